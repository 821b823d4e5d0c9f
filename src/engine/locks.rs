use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::ExpertId;

/// Per-expert advisory locks.
///
/// A booking holds the lock of every expert it touches across its
/// availability check and its write, so two requests for the same expert
/// cannot both pass the check before either commits.
#[derive(Debug, Default)]
pub struct ExpertLocks {
    slots: Mutex<HashMap<ExpertId, Arc<AsyncMutex<()>>>>,
}

/// Guards held for the duration of one logical operation.
#[derive(Debug)]
pub struct ExpertGuard {
    experts: Vec<ExpertId>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl ExpertGuard {
    pub fn covers(&self, expert_id: ExpertId) -> bool {
        self.experts.contains(&expert_id)
    }
}

impl ExpertLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared mutex for one expert. Slots nobody holds or waits on are
    /// dropped first, so the map only tracks experts in use.
    fn slot(&self, expert_id: ExpertId) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.retain(|id, slot| *id == expert_id || Arc::strong_count(slot) > 1);
        slots.entry(expert_id).or_default().clone()
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub async fn lock(&self, expert_id: ExpertId) -> ExpertGuard {
        self.lock_all(&[expert_id]).await
    }

    /// Lock several experts. Ids are taken in ascending order so that two
    /// callers locking overlapping sets cannot deadlock.
    pub async fn lock_all(&self, expert_ids: &[ExpertId]) -> ExpertGuard {
        let mut experts = expert_ids.to_vec();
        experts.sort_unstable();
        experts.dedup();

        let mut guards = Vec::with_capacity(experts.len());
        for &expert_id in &experts {
            guards.push(self.slot(expert_id).lock_owned().await);
        }

        ExpertGuard {
            experts,
            _guards: guards,
        }
    }
}
