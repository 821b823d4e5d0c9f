use std::sync::Arc;
use tracing::{debug, error};

use crate::models::{
    Assignment, AssignmentDraft, AssignmentId, HistoryAction, HistoryEntry, NewHistoryEntry,
};
use crate::store::{Store, StoreResult};

use super::EngineResult;

/// Append-only trail of assignment mutations.
pub struct AuditLog<S: Store> {
    store: Arc<S>,
}

impl<S: Store> Clone for AuditLog<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> AuditLog<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Insert an assignment together with its Created entry. Stores that
    /// support it write both at once; otherwise the entry is best-effort.
    pub async fn insert_recorded(
        &self,
        draft: AssignmentDraft,
        detail: &str,
    ) -> EngineResult<Assignment> {
        let recorded = self
            .store
            .insert_assignment_recorded(draft, HistoryAction::Created, detail.to_string())
            .await?;
        self.settle(recorded.value.id, HistoryAction::Created, recorded.history);
        Ok(recorded.value)
    }

    /// Replace an assignment and record `action` against it. Returns false,
    /// writing nothing, if the assignment no longer exists.
    pub async fn replace_recorded(
        &self,
        assignment: &Assignment,
        action: HistoryAction,
        detail: &str,
    ) -> EngineResult<bool> {
        let recorded = self
            .store
            .replace_assignment_recorded(assignment, action, detail.to_string())
            .await?;
        self.settle(assignment.id, action, recorded.history);
        Ok(recorded.value)
    }

    /// Best-effort append. A store failure is logged and swallowed: the
    /// mutation being audited has already been committed.
    #[allow(dead_code)]
    pub async fn record(&self, assignment_id: AssignmentId, action: HistoryAction, detail: &str) {
        let entry = NewHistoryEntry::new(assignment_id, action, detail);
        let outcome = self.store.append_history(entry).await;
        self.settle(assignment_id, action, Some(outcome));
    }

    fn settle(
        &self,
        assignment_id: AssignmentId,
        action: HistoryAction,
        outcome: Option<StoreResult<HistoryEntry>>,
    ) {
        match outcome {
            Some(Ok(entry)) => debug!(
                "Recorded {} for assignment {} (entry {})",
                entry.action, assignment_id, entry.id
            ),
            Some(Err(e)) => error!(
                "Failed to record {} for assignment {}: {}",
                action, assignment_id, e
            ),
            None => (),
        }
    }

    /// Entries for one assignment, oldest first.
    pub async fn history_for(
        &self,
        assignment_id: AssignmentId,
    ) -> EngineResult<Vec<HistoryEntry>> {
        let mut entries = self.store.history(assignment_id).await?;
        entries.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at).then(a.id.cmp(&b.id)));
        Ok(entries)
    }
}
