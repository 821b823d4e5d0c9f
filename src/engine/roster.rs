use futures::future::try_join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::config::ExpertConfig;
use crate::models::{Category, Expert, ExpertId, ExpertStatus, NewExpert};
use crate::store::{AssignmentQuery, Store};

use super::{EngineError, EngineResult};

/// Number of assignments booked against one expert.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExpertWorkload {
    #[serde(flatten)]
    pub expert: Expert,
    pub assignments: usize,
    /// Assignments that still hold a slot (not cancelled).
    pub holding: usize,
}

/// The pool of bookable specialists.
pub struct ExpertRoster<S: Store> {
    store: Arc<S>,
}

impl<S: Store> Clone for ExpertRoster<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> ExpertRoster<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Insert the configured experts into an empty store.
    ///
    /// Returns how many were inserted; zero when the store already has experts.
    /// The emptiness check and the inserts share one store lease, so two
    /// processes opening a fresh store seed it once.
    pub async fn seed(&self, experts: &[ExpertConfig]) -> EngineResult<usize> {
        let _lease = self.store.lease().await?;
        if !self.store.experts().await?.is_empty() {
            return Ok(0);
        }

        for expert in experts {
            self.store
                .insert_expert(NewExpert::new(expert.name.clone(), expert.category))
                .await?;
        }

        info!("Seeded {} experts", experts.len());
        Ok(experts.len())
    }

    /// Experts ordered by category, then name.
    pub async fn list(&self, include_inactive: bool) -> EngineResult<Vec<Expert>> {
        let mut experts: Vec<Expert> = self
            .store
            .experts()
            .await?
            .into_iter()
            .filter(|e| include_inactive || e.is_active())
            .collect();
        experts.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
                .then(a.id.cmp(&b.id))
        });
        Ok(experts)
    }

    pub async fn get(&self, id: ExpertId) -> EngineResult<Expert> {
        self.store
            .expert(id)
            .await?
            .ok_or(EngineError::ExpertNotFound(id))
    }

    /// Look an expert up by numeric id or, failing that, by name
    /// (case-insensitive, lowest id wins).
    pub async fn resolve(&self, id_or_name: &str) -> EngineResult<Option<Expert>> {
        let needle = id_or_name.trim();
        if let Ok(id) = needle.parse::<ExpertId>() {
            return Ok(self.store.expert(id).await?);
        }

        let mut matches: Vec<Expert> = self
            .store
            .experts()
            .await?
            .into_iter()
            .filter(|e| e.matches_name(needle))
            .collect();
        matches.sort_by_key(|e| e.id);
        Ok(matches.into_iter().next())
    }

    pub async fn add(&self, name: &str, category: Category) -> EngineResult<Expert> {
        let _lease = self.store.lease().await?;
        let expert = self
            .store
            .insert_expert(NewExpert::new(name.trim(), category))
            .await?;
        info!("Added expert {} ({}, {})", expert.id, expert.name, expert.category);
        Ok(expert)
    }

    pub async fn set_status(&self, id: ExpertId, status: ExpertStatus) -> EngineResult<()> {
        let _lease = self.store.lease().await?;
        if !self.store.set_expert_status(id, status).await? {
            return Err(EngineError::ExpertNotFound(id));
        }
        info!("Expert {} is now {}", id, status.description());
        Ok(())
    }

    /// Every expert with its assignment counts, in roster order.
    pub async fn workload(&self) -> EngineResult<Vec<ExpertWorkload>> {
        let experts = self.list(true).await?;

        let counts = try_join_all(experts.iter().map(|expert| {
            let query = AssignmentQuery {
                expert_id: Some(expert.id),
                ..Default::default()
            };
            async move { self.store.assignments(&query).await }
        }))
        .await?;

        Ok(experts
            .into_iter()
            .zip(counts)
            .map(|(expert, assignments)| ExpertWorkload {
                expert,
                holding: assignments.iter().filter(|a| a.holds_slot()).count(),
                assignments: assignments.len(),
            })
            .collect())
    }
}
