use async_trait::async_trait;
use std::path::Path;

use crate::models::{
    Assignment, AssignmentDraft, AssignmentId, Expert, ExpertId, ExpertStatus, HistoryAction,
    HistoryEntry, NewExpert, NewHistoryEntry,
};
use crate::store::{
    AssignmentQuery, MemoryStore, Recorded, Store, StoreLease, StoreResult, YamlStore,
};

/// The store backend selected by configuration.
#[derive(Debug)]
pub enum ConfiguredStore {
    Yaml(YamlStore),
    Memory(MemoryStore),
}

impl ConfiguredStore {
    /// Backing file, if the store is persistent.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfiguredStore::Yaml(store) => Some(store.path()),
            ConfiguredStore::Memory(_) => None,
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            ConfiguredStore::Yaml($store) => $call,
            ConfiguredStore::Memory($store) => $call,
        }
    };
}

#[async_trait]
impl Store for ConfiguredStore {
    async fn lease(&self) -> StoreResult<StoreLease> {
        dispatch!(self, s => s.lease().await)
    }

    async fn expert(&self, id: ExpertId) -> StoreResult<Option<Expert>> {
        dispatch!(self, s => s.expert(id).await)
    }

    async fn experts(&self) -> StoreResult<Vec<Expert>> {
        dispatch!(self, s => s.experts().await)
    }

    async fn insert_expert(&self, expert: NewExpert) -> StoreResult<Expert> {
        dispatch!(self, s => s.insert_expert(expert).await)
    }

    async fn set_expert_status(&self, id: ExpertId, status: ExpertStatus) -> StoreResult<bool> {
        dispatch!(self, s => s.set_expert_status(id, status).await)
    }

    async fn assignment(&self, id: AssignmentId) -> StoreResult<Option<Assignment>> {
        dispatch!(self, s => s.assignment(id).await)
    }

    async fn assignments(&self, query: &AssignmentQuery) -> StoreResult<Vec<Assignment>> {
        dispatch!(self, s => s.assignments(query).await)
    }

    async fn insert_assignment(&self, draft: AssignmentDraft) -> StoreResult<Assignment> {
        dispatch!(self, s => s.insert_assignment(draft).await)
    }

    async fn replace_assignment(&self, assignment: &Assignment) -> StoreResult<bool> {
        dispatch!(self, s => s.replace_assignment(assignment).await)
    }

    async fn append_history(&self, entry: NewHistoryEntry) -> StoreResult<HistoryEntry> {
        dispatch!(self, s => s.append_history(entry).await)
    }

    async fn history(&self, assignment_id: AssignmentId) -> StoreResult<Vec<HistoryEntry>> {
        dispatch!(self, s => s.history(assignment_id).await)
    }

    async fn insert_assignment_recorded(
        &self,
        draft: AssignmentDraft,
        action: HistoryAction,
        detail: String,
    ) -> StoreResult<Recorded<Assignment>> {
        dispatch!(self, s => s.insert_assignment_recorded(draft, action, detail).await)
    }

    async fn replace_assignment_recorded(
        &self,
        assignment: &Assignment,
        action: HistoryAction,
        detail: String,
    ) -> StoreResult<Recorded<bool>> {
        dispatch!(self, s => s.replace_assignment_recorded(assignment, action, detail).await)
    }
}
