use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::models::{
    Assignment, AssignmentDraft, AssignmentId, Expert, ExpertId, ExpertStatus, HistoryAction,
    HistoryEntry, NewExpert, NewHistoryEntry,
};

use super::snapshot::Snapshot;
use super::{AssignmentQuery, Recorded, Store, StoreResult};

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn expert(&self, id: ExpertId) -> StoreResult<Option<Expert>> {
        Ok(self.state.lock().await.expert(id))
    }

    async fn experts(&self) -> StoreResult<Vec<Expert>> {
        Ok(self.state.lock().await.experts())
    }

    async fn insert_expert(&self, expert: NewExpert) -> StoreResult<Expert> {
        Ok(self.state.lock().await.insert_expert(expert))
    }

    async fn set_expert_status(&self, id: ExpertId, status: ExpertStatus) -> StoreResult<bool> {
        Ok(self.state.lock().await.set_expert_status(id, status))
    }

    async fn assignment(&self, id: AssignmentId) -> StoreResult<Option<Assignment>> {
        Ok(self.state.lock().await.assignment(id))
    }

    async fn assignments(&self, query: &AssignmentQuery) -> StoreResult<Vec<Assignment>> {
        Ok(self.state.lock().await.assignments(query))
    }

    async fn insert_assignment(&self, draft: AssignmentDraft) -> StoreResult<Assignment> {
        Ok(self.state.lock().await.insert_assignment(draft))
    }

    async fn replace_assignment(&self, assignment: &Assignment) -> StoreResult<bool> {
        Ok(self.state.lock().await.replace_assignment(assignment))
    }

    async fn append_history(&self, entry: NewHistoryEntry) -> StoreResult<HistoryEntry> {
        Ok(self.state.lock().await.append_history(entry))
    }

    async fn history(&self, assignment_id: AssignmentId) -> StoreResult<Vec<HistoryEntry>> {
        Ok(self.state.lock().await.history(assignment_id))
    }

    async fn insert_assignment_recorded(
        &self,
        draft: AssignmentDraft,
        action: HistoryAction,
        detail: String,
    ) -> StoreResult<Recorded<Assignment>> {
        let (assignment, entry) = self
            .state
            .lock()
            .await
            .insert_assignment_recorded(draft, action, detail);
        Ok(Recorded {
            value: assignment,
            history: Some(Ok(entry)),
        })
    }

    async fn replace_assignment_recorded(
        &self,
        assignment: &Assignment,
        action: HistoryAction,
        detail: String,
    ) -> StoreResult<Recorded<bool>> {
        let entry = self
            .state
            .lock()
            .await
            .replace_assignment_recorded(assignment, action, detail);
        Ok(Recorded {
            value: entry.is_some(),
            history: entry.map(Ok),
        })
    }
}
