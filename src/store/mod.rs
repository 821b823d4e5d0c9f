mod memory;
mod snapshot;
mod yaml;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{
    Assignment, AssignmentDraft, AssignmentId, AssignmentStatus, Expert, ExpertId, ExpertStatus,
    HistoryAction, HistoryEntry, NewExpert, NewHistoryEntry,
};

pub use memory::MemoryStore;
pub use yaml::YamlStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store encoding error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Store is corrupt: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Exclusive hold on a store across several calls.
///
/// A back end shared between processes takes an inter-process lock when the
/// lease is granted and reloads its state from disk, so a read-check-write
/// sequence performed under the lease sees every committed change. Dropping
/// the lease releases it.
#[derive(Debug, Default)]
#[must_use = "the store is only held while the lease is alive"]
pub struct StoreLease {
    _held: Option<yaml::FileLease>,
}

impl StoreLease {
    fn held(lease: yaml::FileLease) -> Self {
        Self { _held: Some(lease) }
    }
}

/// Outcome of a write that also appends a history entry.
///
/// `history` is `None` when the primary write changed nothing and no entry
/// was attempted.
#[derive(Debug)]
pub struct Recorded<T> {
    pub value: T,
    pub history: Option<StoreResult<HistoryEntry>>,
}

/// Filter over stored assignments. Every field left `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentQuery {
    pub expert_id: Option<ExpertId>,
    pub status: Option<AssignmentStatus>,
    pub exclude_status: Option<AssignmentStatus>,
    pub exclude_id: Option<AssignmentId>,
    pub starts_on_or_after: Option<NaiveDate>,
    pub ends_on_or_before: Option<NaiveDate>,
}

impl AssignmentQuery {
    /// Assignments still occupying the expert's calendar.
    pub fn holding_slots(expert_id: ExpertId) -> Self {
        Self {
            expert_id: Some(expert_id),
            exclude_status: Some(AssignmentStatus::Cancelled),
            ..Default::default()
        }
    }

    pub fn excluding(mut self, id: Option<AssignmentId>) -> Self {
        self.exclude_id = id;
        self
    }

    pub fn matches(&self, assignment: &Assignment) -> bool {
        self.expert_id.map_or(true, |id| assignment.expert_id == id)
            && self.status.map_or(true, |s| assignment.status == s)
            && self.exclude_status.map_or(true, |s| assignment.status != s)
            && self.exclude_id.map_or(true, |id| assignment.id != id)
            && self
                .starts_on_or_after
                .map_or(true, |d| assignment.start_date >= d)
            && self
                .ends_on_or_before
                .map_or(true, |d| assignment.end_date <= d)
    }
}

/// Persistence contract for experts, assignments and their audit trail.
///
/// Implementations serialize their own writes. A check-then-write sequence
/// must run under an expert lock within this process and under a
/// [`lease`](Store::lease) across processes.
#[async_trait]
pub trait Store: Send + Sync {
    /// Hold the store until the returned lease is dropped. Stores that are
    /// private to one process have nothing to hold.
    async fn lease(&self) -> StoreResult<StoreLease> {
        Ok(StoreLease::default())
    }

    async fn expert(&self, id: ExpertId) -> StoreResult<Option<Expert>>;

    async fn experts(&self) -> StoreResult<Vec<Expert>>;

    async fn insert_expert(&self, expert: NewExpert) -> StoreResult<Expert>;

    /// Returns false if the expert does not exist.
    async fn set_expert_status(&self, id: ExpertId, status: ExpertStatus) -> StoreResult<bool>;

    async fn assignment(&self, id: AssignmentId) -> StoreResult<Option<Assignment>>;

    /// Matching assignments in ascending id order.
    async fn assignments(&self, query: &AssignmentQuery) -> StoreResult<Vec<Assignment>>;

    async fn insert_assignment(&self, draft: AssignmentDraft) -> StoreResult<Assignment>;

    /// Replace the stored record with the same id. Returns false if absent.
    async fn replace_assignment(&self, assignment: &Assignment) -> StoreResult<bool>;

    async fn append_history(&self, entry: NewHistoryEntry) -> StoreResult<HistoryEntry>;

    /// Entries for one assignment in insertion order.
    async fn history(&self, assignment_id: AssignmentId) -> StoreResult<Vec<HistoryEntry>>;

    /// Insert an assignment and its history entry. Back ends that can do
    /// both in a single write override this.
    async fn insert_assignment_recorded(
        &self,
        draft: AssignmentDraft,
        action: HistoryAction,
        detail: String,
    ) -> StoreResult<Recorded<Assignment>> {
        let assignment = self.insert_assignment(draft).await?;
        let history = self
            .append_history(NewHistoryEntry::new(assignment.id, action, detail))
            .await;
        Ok(Recorded {
            value: assignment,
            history: Some(history),
        })
    }

    /// Replace an assignment and, if it existed, append its history entry.
    async fn replace_assignment_recorded(
        &self,
        assignment: &Assignment,
        action: HistoryAction,
        detail: String,
    ) -> StoreResult<Recorded<bool>> {
        if !self.replace_assignment(assignment).await? {
            return Ok(Recorded {
                value: false,
                history: None,
            });
        }
        let history = self
            .append_history(NewHistoryEntry::new(assignment.id, action, detail))
            .await;
        Ok(Recorded {
            value: true,
            history: Some(history),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{parse_date, AssignmentDetails};
    use chrono::Utc;

    fn assignment(id: AssignmentId, expert_id: ExpertId, status: AssignmentStatus) -> Assignment {
        Assignment {
            id,
            expert_id,
            start_date: parse_date("2025-03-01").unwrap(),
            end_date: parse_date("2025-03-05").unwrap(),
            status,
            details: AssignmentDetails::default(),
            registered_at: Utc::now(),
        }
    }

    #[test]
    fn default_query_matches_everything() {
        let query = AssignmentQuery::default();
        assert!(query.matches(&assignment(1, 1, AssignmentStatus::Cancelled)));
        assert!(query.matches(&assignment(2, 9, AssignmentStatus::Completed)));
    }

    #[test]
    fn holding_slots_skips_cancelled_and_other_experts() {
        let query = AssignmentQuery::holding_slots(1);
        assert!(query.matches(&assignment(1, 1, AssignmentStatus::Pending)));
        assert!(query.matches(&assignment(2, 1, AssignmentStatus::Completed)));
        assert!(!query.matches(&assignment(3, 1, AssignmentStatus::Cancelled)));
        assert!(!query.matches(&assignment(4, 2, AssignmentStatus::Pending)));
    }

    #[test]
    fn excluding_drops_one_id() {
        let query = AssignmentQuery::holding_slots(1).excluding(Some(7));
        assert!(!query.matches(&assignment(7, 1, AssignmentStatus::Pending)));
        assert!(query.matches(&assignment(8, 1, AssignmentStatus::Pending)));
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let record = assignment(1, 1, AssignmentStatus::Pending);
        let query = AssignmentQuery {
            starts_on_or_after: Some(parse_date("2025-03-01").unwrap()),
            ends_on_or_before: Some(parse_date("2025-03-05").unwrap()),
            ..Default::default()
        };
        assert!(query.matches(&record));

        let later = AssignmentQuery {
            starts_on_or_after: Some(parse_date("2025-03-02").unwrap()),
            ..Default::default()
        };
        assert!(!later.matches(&record));
    }
}
