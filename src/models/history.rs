use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::assignment::{AssignmentId, AssignmentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Created,
    Modified,
    Started,
    Completed,
    Cancelled,
}

impl HistoryAction {
    /// Action recorded when an assignment moves into `status`.
    pub fn for_status(status: AssignmentStatus) -> Self {
        match status {
            AssignmentStatus::Pending => HistoryAction::Modified,
            AssignmentStatus::InProcess => HistoryAction::Started,
            AssignmentStatus::Completed => HistoryAction::Completed,
            AssignmentStatus::Cancelled => HistoryAction::Cancelled,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HistoryAction::Created => "Created",
            HistoryAction::Modified => "Modified",
            HistoryAction::Started => "Started",
            HistoryAction::Completed => "Completed",
            HistoryAction::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub id: u64,
    pub assignment_id: AssignmentId,
    pub action: HistoryAction,
    #[serde(default)]
    pub detail: String,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Timestamp for the next entry: wall clock, but never earlier than the
    /// previous entry so the log stays ordered when the clock steps back.
    pub fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
        let now = Utc::now();
        match previous {
            Some(last) if last > now => last,
            _ => now,
        }
    }
}

/// Entry fields supplied by the caller; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryEntry {
    pub assignment_id: AssignmentId,
    pub action: HistoryAction,
    pub detail: String,
}

impl NewHistoryEntry {
    pub fn new(
        assignment_id: AssignmentId,
        action: HistoryAction,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            assignment_id,
            action,
            detail: detail.into(),
        }
    }
}
