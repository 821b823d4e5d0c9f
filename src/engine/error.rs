use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{
    AssignmentId, AssignmentStatus, AssignmentSummary, DateFormatError, ExpertId,
};
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid date '{value}': expected YYYY-MM-DD")]
    DateFormat { value: String },

    #[error("Start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error(
        "Expert is not available on these dates ({} conflicting assignment(s))",
        .conflicts.len()
    )]
    Conflict { conflicts: Vec<AssignmentSummary> },

    #[error("Assignment not found: {0}")]
    AssignmentNotFound(AssignmentId),

    #[error("Expert not found: {0}")]
    ExpertNotFound(ExpertId),

    #[error("Expert {0} is inactive and cannot be booked")]
    ExpertInactive(ExpertId),

    #[error("No fields to update")]
    NoFields,

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: AssignmentStatus,
        to: AssignmentStatus,
    },

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}

impl EngineError {
    /// Stable kind tag for callers that report errors as structured data.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::DateFormat { .. } => "date_format",
            EngineError::InvalidRange { .. } => "invalid_range",
            EngineError::Conflict { .. } => "conflict",
            EngineError::AssignmentNotFound(_) | EngineError::ExpertNotFound(_) => "not_found",
            EngineError::ExpertInactive(_) => "expert_inactive",
            EngineError::NoFields => "no_fields",
            EngineError::InvalidTransition { .. } => "invalid_transition",
            EngineError::Persistence(_) => "persistence",
        }
    }

    pub fn conflicts(&self) -> Option<&[AssignmentSummary]> {
        match self {
            EngineError::Conflict { conflicts } => Some(conflicts),
            _ => None,
        }
    }
}

impl From<DateFormatError> for EngineError {
    fn from(e: DateFormatError) -> Self {
        EngineError::DateFormat { value: e.value }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
