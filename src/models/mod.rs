mod assignment;
mod dates;
mod expert;
mod history;

pub use assignment::{
    Assignment, AssignmentDetails, AssignmentDraft, AssignmentField, AssignmentId,
    AssignmentPatch, AssignmentStatus, AssignmentSummary, AssignmentView, NewAssignment,
    PatchDates,
};
pub use dates::{parse_date, DateFormatError, DateRange, DATE_FORMAT};
pub use expert::{Category, Expert, ExpertId, ExpertStatus, NewExpert};
pub use history::{HistoryAction, HistoryEntry, NewHistoryEntry};
