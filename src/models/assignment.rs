use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::dates::{parse_date, DateFormatError, DateRange};
use super::expert::ExpertId;

/// Unique identifier for assignments
pub type AssignmentId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    #[default]
    Pending,
    InProcess,
    Completed,
    Cancelled,
}

impl AssignmentStatus {
    pub const ALL: [AssignmentStatus; 4] = [
        AssignmentStatus::Pending,
        AssignmentStatus::InProcess,
        AssignmentStatus::Completed,
        AssignmentStatus::Cancelled,
    ];

    /// Pending -> InProcess -> Completed, and any non-terminal state may be cancelled.
    pub fn can_transition_to(&self, next: AssignmentStatus) -> bool {
        use AssignmentStatus::*;
        matches!(
            (self, next),
            (Pending, InProcess) | (InProcess, Completed) | (Pending | InProcess, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AssignmentStatus::Completed | AssignmentStatus::Cancelled)
    }

    /// Whether the assignment still occupies its expert's calendar.
    pub fn holds_slot(&self) -> bool {
        !matches!(self, AssignmentStatus::Cancelled)
    }

    pub fn label(&self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "Pending",
            AssignmentStatus::InProcess => "In Process",
            AssignmentStatus::Completed => "Completed",
            AssignmentStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for AssignmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "pending" => Ok(AssignmentStatus::Pending),
            "inprocess" => Ok(AssignmentStatus::InProcess),
            "completed" => Ok(AssignmentStatus::Completed),
            "cancelled" | "canceled" => Ok(AssignmentStatus::Cancelled),
            _ => Err(format!(
                "unknown status '{}' (expected pending, in_process, completed or cancelled)",
                s
            )),
        }
    }
}

/// Free-text paperwork attached to an assignment. Every field is optional and
/// stored as an empty string when absent.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AssignmentDetails {
    #[serde(default)]
    pub routing_sheet: String,
    #[serde(default)]
    pub case_file: String,
    #[serde(default)]
    pub agency: String,
    #[serde(default)]
    pub prosecutor_folder: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub designation: String,
    #[serde(default)]
    pub displacement_order: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assignment {
    pub id: AssignmentId,
    pub expert_id: ExpertId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub status: AssignmentStatus,
    #[serde(default)]
    pub details: AssignmentDetails,
    pub registered_at: DateTime<Utc>,
}

impl Assignment {
    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }

    pub fn holds_slot(&self) -> bool {
        self.status.holds_slot()
    }

    pub fn summary(&self) -> AssignmentSummary {
        AssignmentSummary {
            id: self.id,
            case_file: self.details.case_file.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            notes: self.details.notes.clone(),
        }
    }
}

/// A validated booking ready to be stored; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentDraft {
    pub expert_id: ExpertId,
    pub range: DateRange,
    pub details: AssignmentDetails,
}

/// Booking request as received from a caller, with dates still in text form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewAssignment {
    pub expert_id: ExpertId,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub details: AssignmentDetails,
}

impl NewAssignment {
    pub fn new(
        expert_id: ExpertId,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            expert_id,
            start_date: start_date.into(),
            end_date: end_date.into(),
            details: AssignmentDetails::default(),
        }
    }

    pub fn with_details(mut self, details: AssignmentDetails) -> Self {
        self.details = details;
        self
    }
}

/// Fields an update may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentField {
    RoutingSheet,
    CaseFile,
    Agency,
    ProsecutorFolder,
    Notes,
    Location,
    Designation,
    DisplacementOrder,
    StartDate,
    EndDate,
    ExpertId,
    Status,
}

impl AssignmentField {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentField::RoutingSheet => "routing_sheet",
            AssignmentField::CaseFile => "case_file",
            AssignmentField::Agency => "agency",
            AssignmentField::ProsecutorFolder => "prosecutor_folder",
            AssignmentField::Notes => "notes",
            AssignmentField::Location => "location",
            AssignmentField::Designation => "designation",
            AssignmentField::DisplacementOrder => "displacement_order",
            AssignmentField::StartDate => "start_date",
            AssignmentField::EndDate => "end_date",
            AssignmentField::ExpertId => "expert_id",
            AssignmentField::Status => "status",
        }
    }
}

impl std::fmt::Display for AssignmentField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssignmentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_sheet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prosecutor_folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displacement_order: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expert_id: Option<ExpertId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AssignmentStatus>,
}

/// Dates of a patch after boundary parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchDates {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl AssignmentPatch {
    pub fn with_dates(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_date = Some(start.into());
        self.end_date = Some(end.into());
        self
    }

    pub fn with_expert(mut self, expert_id: ExpertId) -> Self {
        self.expert_id = Some(expert_id);
        self
    }

    /// Supplied fields, in declaration order.
    pub fn fields(&self) -> Vec<AssignmentField> {
        let supplied = [
            (self.routing_sheet.is_some(), AssignmentField::RoutingSheet),
            (self.case_file.is_some(), AssignmentField::CaseFile),
            (self.agency.is_some(), AssignmentField::Agency),
            (self.prosecutor_folder.is_some(), AssignmentField::ProsecutorFolder),
            (self.notes.is_some(), AssignmentField::Notes),
            (self.location.is_some(), AssignmentField::Location),
            (self.designation.is_some(), AssignmentField::Designation),
            (self.displacement_order.is_some(), AssignmentField::DisplacementOrder),
            (self.start_date.is_some(), AssignmentField::StartDate),
            (self.end_date.is_some(), AssignmentField::EndDate),
            (self.expert_id.is_some(), AssignmentField::ExpertId),
            (self.status.is_some(), AssignmentField::Status),
        ];
        supplied
            .into_iter()
            .filter_map(|(set, field)| set.then_some(field))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Whether the patch names expert, start and end together.
    pub fn sets_full_schedule(&self) -> bool {
        self.expert_id.is_some() && self.start_date.is_some() && self.end_date.is_some()
    }

    /// Whether the patch touches any of expert, start or end.
    pub fn touches_schedule(&self) -> bool {
        self.expert_id.is_some() || self.start_date.is_some() || self.end_date.is_some()
    }

    pub fn parse_dates(&self) -> Result<PatchDates, DateFormatError> {
        Ok(PatchDates {
            start: self.start_date.as_deref().map(parse_date).transpose()?,
            end: self.end_date.as_deref().map(parse_date).transpose()?,
        })
    }

    /// Copy every supplied field onto `target` and return the fields written.
    pub fn apply(&self, target: &mut Assignment, dates: &PatchDates) -> Vec<AssignmentField> {
        let details = &mut target.details;
        let text_fields = [
            (&self.routing_sheet, &mut details.routing_sheet),
            (&self.case_file, &mut details.case_file),
            (&self.agency, &mut details.agency),
            (&self.prosecutor_folder, &mut details.prosecutor_folder),
            (&self.notes, &mut details.notes),
            (&self.location, &mut details.location),
            (&self.designation, &mut details.designation),
            (&self.displacement_order, &mut details.displacement_order),
        ];
        for (value, slot) in text_fields {
            if let Some(value) = value {
                *slot = value.clone();
            }
        }

        if let Some(start) = dates.start {
            target.start_date = start;
        }
        if let Some(end) = dates.end {
            target.end_date = end;
        }
        if let Some(expert_id) = self.expert_id {
            target.expert_id = expert_id;
        }
        if let Some(status) = self.status {
            target.status = status;
        }

        self.fields()
    }
}

/// Enough of a conflicting booking to explain the clash to a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssignmentSummary {
    pub id: AssignmentId,
    pub case_file: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub notes: String,
}

/// An assignment joined with its expert's name.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AssignmentView {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub expert_name: Option<String>,
}
