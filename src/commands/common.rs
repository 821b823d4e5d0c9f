use anyhow::{anyhow, bail, Result};
use clap::Args as ClapArgs;
use serde::Serialize;

use crate::context::AppContext;
use crate::engine::EngineError;
use crate::models::{Assignment, AssignmentDetails, AssignmentPatch, AssignmentSummary, Expert};

/// Paperwork flags shared by `book` and `edit`.
#[derive(ClapArgs, Debug, Default)]
pub struct DetailArgs {
    /// Routing sheet number
    #[arg(long)]
    pub routing_sheet: Option<String>,

    /// Case file reference
    #[arg(long)]
    pub case_file: Option<String>,

    /// Requesting agency
    #[arg(long)]
    pub agency: Option<String>,

    /// Prosecutor folder reference
    #[arg(long)]
    pub prosecutor_folder: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    #[arg(long)]
    pub designation: Option<String>,

    /// Displacement order reference
    #[arg(long)]
    pub displacement_order: Option<String>,
}

impl DetailArgs {
    pub fn into_details(self) -> AssignmentDetails {
        AssignmentDetails {
            routing_sheet: self.routing_sheet.unwrap_or_default(),
            case_file: self.case_file.unwrap_or_default(),
            agency: self.agency.unwrap_or_default(),
            prosecutor_folder: self.prosecutor_folder.unwrap_or_default(),
            notes: self.notes.unwrap_or_default(),
            location: self.location.unwrap_or_default(),
            designation: self.designation.unwrap_or_default(),
            displacement_order: self.displacement_order.unwrap_or_default(),
        }
    }

    pub fn apply_to(self, patch: &mut AssignmentPatch) {
        patch.routing_sheet = self.routing_sheet;
        patch.case_file = self.case_file;
        patch.agency = self.agency;
        patch.prosecutor_folder = self.prosecutor_folder;
        patch.notes = self.notes;
        patch.location = self.location;
        patch.designation = self.designation;
        patch.displacement_order = self.displacement_order;
    }
}

/// Resolve an expert given as numeric id or name.
pub async fn resolve_expert(ctx: &AppContext, id_or_name: &str) -> Result<Expert> {
    match ctx.experts.resolve(id_or_name).await? {
        Some(expert) => Ok(expert),
        None => bail!("Expert not found: {}", id_or_name),
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_conflicts(conflicts: &[AssignmentSummary]) {
    for c in conflicts {
        let case_file = if c.case_file.is_empty() {
            "-"
        } else {
            c.case_file.as_str()
        };
        eprintln!(
            "  #{} {} .. {}  case file: {}  {}",
            c.id, c.start_date, c.end_date, case_file, c.notes
        );
    }
}

/// Turn an engine error into a command error, printing the conflicting
/// bookings first when there are any.
pub fn explain(err: EngineError) -> anyhow::Error {
    if let Some(conflicts) = err.conflicts() {
        eprintln!("Conflicting assignments:");
        print_conflicts(conflicts);
    }
    anyhow!(err)
}

pub fn describe_assignment(
    assignment: &Assignment,
    expert_name: Option<&str>,
) -> Vec<(&'static str, String)> {
    let d = &assignment.details;
    vec![
        ("Assignment", assignment.id.to_string()),
        (
            "Expert",
            match expert_name {
                Some(name) => format!("{} (#{})", name, assignment.expert_id),
                None => format!("#{}", assignment.expert_id),
            },
        ),
        ("Dates", assignment.range().to_string()),
        ("Status", assignment.status.to_string()),
        ("Routing sheet", d.routing_sheet.clone()),
        ("Case file", d.case_file.clone()),
        ("Agency", d.agency.clone()),
        ("Prosecutor folder", d.prosecutor_folder.clone()),
        ("Location", d.location.clone()),
        ("Designation", d.designation.clone()),
        ("Displacement order", d.displacement_order.clone()),
        ("Notes", d.notes.clone()),
        (
            "Registered",
            assignment.registered_at.format("%Y-%m-%d %H:%M").to_string(),
        ),
    ]
}
