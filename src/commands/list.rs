use anyhow::{Context, Result};
use clap::Args as ClapArgs;

use crate::commands::common;
use crate::context::AppContext;
use crate::engine::ListFilter;
use crate::models::{parse_date, AssignmentStatus};
use crate::utils::render_table;

#[derive(ClapArgs)]
pub struct Args {
    #[arg(long)]
    pub status: Option<AssignmentStatus>,

    /// Expert id or name
    #[arg(long)]
    pub expert: Option<String>,

    /// Only assignments starting on or after this day
    #[arg(long)]
    pub from: Option<String>,

    /// Only assignments ending on or before this day
    #[arg(long)]
    pub until: Option<String>,

    #[arg(long)]
    pub json: bool,
}

pub async fn execute(ctx: &AppContext, args: Args) -> Result<()> {
    let mut filter = ListFilter {
        status: args.status,
        ..Default::default()
    };
    if let Some(expert) = &args.expert {
        filter.expert_id = Some(common::resolve_expert(ctx, expert).await?.id);
    }
    if let Some(from) = &args.from {
        filter.starts_from = Some(parse_date(from).context("Invalid --from")?);
    }
    if let Some(until) = &args.until {
        filter.ends_until = Some(parse_date(until).context("Invalid --until")?);
    }

    let views = ctx.assignments.list(&filter).await?;
    if args.json {
        return common::print_json(&views);
    }

    if views.is_empty() {
        println!("No assignments");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = views
        .iter()
        .map(|v| {
            let a = &v.assignment;
            vec![
                a.id.to_string(),
                v.expert_name.clone().unwrap_or_else(|| format!("#{}", a.expert_id)),
                a.start_date.to_string(),
                a.end_date.to_string(),
                a.status.to_string(),
                a.details.case_file.clone(),
                a.details.location.clone(),
            ]
        })
        .collect();
    println!(
        "{}",
        render_table(
            &["ID", "EXPERT", "START", "END", "STATUS", "CASE FILE", "LOCATION"],
            &rows,
            28
        )
    );
    Ok(())
}
