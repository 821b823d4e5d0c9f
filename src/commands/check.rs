use anyhow::Result;
use clap::Args as ClapArgs;

use crate::commands::common;
use crate::context::AppContext;
use crate::models::AssignmentId;

#[derive(ClapArgs)]
pub struct Args {
    /// Expert id or name
    pub expert: String,

    /// First day (YYYY-MM-DD)
    pub start: String,

    /// Last day, inclusive (YYYY-MM-DD)
    pub end: String,

    /// Ignore this assignment (use when checking an edit)
    #[arg(long)]
    pub exclude: Option<AssignmentId>,

    #[arg(long)]
    pub json: bool,
}

pub async fn execute(ctx: &AppContext, args: Args) -> Result<()> {
    let expert = common::resolve_expert(ctx, &args.expert).await?;
    let availability = ctx
        .assignments
        .check_availability(expert.id, &args.start, &args.end, args.exclude)
        .await
        .map_err(common::explain)?;

    if args.json {
        return common::print_json(&availability);
    }

    if availability.available {
        println!("{} is available from {} to {}", expert.name, args.start, args.end);
    } else {
        println!("{} is NOT available from {} to {}", expert.name, args.start, args.end);
        common::print_conflicts(&availability.conflicts);
    }
    Ok(())
}
