use anyhow::Result;
use clap::Args as ClapArgs;

use crate::commands::common::{self, DetailArgs};
use crate::context::AppContext;
use crate::models::{AssignmentId, AssignmentPatch, AssignmentStatus};

#[derive(ClapArgs)]
pub struct Args {
    pub id: AssignmentId,

    /// New first day (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,

    /// New last day (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<String>,

    /// Move to another expert (id or name)
    #[arg(long)]
    pub expert: Option<String>,

    #[arg(long)]
    pub status: Option<AssignmentStatus>,

    #[command(flatten)]
    pub details: DetailArgs,
}

pub async fn execute(ctx: &AppContext, args: Args) -> Result<()> {
    let mut patch = AssignmentPatch {
        start_date: args.start,
        end_date: args.end,
        status: args.status,
        ..Default::default()
    };
    if let Some(expert) = &args.expert {
        patch.expert_id = Some(common::resolve_expert(ctx, expert).await?.id);
    }
    args.details.apply_to(&mut patch);

    let applied = ctx
        .assignments
        .update(args.id, &patch)
        .await
        .map_err(common::explain)?;

    let names: Vec<&str> = applied.iter().map(|f| f.as_str()).collect();
    println!("{} updated: {}", args.id, names.join(", "));
    Ok(())
}
