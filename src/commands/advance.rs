use anyhow::Result;
use clap::Args as ClapArgs;

use crate::commands::common;
use crate::context::AppContext;
use crate::models::{AssignmentId, AssignmentStatus};

#[derive(ClapArgs)]
pub struct Args {
    pub id: AssignmentId,

    /// in_process, completed or cancelled
    pub status: AssignmentStatus,
}

pub async fn execute(ctx: &AppContext, args: Args) -> Result<()> {
    ctx.assignments
        .advance(args.id, args.status)
        .await
        .map_err(common::explain)?;
    println!("{} is now {}", args.id, args.status);
    Ok(())
}
