use anyhow::Result;
use clap::Args as ClapArgs;

use crate::commands::common;
use crate::context::AppContext;
use crate::models::AssignmentId;

#[derive(ClapArgs)]
pub struct Args {
    pub id: AssignmentId,
}

pub async fn execute(ctx: &AppContext, args: Args) -> Result<()> {
    let cancelled = ctx
        .assignments
        .cancel(args.id)
        .await
        .map_err(common::explain)?;

    if cancelled {
        println!("{} cancelled", args.id);
    } else {
        println!("{} unchanged (unknown or already cancelled)", args.id);
    }
    Ok(())
}
