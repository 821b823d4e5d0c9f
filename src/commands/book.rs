use anyhow::Result;
use clap::Args as ClapArgs;

use crate::commands::common::{self, DetailArgs};
use crate::context::AppContext;
use crate::models::NewAssignment;

#[derive(ClapArgs)]
pub struct Args {
    /// Expert id or name
    pub expert: String,

    /// First day (YYYY-MM-DD)
    pub start: String,

    /// Last day, inclusive (YYYY-MM-DD)
    pub end: String,

    #[command(flatten)]
    pub details: DetailArgs,

    #[arg(long)]
    pub json: bool,
}

pub async fn execute(ctx: &AppContext, args: Args) -> Result<()> {
    let expert = common::resolve_expert(ctx, &args.expert).await?;
    let request = NewAssignment::new(expert.id, args.start, args.end)
        .with_details(args.details.into_details());

    let id = ctx
        .assignments
        .create(request)
        .await
        .map_err(common::explain)?;

    if args.json {
        let view = ctx.assignments.get(id).await?;
        return common::print_json(&view);
    }
    println!("{}", id);
    Ok(())
}
