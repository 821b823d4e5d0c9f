use anyhow::Result;
use clap::{Args as ClapArgs, Subcommand};

use crate::commands::common;
use crate::context::AppContext;
use crate::models::{Category, ExpertStatus};

#[derive(Subcommand)]
pub enum Command {
    /// Add a new active expert
    Add(AddArgs),

    /// Make an expert bookable again
    Activate(StatusArgs),

    /// Stop an expert from receiving new bookings
    Deactivate(StatusArgs),
}

#[derive(ClapArgs)]
pub struct AddArgs {
    pub name: String,

    /// computing, acoustic, anthropologist or accounting
    pub category: Category,
}

#[derive(ClapArgs)]
pub struct StatusArgs {
    /// Expert id or name
    pub expert: String,
}

pub async fn execute(ctx: &AppContext, command: Command) -> Result<()> {
    match command {
        Command::Add(args) => {
            let expert = ctx.experts.add(&args.name, args.category).await?;
            println!("{}", expert.id);
        }
        Command::Activate(args) => set_status(ctx, &args.expert, ExpertStatus::Active).await?,
        Command::Deactivate(args) => set_status(ctx, &args.expert, ExpertStatus::Inactive).await?,
    }
    Ok(())
}

async fn set_status(ctx: &AppContext, id_or_name: &str, status: ExpertStatus) -> Result<()> {
    let expert = common::resolve_expert(ctx, id_or_name).await?;
    ctx.experts
        .set_status(expert.id, status)
        .await
        .map_err(common::explain)?;
    println!("{} is now {}", expert.name, status.description());
    Ok(())
}
