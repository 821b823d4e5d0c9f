use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use std::path::PathBuf;

use crate::config::Config;
use crate::context::AppContext;
use crate::store::{AssignmentQuery, Store};

#[derive(ClapArgs)]
pub struct Args {
    /// Also write the effective configuration to the config path
    #[arg(long)]
    pub write_config: bool,
}

pub async fn execute(ctx: &AppContext, config_path: Option<PathBuf>, args: Args) -> Result<()> {
    if args.write_config {
        let path = config_path.unwrap_or_else(Config::default_config_path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }
        let yaml = serde_yaml::to_string(&ctx.config)?;
        tokio::fs::write(&path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        println!("Config written to {}", path.display());
    }

    let experts = ctx.experts.list(true).await?;
    let assignments = ctx.store.assignments(&AssignmentQuery::default()).await?;

    match ctx.store.path() {
        Some(path) => println!("Store: {}", path.display()),
        None => println!("Store: in-memory (nothing is persisted)"),
    }
    println!("Experts: {}", experts.len());
    println!("Assignments: {}", assignments.len());

    Ok(())
}
