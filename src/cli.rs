use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{
    advance, book, cancel, check, edit, expert, experts, history, init, list, show,
};

#[derive(Parser)]
#[command(name = "roster")]
#[command(about = "Expert roster - book specialists without double-booking them")]
#[command(version)]
pub struct Cli {
    /// Path to config file (defaults to $ROSTER_CONFIG or the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data store and seed the configured experts
    Init(init::Args),

    /// List experts
    Experts(experts::Args),

    /// Add, activate or deactivate an expert
    #[command(subcommand)]
    Expert(expert::Command),

    /// Check whether an expert is free on a date range
    Check(check::Args),

    /// Book an expert for a date range
    Book(book::Args),

    /// Edit fields of an assignment
    Edit(edit::Args),

    /// Cancel an assignment (soft delete)
    Cancel(cancel::Args),

    /// Move an assignment to its next status
    Advance(advance::Args),

    /// Show one assignment
    Show(show::Args),

    /// List assignments
    List(list::Args),

    /// Show the change history of an assignment
    History(history::Args),
}
