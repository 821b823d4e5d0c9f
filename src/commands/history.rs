use anyhow::Result;
use clap::Args as ClapArgs;

use crate::commands::common;
use crate::context::AppContext;
use crate::models::AssignmentId;
use crate::utils::render_table;

#[derive(ClapArgs)]
pub struct Args {
    pub id: AssignmentId,

    #[arg(long)]
    pub json: bool,
}

pub async fn execute(ctx: &AppContext, args: Args) -> Result<()> {
    let entries = ctx.assignments.history(args.id).await?;

    if args.json {
        return common::print_json(&entries);
    }

    if entries.is_empty() {
        println!("No history for assignment {}", args.id);
        return Ok(());
    }

    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|h| {
            vec![
                h.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                h.action.to_string(),
                h.detail.clone(),
            ]
        })
        .collect();
    println!("{}", render_table(&["WHEN", "ACTION", "DETAIL"], &rows, 60));
    Ok(())
}
