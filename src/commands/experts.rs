use anyhow::Result;
use clap::Args as ClapArgs;

use crate::commands::common;
use crate::context::AppContext;
use crate::utils::render_table;

#[derive(ClapArgs)]
pub struct Args {
    /// Include inactive experts
    #[arg(long)]
    pub all: bool,

    /// Show assignment counts per expert
    #[arg(long)]
    pub workload: bool,

    #[arg(long)]
    pub json: bool,
}

pub async fn execute(ctx: &AppContext, args: Args) -> Result<()> {
    if args.workload {
        let workload: Vec<_> = ctx
            .experts
            .workload()
            .await?
            .into_iter()
            .filter(|w| args.all || w.expert.is_active())
            .collect();

        if args.json {
            return common::print_json(&workload);
        }

        let rows: Vec<Vec<String>> = workload
            .iter()
            .map(|w| {
                vec![
                    w.expert.id.to_string(),
                    w.expert.name.clone(),
                    w.expert.category.to_string(),
                    w.holding.to_string(),
                    w.assignments.to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            render_table(&["ID", "NAME", "CATEGORY", "OPEN", "TOTAL"], &rows, 40)
        );
        return Ok(());
    }

    let experts = ctx.experts.list(args.all).await?;
    if args.json {
        return common::print_json(&experts);
    }

    if experts.is_empty() {
        println!("No experts");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = experts
        .iter()
        .map(|e| {
            vec![
                e.id.to_string(),
                e.name.clone(),
                e.category.to_string(),
                format!("{} {}", e.status.symbol(), e.status.description()),
            ]
        })
        .collect();
    println!("{}", render_table(&["ID", "NAME", "CATEGORY", "STATUS"], &rows, 40));

    Ok(())
}
