use anyhow::Result;
use clap::Args as ClapArgs;

use crate::commands::common;
use crate::context::AppContext;
use crate::models::AssignmentId;
use crate::utils::pad_str;

#[derive(ClapArgs)]
pub struct Args {
    pub id: AssignmentId,

    #[arg(long)]
    pub json: bool,
}

pub async fn execute(ctx: &AppContext, args: Args) -> Result<()> {
    let view = ctx
        .assignments
        .get(args.id)
        .await
        .map_err(common::explain)?;

    if args.json {
        return common::print_json(&view);
    }

    let fields = common::describe_assignment(&view.assignment, view.expert_name.as_deref());
    for (label, value) in fields {
        if value.is_empty() {
            continue;
        }
        println!("{} {}", pad_str(&format!("{}:", label), 20), value);
    }
    Ok(())
}
