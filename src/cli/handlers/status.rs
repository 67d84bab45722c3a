use anyhow::Result;
use clap::Parser;
use colored::*;

use crate::{cli::handlers::commons::HandlerContext, core::changeset::{self, Drift}};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Lists what changed since the last build or clean."
)]
struct StatusArgs {}

pub fn handle(args: Vec<String>, ctx: &HandlerContext) -> Result<()> {
    let _status_args = StatusArgs::try_parse_from(&args)?;
    let session = ctx.open_session()?;
    let store = session.store();

    let drift = changeset::diff(store.last_build(), store.build());
    if drift.is_empty() {
        println!("{}", "Selection matches the last build.".green());
        return Ok(());
    }

    println!("{}", "Changed since the last build:".yellow().bold());
    for entry in &drift {
        match entry {
            Drift::Added { key, value } => println!("  {} {} = {}", "+".green(), key.cyan(), value),
            Drift::Removed { key, value } => {
                println!("  {} {} = {}", "-".red(), key.cyan(), value)
            }
            Drift::Changed { key, before, after } => println!(
                "  {} {}: {} -> {}",
                "~".yellow(),
                key.cyan(),
                before,
                after.green()
            ),
        }
    }
    println!("{}", "The next build runs clean first.".dimmed());
    Ok(())
}
