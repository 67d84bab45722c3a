use anyhow::Result;
use clap::Parser;
use colored::*;

use crate::cli::handlers::commons::{self, HandlerContext};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Runs the clean command for the last built selection."
)]
struct CleanArgs {
    /// Do not run the command hooks.
    #[arg(long)]
    no_hooks: bool,
}

pub fn handle(args: Vec<String>, ctx: &HandlerContext) -> Result<()> {
    let clean_args = CleanArgs::try_parse_from(&args)?;
    let mut session = ctx.open_session()?;
    let mut hooks = commons::hooks(clean_args.no_hooks);
    let mut runner = ctx.runner();

    let rendered = session.clean(&mut runner, hooks.as_mut())?;
    println!("{} {}", "Cleaned:".green().bold(), rendered);
    Ok(())
}
