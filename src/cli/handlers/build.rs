use anyhow::Result;
use clap::Parser;
use colored::*;

use crate::{
    cli::handlers::commons::{self, HandlerContext},
    constants::BUILD_COMMAND,
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Runs the build command, cleaning first if the selection changed."
)]
struct BuildArgs {
    /// Do not run the command hooks.
    #[arg(long)]
    no_hooks: bool,
}

pub fn handle(args: Vec<String>, ctx: &HandlerContext) -> Result<()> {
    let build_args = BuildArgs::try_parse_from(&args)?;
    let mut session = ctx.open_session()?;
    let mut hooks = commons::hooks(build_args.no_hooks);
    let mut runner = ctx.runner();

    commons::warn_unresolved(BUILD_COMMAND, &session.render(BUILD_COMMAND)?);
    let report = session.build(&mut runner, hooks.as_mut())?;

    if let Some(cleaned) = &report.cleaned {
        println!("{} {}", "Cleaned:".dimmed(), cleaned.dimmed());
    }
    println!("{} {}", "Built:".green().bold(), report.built);
    Ok(())
}
