use anyhow::Result;
use clap::Parser;
use colored::*;
use dialoguer::{Confirm, theme::ColorfulTheme};

use crate::cli::handlers::commons::HandlerContext;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Returns every option to its default label."
)]
struct ResetArgs {
    /// Skip the confirmation prompt.
    #[arg(long, short)]
    yes: bool,
}

pub fn handle(args: Vec<String>, ctx: &HandlerContext) -> Result<()> {
    let reset_args = ResetArgs::try_parse_from(&args)?;
    let mut session = ctx.open_session()?;

    if !reset_args.yes
        && !Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Reset every option to its default?")
            .default(false)
            .interact()?
    {
        println!("{}", "Reset cancelled.".dimmed());
        return Ok(());
    }

    session.reset()?;
    println!("{}", "All options are back to their defaults.".green());
    Ok(())
}
