use anyhow::Result;
use clap::Parser;

use crate::cli::handlers::commons::{self, HandlerContext};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Selects a label for an option and updates the options that depend on it."
)]
struct SelectArgs {
    /// The option to change.
    option: String,

    /// The label to select.
    label: String,

    /// Do not run the option's hooks.
    #[arg(long)]
    no_hooks: bool,
}

pub fn handle(args: Vec<String>, ctx: &HandlerContext) -> Result<()> {
    let select_args = SelectArgs::try_parse_from(&args)?;
    let mut session = ctx.open_session()?;
    let mut hooks = commons::hooks(select_args.no_hooks);

    let outcome = session.select(&select_args.option, &select_args.label, hooks.as_mut())?;
    commons::print_changes(&outcome);
    Ok(())
}
