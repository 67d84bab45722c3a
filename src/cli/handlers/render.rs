use anyhow::Result;
use clap::Parser;

use crate::cli::handlers::commons::{self, HandlerContext};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Prints a command with the current selection substituted."
)]
struct RenderArgs {
    /// The command to render, as named in the commands file.
    command: String,
}

pub fn handle(args: Vec<String>, ctx: &HandlerContext) -> Result<()> {
    let render_args = RenderArgs::try_parse_from(&args)?;
    let session = ctx.open_session()?;

    let rendered = session.render(&render_args.command)?;
    commons::warn_unresolved(&render_args.command, &rendered);
    println!("{}", rendered);
    Ok(())
}
