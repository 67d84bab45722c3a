use clap::Parser;
use std::path::PathBuf;

pub mod handlers;

/// buildopts: pick interdependent build options and run the matching build.
///
/// Options and commands are read from `.buildopts/options.json` and
/// `.buildopts/commands.json` in the workspace root.
///
/// Actions:
///   show [option]           Current selection, or the choices of one option (alias: ls)
///   select <option> <label> Change a selection and cascade it (alias: set)
///   pick [option]           Change a selection interactively
///   render <command>        Print a command with the selection substituted
///   status                  Changes since the last build or clean
///   build                   Run `build`, cleaning first if the selection changed
///   clean                   Run `clean`
///   reset                   Return every option to its default
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Workspace root. Defaults to the current directory.
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// The action to perform. Defaults to `show`.
    pub action: Option<String>,

    /// Arguments for the action.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
