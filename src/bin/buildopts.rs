// src/bin/buildopts.rs

use anyhow::Result;
use buildopts::{
    CancellationToken,
    cli::{
        Cli,
        handlers::{self, commons::HandlerContext},
    },
    core::session::SessionError,
};
use clap::Parser;
use colored::*;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

// --- Command Definition and Registry ---

/// An action, its aliases and its handler.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Vec<String>, &HandlerContext) -> Result<()>,
}

static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "build",
        aliases: &[],
        handler: handlers::build::handle,
    },
    CommandDefinition {
        name: "clean",
        aliases: &[],
        handler: handlers::clean::handle,
    },
    CommandDefinition {
        name: "pick",
        aliases: &[],
        handler: handlers::pick::handle,
    },
    CommandDefinition {
        name: "render",
        aliases: &[],
        handler: handlers::render::handle,
    },
    CommandDefinition {
        name: "reset",
        aliases: &[],
        handler: handlers::reset::handle,
    },
    CommandDefinition {
        name: "select",
        aliases: &["set"],
        handler: handlers::select::handle,
    },
    CommandDefinition {
        name: "show",
        aliases: &["ls"],
        handler: handlers::show::handle,
    },
    CommandDefinition {
        name: "status",
        aliases: &["st"],
        handler: handlers::status::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

fn main() {
    // Nothing sets the token yet; a Ctrl+C reaches the child directly.
    let cancellation_token = Arc::new(AtomicBool::new(false));
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse(), cancellation_token) {
        let cancelled = e
            .downcast_ref::<SessionError>()
            .is_some_and(SessionError::is_cancellation);
        if cancelled {
            std::process::exit(130);
        }

        eprintln!("\n{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli, cancellation_token: CancellationToken) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let ctx = HandlerContext {
        root: cli.root,
        cancellation_token,
    };
    let action = cli.action.unwrap_or_else(|| "show".to_string());

    match find_command(&action) {
        Some(command) => (command.handler)(cli.args, &ctx),
        None => {
            let known: Vec<&str> = COMMAND_REGISTRY.iter().map(|cmd| cmd.name).collect();
            Err(anyhow::anyhow!(
                "Unknown action '{}'. Available actions: {}",
                action.yellow(),
                known.join(", ")
            ))
        }
    }
}
