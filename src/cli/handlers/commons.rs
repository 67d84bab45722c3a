// src/cli/handlers/commons.rs

// Shared by the handlers: session opening, hook selection and change reporting.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::{
    CancellationToken,
    core::{
        hooks::{HookDispatcher, HookRegistry, NoHooks},
        paths,
        session::Session,
        settings::Settings,
        template,
    },
    models::{ChangeCause, ChangeOutcome},
    system::executor::ProcessRunner,
};

/// What every handler gets from the dispatcher besides its own arguments.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub root: Option<PathBuf>,
    pub cancellation_token: CancellationToken,
}

impl HandlerContext {
    /// Resolves the workspace, loads its settings and opens a session on it.
    pub fn open_session(&self) -> Result<Session> {
        let root = paths::resolve_workspace_root(self.root.as_deref())?;
        let settings = Settings::load(&root)
            .with_context(|| format!("Failed to load settings for '{}'", root.display()))?;
        let session = Session::open(settings)?;
        for warning in session.warnings() {
            eprintln!("{} {}", "Warning:".yellow().bold(), warning);
        }
        Ok(session)
    }

    pub fn runner(&self) -> ProcessRunner {
        ProcessRunner::new(self.cancellation_token.clone())
    }
}

/// The hooks a handler runs with: the built-ins, or none at all.
pub fn hooks(disabled: bool) -> Box<dyn HookDispatcher> {
    if disabled {
        Box::new(NoHooks)
    } else {
        Box::new(HookRegistry::with_builtins())
    }
}

/// Prints the direct change and everything it cascaded into.
pub fn print_changes(outcome: &ChangeOutcome) {
    match outcome {
        ChangeOutcome::Unchanged => println!("{}", "Nothing changed.".dimmed()),
        ChangeOutcome::Changed(changes) => {
            for change in changes {
                let line = format!(
                    "{}: {} -> {}",
                    change.option.cyan(),
                    change.previous,
                    change.current.green()
                );
                match &change.cause {
                    ChangeCause::Direct => println!("{}", line),
                    ChangeCause::Cascade { parent } => println!(
                        "  {} {} {}",
                        "↳".yellow(),
                        line,
                        format!("(follows {})", parent).dimmed()
                    ),
                }
            }
        }
    }
}

/// Warns about `{name}` tokens that were left in a rendered command.
pub fn warn_unresolved(command: &str, rendered: &str) {
    let tokens = template::unresolved_tokens(rendered);
    if !tokens.is_empty() {
        eprintln!(
            "{} '{}' still contains unresolved tokens: {}",
            "Warning:".yellow().bold(),
            command,
            tokens.join(", ")
        );
    }
}
