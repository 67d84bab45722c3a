use anyhow::Result;
use clap::Parser;
use colored::*;

use crate::{cli::handlers::commons::HandlerContext, core::session::Session};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Shows the current selection, or every choice of one option."
)]
struct ShowArgs {
    /// Only list the choices of this option.
    option: Option<String>,

    /// Also show the value each label resolves to.
    #[arg(long, short)]
    values: bool,
}

pub fn handle(args: Vec<String>, ctx: &HandlerContext) -> Result<()> {
    let show_args = ShowArgs::try_parse_from(&args)?;
    let session = ctx.open_session()?;

    match show_args.option {
        Some(option) => print_choices(&session, &option),
        None => {
            print_selection(&session, show_args.values);
            Ok(())
        }
    }
}

fn print_selection(session: &Session, show_values: bool) {
    let store = session.store();
    let values = store.resolved_values();

    println!("\n{}", "Current selection".bold());
    for opt in store.graph().options() {
        let label = store.build().get(&opt.name).map(String::as_str).unwrap_or("");
        let drifted = store.last_build().get(&opt.name).map(String::as_str) != Some(label);
        let mut line = selection_row(&opt.name, label, drifted);
        if show_values {
            if let Some(value) = values.get(&opt.name) {
                line.push_str(&format!(" = {}", value));
            }
        }
        if let Some(parent) = &opt.depends_on {
            line.push_str(&format!(" {}", format!("(depends on {})", parent).dimmed()));
        }
        println!("{}", line);
    }

    if store.has_drifted() {
        println!(
            "\n{}",
            "* changed since the last build; the next build cleans first.".yellow()
        );
    }
}

/// Width of the name column. Padding happens on the plain text, since escape
/// codes would otherwise count towards the width.
const NAME_WIDTH: usize = 20;

fn selection_row(name: &str, label: &str, drifted: bool) -> String {
    let marker = if drifted { "*".yellow() } else { " ".normal() };
    let name = format!("{:<width$}", name, width = NAME_WIDTH);
    format!("{} {} {}", marker, name.cyan(), label.green())
}

fn print_choices(session: &Session, option: &str) -> Result<()> {
    let store = session.store();
    let current = store.selection(option)?;
    let valid = store.valid_items(option)?;
    let Some(opt) = store.graph().option(option) else {
        return Ok(());
    };

    println!("\n{} {}", "Choices for".bold(), option.cyan().bold());
    for item in &opt.items {
        let is_valid = valid.iter().any(|v| v.label == item.label);
        let line = format!(
            "{:<width$} {}",
            item.label,
            item.value.dimmed(),
            width = NAME_WIDTH
        );
        if item.label == current {
            println!("{} {}", ">".green().bold(), line.green());
        } else if is_valid {
            println!("  {}", line);
        } else {
            println!("  {} {}", line.dimmed(), "(unavailable)".dimmed());
        }
    }
    Ok(())
}
