use anyhow::{Result, anyhow};
use clap::Parser;
use colored::*;
use dialoguer::{Select, theme::ColorfulTheme};

use crate::cli::handlers::commons::{self, HandlerContext};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Picks an option and one of its valid labels interactively."
)]
struct PickArgs {
    /// The option to change. Asked for when omitted.
    option: Option<String>,

    /// Do not run the option's hooks.
    #[arg(long)]
    no_hooks: bool,
}

pub fn handle(args: Vec<String>, ctx: &HandlerContext) -> Result<()> {
    let pick_args = PickArgs::try_parse_from(&args)?;
    let mut session = ctx.open_session()?;
    let theme = ColorfulTheme::default();

    let option = match pick_args.option {
        Some(option) => option,
        None => {
            let store = session.store();
            let names: Vec<String> = store
                .graph()
                .options()
                .iter()
                .map(|opt| opt.name.clone())
                .collect();
            let items: Vec<String> = names
                .iter()
                .map(|name| {
                    let label = store.build().get(name).map(String::as_str).unwrap_or("");
                    format!("{} ({})", name, label)
                })
                .collect();
            let picked = Select::with_theme(&theme)
                .with_prompt("Option to change")
                .items(&items)
                .default(0)
                .interact_opt()?;
            match picked.and_then(|idx| names.get(idx)) {
                Some(name) => name.clone(),
                None => return Ok(()),
            }
        }
    };

    let store = session.store();
    let current = store.selection(&option)?.to_string();
    let labels: Vec<String> = store
        .valid_items(&option)?
        .iter()
        .map(|item| item.label.clone())
        .collect();
    if labels.is_empty() {
        return Err(anyhow!("Option '{}' has no valid choice.", option));
    }
    let default = labels.iter().position(|l| *l == current).unwrap_or(0);

    let picked = Select::with_theme(&theme)
        .with_prompt(format!("Select {}", option.cyan()))
        .items(&labels)
        .default(default)
        .interact_opt()?;
    let Some(label) = picked.and_then(|idx| labels.get(idx)) else {
        return Ok(());
    };

    let mut hooks = commons::hooks(pick_args.no_hooks);
    let outcome = session.select(&option, label, hooks.as_mut())?;
    commons::print_changes(&outcome);
    Ok(())
}
