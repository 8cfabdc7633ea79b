//! Interactive chat loop.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tradecore_core::analysis::EngineTier;
use tradecore_core::chart::ChartKind;
use tradecore_core::chat::PLACEHOLDER_TITLE;
use tradecore_core::export::write_export;
use tradecore_core::prompt::QuickAction;
use tradecore_core::{ChatView, Config, SessionManager, TurnOutcome};

use crate::message_format::transcript;
use crate::turn::{analysis_client, run_turn};

const HELP: &str = "\
Commands:
  /image PATH      stage an image for the next message
  /drop N          unstage image N
  /quick ACTION    run a quick action (fvg, levels, volume, trend, refresh)
  /rename TITLE    rename the current session
  /template NAME   save this chat as a template
  /export [DIR]    export the current session as JSON
  /new             start a new chat
  /help            show this help
  /quit            leave
Anything else is sent as a message. An empty line sends staged images alone.";

/// One line of REPL input
#[derive(Debug, PartialEq)]
pub enum ReplCommand {
    Send(String),
    Image(PathBuf),
    Drop(usize),
    Quick(QuickAction),
    Rename(String),
    Template(String),
    Export(Option<PathBuf>),
    New,
    Help,
    Quit,
    Invalid(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(command) = line.strip_prefix('/') else {
            return ReplCommand::Send(line.to_string());
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };

        match name {
            "image" if !arg.is_empty() => ReplCommand::Image(PathBuf::from(arg)),
            "image" => ReplCommand::Invalid("usage: /image PATH".to_string()),
            "drop" => match arg.parse::<usize>() {
                Ok(n) if n >= 1 => ReplCommand::Drop(n),
                _ => ReplCommand::Invalid("usage: /drop N (1-based)".to_string()),
            },
            "quick" => match arg.parse::<QuickAction>() {
                Ok(action) => ReplCommand::Quick(action),
                Err(e) => ReplCommand::Invalid(e),
            },
            "rename" if !arg.is_empty() => ReplCommand::Rename(arg.to_string()),
            "rename" => ReplCommand::Invalid("usage: /rename TITLE".to_string()),
            "template" if !arg.is_empty() => ReplCommand::Template(arg.to_string()),
            "template" => ReplCommand::Invalid("usage: /template NAME".to_string()),
            "export" => ReplCommand::Export((!arg.is_empty()).then(|| PathBuf::from(arg))),
            "new" => ReplCommand::New,
            "help" => ReplCommand::Help,
            "quit" | "exit" => ReplCommand::Quit,
            other => ReplCommand::Invalid(format!("unknown command: /{}", other)),
        }
    }
}

/// Run the chat loop until `/quit` or end of input.
pub fn run(
    config: &Config,
    manager: &mut SessionManager,
    session: Option<&str>,
    template: Option<&str>,
    chart_preference: Option<ChartKind>,
) -> Result<()> {
    let client = analysis_client(&config.analysis);
    let mut view = ChatView::new(config.analysis.search_domains.clone());

    if let Some(key) = session {
        let id = manager.resolve_session(key)?.id.clone();
        manager.select_active(&id)?;
        view.sync_with(manager);
    } else if let Some(key) = template {
        let template = manager.resolve_template(key)?.clone();
        view.new_chat(Some(&template), manager);
    }

    print_header(&view, manager);

    let stdin = io::stdin();
    let mut input = stdin.lock();
    loop {
        print!("> ");
        io::stdout().flush().context("failed to flush stdout")?;

        let mut line = String::new();
        if input.read_line(&mut line).context("failed to read input")? == 0 {
            break;
        }

        match ReplCommand::parse(&line) {
            ReplCommand::Send(text) => {
                view.set_input(text);
                let outcome = run_turn(&mut view, None, client.as_ref(), manager, chart_preference);
                after_turn(outcome);
            }
            ReplCommand::Quick(action) => {
                let outcome = run_turn(
                    &mut view,
                    Some(action.prompt()),
                    client.as_ref(),
                    manager,
                    chart_preference,
                );
                after_turn(outcome);
            }
            ReplCommand::Image(path) => match view.stage_image_file(&path) {
                Ok(()) => println!(
                    "Staged {} ({} staged)",
                    path.display(),
                    view.staged_images().len()
                ),
                Err(e) => println!("Could not read {}: {}", path.display(), e),
            },
            ReplCommand::Drop(n) => match view.remove_image(n - 1) {
                Some(_) => println!("Removed image {} ({} staged)", n, view.staged_images().len()),
                None => println!("No staged image {}", n),
            },
            ReplCommand::Rename(title) => match view.rename(&title, manager) {
                Ok(true) => println!("Renamed to {}", view.title()),
                Ok(false) => println!("Nothing to rename yet."),
                Err(e) => {
                    tracing::warn!(error = %e, "Rename failed");
                    println!("Rename failed: {}", e);
                }
            },
            ReplCommand::Template(name) => match view.save_as_template(&name, manager) {
                Some(id) => println!("Saved template {} ({})", name, id),
                None => println!("Nothing to save yet."),
            },
            ReplCommand::Export(dir) => {
                export_active(manager, dir.as_deref().unwrap_or_else(|| Path::new(".")))
            }
            ReplCommand::New => {
                view.new_chat(None, manager);
                print_header(&view, manager);
            }
            ReplCommand::Help => println!("{}", HELP),
            ReplCommand::Quit => break,
            ReplCommand::Invalid(message) => println!("{}", message),
        }
    }

    Ok(())
}

fn print_header(view: &ChatView, manager: &SessionManager) {
    let tier = EngineTier::from_settings(&manager.settings());
    println!("{} [{}]", view.title(), tier.display_name());
    if view.messages().is_empty() {
        if view.title() == PLACEHOLDER_TITLE {
            println!("Ask about any asset, e.g. \"BTC levels for the next 24 hours\". /help for commands.");
        }
    } else {
        print!("{}", transcript(view.messages(), None));
    }
}

fn after_turn(outcome: Option<TurnOutcome>) {
    match outcome {
        Some(TurnOutcome::Committed { .. }) => {
            let labels: Vec<&str> = QuickAction::FOLLOW_UPS.iter().map(|a| a.label()).collect();
            println!("\nFollow-ups (/quick NAME): {}", labels.join(" | "));
        }
        Some(TurnOutcome::Failed) => {}
        None => println!("Nothing to send."),
    }
}

/// Export the active session. Failures are reported and the loop goes on.
fn export_active(manager: &SessionManager, dir: &Path) {
    let Some(session) = manager.active_session() else {
        println!("Nothing to export yet.");
        return;
    };
    match write_export(dir, session) {
        Ok(path) => println!("Exported to {}", path.display()),
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Export failed");
            println!("Export failed: {}", e);
        }
    }
}
