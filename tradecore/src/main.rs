//! tradecore - market analysis chat client
//!
//! Sends market questions to a search-backed analysis engine, keeps the
//! conversations as replayable sessions and templates, and shows a live
//! market ticker.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/tradecore/data.db (~/.local/share/tradecore/data.db)
//! - Config: $XDG_CONFIG_HOME/tradecore/config.toml (~/.config/tradecore/config.toml)
//! - Logs: $XDG_STATE_HOME/tradecore/ (~/.local/state/tradecore/)

mod market;
mod message_format;
mod repl;
mod turn;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tradecore_core::analysis::EngineTier;
use tradecore_core::chart::ChartKind;
use tradecore_core::export::write_export;
use tradecore_core::{ChatView, Config, SecureStore, SessionManager, TurnOutcome};

use crate::message_format::{session_row, short_id, template_row, transcript};
use crate::turn::{analysis_client, run_turn};

#[derive(Parser)]
#[command(name = "tradecore")]
#[command(about = "Market analysis chat client")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask one question and print the analysis
    Ask {
        /// Question to ask
        prompt: String,

        /// Attach an image (repeatable)
        #[arg(long = "image", value_name = "PATH")]
        images: Vec<PathBuf>,

        /// Continue an existing session (ID or unique prefix)
        #[arg(short, long)]
        session: Option<String>,

        /// Render charts as this type (area, line, bar)
        #[arg(long)]
        chart_type: Option<ChartKind>,
    },

    /// Start an interactive chat
    Chat {
        /// Continue an existing session (ID or unique prefix)
        #[arg(short, long, conflicts_with = "template")]
        session: Option<String>,

        /// Start from a saved template (ID or unique prefix)
        #[arg(short, long)]
        template: Option<String>,

        /// Render charts as this type (area, line, bar)
        #[arg(long)]
        chart_type: Option<ChartKind>,
    },

    /// List saved sessions, newest first
    History,

    /// Print a session transcript
    Show {
        /// Session ID or unique prefix
        id: String,

        /// Render charts as this type (area, line, bar)
        #[arg(long)]
        chart_type: Option<ChartKind>,
    },

    /// Rename a session
    Rename {
        /// Session ID or unique prefix
        id: String,

        /// New title
        title: String,
    },

    /// Export a session as JSON
    Export {
        /// Session ID or unique prefix
        id: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Delete all saved sessions
    Clear,

    /// Manage session templates
    Templates {
        #[command(subcommand)]
        command: TemplateCommand,
    },

    /// Show or change analysis settings
    Settings {
        /// Use the deep reasoning engine
        #[arg(long, conflicts_with = "fast")]
        pro: bool,

        /// Use the fast engine
        #[arg(long)]
        fast: bool,

        /// Thinking budget in tokens
        #[arg(long)]
        thinking_budget: Option<u32>,

        /// Restore default settings
        #[arg(long, conflicts_with_all = ["pro", "fast", "thinking_budget"])]
        reset: bool,
    },

    /// Show the market ticker
    Ticker {
        /// Symbol to show (default: from config)
        #[arg(short, long)]
        symbol: Option<String>,

        /// Keep polling until Ctrl+C
        #[arg(short, long)]
        watch: bool,
    },
}

#[derive(Subcommand)]
enum TemplateCommand {
    /// List saved templates
    List,

    /// Save a session as a template
    Save {
        /// Session ID or unique prefix
        session: String,

        /// Template name
        name: String,
    },

    /// Export a template as JSON
    Export {
        /// Template ID or unique prefix
        id: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Start a new session from a template
    Use {
        /// Template ID or unique prefix
        id: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging (to file, stdout belongs to the chat)
    let _log_guard =
        tradecore_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("tradecore starting up");

    let mut manager = open_manager()?;

    match args.command {
        Command::Ask {
            prompt,
            images,
            session,
            chart_type,
        } => cmd_ask(&config, &mut manager, &prompt, &images, session.as_deref(), chart_type),
        Command::Chat {
            session,
            template,
            chart_type,
        } => repl::run(
            &config,
            &mut manager,
            session.as_deref(),
            template.as_deref(),
            chart_type,
        ),
        Command::History => cmd_history(&manager),
        Command::Show { id, chart_type } => cmd_show(&manager, &id, chart_type),
        Command::Rename { id, title } => cmd_rename(&mut manager, &id, &title),
        Command::Export { id, dir } => cmd_export(&manager, &id, &dir),
        Command::Clear => cmd_clear(&mut manager),
        Command::Templates { command } => cmd_templates(&mut manager, command),
        Command::Settings {
            pro,
            fast,
            thinking_budget,
            reset,
        } => cmd_settings(&mut manager, pro, fast, thinking_budget, reset),
        Command::Ticker { symbol, watch } => {
            let symbol = symbol.unwrap_or_else(|| config.ticker.symbol.clone());
            market::run(&config.ticker, &symbol, watch)
        }
    }
}

fn open_manager() -> Result<SessionManager> {
    let db_path = Config::database_path();
    tracing::info!(path = %db_path.display(), "Opening store");
    let store = SecureStore::open(&db_path).context("failed to open store")?;
    Ok(SessionManager::load(store))
}

fn cmd_ask(
    config: &Config,
    manager: &mut SessionManager,
    prompt: &str,
    images: &[PathBuf],
    session: Option<&str>,
    chart_type: Option<ChartKind>,
) -> Result<()> {
    let mut view = ChatView::new(config.analysis.search_domains.clone());

    if let Some(key) = session {
        let id = manager.resolve_session(key)?.id.clone();
        manager.select_active(&id)?;
        view.sync_with(manager);
    }

    for path in images {
        view.stage_image_file(path)
            .with_context(|| format!("failed to read image {}", path.display()))?;
    }

    view.set_input(prompt);
    let client = analysis_client(&config.analysis);

    match run_turn(&mut view, None, client.as_ref(), manager, chart_type) {
        Some(TurnOutcome::Committed { session_id }) => {
            println!();
            println!("Session: {}", session_id);
            Ok(())
        }
        Some(TurnOutcome::Failed) => Ok(()),
        None => anyhow::bail!("nothing to send: provide a prompt or --image"),
    }
}

fn cmd_history(manager: &SessionManager) -> Result<()> {
    if manager.sessions().is_empty() {
        println!("No saved sessions.");
        return Ok(());
    }

    for session in manager.history() {
        println!("{}", session_row(session));
    }
    Ok(())
}

fn cmd_show(manager: &SessionManager, key: &str, chart_type: Option<ChartKind>) -> Result<()> {
    let session = manager.resolve_session(key)?;
    println!("{}", session.title);
    println!(
        "{} | {} messages",
        session.created_at.format("%Y-%m-%d %H:%M UTC"),
        session.messages.len()
    );
    println!();
    print!("{}", transcript(&session.messages, chart_type));
    Ok(())
}

fn cmd_rename(manager: &mut SessionManager, key: &str, title: &str) -> Result<()> {
    let id = manager.resolve_session(key)?.id.clone();
    if manager.rename(&id, title)? {
        println!("Renamed {} to {}", short_id(&id), title.trim());
    } else {
        println!("Title unchanged.");
    }
    Ok(())
}

fn cmd_export(manager: &SessionManager, key: &str, dir: &Path) -> Result<()> {
    let session = manager.resolve_session(key)?;
    let path = write_export(dir, session).context("failed to export session")?;
    println!("Exported to {}", path.display());
    Ok(())
}

fn cmd_clear(manager: &mut SessionManager) -> Result<()> {
    let count = manager.sessions().len();
    manager.clear_all();
    println!("Cleared {} session(s).", count);
    Ok(())
}

fn cmd_templates(manager: &mut SessionManager, command: TemplateCommand) -> Result<()> {
    match command {
        TemplateCommand::List => {
            if manager.templates().is_empty() {
                println!("No saved templates.");
            }
            for template in manager.templates() {
                println!("{}", template_row(template));
            }
        }
        TemplateCommand::Save { session, name } => {
            let id = manager.resolve_session(&session)?.id.clone();
            manager.select_active(&id)?;
            let mut view = ChatView::new(Vec::new());
            view.sync_with(manager);
            match view.save_as_template(&name, manager) {
                Some(template_id) => println!("Saved template {} ({})", name.trim(), template_id),
                None => println!("Nothing to save: the session is empty or the name is blank."),
            }
        }
        TemplateCommand::Export { id, dir } => {
            let template = manager.resolve_template(&id)?;
            let path = write_export(&dir, template).context("failed to export template")?;
            println!("Exported to {}", path.display());
        }
        TemplateCommand::Use { id } => {
            let template = manager.resolve_template(&id)?.clone();
            let session_id = manager
                .new_chat(Some(&template))
                .context("failed to start session from template")?;
            println!("Started session {} from {}", session_id, template.name);
        }
    }
    Ok(())
}

fn cmd_settings(
    manager: &mut SessionManager,
    pro: bool,
    fast: bool,
    thinking_budget: Option<u32>,
    reset: bool,
) -> Result<()> {
    if reset {
        manager.reset_settings();
        println!("Settings reset.");
    }

    let mut settings = manager.settings();
    let changed = pro || fast || thinking_budget.is_some();

    if pro {
        settings.use_pro_model = true;
    }
    if fast {
        settings.use_pro_model = false;
    }
    if let Some(budget) = thinking_budget {
        settings.thinking_budget = budget;
    }
    if changed {
        manager.save_settings(settings);
        println!("Settings saved.");
    }

    let tier = EngineTier::from_settings(&settings);
    println!("Engine:          {}", tier.display_name());
    println!("Model:           {}", tier.model());
    println!("Thinking budget: {}", settings.thinking_budget);
    println!("Log file:        {}", tradecore_core::logging::log_file_path().display());
    Ok(())
}
