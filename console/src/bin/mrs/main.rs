//! `mrs` - command-line front end for the Medical Research Synthesizer.
//!
//! One-shot subcommands print a single brief or backend listing; with no subcommand the
//! interactive shell starts.

mod cli;
mod render;
mod shell;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use mrs_engine::workspace::history_session;
use mrs_engine::{
    Config, ConsoleCommand, ConsoleEvent, DocumentMetadata, DocumentUploader,
    ExecutorState, InvalidationBus, JsonFileStore, Mode, QueryExecutor, QueryForm, ResearchClient,
    ResearchConsole, Settings, Theme, WorkspaceStore,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, ExportFormat, SettingsCommands, ThemeArg};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url.trim_end_matches('/').to_string();
    }
    config.live |= cli.live;

    let client = ResearchClient::from_config(&config)?;
    let bus = InvalidationBus::default();

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Ask {
            question,
            filters,
            export,
        } => {
            let form = QueryForm {
                question: question.join(" "),
                max_results: filters.max_results,
                start_year: filters.start_year,
                end_year: filters.end_year,
                journals: filters.journals,
            };
            let console = open_console(&config, &client, &bus).await;
            run_once(console, ConsoleCommand::Submit(form), export).await
        }
        Commands::Suggest { label, export } => {
            let console = open_console(&config, &client, &bus).await;
            run_once(console, ConsoleCommand::RunSuggested { label: label.join(" ") }, export).await
        }
        Commands::Template { id, export } => {
            let console = open_console(&config, &client, &bus).await;
            run_once(console, ConsoleCommand::RunTemplate { id }, export).await
        }
        Commands::Demo { export } => {
            let console = open_console(&config, &client, &bus).await;
            run_once(console, ConsoleCommand::TryDemo, export).await
        }
        Commands::Rerun { entry_id, export } => {
            let console = open_console(&config, &client, &bus).await;
            run_once(console, ConsoleCommand::RerunHistory { entry_id }, export).await
        }
        Commands::Sessions => {
            let console = open_console(&config, &client, &bus).await;
            print!("{}", render::sessions(console.workspace().sessions()));
            Ok(())
        }
        Commands::Upload { file, metadata } => {
            let metadata = DocumentMetadata::from_form(
                metadata.title.as_deref(),
                metadata.authors.as_deref(),
                metadata.journal.as_deref(),
                metadata.year,
                metadata.doi.as_deref(),
                metadata.url.as_deref(),
            );
            let outcome = DocumentUploader::new(client, bus)
                .upload(&file, &metadata)
                .await?;
            println!("{}", outcome.message());
            Ok(())
        }
        Commands::Documents => {
            print!("{}", render::documents(&client.list_documents().await?));
            Ok(())
        }
        Commands::Health => {
            print!("{}", render::health(&client.health().await?));
            Ok(())
        }
        Commands::Metrics => {
            print!("{}", render::metrics(&client.metrics().await?));
            Ok(())
        }
        Commands::Settings { action } => settings(&config, action),
        Commands::Shell => {
            let settings = mrs_engine::settings::open_or_default(&config.settings_path);
            let invalidations = bus.subscribe();
            let console = open_console(&config, &client, &bus).await;
            shell::run(console, client, invalidations, settings).await
        }
    }
}

/// Build a console in the configured mode, with history from the matching source.
async fn open_console(config: &Config, client: &ResearchClient, bus: &InvalidationBus) -> ResearchConsole {
    let mode = if config.live { Mode::Live } else { Mode::Simulated };
    let executor = QueryExecutor::new(
        Arc::new(client.clone()),
        bus.clone(),
        config.simulated_latency,
        mode,
    );

    let sessions = match mode {
        Mode::Simulated => ResearchConsole::seed_sessions(mode),
        Mode::Live => match client.query_history().await {
            Ok(entries) => vec![history_session(entries)],
            Err(e) => {
                warn!(error = %e, "Failed to load query history");
                Vec::new()
            }
        },
    };

    info!(mode = mode.as_str(), base_url = client.base_url(), "Console ready");
    ResearchConsole::new(executor, WorkspaceStore::new(sessions))
}

/// Apply a single query command, wait for it to settle and print the outcome.
async fn run_once(
    mut console: ResearchConsole,
    command: ConsoleCommand,
    export: Option<ExportFormat>,
) -> Result<()> {
    let ConsoleEvent::Submitted(submission) = console.apply(command)? else {
        bail!("command did not start a query");
    };
    submission.wait().await;
    console.sync();

    match console.executor().state() {
        ExecutorState::Settled(settled) => {
            match export {
                Some(format) => println!("{}", render::exported(format, &settled.question, &settled.result)),
                None => print!(
                    "{}",
                    render::brief(&settled, &console.segments(), console.highlight(), Theme::default())
                ),
            }
            Ok(())
        }
        ExecutorState::Failed(message) => bail!("query failed: {}", message),
        ExecutorState::Idle | ExecutorState::Pending => bail!("query was discarded"),
    }
}

fn load_settings(config: &Config) -> Result<Settings<JsonFileStore>> {
    let store = JsonFileStore::open(&config.settings_path)
        .with_context(|| format!("reading settings from {}", config.settings_path.display()))?;
    Ok(Settings::load(store)?)
}

fn settings(config: &Config, action: Option<SettingsCommands>) -> Result<()> {
    let mut settings = load_settings(config)?;
    match action {
        None => {}
        Some(SettingsCommands::Theme { value: None }) => {
            settings.toggle_theme()?;
        }
        Some(SettingsCommands::Theme { value: Some(value) }) => {
            settings.set_theme(match value {
                ThemeArg::Dark => Theme::Dark,
                ThemeArg::Light => Theme::Light,
            })?;
        }
        Some(SettingsCommands::ResetTour) => settings.set_tour_done(false)?,
    }
    println!(
        "theme: {}\ntour completed: {}\nfile: {}",
        settings.theme(),
        settings.tour_done(),
        settings.store().path().display()
    );
    Ok(())
}
