//! Interactive shell.
//!
//! The input task owns the draft query form and turns lines into [`ConsoleCommand`]s on the
//! command bus. The main loop owns the [`ResearchConsole`] and reacts to commands, executor
//! transitions and cache invalidations.

use anyhow::Result;
use clap::ValueEnum;
use mrs_engine::fixtures::{QUERY_TEMPLATES, SUGGESTED_QUESTIONS};
use mrs_engine::tour::Tour;
use mrs_engine::workspace::history_session;
use mrs_engine::models::MetricsSnapshot;
use mrs_engine::{
    CacheKey, CommandBus, ConsoleCommand, ConsoleEvent, DynSettings, ExecutorState, Mode,
    QueryForm, QueryHistoryEntry, ResearchClient, ResearchConsole,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use crate::cli::ExportFormat;
use crate::render;

const HELP: &str = "\
Questions
  ask <question>           submit the form with this question
  max <n> | max clear      maximum sources
  years <from>-<to>        publication year range (years clear to drop)
  journals <a, b, ...>     journal filter (journals clear to drop)
  suggest <label>          run a suggested question
  template <id>            run a query template
  demo                     run the demo question
  rerun <history-id>       re-run a history entry
Answer
  show                     print the current brief
  segment <n>              highlight the citation behind answer segment n
  cite <citation-id>       highlight a citation
  clear                    clear the highlight
  pin | unpin <pin-id>     keep the current answer in Highlights
  pins                     list pinned answers
  export <markdown|references|answer>
Session
  mode                     toggle demo / live answers
  reset                    start over
  dismiss                  dismiss an error
  sessions | suggestions | templates
  theme                    toggle dark / light
  tour next | tour skip
  help | quit";

/// Commands handled by the view itself rather than the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCommand {
    Help,
    Show,
    Pins,
    Sessions,
    Suggestions,
    Templates,
    Export(ExportFormat),
    Theme,
    TourNext,
    TourSkip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Console(ConsoleCommand),
    View(ViewCommand),
    Quit,
}

/// Draft query form, edited line by line.
#[derive(Debug, Default)]
pub struct Draft {
    form: QueryForm,
}

impl Draft {
    /// Parse one input line. Filter edits update the draft and yield nothing.
    pub fn parse(&mut self, line: &str) -> std::result::Result<Option<Input>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let console = |command| Ok(Some(Input::Console(command)));
        let view = |command| Ok(Some(Input::View(command)));

        match word.to_lowercase().as_str() {
            "ask" => {
                self.form.question = rest.to_string();
                console(ConsoleCommand::Submit(self.form.clone()))
            }
            "max" => {
                self.form.max_results = (rest != "clear" && !rest.is_empty()).then(|| rest.to_string());
                Ok(None)
            }
            "years" => {
                if rest == "clear" || rest.is_empty() {
                    self.form.start_year = None;
                    self.form.end_year = None;
                    return Ok(None);
                }
                let (start, end) = rest
                    .split_once('-')
                    .ok_or_else(|| "expected years <from>-<to>".to_string())?;
                let year = |s: &str| s.trim().parse::<i32>().map_err(|_| format!("not a year: {}", s.trim()));
                self.form.start_year = Some(year(start)?);
                self.form.end_year = Some(year(end)?);
                Ok(None)
            }
            "journals" => {
                self.form.journals = if rest == "clear" { String::new() } else { rest.to_string() };
                Ok(None)
            }
            "suggest" => console(ConsoleCommand::RunSuggested { label: rest.to_string() }),
            "template" => console(ConsoleCommand::RunTemplate { id: rest.to_string() }),
            "demo" => console(ConsoleCommand::TryDemo),
            "rerun" => console(ConsoleCommand::RerunHistory { entry_id: rest.to_string() }),
            "mode" => console(ConsoleCommand::ToggleMode),
            "reset" => {
                self.form = QueryForm::default();
                console(ConsoleCommand::Reset)
            }
            "dismiss" => console(ConsoleCommand::DismissError),
            "pin" => console(ConsoleCommand::PinCurrent),
            "unpin" => console(ConsoleCommand::Unpin { id: rest.to_string() }),
            "segment" => match rest.parse::<usize>() {
                Ok(n) if n >= 1 => console(ConsoleCommand::ClickSegment { index: n - 1 }),
                _ => Err("expected segment <n>, counting from 1".to_string()),
            },
            "cite" => console(ConsoleCommand::SelectCitation { id: rest.to_string() }),
            "clear" => console(ConsoleCommand::ClearHighlight),
            "show" => view(ViewCommand::Show),
            "pins" => view(ViewCommand::Pins),
            "sessions" | "history" => view(ViewCommand::Sessions),
            "suggestions" => view(ViewCommand::Suggestions),
            "templates" => view(ViewCommand::Templates),
            "export" => ExportFormat::from_str(rest, true)
                .map(|format| Some(Input::View(ViewCommand::Export(format))))
                .map_err(|_| "expected export <markdown|references|answer>".to_string()),
            "theme" => view(ViewCommand::Theme),
            "tour" => match rest {
                "next" => view(ViewCommand::TourNext),
                "skip" | "done" => view(ViewCommand::TourSkip),
                _ => Err("expected tour next | tour skip".to_string()),
            },
            "help" | "?" => view(ViewCommand::Help),
            "quit" | "exit" => Ok(Some(Input::Quit)),
            other => Err(format!("unknown command {:?}, try help", other)),
        }
    }
}

/// Read stdin until EOF or `quit`, posting commands.
async fn read_input(bus: CommandBus, views: mpsc::Sender<ViewCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut draft = Draft::default();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read input");
                break;
            }
        };
        let sent = match draft.parse(&line) {
            Ok(Some(Input::Console(command))) => bus.send(command).await.is_ok(),
            Ok(Some(Input::View(command))) => views.send(command).await.is_ok(),
            Ok(Some(Input::Quit)) => break,
            Ok(None) => true,
            Err(message) => {
                println!("{}", message);
                true
            }
        };
        if !sent {
            break;
        }
    }
}

/// Run the shell until the input ends.
pub async fn run(
    mut console: ResearchConsole,
    client: ResearchClient,
    mut invalidations: broadcast::Receiver<CacheKey>,
    mut settings: DynSettings,
) -> Result<()> {
    let (bus, mut commands) = CommandBus::channel(32);
    let (view_tx, mut views) = mpsc::channel(32);
    let (refresh_tx, mut refreshes) = mpsc::channel(8);
    let input = tokio::spawn(read_input(bus, view_tx));
    let mut states = console.executor().subscribe();

    println!(
        "Medical Research Synthesizer ({} answers). Type help for commands.",
        console.executor().mode().as_str()
    );
    let mut tour = Tour::start(&settings);
    if let Some(tour) = &tour {
        print_tour(tour);
    }

    loop {
        tokio::select! {
            biased;

            Some(command) = commands.recv() => {
                match console.apply(command) {
                    Ok(event) => {
                        if matches!(event, ConsoleEvent::ModeChanged(Mode::Live)) {
                            spawn_refresh(&client, CacheKey::QueryHistory, refresh_tx.clone());
                        }
                        print_event(&console, &settings, event);
                    }
                    Err(e) => println!("{}", e),
                }
            }
            view = views.recv() => {
                let Some(view) = view else { break };
                if let Err(e) = handle_view(&console, &mut settings, &mut tour, view) {
                    warn!(error = %e, "Failed to save settings");
                    println!("Could not save settings: {}", e);
                }
            }
            Ok(()) = states.changed() => {
                let state = states.borrow_and_update().clone();
                console.sync();
                match state {
                    ExecutorState::Settled(_) => show(&console, &settings),
                    ExecutorState::Failed(message) => {
                        println!("Query failed: {}\n(type dismiss to clear, or mode to switch to demo answers)", message);
                    }
                    ExecutorState::Pending | ExecutorState::Idle => {}
                }
            }
            Ok(key) = invalidations.recv() => {
                if console.executor().mode() == Mode::Live {
                    spawn_refresh(&client, key, refresh_tx.clone());
                } else {
                    debug!(key = key.as_str(), "Ignoring invalidation in simulated mode");
                }
            }
            Some(refreshed) = refreshes.recv() => {
                apply_refresh(&mut console, refreshed);
            }
        }
    }

    input.abort();
    Ok(())
}

fn print_event(console: &ResearchConsole, settings: &DynSettings, event: ConsoleEvent) {
    match event {
        ConsoleEvent::Submitted(_) => println!("{}", render::pending(console.executor().mode())),
        ConsoleEvent::ModeChanged(mode) => println!("Now using {} answers.", mode.as_str()),
        ConsoleEvent::Reset => println!("Cleared."),
        ConsoleEvent::ErrorDismissed => {}
        ConsoleEvent::Pinned(pin) => println!("Pinned as {}.", pin.id),
        ConsoleEvent::Unpinned(Some(pin)) => println!("Unpinned {}.", pin.id),
        ConsoleEvent::Unpinned(None) => println!("No such pin."),
        ConsoleEvent::HighlightChanged(_) => show(console, settings),
        ConsoleEvent::Ignored(reason) => println!("Nothing to do: {}.", reason),
    }
}

fn show(console: &ResearchConsole, settings: &DynSettings) {
    match console.current() {
        Some(settled) => print!(
            "{}",
            render::brief(&settled, &console.segments(), console.highlight(), settings.theme())
        ),
        None => println!("No answer yet."),
    }
}

fn handle_view(
    console: &ResearchConsole,
    settings: &mut DynSettings,
    tour: &mut Option<Tour>,
    view: ViewCommand,
) -> Result<()> {
    match view {
        ViewCommand::Help => println!("{}", HELP),
        ViewCommand::Show => show(console, settings),
        ViewCommand::Pins => print!("{}", render::pins(console.workspace().pinned())),
        ViewCommand::Sessions => print!("{}", render::sessions(console.workspace().sessions())),
        ViewCommand::Suggestions => {
            for suggestion in SUGGESTED_QUESTIONS {
                println!("  {}", suggestion.label);
            }
        }
        ViewCommand::Templates => {
            for template in QUERY_TEMPLATES {
                println!("  {:<20} {} ({})", template.id, template.label, template.description);
            }
        }
        ViewCommand::Export(format) => match console.current() {
            Some(settled) => println!("{}", render::exported(format, &settled.question, &settled.result)),
            None => println!("No answer to export."),
        },
        ViewCommand::Theme => {
            let theme = settings.toggle_theme()?;
            println!("Theme: {}", theme);
        }
        ViewCommand::TourNext => match tour.as_mut() {
            Some(current) => {
                if current.advance() {
                    print_tour(current);
                } else {
                    finish_tour(tour, settings)?;
                }
            }
            None => println!("The tour is finished."),
        },
        ViewCommand::TourSkip => finish_tour(tour, settings)?,
    }
    Ok(())
}

fn print_tour(tour: &Tour) {
    let step = tour.current();
    println!(
        "Tour {}/{}: {}. {} (tour next / tour skip)",
        tour.step() + 1,
        mrs_engine::tour::STEPS.len(),
        step.title,
        step.body
    );
}

fn finish_tour(tour: &mut Option<Tour>, settings: &mut DynSettings) -> Result<()> {
    if let Some(done) = tour.take() {
        done.finish(settings)?;
        println!("Tour finished.");
    }
    Ok(())
}

/// Backend data refetched after an invalidation.
#[derive(Debug)]
enum Refreshed {
    History(Vec<QueryHistoryEntry>),
    Metrics(MetricsSnapshot),
}

/// Refetch whatever `key` points at without blocking the main loop.
fn spawn_refresh(client: &ResearchClient, key: CacheKey, refreshed: mpsc::Sender<Refreshed>) {
    let client = client.clone();
    tokio::spawn(async move {
        let fetched = match key {
            CacheKey::QueryHistory => client.query_history().await.map(Refreshed::History),
            CacheKey::Metrics => client.metrics().await.map(Refreshed::Metrics),
            CacheKey::Documents => return,
        };
        match fetched {
            Ok(data) => {
                let _ = refreshed.send(data).await;
            }
            Err(e) => warn!(error = %e, key = key.as_str(), "Failed to refresh"),
        }
    });
}

/// History fetched for live mode is dropped if the console has since left it.
fn apply_refresh(console: &mut ResearchConsole, refreshed: Refreshed) {
    match refreshed {
        Refreshed::History(entries) => {
            if console.executor().mode() == Mode::Live {
                console
                    .workspace_mut()
                    .replace_sessions(vec![history_session(entries)]);
            } else {
                debug!("Dropping live history fetched before a mode switch");
            }
        }
        Refreshed::Metrics(metrics) => print!("{}", render::metrics(&metrics)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mrs_engine::{InvalidationBus, KeyValueStore, QueryExecutor, Settings, Theme, WorkspaceStore};
    use std::sync::Arc;
    use std::time::Duration;

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> mrs_engine::Result<Option<String>> {
            Ok(None)
        }

        fn set(&mut self, _key: &str, _value: &str) -> mrs_engine::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }
    }

    fn console(mode: Mode) -> ResearchConsole {
        let client = ResearchClient::new("http://127.0.0.1:9", Duration::from_millis(100)).unwrap();
        let executor = QueryExecutor::new(Arc::new(client), InvalidationBus::default(), Duration::ZERO, mode);
        ResearchConsole::new(executor, WorkspaceStore::new(ResearchConsole::seed_sessions(mode)))
    }

    fn entry(id: &str) -> QueryHistoryEntry {
        QueryHistoryEntry {
            id: id.to_string(),
            question: "Q".to_string(),
            answer: "A".to_string(),
            created_at: Utc::now(),
            metadata: Default::default(),
        }
    }

    #[test]
    fn test_settings_write_failure_is_reported() {
        let console = console(Mode::Simulated);
        let store: Box<dyn KeyValueStore + Send> = Box::new(ReadOnlyStore);
        let mut settings: DynSettings = Settings::load(store).unwrap();
        let mut tour = Tour::start(&settings);

        assert!(handle_view(&console, &mut settings, &mut tour, ViewCommand::Theme).is_err());
        assert_eq!(settings.theme(), Theme::Dark);

        // The tour is not offered again this session even though it could not be saved.
        assert!(handle_view(&console, &mut settings, &mut tour, ViewCommand::TourSkip).is_err());
        assert!(tour.is_none());
        assert!(handle_view(&console, &mut settings, &mut tour, ViewCommand::Show).is_ok());
    }

    #[test]
    fn test_live_history_refresh() {
        let mut console = console(Mode::Live);
        apply_refresh(&mut console, Refreshed::History(vec![entry("q-1")]));
        assert!(console.workspace().find_entry("q-1").is_some());
    }

    #[test]
    fn test_history_fetched_before_mode_switch_is_dropped() {
        let mut console = console(Mode::Simulated);
        apply_refresh(&mut console, Refreshed::History(vec![entry("q-1")]));
        assert!(console.workspace().find_entry("q-1").is_none());
        assert!(console.workspace().find_entry("h-1").is_some());
    }

    #[test]
    fn test_filters_carry_into_submission() {
        let mut draft = Draft::default();
        assert_eq!(draft.parse("years 2018-2024"), Ok(None));
        assert_eq!(draft.parse("journals NEJM, Lancet"), Ok(None));
        assert_eq!(draft.parse("max 5"), Ok(None));

        let Ok(Some(Input::Console(ConsoleCommand::Submit(form)))) = draft.parse("ask  SGLT2 in CKD? ") else {
            panic!("expected a submission");
        };
        assert_eq!(form.question, "SGLT2 in CKD?");
        assert_eq!(form.start_year, Some(2018));
        assert_eq!(form.end_year, Some(2024));
        assert_eq!(form.journals, "NEJM, Lancet");
        assert_eq!(form.max_results.as_deref(), Some("5"));
    }

    #[test]
    fn test_reset_clears_draft() {
        let mut draft = Draft::default();
        draft.parse("years 2018-2024").unwrap();
        assert_eq!(draft.parse("reset"), Ok(Some(Input::Console(ConsoleCommand::Reset))));
        let Ok(Some(Input::Console(ConsoleCommand::Submit(form)))) = draft.parse("ask q") else {
            panic!("expected a submission");
        };
        assert_eq!(form.start_year, None);
    }

    #[test]
    fn test_segments_are_one_based() {
        let mut draft = Draft::default();
        assert_eq!(
            draft.parse("segment 2"),
            Ok(Some(Input::Console(ConsoleCommand::ClickSegment { index: 1 })))
        );
        assert!(draft.parse("segment 0").is_err());
    }

    #[test]
    fn test_view_commands() {
        let mut draft = Draft::default();
        assert_eq!(
            draft.parse("export references"),
            Ok(Some(Input::View(ViewCommand::Export(ExportFormat::References))))
        );
        assert!(draft.parse("export pdf").is_err());
        assert_eq!(draft.parse("tour skip"), Ok(Some(Input::View(ViewCommand::TourSkip))));
        assert_eq!(draft.parse("quit"), Ok(Some(Input::Quit)));
        assert_eq!(draft.parse("   "), Ok(None));
        assert!(draft.parse("frobnicate").is_err());
    }
}
