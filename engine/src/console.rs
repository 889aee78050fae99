//! The research console: applies commands to the executor, highlight and workspace.

use std::sync::Arc;

use tracing::debug;

use crate::commands::ConsoleCommand;
use crate::executor::{ExecutorState, Mode, QueryExecutor, SettledQuery, Submission};
use crate::filters::{build_request, QueryForm};
use crate::fixtures;
use crate::intent::CanonicalKey;
use crate::models::{QueryRequest, Session};
use crate::provenance::{self, AnswerSegment, HighlightState};
use crate::workspace::{PinnedAnswer, WorkspaceStore};
use crate::{Error, Result};

/// What applying a command did.
#[derive(Debug)]
pub enum ConsoleEvent {
    Submitted(Submission),
    ModeChanged(Mode),
    Reset,
    ErrorDismissed,
    Pinned(PinnedAnswer),
    Unpinned(Option<PinnedAnswer>),
    HighlightChanged(Option<String>),
    /// The command had nothing to act on.
    Ignored(&'static str),
}

/// Owns everything a single user session mutates.
pub struct ResearchConsole {
    executor: QueryExecutor,
    workspace: WorkspaceStore,
    highlight: HighlightState,
    form: QueryForm,
    shown: Option<Arc<SettledQuery>>,
}

impl ResearchConsole {
    pub fn new(executor: QueryExecutor, workspace: WorkspaceStore) -> Self {
        Self {
            executor,
            workspace,
            highlight: HighlightState::new(),
            form: QueryForm::default(),
            shown: None,
        }
    }

    /// Catch up with the executor. A newly settled answer clears the highlight.
    ///
    /// Returns true when the answer on screen changed.
    pub fn sync(&mut self) -> bool {
        let current = self.current();
        let changed = match (&current, &self.shown) {
            (Some(now), Some(before)) => !Arc::ptr_eq(now, before),
            (None, None) => false,
            _ => true,
        };
        if changed {
            if current.is_some() {
                self.highlight.clear();
            }
            self.shown = current;
        }
        changed
    }

    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    pub fn workspace(&self) -> &WorkspaceStore {
        &self.workspace
    }

    pub fn workspace_mut(&mut self) -> &mut WorkspaceStore {
        &mut self.workspace
    }

    pub fn highlight(&self) -> &HighlightState {
        &self.highlight
    }

    /// Last form contents, including questions filled in by suggestions or history.
    pub fn form(&self) -> &QueryForm {
        &self.form
    }

    /// The settled answer on screen, if any.
    pub fn current(&self) -> Option<Arc<SettledQuery>> {
        self.executor.state().settled().cloned()
    }

    /// Segments of the current answer.
    pub fn segments(&self) -> Vec<AnswerSegment> {
        match self.current() {
            Some(settled) => provenance::segment(&settled.result.answer, settled.key, &settled.result.sources),
            None => Vec::new(),
        }
    }

    /// Apply one command. Validation failures are returned without touching query state.
    pub fn apply(&mut self, command: ConsoleCommand) -> Result<ConsoleEvent> {
        debug!(?command, "Applying console command");
        self.sync();
        match command {
            ConsoleCommand::Submit(form) => {
                let request = build_request(&form)?;
                self.form = form;
                Ok(self.submit(request, None))
            }
            ConsoleCommand::RunSuggested { label } => {
                let suggestion = fixtures::suggestion(&label)
                    .ok_or_else(|| Error::NotFound(format!("suggested question {:?}", label)))?;
                self.run_known(suggestion.label, Some(suggestion.key))
            }
            ConsoleCommand::RunTemplate { id } => {
                let template = fixtures::template(&id)
                    .ok_or_else(|| Error::NotFound(format!("query template {:?}", id)))?;
                self.run_known(template.question, Some(template.key))
            }
            ConsoleCommand::TryDemo => self.run_known(fixtures::DEMO_QUESTION, Some(CanonicalKey::Default)),
            ConsoleCommand::RerunHistory { entry_id } => {
                let question = self
                    .workspace
                    .find_entry(&entry_id)
                    .map(|entry| entry.question.clone())
                    .ok_or_else(|| Error::NotFound(format!("history entry {:?}", entry_id)))?;
                self.run_known(&question, None)
            }
            ConsoleCommand::ToggleMode => {
                let mode = self.executor.toggle_mode();
                self.highlight.clear();
                self.workspace.replace_sessions(Self::seed_sessions(mode));
                Ok(ConsoleEvent::ModeChanged(mode))
            }
            ConsoleCommand::Reset => {
                self.form = QueryForm::default();
                self.executor.reset();
                self.highlight.clear();
                Ok(ConsoleEvent::Reset)
            }
            ConsoleCommand::DismissError => {
                self.executor.dismiss_error();
                Ok(ConsoleEvent::ErrorDismissed)
            }
            ConsoleCommand::PinCurrent => match self.current() {
                Some(settled) => Ok(ConsoleEvent::Pinned(
                    self.workspace.pin(settled.question.clone(), &settled.result),
                )),
                None => Ok(ConsoleEvent::Ignored("no answer to pin")),
            },
            ConsoleCommand::Unpin { id } => Ok(ConsoleEvent::Unpinned(self.workspace.unpin(&id))),
            ConsoleCommand::ClickSegment { index } => {
                let Some(settled) = self.current() else {
                    return Ok(ConsoleEvent::Ignored("no answer on screen"));
                };
                let segments = self.segments();
                let Some(segment) = segments.get(index) else {
                    return Ok(ConsoleEvent::Ignored("no such segment"));
                };
                self.highlight.click_segment(segment, &settled.result.sources);
                Ok(self.highlight_changed())
            }
            ConsoleCommand::SelectCitation { id } => {
                self.highlight.select_citation(id);
                Ok(self.highlight_changed())
            }
            ConsoleCommand::ClearHighlight => {
                self.highlight.clear();
                Ok(self.highlight_changed())
            }
        }
    }

    /// History each mode starts from. Live history arrives from the backend later.
    pub fn seed_sessions(mode: Mode) -> Vec<Session> {
        match mode {
            Mode::Simulated => fixtures::demo_sessions(),
            Mode::Live => Vec::new(),
        }
    }

    fn run_known(&mut self, question: &str, key: Option<CanonicalKey>) -> Result<ConsoleEvent> {
        let request = QueryRequest::question_only(question)?;
        self.form = QueryForm {
            question: question.to_string(),
            ..self.form.clone()
        };
        Ok(self.submit(request, key))
    }

    fn submit(&mut self, request: QueryRequest, key: Option<CanonicalKey>) -> ConsoleEvent {
        self.highlight.clear();
        ConsoleEvent::Submitted(self.executor.submit(request, key))
    }

    fn highlight_changed(&self) -> ConsoleEvent {
        ConsoleEvent::HighlightChanged(self.highlight.highlighted().map(String::from))
    }

    /// True while a submission is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self.executor.state(), ExecutorState::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ResearchBackend;
    use crate::commands::CommandBus;
    use crate::events::InvalidationBus;
    use crate::executor::Completion;
    use crate::models::QueryResult;
    use async_trait::async_trait;
    use std::time::Duration;

    struct OfflineBackend;

    #[async_trait]
    impl ResearchBackend for OfflineBackend {
        async fn query(&self, _request: &QueryRequest) -> Result<QueryResult> {
            Err(Error::Transport("connection refused".to_string()))
        }
    }

    fn console() -> ResearchConsole {
        let executor = QueryExecutor::new(
            Arc::new(OfflineBackend),
            InvalidationBus::default(),
            Duration::from_millis(2),
            Mode::Simulated,
        );
        ResearchConsole::new(executor, WorkspaceStore::new(fixtures::demo_sessions()))
    }

    async fn settle(console: &mut ResearchConsole, command: ConsoleCommand) -> Completion {
        match console.apply(command).unwrap() {
            ConsoleEvent::Submitted(submission) => submission.wait().await,
            other => panic!("expected submission, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_form_issues_no_request() {
        let mut console = console();
        let mut form = QueryForm::with_question("Q");
        form.start_year = Some(2024);
        form.end_year = Some(2020);
        let err = console.apply(ConsoleCommand::Submit(form)).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(console.executor().state(), ExecutorState::Idle);
    }

    #[tokio::test]
    async fn test_form_submission_is_classified() {
        let mut console = console();
        let form = QueryForm::with_question("What are the main limitations of the evidence?");
        settle(&mut console, ConsoleCommand::Submit(form)).await;
        assert_eq!(console.current().unwrap().key, Some(CanonicalKey::LimitationsOnly));
    }

    #[tokio::test]
    async fn test_suggestion_uses_its_key() {
        let mut console = console();
        settle(&mut console, ConsoleCommand::RunSuggested { label: "Compare GLP-1 vs SGLT2".into() }).await;
        let current = console.current().unwrap();
        assert_eq!(current.key, Some(CanonicalKey::CompareTreatments));
        assert_eq!(current.question, "Compare GLP-1 vs SGLT2");
        assert_eq!(console.form().question, "Compare GLP-1 vs SGLT2");
    }

    #[tokio::test]
    async fn test_unknown_template_is_not_found() {
        let mut console = console();
        let err = console.apply(ConsoleCommand::RunTemplate { id: "nope".into() }).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_history_rerun_is_reclassified() {
        let mut console = console();
        settle(&mut console, ConsoleCommand::RerunHistory { entry_id: "h-3".into() }).await;
        assert_eq!(console.current().unwrap().key, Some(CanonicalKey::HeartFailure));
    }

    #[tokio::test]
    async fn test_demo_answer_highlighting() {
        let mut console = console();
        settle(&mut console, ConsoleCommand::TryDemo).await;
        assert_eq!(console.segments().len(), 3);

        match console.apply(ConsoleCommand::ClickSegment { index: 1 }).unwrap() {
            ConsoleEvent::HighlightChanged(id) => assert_eq!(id.as_deref(), Some("demo-1")),
            other => panic!("unexpected {:?}", other),
        }
        console.apply(ConsoleCommand::ClickSegment { index: 1 }).unwrap();
        assert_eq!(console.highlight().highlighted(), None);

        // The first segment carries no citation.
        console.apply(ConsoleCommand::ClickSegment { index: 0 }).unwrap();
        assert_eq!(console.highlight().highlighted(), None);

        console.apply(ConsoleCommand::SelectCitation { id: "demo-2".into() }).unwrap();
        console.apply(ConsoleCommand::ClearHighlight).unwrap();
        assert_eq!(console.highlight().highlighted(), None);
    }

    #[tokio::test]
    async fn test_new_submission_clears_highlight() {
        let mut console = console();
        settle(&mut console, ConsoleCommand::TryDemo).await;
        console.apply(ConsoleCommand::SelectCitation { id: "demo-1".into() }).unwrap();
        settle(&mut console, ConsoleCommand::RunTemplate { id: "limitations-only".into() }).await;
        assert_eq!(console.highlight().highlighted(), None);
        assert_eq!(console.segments().len(), 1);
    }

    #[tokio::test]
    async fn test_settling_clears_highlight_chosen_while_pending() {
        let mut console = console();
        settle(&mut console, ConsoleCommand::TryDemo).await;
        assert!(console.sync());

        let submission = match console.apply(ConsoleCommand::TryDemo).unwrap() {
            ConsoleEvent::Submitted(submission) => submission,
            other => panic!("unexpected {:?}", other),
        };
        console.apply(ConsoleCommand::SelectCitation { id: "demo-2".into() }).unwrap();
        assert_eq!(console.highlight().highlighted(), Some("demo-2"));

        submission.wait().await;
        assert!(console.sync());
        assert_eq!(console.highlight().highlighted(), None);
        assert!(!console.sync());
    }

    #[tokio::test]
    async fn test_pin_and_unpin_current() {
        let mut console = console();
        assert!(matches!(console.apply(ConsoleCommand::PinCurrent).unwrap(), ConsoleEvent::Ignored(_)));

        settle(&mut console, ConsoleCommand::TryDemo).await;
        let pinned = match console.apply(ConsoleCommand::PinCurrent).unwrap() {
            ConsoleEvent::Pinned(pinned) => pinned,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(pinned.question, fixtures::DEMO_QUESTION);

        // Moving on does not disturb the pinned copy.
        console.apply(ConsoleCommand::Reset).unwrap();
        assert_eq!(console.workspace().pinned().len(), 1);
        assert_eq!(console.workspace().pinned()[0].result, fixtures::response(CanonicalKey::Default));

        console.apply(ConsoleCommand::Unpin { id: pinned.id }).unwrap();
        assert!(console.workspace().pinned().is_empty());
    }

    #[tokio::test]
    async fn test_live_failure_then_toggle_back() {
        let mut console = console();
        assert!(matches!(
            console.apply(ConsoleCommand::ToggleMode).unwrap(),
            ConsoleEvent::ModeChanged(Mode::Live)
        ));
        settle(&mut console, ConsoleCommand::TryDemo).await;
        assert!(matches!(console.executor().state(), ExecutorState::Failed(_)));

        console.apply(ConsoleCommand::DismissError).unwrap();
        assert_eq!(console.executor().state(), ExecutorState::Idle);
        console.apply(ConsoleCommand::ToggleMode).unwrap();
        assert_eq!(console.executor().mode(), Mode::Simulated);
    }

    #[tokio::test]
    async fn test_mode_toggle_swaps_history_source() {
        let mut console = console();
        assert!(console.workspace().find_entry("h-1").is_some());

        console.apply(ConsoleCommand::ToggleMode).unwrap();
        assert!(console.workspace().sessions().is_empty());
        let err = console.apply(ConsoleCommand::RerunHistory { entry_id: "h-1".into() }).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        console.apply(ConsoleCommand::ToggleMode).unwrap();
        assert_eq!(console.workspace().sessions().len(), 2);
        assert!(console.workspace().find_entry("h-3").is_some());
    }

    #[tokio::test]
    async fn test_commands_via_bus() {
        let mut console = console();
        let (bus, mut rx) = CommandBus::channel(8);
        bus.send(ConsoleCommand::RerunHistory { entry_id: "h-1".into() }).await.unwrap();
        drop(bus);

        let mut last = None;
        while let Some(command) = rx.recv().await {
            if let ConsoleEvent::Submitted(submission) = console.apply(command).unwrap() {
                last = Some(submission.wait().await);
            }
        }
        assert_eq!(last, Some(Completion::Applied));
        assert!(console.current().is_some());
    }
}
