//! Commands sent to the research console by the views that drive it.
//!
//! History lists, suggestion chips and the prompt do not call into the console directly;
//! they post a [`ConsoleCommand`] and the console applies commands one at a time.

use tokio::sync::mpsc;

use crate::filters::QueryForm;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Submit the query form.
    Submit(QueryForm),
    /// Run a suggested question by label.
    RunSuggested { label: String },
    /// Run a query template by id.
    RunTemplate { id: String },
    /// Run the built-in demo question.
    TryDemo,
    /// Re-run a history entry as if the question were retyped.
    RerunHistory { entry_id: String },
    ToggleMode,
    Reset,
    DismissError,
    PinCurrent,
    Unpin { id: String },
    /// Click the n-th answer segment (0-based).
    ClickSegment { index: usize },
    SelectCitation { id: String },
    ClearHighlight,
}

/// Sending half of the console command channel.
#[derive(Debug, Clone)]
pub struct CommandBus {
    sender: mpsc::Sender<ConsoleCommand>,
}

impl CommandBus {
    /// Create a bus and the receiver the console drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ConsoleCommand>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    pub async fn send(&self, command: ConsoleCommand) -> Result<()> {
        self.sender
            .send(command)
            .await
            .map_err(|e| Error::Unavailable(format!("console closed, dropped {:?}", e.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commands_arrive_in_order() {
        let (bus, mut rx) = CommandBus::channel(4);
        bus.send(ConsoleCommand::TryDemo).await.unwrap();
        bus.send(ConsoleCommand::PinCurrent).await.unwrap();
        assert_eq!(rx.recv().await, Some(ConsoleCommand::TryDemo));
        assert_eq!(rx.recv().await, Some(ConsoleCommand::PinCurrent));
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (bus, rx) = CommandBus::channel(1);
        drop(rx);
        assert!(bus.send(ConsoleCommand::Reset).await.is_err());
    }
}
