//! First-run guided tour.

use crate::settings::{KeyValueStore, Settings};
use crate::Result;

/// One tour card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TourStep {
    pub title: &'static str,
    pub body: &'static str,
}

pub const STEPS: [TourStep; 3] = [
    TourStep {
        title: "Ask a question",
        body: "Type a clinical question or pick a suggested topic.",
    },
    TourStep {
        title: "Get a synthesis",
        body: "Review the AI-generated brief with evidence and citations.",
    },
    TourStep {
        title: "Pin & export",
        body: "Pin answers to Highlights and copy as Markdown or references.",
    },
];

/// Position within the tour.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tour {
    step: usize,
}

impl Tour {
    /// A tour to show, unless it was already completed.
    pub fn start<S: KeyValueStore>(settings: &Settings<S>) -> Option<Self> {
        (!settings.tour_done()).then(Self::default)
    }

    pub fn current(&self) -> &'static TourStep {
        &STEPS[self.step]
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn is_last(&self) -> bool {
        self.step + 1 == STEPS.len()
    }

    /// Advance; returns false on the last step.
    pub fn advance(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.step += 1;
        true
    }

    pub fn go_to(&mut self, step: usize) {
        self.step = step.min(STEPS.len() - 1);
    }

    /// Finish or skip; the tour will not start again.
    pub fn finish<S: KeyValueStore>(self, settings: &mut Settings<S>) -> Result<()> {
        settings.set_tour_done(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemoryStore;

    #[test]
    fn test_walkthrough_then_never_again() {
        let mut settings = Settings::load(MemoryStore::default()).unwrap();
        let mut tour = Tour::start(&settings).unwrap();
        assert_eq!(tour.current().title, "Ask a question");
        assert!(tour.advance());
        assert!(tour.advance());
        assert!(tour.is_last());
        assert!(!tour.advance());

        tour.finish(&mut settings).unwrap();
        assert!(Tour::start(&settings).is_none());
    }

    #[test]
    fn test_go_to_clamps() {
        let mut tour = Tour::default();
        tour.go_to(10);
        assert_eq!(tour.step(), 2);
    }
}
