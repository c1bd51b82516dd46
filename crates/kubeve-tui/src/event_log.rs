//! Append-only event history for the active watch generation.

use kubeve_core::{Event, WatchGeneration};

#[derive(Debug, Clone, Default)]
pub struct EventLog {
    generation: WatchGeneration,
    events: Vec<Event>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every recorded event and binds the log to `generation`.
    pub fn reset(&mut self, generation: WatchGeneration) {
        self.generation = generation;
        self.events.clear();
    }

    /// Appends `event` and returns its position.
    pub fn push(&mut self, event: Event) -> usize {
        self.events.push(event);
        self.events.len() - 1
    }

    #[must_use]
    pub fn generation(&self) -> WatchGeneration {
        self.generation
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Event> {
        self.events.get(index)
    }

    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
