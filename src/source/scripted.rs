//! Deterministic queue-backed source for tests and demos.

use std::collections::VecDeque;
use std::time::Duration;

use crate::source::types::{InputEvent, SourceError};
use crate::source::EventSource;

/// Plays back a fixed sequence of events, one per poll.
pub struct ScriptedSource {
    events: VecDeque<InputEvent>,
    listening: bool,
}

impl ScriptedSource {
    pub fn new(events: impl IntoIterator<Item = InputEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            listening: false,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSource for ScriptedSource {
    fn start(&mut self) -> Result<(), SourceError> {
        if self.listening {
            return Err(SourceError::AlreadyRunning);
        }
        self.listening = true;
        Ok(())
    }

    fn listening(&self) -> bool {
        self.listening
    }

    fn poll_event(&mut self, _timeout: Duration) -> Option<InputEvent> {
        if !self.listening {
            return None;
        }
        self.events.pop_front()
    }

    fn stop_listening(&mut self) {
        self.listening = false;
    }
}
