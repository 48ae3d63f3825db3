//! Non-Linux (noop) event source.
//!
//! This exists so the crate (and binary) can compile on other targets
//! without pulling in evdev. It starts, listens, and never yields events.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::source::types::{InputEvent, SourceError};
use crate::source::EventSource;

/// An event source that never emits events.
pub struct NoopSource {
    _sender: Sender<InputEvent>,
    receiver: Receiver<InputEvent>,
    listening: bool,
}

impl NoopSource {
    pub fn new() -> Self {
        let (sender, receiver) = bounded(10_000);
        Self {
            _sender: sender,
            receiver,
            listening: false,
        }
    }
}

impl Default for NoopSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for NoopSource {
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

    /// Blocks for the full timeout; the channel never carries anything.
    fn poll_event(&mut self, timeout: Duration) -> Option<InputEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    fn stop_listening(&mut self) {
        self.listening = false;
    }
}

/// No device permission gate on this platform.
pub fn check_device_access() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_lifecycle() {
        let mut source = NoopSource::new();
        assert!(!source.listening());
        source.start().unwrap();
        assert!(source.listening());
        assert!(matches!(source.start(), Err(SourceError::AlreadyRunning)));

        assert!(source.poll_event(Duration::from_millis(1)).is_none());

        source.stop_listening();
        assert!(!source.listening());
    }
}
