//! Event sources.
//!
//! A source adapts one capture mechanism (evdev on Linux, a scripted queue
//! in tests) to the small polling interface the counting loop consumes.

use std::time::Duration;

pub mod scripted;
pub mod types;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(not(target_os = "linux"))]
pub mod noop;

// Re-export commonly used types
pub use scripted::ScriptedSource;
pub use types::{InputEvent, KeyCode, SourceError};

#[cfg(target_os = "linux")]
pub use linux::{check_device_access, EvdevSource};

/// Platform-agnostic source type alias
#[cfg(target_os = "linux")]
pub type PlatformSource = EvdevSource;

#[cfg(not(target_os = "linux"))]
pub use noop::{check_device_access, NoopSource};

/// Platform-agnostic source type alias
#[cfg(not(target_os = "linux"))]
pub type PlatformSource = NoopSource;

/// What the counting loop needs from a source of input events.
pub trait EventSource {
    /// Begin capturing. Capture may come up asynchronously; poll
    /// [`listening`](Self::listening) to find out when events can flow.
    fn start(&mut self) -> Result<(), SourceError>;

    /// Whether the source is actively capturing.
    fn listening(&self) -> bool;

    /// Wait up to `timeout` for the next event. `None` means no event
    /// arrived in time, not end of stream.
    fn poll_event(&mut self, timeout: Duration) -> Option<InputEvent>;

    /// Stop capturing. Idempotent.
    fn stop_listening(&mut self);
}
