//! Raw input event types delivered by an event source.
//!
//! Sources translate whatever the platform hands them into these variants;
//! everything downstream (classification, aggregation, storage) is
//! platform-agnostic.

use thiserror::Error;

/// A key or pointer-button code as reported by the platform.
///
/// `name` is the resolved identifier (`KEY_A`, `BTN_LEFT`, ...) when the
/// scancode is known; unknown codes still carry the raw scancode so they can
/// be counted under a fallback identifier instead of being dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCode {
    name: Option<&'static str>,
    code: u16,
}

impl KeyCode {
    /// A code with a resolved identifier name.
    pub fn named(name: &'static str, code: u16) -> Self {
        Self {
            name: Some(name),
            code,
        }
    }

    /// A code with no known name; counted under the decimal scancode.
    pub fn raw(code: u16) -> Self {
        Self { name: None, code }
    }

    /// The identifier this code is counted under.
    pub fn identifier(&self) -> String {
        match self.name {
            Some(name) => name.to_string(),
            None => self.code.to_string(),
        }
    }

    pub fn scancode(&self) -> u16 {
        self.code
    }
}

/// A single input event as seen by the counting loop.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Keyboard key transition. Auto-repeat is not delivered as a press.
    Key { code: KeyCode, pressed: bool },
    /// Pointer button transition.
    Button { code: KeyCode, pressed: bool },
    /// Absolute pointer position sample.
    PointerMove { x: i32, y: i32 },
    /// Signed wheel step; positive scrolls up/away.
    Scroll { delta: i32 },
}

impl InputEvent {
    pub fn key_press(code: KeyCode) -> Self {
        InputEvent::Key {
            code,
            pressed: true,
        }
    }

    pub fn key_release(code: KeyCode) -> Self {
        InputEvent::Key {
            code,
            pressed: false,
        }
    }

    pub fn button_press(code: KeyCode) -> Self {
        InputEvent::Button {
            code,
            pressed: true,
        }
    }

    pub fn button_release(code: KeyCode) -> Self {
        InputEvent::Button {
            code,
            pressed: false,
        }
    }
}

/// Errors raised by event sources.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source is already running")]
    AlreadyRunning,

    #[error("no readable input devices found (is this user in the 'input' group?)")]
    NoDevices,

    #[error("device error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_code_identifier() {
        let code = KeyCode::named("KEY_A", 30);
        assert_eq!(code.identifier(), "KEY_A");
        assert_eq!(code.scancode(), 30);
    }

    #[test]
    fn test_raw_code_falls_back_to_scancode() {
        let code = KeyCode::raw(743);
        assert_eq!(code.identifier(), "743");
    }

    #[test]
    fn test_event_constructors() {
        let down = InputEvent::key_press(KeyCode::named("KEY_B", 48));
        assert!(matches!(down, InputEvent::Key { pressed: true, .. }));

        let up = InputEvent::button_release(KeyCode::named("BTN_LEFT", 272));
        assert!(matches!(up, InputEvent::Button { pressed: false, .. }));
    }
}
