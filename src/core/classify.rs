//! Turns raw input events into counting actions.
//!
//! The caller updates the modifier tracker first and passes the resulting
//! mask in, so a modifier's own press is counted with its bit already set.

use crate::core::modifiers::ModifierMask;
use crate::source::InputEvent;

/// Wheel step direction, counted under a synthetic identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelDirection {
    Up,
    Down,
}

impl WheelDirection {
    pub fn identifier(&self) -> &'static str {
        match self {
            WheelDirection::Up => "WHEEL_UP",
            WheelDirection::Down => "WHEEL_DOWN",
        }
    }
}

/// What a single input event contributes to the aggregates.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Count a keyboard press under `(identifier, mask)`.
    CountKey { id: String, mask: ModifierMask },
    /// Count a pointer-button press under `(identifier, mask)`.
    CountButton { id: String, mask: ModifierMask },
    /// Count wheel steps, by magnitude, under the direction's identifier.
    CountWheel {
        direction: WheelDirection,
        magnitude: u64,
        mask: ModifierMask,
    },
    /// Accumulate per-axis absolute pointer travel.
    Travel { dx: u64, dy: u64 },
    /// Nothing to count (releases, zero scrolls, first position sample).
    Ignore,
}

/// Stateful classifier: remembers the previous pointer sample so motion
/// becomes per-axis deltas.
#[derive(Debug, Default)]
pub struct EventClassifier {
    last_position: Option<(i32, i32)>,
}

impl EventClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(&mut self, event: &InputEvent, mask: ModifierMask) -> Action {
        match event {
            InputEvent::Key { code, pressed } => {
                if !pressed {
                    return Action::Ignore;
                }
                Action::CountKey {
                    id: code.identifier(),
                    mask,
                }
            }
            InputEvent::Button { code, pressed } => {
                if !pressed {
                    return Action::Ignore;
                }
                Action::CountButton {
                    id: code.identifier(),
                    mask,
                }
            }
            InputEvent::Scroll { delta } => {
                if *delta == 0 {
                    return Action::Ignore;
                }
                let direction = if *delta > 0 {
                    WheelDirection::Up
                } else {
                    WheelDirection::Down
                };
                Action::CountWheel {
                    direction,
                    magnitude: u64::from(delta.unsigned_abs()),
                    mask,
                }
            }
            InputEvent::PointerMove { x, y } => {
                // The first sample only establishes a reference position.
                let Some((last_x, last_y)) = self.last_position.replace((*x, *y)) else {
                    return Action::Ignore;
                };
                Action::Travel {
                    dx: u64::from(x.abs_diff(last_x)),
                    dy: u64::from(y.abs_diff(last_y)),
                }
            }
        }
    }
}
