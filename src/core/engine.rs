//! The per-event pipeline: tracker update, classification, buffering.

use tracing::trace;

use crate::core::buffer::{AggregateKey, AggregationBuffer, CounterTable, FlushBatch};
use crate::core::classify::{Action, EventClassifier};
use crate::core::modifiers::ModifierTracker;
use crate::source::InputEvent;

/// Owns the counting state between flushes. One instance per counting loop;
/// nothing here is shared across threads.
#[derive(Debug, Default)]
pub struct CounterEngine {
    tracker: ModifierTracker,
    classifier: EventClassifier,
    buffer: AggregationBuffer,
}

impl CounterEngine {
    pub fn new(tracker: ModifierTracker) -> Self {
        Self {
            tracker,
            classifier: EventClassifier::new(),
            buffer: AggregationBuffer::new(),
        }
    }

    /// Apply one event: update modifier state, classify with the post-update
    /// mask, and fold the resulting action into the buffer.
    pub fn apply(&mut self, event: &InputEvent) {
        if let InputEvent::Key { code, pressed } = event {
            self.tracker.update(&code.identifier(), *pressed);
        }

        match self.classifier.classify(event, self.tracker.mask()) {
            Action::CountKey { id, mask } => {
                trace!(id, mask = mask.bits(), "key press");
                self.buffer
                    .increment(CounterTable::Keyboard, AggregateKey::new(id, mask), 1);
            }
            Action::CountButton { id, mask } => {
                trace!(id, mask = mask.bits(), "button press");
                self.buffer
                    .increment(CounterTable::Mouse, AggregateKey::new(id, mask), 1);
            }
            Action::CountWheel {
                direction,
                magnitude,
                mask,
            } => {
                trace!(id = direction.identifier(), magnitude, "wheel");
                self.buffer.increment(
                    CounterTable::Mouse,
                    AggregateKey::new(direction.identifier(), mask),
                    magnitude,
                );
            }
            Action::Travel { dx, dy } => {
                self.buffer.accumulate_travel(dx, dy);
            }
            Action::Ignore => {}
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Snapshot and reset the buffered aggregates.
    pub fn drain(&mut self) -> FlushBatch {
        self.buffer.drain()
    }

    /// Return a batch to the buffer after a failed flush.
    pub fn absorb(&mut self, batch: FlushBatch) {
        self.buffer.absorb(batch);
    }
}
