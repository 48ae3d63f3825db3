//! In-memory aggregation between flushes.
//!
//! Counts are keyed by `(identifier, mask)` per table; pointer travel is a
//! pair of per-axis absolute-delta sums. Everything here is owned by the
//! counting thread, so draining is a plain take-and-reset.

use std::collections::HashMap;

use crate::core::modifiers::ModifierMask;

/// Which store table a counter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterTable {
    Keyboard,
    Mouse,
}

impl CounterTable {
    pub fn table_name(&self) -> &'static str {
        match self {
            CounterTable::Keyboard => "keyboard",
            CounterTable::Mouse => "mouse",
        }
    }
}

/// The in-memory counting key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregateKey {
    pub id: String,
    pub mask: ModifierMask,
}

impl AggregateKey {
    pub fn new(id: impl Into<String>, mask: ModifierMask) -> Self {
        Self {
            id: id.into(),
            mask,
        }
    }
}

/// One buffered row for one table; the bucket is supplied at flush time.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterRecord {
    pub id: String,
    pub mask: ModifierMask,
    pub count: u64,
}

/// A drained snapshot of the buffer, ready to merge into the store.
#[derive(Debug, Clone, Default)]
pub struct FlushBatch {
    pub keyboard: Vec<CounterRecord>,
    pub mouse: Vec<CounterRecord>,
    pub travel_x: u64,
    pub travel_y: u64,
}

impl FlushBatch {
    pub fn is_empty(&self) -> bool {
        self.keyboard.is_empty()
            && self.mouse.is_empty()
            && self.travel_x == 0
            && self.travel_y == 0
    }

    /// Total buffered rows, for flush logging.
    pub fn record_count(&self) -> usize {
        self.keyboard.len() + self.mouse.len()
    }
}

/// Composite-key counters plus travel accumulators.
#[derive(Debug, Default)]
pub struct AggregationBuffer {
    keyboard: HashMap<AggregateKey, u64>,
    mouse: HashMap<AggregateKey, u64>,
    travel_x: u64,
    travel_y: u64,
}

impl AggregationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, table: CounterTable, key: AggregateKey, amount: u64) {
        let map = match table {
            CounterTable::Keyboard => &mut self.keyboard,
            CounterTable::Mouse => &mut self.mouse,
        };
        let count = map.entry(key).or_insert(0);
        *count = count.saturating_add(amount);
    }

    pub fn accumulate_travel(&mut self, dx: u64, dy: u64) {
        self.travel_x = self.travel_x.saturating_add(dx);
        self.travel_y = self.travel_y.saturating_add(dy);
    }

    pub fn is_empty(&self) -> bool {
        self.keyboard.is_empty() && self.mouse.is_empty() && self.travel_x == 0 && self.travel_y == 0
    }

    /// Take everything buffered so far and reset to empty.
    pub fn drain(&mut self) -> FlushBatch {
        let keyboard = std::mem::take(&mut self.keyboard);
        let mouse = std::mem::take(&mut self.mouse);
        FlushBatch {
            keyboard: into_records(keyboard),
            mouse: into_records(mouse),
            travel_x: std::mem::take(&mut self.travel_x),
            travel_y: std::mem::take(&mut self.travel_y),
        }
    }

    /// Merge a drained batch back in, after a failed flush. Increments
    /// commute, so re-absorbing keeps totals exact even if new events were
    /// counted in the meantime.
    pub fn absorb(&mut self, batch: FlushBatch) {
        for record in batch.keyboard {
            self.increment(
                CounterTable::Keyboard,
                AggregateKey::new(record.id, record.mask),
                record.count,
            );
        }
        for record in batch.mouse {
            self.increment(
                CounterTable::Mouse,
                AggregateKey::new(record.id, record.mask),
                record.count,
            );
        }
        self.accumulate_travel(batch.travel_x, batch.travel_y);
    }
}

fn into_records(map: HashMap<AggregateKey, u64>) -> Vec<CounterRecord> {
    map.into_iter()
        .map(|(key, count)| CounterRecord {
            id: key.id,
            mask: key.mask,
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(records: &[CounterRecord], id: &str, mask: ModifierMask) -> Option<u64> {
        records
            .iter()
            .find(|r| r.id == id && r.mask == mask)
            .map(|r| r.count)
    }

    #[test]
    fn test_increments_fold_into_one_entry() {
        let mut buffer = AggregationBuffer::new();
        for _ in 0..3 {
            buffer.increment(
                CounterTable::Keyboard,
                AggregateKey::new("KEY_A", ModifierMask::SHIFT),
                1,
            );
        }
        let batch = buffer.drain();
        assert_eq!(batch.keyboard.len(), 1);
        assert_eq!(find(&batch.keyboard, "KEY_A", ModifierMask::SHIFT), Some(3));
    }

    #[test]
    fn test_distinct_masks_are_distinct_entries() {
        let mut buffer = AggregationBuffer::new();
        buffer.increment(
            CounterTable::Keyboard,
            AggregateKey::new("KEY_C", ModifierMask::SHIFT),
            1,
        );
        buffer.increment(
            CounterTable::Keyboard,
            AggregateKey::new("KEY_C", ModifierMask::empty()),
            1,
        );
        let batch = buffer.drain();
        assert_eq!(batch.keyboard.len(), 2);
        assert_eq!(find(&batch.keyboard, "KEY_C", ModifierMask::SHIFT), Some(1));
        assert_eq!(find(&batch.keyboard, "KEY_C", ModifierMask::empty()), Some(1));
    }

    #[test]
    fn test_drain_resets_the_buffer() {
        let mut buffer = AggregationBuffer::new();
        buffer.increment(
            CounterTable::Mouse,
            AggregateKey::new("BTN_LEFT", ModifierMask::empty()),
            1,
        );
        buffer.accumulate_travel(10, 4);
        assert!(!buffer.is_empty());

        let batch = buffer.drain();
        assert!(!batch.is_empty());
        assert_eq!(batch.travel_x, 10);
        assert_eq!(batch.travel_y, 4);

        assert!(buffer.is_empty());
        assert!(buffer.drain().is_empty());
    }

    #[test]
    fn test_absorb_restores_counts() {
        let mut buffer = AggregationBuffer::new();
        buffer.increment(
            CounterTable::Keyboard,
            AggregateKey::new("KEY_B", ModifierMask::empty()),
            2,
        );
        buffer.accumulate_travel(7, 7);
        let batch = buffer.drain();

        // New events arrive while the failed batch is out.
        buffer.increment(
            CounterTable::Keyboard,
            AggregateKey::new("KEY_B", ModifierMask::empty()),
            1,
        );
        buffer.absorb(batch);

        let merged = buffer.drain();
        assert_eq!(find(&merged.keyboard, "KEY_B", ModifierMask::empty()), Some(3));
        assert_eq!(merged.travel_x, 7);
        assert_eq!(merged.travel_y, 7);
    }

    #[test]
    fn test_tables_are_independent() {
        let mut buffer = AggregationBuffer::new();
        buffer.increment(
            CounterTable::Keyboard,
            AggregateKey::new("KEY_A", ModifierMask::empty()),
            1,
        );
        buffer.increment(
            CounterTable::Mouse,
            AggregateKey::new("WHEEL_UP", ModifierMask::empty()),
            4,
        );
        let batch = buffer.drain();
        assert_eq!(batch.keyboard.len(), 1);
        assert_eq!(batch.mouse.len(), 1);
        assert_eq!(find(&batch.mouse, "WHEEL_UP", ModifierMask::empty()), Some(4));
    }
}
