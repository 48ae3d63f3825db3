//! Core counting pipeline.
//!
//! This module contains:
//! - Modifier state tracking (bitmask of held modifiers)
//! - Event classification into counting actions
//! - The in-memory aggregation buffer and its flush batches
//! - Flush scheduling and (day, hour) bucket attribution
//! - The engine tying the pipeline together per event

pub mod buffer;
pub mod classify;
pub mod engine;
pub mod modifiers;
pub mod scheduler;

// Re-export commonly used types
pub use buffer::{AggregateKey, AggregationBuffer, CounterRecord, CounterTable, FlushBatch};
pub use classify::{Action, EventClassifier, WheelDirection};
pub use engine::CounterEngine;
pub use modifiers::{default_modifier_table, ModifierMask, ModifierTracker};
pub use scheduler::{Bucket, FlushScheduler};
