//! keytally - durable per-key, per-modifier input statistics.
//!
//! This library ingests live input events (key and button presses, pointer
//! motion, wheel steps) and maintains hourly aggregate counters in SQLite:
//! per-key and per-button press counts split by the modifier combination
//! held at press time, plus cumulative pointer travel per hour.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                         keytally                           │
//! ├────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌────────┐  │
//! │  │  Source  │──▶│ Classify │──▶│  Buffer  │──▶│ Store  │  │
//! │  │  (evdev) │   │ (+ mask) │   │ (in-mem) │   │(sqlite)│  │
//! │  └──────────┘   └──────────┘   └──────────┘   └────────┘  │
//! │                      │              ▲                      │
//! │                      ▼              │                      │
//! │                ┌──────────┐   ┌──────────┐                 │
//! │                │ Modifier │   │Scheduler │                 │
//! │                │ Tracker  │   │ (bucket) │                 │
//! │                └──────────┘   └──────────┘                 │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use keytally::core::{CounterEngine, ModifierTracker};
//! use keytally::source::{EventSource, ScriptedSource, InputEvent, KeyCode};
//!
//! let mut engine = CounterEngine::new(ModifierTracker::default());
//! let mut source = ScriptedSource::new([
//!     InputEvent::key_press(KeyCode::named("KEY_A", 30)),
//! ]);
//! source.start().expect("scripted sources always start");
//! while let Some(event) = source.poll_event(std::time::Duration::ZERO) {
//!     engine.apply(&event);
//! }
//! let batch = engine.drain();
//! assert_eq!(batch.keyboard.len(), 1);
//! ```

pub mod config;
pub mod core;
pub mod heatmap;
pub mod keymap;
pub mod report;
pub mod source;
pub mod store;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError, ScreenConfig};
pub use core::{
    AggregationBuffer, Bucket, CounterEngine, CounterTable, FlushBatch, FlushScheduler,
    ModifierMask, ModifierTracker,
};
pub use report::{GeometryProvider, ScreenGeometry};
pub use source::{EventSource, InputEvent, KeyCode, PlatformSource, SourceError};
pub use store::{Store, StoreError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
