//! Demonstration of the keytally counting pipeline, no input devices needed.
//!
//! This example shows how to:
//! 1. Build a scripted event source
//! 2. Run events through the counter engine
//! 3. Flush counts into a SQLite store
//! 4. Print the report and the heatmap
//!
//! Run with: cargo run --example replay_demo

use std::time::Duration;

use chrono::Local;
use keytally::{
    core::{Bucket, CounterEngine, ModifierTracker},
    heatmap::render_heatmap,
    keymap,
    report::{print_report, ScreenGeometry},
    source::{EventSource, InputEvent, ScriptedSource},
    store::Store,
    VERSION,
};

fn main() {
    println!("keytally v{VERSION} - Replay Demo");
    println!("================================");
    println!();

    // Build a short scripted session: "Hello" with a held shift, a
    // Ctrl+C, a few clicks, a wheel spin and a pointer sweep.
    let mut script = Vec::new();

    tap(&mut script, 42, &[35]); // Shift+H
    for code in [18, 38, 38, 24] {
        tap(&mut script, 0, &[code]); // e, l, l, o
    }
    tap(&mut script, 29, &[46]); // Ctrl+C

    let left = keymap::resolve(272);
    for _ in 0..3 {
        script.push(InputEvent::button_press(left));
        script.push(InputEvent::button_release(left));
    }
    for _ in 0..4 {
        script.push(InputEvent::Scroll { delta: -1 });
    }
    script.push(InputEvent::PointerMove { x: 0, y: 0 });
    script.push(InputEvent::PointerMove { x: 1920, y: 0 });
    script.push(InputEvent::PointerMove { x: 1920, y: 1080 });

    println!("Replaying {} scripted events...", script.len());
    println!();

    // Run the whole script through the engine.
    let mut source = ScriptedSource::new(script);
    source.start().expect("failed to start scripted source");

    let mut engine = CounterEngine::new(ModifierTracker::default());
    while let Some(event) = source.poll_event(Duration::ZERO) {
        engine.apply(&event);
    }

    // Flush into a throwaway store.
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("replay.db");
    let mut store = Store::open(&path).expect("failed to open store");
    store
        .write_batch(Bucket::of(Local::now()), &engine.drain())
        .expect("failed to flush counts");

    // A typical 24" 1080p panel, so the distance prints in real meters.
    let geometry = ScreenGeometry {
        width_px: 1920.0,
        height_px: 1080.0,
        width_mm: 531.0,
        height_mm: 299.0,
    };

    println!("=== Report ===");
    print_report(&store, &geometry, Local::now()).expect("report failed");
    println!();

    println!("=== Heatmap ===");
    render_heatmap(&store).expect("heatmap failed");
    println!();
    println!("Demo complete!");
}

/// Press `key` while `modifier` (scancode, 0 for none) is held.
fn tap(script: &mut Vec<InputEvent>, modifier: u16, keys: &[u16]) {
    if modifier != 0 {
        script.push(InputEvent::key_press(keymap::resolve(modifier)));
    }
    for &code in keys {
        let key = keymap::resolve(code);
        script.push(InputEvent::key_press(key));
        script.push(InputEvent::key_release(key));
    }
    if modifier != 0 {
        script.push(InputEvent::key_release(keymap::resolve(modifier)));
    }
}
