//! keytally CLI
//!
//! Counts key and button presses per held-modifier combination, plus
//! pointer travel, into hourly buckets in a SQLite store.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use keytally::{
    config::Config,
    core::{Bucket, CounterEngine, FlushScheduler, ModifierTracker},
    heatmap::render_heatmap,
    report::{print_report, ConfigGeometry},
    source::{check_device_access, EventSource, PlatformSource},
    store::Store,
    VERSION,
};
use tracing::{debug, error, info};

#[derive(Parser)]
#[command(name = "keytally")]
#[command(version = VERSION)]
#[command(about = "Per-key, per-modifier input statistics in SQLite", long_about = None)]
struct Cli {
    /// SQLite store file (defaults to the configured path, ~/.keytally.db)
    #[arg(long, value_name = "PATH")]
    storepath: Option<PathBuf>,

    /// Print top keys, top buttons and the current-hour pointer distance
    #[arg(long)]
    report: bool,

    /// Render a keyboard heatmap from the stored counters
    #[arg(long)]
    heatmap: bool,

    /// Delete stored counters for the current hour
    #[arg(long)]
    zero_hour: bool,

    /// Delete stored counters for the current day
    #[arg(long)]
    zero_day: bool,

    /// Delete the store file entirely
    #[arg(long)]
    zero_all: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config = Config::load().unwrap_or_default();
    let store_path = config.resolved_store_path(cli.storepath.as_deref());

    // One action per invocation; first match wins.
    if cli.report {
        cmd_report(&store_path, &config)
    } else if cli.heatmap {
        cmd_heatmap(&store_path)
    } else if cli.zero_hour {
        cmd_zero_hour(&store_path)
    } else if cli.zero_day {
        cmd_zero_day(&store_path)
    } else if cli.zero_all {
        cmd_zero_all(&store_path)
    } else {
        run_counting(&store_path, &config)
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("keytally={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .compact()
        .init();
}

fn cmd_report(store_path: &Path, config: &Config) -> Result<()> {
    let store = Store::open(store_path)
        .with_context(|| format!("opening store {}", store_path.display()))?;
    let geometry = ConfigGeometry::new(config.screen);
    print_report(&store, &geometry, Local::now())?;
    Ok(())
}

fn cmd_heatmap(store_path: &Path) -> Result<()> {
    let store = Store::open(store_path)
        .with_context(|| format!("opening store {}", store_path.display()))?;
    render_heatmap(&store)?;
    Ok(())
}

fn cmd_zero_hour(store_path: &Path) -> Result<()> {
    let mut store = Store::open(store_path)
        .with_context(|| format!("opening store {}", store_path.display()))?;
    let bucket = Bucket::of(Local::now());
    store.clear_hour(bucket)?;
    println!("Cleared counters for {bucket}.");
    Ok(())
}

fn cmd_zero_day(store_path: &Path) -> Result<()> {
    let mut store = Store::open(store_path)
        .with_context(|| format!("opening store {}", store_path.display()))?;
    let today = Local::now().date_naive();
    store.clear_day(today)?;
    println!("Cleared counters for {today}.");
    Ok(())
}

fn cmd_zero_all(store_path: &Path) -> Result<()> {
    Store::destroy(store_path)?;
    println!("Removed {}.", store_path.display());
    Ok(())
}

fn run_counting(store_path: &Path, config: &Config) -> Result<()> {
    println!("keytally v{VERSION}");
    println!();

    if !check_device_access() {
        eprintln!("Warning: no input devices are accessible; will keep retrying.");
        eprintln!("On Linux, add this user to the 'input' group to read /dev/input.");
    }

    let mut store = Store::open(store_path)
        .with_context(|| format!("opening store {}", store_path.display()))?;

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc_handler(r)?;

    let mut source = PlatformSource::new();
    source.start().context("starting event source")?;

    // Capture can come up asynchronously; wait for it, but stay
    // interruptible.
    while !source.listening() {
        if !running.load(Ordering::SeqCst) {
            source.stop_listening();
            return Ok(());
        }
        thread::sleep(Duration::from_secs(1));
    }

    println!("Counting into {}", store_path.display());
    println!("Flushing every {}s (or at the hour boundary)", config.flush_interval_secs);
    println!();
    println!("Press Ctrl+C to stop");

    let mut engine = CounterEngine::new(ModifierTracker::default());
    let mut scheduler = FlushScheduler::new(Local::now(), config.flush_interval());
    info!(bucket = %scheduler.bucket(), "counting started");

    let idle = config.idle_poll();
    while running.load(Ordering::SeqCst) {
        if let Some(event) = source.poll_event(idle) {
            engine.apply(&event);
        }

        if scheduler.flush_due(Local::now()) {
            flush_counts(&mut engine, &mut store, scheduler.bucket());
            scheduler.note_flushed(Local::now());
            debug!(bucket = %scheduler.bucket(), "next bucket");
        }
    }

    println!();
    println!("Stopping...");
    source.stop_listening();
    flush_counts(&mut engine, &mut store, scheduler.bucket());
    info!("final flush complete");

    Ok(())
}

/// Drain the engine into the store. On failure the batch goes back into
/// the buffer; merges are monotone, so the retry at the next deadline
/// writes correct totals.
fn flush_counts(engine: &mut CounterEngine, store: &mut Store, bucket: Bucket) {
    let batch = engine.drain();
    if batch.is_empty() {
        return;
    }
    if let Err(e) = store.write_batch(bucket, &batch) {
        error!(error = %e, "flush failed; keeping counts buffered for retry");
        engine.absorb(batch);
    }
}

fn ctrlc_handler(running: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl-C handler")?;
    Ok(())
}
