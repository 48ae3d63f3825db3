//! Linux event source backed by evdev.
//!
//! Discovery scans `/dev/input` for keyboard and pointer devices; each gets
//! a capture thread reading in non-blocking mode and forwarding into a
//! bounded channel. All threads integrate relative motion into one shared
//! synthetic cursor, so downstream only ever sees position samples from a
//! single coordinate space.

use std::io;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use evdev::{Device, EventType, InputEventKind, Key, RelativeAxisType};
use tracing::{debug, info, warn};

use crate::keymap;
use crate::source::types::{InputEvent, SourceError};
use crate::source::EventSource;

const CHANNEL_CAPACITY: usize = 10_000;
const READ_POLL: Duration = Duration::from_millis(10);
const ERROR_BACKOFF: Duration = Duration::from_millis(250);
const DISCOVERY_RETRY: Duration = Duration::from_secs(2);
const MAX_CONSECUTIVE_ERRORS: u32 = 5;

/// Synthetic cursor shared by every reader thread; all devices integrate
/// relative motion into the same coordinate pair.
struct SharedCursor {
    x: AtomicI32,
    y: AtomicI32,
}

impl SharedCursor {
    fn new() -> Self {
        Self {
            x: AtomicI32::new(0),
            y: AtomicI32::new(0),
        }
    }

    fn nudge_x(&self, delta: i32) -> (i32, i32) {
        (fetch_saturating_add(&self.x, delta), self.y.load(Ordering::SeqCst))
    }

    fn nudge_y(&self, delta: i32) -> (i32, i32) {
        (self.x.load(Ordering::SeqCst), fetch_saturating_add(&self.y, delta))
    }

    fn set_x(&self, value: i32) -> (i32, i32) {
        self.x.store(value, Ordering::SeqCst);
        (value, self.y.load(Ordering::SeqCst))
    }

    fn set_y(&self, value: i32) -> (i32, i32) {
        self.y.store(value, Ordering::SeqCst);
        (self.x.load(Ordering::SeqCst), value)
    }
}

/// Saturating counterpart of `fetch_add`; returns the updated value.
fn fetch_saturating_add(axis: &AtomicI32, delta: i32) -> i32 {
    let mut current = axis.load(Ordering::SeqCst);
    loop {
        let next = current.saturating_add(delta);
        match axis.compare_exchange_weak(current, next, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(_) => return next,
            Err(seen) => current = seen,
        }
    }
}

/// Captures key, button, motion and wheel events from evdev devices.
pub struct EvdevSource {
    sender: Sender<InputEvent>,
    receiver: Receiver<InputEvent>,
    running: Arc<AtomicBool>,
    active_readers: Arc<AtomicUsize>,
    cursor: Arc<SharedCursor>,
    started: bool,
}

impl EvdevSource {
    pub fn new() -> Self {
        let (sender, receiver) = bounded(CHANNEL_CAPACITY);
        Self {
            sender,
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            active_readers: Arc::new(AtomicUsize::new(0)),
            cursor: Arc::new(SharedCursor::new()),
            started: false,
        }
    }
}

impl Default for EvdevSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for EvdevSource {
    fn start(&mut self) -> Result<(), SourceError> {
        if self.started {
            return Err(SourceError::AlreadyRunning);
        }
        self.started = true;
        self.running.store(true, Ordering::SeqCst);

        let sender = self.sender.clone();
        let running = Arc::clone(&self.running);
        let active = Arc::clone(&self.active_readers);
        let cursor = Arc::clone(&self.cursor);
        thread::spawn(move || run_supervisor(sender, running, active, cursor));
        Ok(())
    }

    fn listening(&self) -> bool {
        self.active_readers.load(Ordering::SeqCst) > 0
    }

    fn poll_event(&mut self, timeout: Duration) -> Option<InputEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    fn stop_listening(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.started = false;
    }
}

/// Whether at least one input device can be opened right now. The source
/// keeps retrying either way; this only exists so startup can warn early.
pub fn check_device_access() -> bool {
    evdev::enumerate().next().is_some()
}

/// Scans until at least one device shows up, spawns one reader per device,
/// then exits. Devices plugged in later are not picked up.
fn run_supervisor(
    sender: Sender<InputEvent>,
    running: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
    cursor: Arc<SharedCursor>,
) {
    loop {
        if !running.load(Ordering::SeqCst) {
            return;
        }

        let devices = discover_devices();
        if devices.is_empty() {
            warn!("no readable input devices found (is this user in the 'input' group?); retrying");
            thread::sleep(DISCOVERY_RETRY);
            continue;
        }

        info!(devices = devices.len(), "capturing input events");
        for (path, device) in devices {
            if let Err(e) = set_nonblocking(&device) {
                warn!(device = %path.display(), error = %e, "cannot set non-blocking mode, skipping");
                continue;
            }
            debug!(device = %path.display(), name = device.name().unwrap_or("?"), "reading device");

            active.fetch_add(1, Ordering::SeqCst);
            let sender = sender.clone();
            let running = Arc::clone(&running);
            let active = Arc::clone(&active);
            let cursor = Arc::clone(&cursor);
            thread::spawn(move || {
                run_reader(device, path, sender, running, cursor);
                active.fetch_sub(1, Ordering::SeqCst);
            });
        }
        return;
    }
}

fn discover_devices() -> Vec<(PathBuf, Device)> {
    evdev::enumerate()
        .filter(|(_, device)| is_keyboard(device) || is_pointer(device))
        .collect()
}

fn is_keyboard(device: &Device) -> bool {
    device.supported_events().contains(EventType::KEY)
        && device
            .supported_keys()
            .map_or(false, |keys| keys.contains(Key::KEY_A) || keys.contains(Key::KEY_ENTER))
}

fn is_pointer(device: &Device) -> bool {
    device.supported_events().contains(EventType::RELATIVE)
        || device
            .supported_keys()
            .map_or(false, |keys| keys.contains(Key::BTN_LEFT))
}

fn set_nonblocking(device: &Device) -> io::Result<()> {
    let fd = device.as_raw_fd();
    // SAFETY: fd stays owned by `device` for both calls.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    let result = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn run_reader(
    mut device: Device,
    path: PathBuf,
    sender: Sender<InputEvent>,
    running: Arc<AtomicBool>,
    cursor: Arc<SharedCursor>,
) {
    let mut consecutive_errors = 0u32;

    while running.load(Ordering::SeqCst) {
        match device.fetch_events() {
            Ok(events) => {
                consecutive_errors = 0;
                for event in events {
                    if let Some(mapped) = map_event(event.kind(), event.value(), &cursor) {
                        // Drop on backpressure; the loop will catch up.
                        let _ = sender.try_send(mapped);
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(READ_POLL);
            }
            Err(e) => {
                consecutive_errors += 1;
                if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    warn!(device = %path.display(), error = %e, "giving up on device");
                    return;
                }
                warn!(
                    device = %path.display(),
                    error = %e,
                    attempt = consecutive_errors,
                    "read failed"
                );
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
}

fn map_event(kind: InputEventKind, value: i32, cursor: &SharedCursor) -> Option<InputEvent> {
    match kind {
        InputEventKind::Key(key) => {
            // 0 release, 1 press, 2 auto-repeat; repeats are not presses.
            if value > 1 {
                return None;
            }
            let code = key.code();
            let resolved = keymap::resolve(code);
            if keymap::is_button(code) {
                Some(InputEvent::Button {
                    code: resolved,
                    pressed: value == 1,
                })
            } else {
                Some(InputEvent::Key {
                    code: resolved,
                    pressed: value == 1,
                })
            }
        }
        InputEventKind::RelAxis(axis) => {
            if axis == RelativeAxisType::REL_X {
                let (x, y) = cursor.nudge_x(value);
                Some(InputEvent::PointerMove { x, y })
            } else if axis == RelativeAxisType::REL_Y {
                let (x, y) = cursor.nudge_y(value);
                Some(InputEvent::PointerMove { x, y })
            } else if axis == RelativeAxisType::REL_WHEEL {
                Some(InputEvent::Scroll { delta: value })
            } else {
                None
            }
        }
        InputEventKind::AbsAxis(axis) => {
            if axis == evdev::AbsoluteAxisType::ABS_X {
                let (x, y) = cursor.set_x(value);
                Some(InputEvent::PointerMove { x, y })
            } else if axis == evdev::AbsoluteAxisType::ABS_Y {
                let (x, y) = cursor.set_y(value);
                Some(InputEvent::PointerMove { x, y })
            } else {
                None
            }
        }
        _ => None,
    }
}
