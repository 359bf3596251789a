use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use log::{info, warn};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::constants::{BYTES_PER_MB, PROGRESS_MIN_INTERVAL, PROGRESS_MIN_PERCENT_STEP};
use crate::models::ProgressEvent;

/// Receives throttled progress events.
///
/// Called while the tracker holds its lock, so implementations must return
/// quickly. A panicking observer is caught and logged; the transfer goes on.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

/// Logs progress through the `log` facade.
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn on_progress(&self, event: &ProgressEvent) {
        info!(
            "Progress: {}% ({:.1}/{:.1} MB)",
            event.percent,
            event.bytes_read as f64 / BYTES_PER_MB,
            event.total_bytes as f64 / BYTES_PER_MB
        );
    }
}

/// Forwards progress to a channel without waiting.
///
/// Events are dropped when the channel is full or closed.
pub struct ChannelObserver {
    sender: mpsc::Sender<ProgressEvent>,
}

impl ChannelObserver {
    pub fn new(sender: mpsc::Sender<ProgressEvent>) -> Self {
        ChannelObserver { sender }
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&self, event: &ProgressEvent) {
        let _ = self.sender.try_send(*event);
    }
}

/// Discards all progress.
pub struct NullObserver;

impl ProgressObserver for NullObserver {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

struct ProgressState {
    job_id: Uuid,
    bytes_read: u64,
    total_bytes: u64,
    last_emitted_percent: u8,
    last_emitted_at: Instant,
    emitted_final: bool,
}

impl ProgressState {
    fn percent(&self) -> u8 {
        if self.total_bytes == 0 {
            return 100;
        }
        let percent = (self.bytes_read as u128 * 100) / self.total_bytes as u128;
        percent.min(100) as u8
    }

    fn event(&self) -> ProgressEvent {
        ProgressEvent {
            job_id: self.job_id,
            percent: self.percent(),
            bytes_read: self.bytes_read,
            total_bytes: self.total_bytes,
        }
    }
}

/// Byte counter for one job with throttled emission.
///
/// An event is emitted when the integer percentage has grown by at least
/// [`PROGRESS_MIN_PERCENT_STEP`] since the last event, or when
/// [`PROGRESS_MIN_INTERVAL`] has passed since then. Counting and the emit
/// decision happen under one lock, so concurrent part uploads see a single
/// non-decreasing sequence.
pub struct ProgressTracker {
    observer: Arc<dyn ProgressObserver>,
    state: Mutex<ProgressState>,
}

impl ProgressTracker {
    pub fn new(job_id: Uuid, total_bytes: u64, observer: Arc<dyn ProgressObserver>) -> Self {
        ProgressTracker {
            observer,
            state: Mutex::new(ProgressState {
                job_id,
                bytes_read: 0,
                total_bytes,
                last_emitted_percent: 0,
                last_emitted_at: Instant::now(),
                emitted_final: false,
            }),
        }
    }

    /// Count `bytes` more and emit if the throttle allows.
    pub fn record(&self, bytes: u64) -> Option<ProgressEvent> {
        self.record_at(bytes, Instant::now())
    }

    pub fn record_at(&self, bytes: u64, now: Instant) -> Option<ProgressEvent> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.bytes_read = state.bytes_read.saturating_add(bytes).min(state.total_bytes);

        let percent = state.percent();
        let step_reached = percent >= state.last_emitted_percent.saturating_add(PROGRESS_MIN_PERCENT_STEP);
        let interval_reached = now.saturating_duration_since(state.last_emitted_at) >= PROGRESS_MIN_INTERVAL;
        if !(step_reached || interval_reached) {
            return None;
        }

        state.last_emitted_percent = percent;
        state.last_emitted_at = now;
        state.emitted_final = percent == 100;
        let event = state.event();
        self.notify(&event);
        Some(event)
    }

    /// Emit the 100% event for a finished job unless it was already sent.
    pub fn finish(&self) -> Option<ProgressEvent> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.bytes_read = state.total_bytes;
        if state.emitted_final {
            return None;
        }

        state.last_emitted_percent = 100;
        state.last_emitted_at = Instant::now();
        state.emitted_final = true;
        let event = state.event();
        self.notify(&event);
        Some(event)
    }

    pub fn bytes_read(&self) -> u64 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).bytes_read
    }

    pub fn percent(&self) -> u8 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).percent()
    }

    fn notify(&self, event: &ProgressEvent) {
        let observer = &self.observer;
        if catch_unwind(AssertUnwindSafe(|| observer.on_progress(event))).is_err() {
            warn!("Progress observer panicked for job {}; continuing", event.job_id);
        }
    }
}
