use parking_lot::{Condvar, Mutex, MutexGuard};
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::source::{FileLineSource, LineSource};

/// Polling intervals for the tailer worker
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TailerConfig {
    /// Longest stretch spent forwarding lines before the idle wait
    pub slice: Duration,

    /// Wait between polling slices
    pub idle_timeout: Duration,

    /// While the view is inactive, the gate is re-checked every
    /// `idle_timeout / inactive_divisor`
    pub inactive_divisor: u32,
}

impl TailerConfig {
    pub fn inactive_wait(&self) -> Duration {
        self.idle_timeout / self.inactive_divisor.max(1)
    }
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            slice: Duration::from_millis(200),
            idle_timeout: Duration::from_millis(200),
            inactive_divisor: 4,
        }
    }
}

/// Host predicate: is the log view currently visible
pub type ActivityGate = Arc<dyn Fn() -> bool + Send + Sync>;

/// Gate for hosts without a notion of visibility
pub fn always_active() -> ActivityGate {
    Arc::new(|| true)
}

/// Receives lines from the tailer worker, in file order
pub trait LineSink: Send + 'static {
    /// Returns false once the receiving side has gone away
    fn forward(&mut self, line: String) -> bool;
}

impl LineSink for mpsc::UnboundedSender<String> {
    fn forward(&mut self, line: String) -> bool {
        self.send(line).is_ok()
    }
}

/// Lifecycle of the tailer worker
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TailerState {
    Starting,
    Polling,
    Stopping,
    Stopped,
}

struct Control {
    state: TailerState,

    /// Set by the first stop request; the flag is whether to flush
    stop: Option<bool>,
}

struct Shared {
    control: Mutex<Control>,
    wakeup: Condvar,
}

impl Shared {
    fn new(state: TailerState) -> Self {
        Self {
            control: Mutex::new(Control { state, stop: None }),
            wakeup: Condvar::new(),
        }
    }

    fn set_state(&self, state: TailerState) {
        self.control.lock().state = state;
    }

    fn stop_requested(&self) -> Option<bool> {
        self.control.lock().stop
    }

    /// Idle between slices. Returns the flush flag if a stop arrived.
    fn wait_idle(&self, config: &TailerConfig, gate: &ActivityGate) -> Option<bool> {
        let mut control = self.control.lock();
        if control.stop.is_none() {
            self.wakeup.wait_for(&mut control, config.idle_timeout);
        }
        loop {
            if let Some(flush) = control.stop {
                return Some(flush);
            }
            if MutexGuard::unlocked(&mut control, || gate()) {
                return None;
            }
            self.wakeup.wait_for(&mut control, config.inactive_wait());
        }
    }
}

/// Follows a line source on a dedicated worker thread
///
/// Lines are handed to the sink as they are read. Stopping is cooperative:
/// the worker notices at the next line or wakes from its idle wait, then
/// optionally drains what is left before closing the source.
pub struct LogTailer {
    shared: Arc<Shared>,

    /// Worker thread handle, taken by the first `stop`
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl LogTailer {
    /// Start tailing a source
    pub fn spawn<S, K>(source: S, config: TailerConfig, gate: ActivityGate, sink: K) -> std::io::Result<Self>
    where
        S: LineSource + 'static,
        K: LineSink,
    {
        let shared = Arc::new(Shared::new(TailerState::Starting));
        let worker = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("log-tailer".to_string())
                .spawn(move || run(&shared, source, sink, config, &gate))?
        };

        Ok(Self {
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Open a file and start tailing it
    ///
    /// If the file cannot be opened or the worker cannot start, the error is
    /// logged and a stopped tailer is returned.
    pub fn open<K: LineSink>(
        path: &Path,
        skip_existing: bool,
        config: TailerConfig,
        gate: ActivityGate,
        sink: K,
    ) -> Self {
        let source = match FileLineSource::open(path, skip_existing) {
            Ok(source) => source,
            Err(e) => {
                warn!(error = %e, "Tailing disabled");
                return Self::disabled();
            }
        };
        match Self::spawn(source, config, gate, sink) {
            Ok(tailer) => tailer,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to start tailer thread");
                Self::disabled()
            }
        }
    }

    /// A tailer with no source; every operation is a no-op
    pub fn disabled() -> Self {
        Self {
            shared: Arc::new(Shared::new(TailerState::Stopped)),
            worker: Mutex::new(None),
        }
    }

    /// Stop the worker and wait for it to exit
    ///
    /// With `flush`, every line still in the source is forwarded before the
    /// source is closed. Only the first call decides whether to flush; later
    /// calls return once the worker is gone.
    pub fn stop(&self, flush: bool) {
        {
            let mut control = self.shared.control.lock();
            if control.stop.is_none() {
                control.stop = Some(flush);
            }
            self.shared.wakeup.notify_all();
        }

        let mut worker = self.worker.lock();
        if let Some(handle) = worker.take() {
            if handle.join().is_err() {
                error!("Tailer worker panicked");
            }
        }
    }

    pub fn state(&self) -> TailerState {
        self.shared.control.lock().state
    }

    /// Check if the worker is still following the source
    pub fn is_running(&self) -> bool {
        matches!(self.state(), TailerState::Starting | TailerState::Polling)
    }
}

impl Drop for LogTailer {
    fn drop(&mut self) {
        self.stop(false);
    }
}

fn run<S: LineSource, K: LineSink>(
    shared: &Shared,
    mut source: S,
    mut sink: K,
    config: TailerConfig,
    gate: &ActivityGate,
) {
    shared.set_state(TailerState::Polling);
    debug!("Tailer polling");

    let flush = 'poll: loop {
        let deadline = Instant::now() + config.slice;
        while Instant::now() < deadline {
            if let Some(flush) = shared.stop_requested() {
                break 'poll flush;
            }
            match source.try_read_line() {
                Ok(Some(line)) => {
                    if !sink.forward(line) {
                        debug!("Line receiver closed, stopping tailer");
                        break 'poll false;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Error reading log source");
                    break;
                }
            }
        }

        if let Some(flush) = shared.wait_idle(&config, gate) {
            break flush;
        }
    };

    shared.set_state(TailerState::Stopping);
    if flush {
        match source.drain_remaining() {
            Ok(lines) => {
                debug!(count = lines.len(), "Flushing remaining lines");
                for line in lines {
                    if !sink.forward(line) {
                        break;
                    }
                }
            }
            Err(e) => warn!(error = %e, "Error flushing log source"),
        }
    }
    source.close();
    shared.set_state(TailerState::Stopped);
    debug!("Tailer stopped");
}
