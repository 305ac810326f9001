//! The single lane between request handlers and the host input injector.
//!
//! # Why one lane? (for beginners)
//!
//! Many HTTP requests are handled in parallel, but OS input APIs are not safe
//! to call from several threads at once.  So handlers never call the
//! [`InputInjector`] themselves.  They push a [`DispatchJob`] onto a bounded
//! queue, and one dedicated OS thread pops jobs and applies them in order:
//!
//! ```text
//!  handler ─┐
//!  handler ─┼─► [ bounded mpsc queue ] ─► dispatcher thread ─► InputInjector
//!  handler ─┘         try_send                blocking_recv
//! ```
//!
//! - `try_send` never waits, so a slow injector cannot stall a request.  When
//!   the queue is full the job is dropped with [`DispatchError::QueueFull`].
//! - Jobs are applied in the order they were enqueued.  Callers that enqueue
//!   while holding their session lock therefore get per-session FIFO.
//! - Once enqueued a job is never cancelled; input injection has no undo.
//!
//! # Fractional deltas
//!
//! The interpreter produces `f64` deltas but injectors take whole pixels and
//! wheel lines.  The worker keeps the fractional remainder of each axis and
//! adds it to the next delta, so slow finger motion is not rounded away.
//!
//! Remainders are kept per session, so one phone's leftover fraction never
//! moves the cursor for another.  [`InjectorDispatcher::forget`] clears a
//! session's remainders; it travels through the same queue as the jobs, so
//! it takes effect exactly between the jobs queued before and after it.
//! Non-finite deltas are ignored and never reach a remainder.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use trackpad_core::InputAction;
use uuid::Uuid;

use super::event_log::EventLog;
use super::inject::{InjectorError, InputInjector};

/// One action on its way to the injector.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchJob {
    pub session_id: Uuid,
    /// Per-session sequence number, for diagnostics.
    pub seq: u64,
    pub action: InputAction,
}

/// Sessions with remainders the worker tracks before it starts over.  Only
/// reached when sessions end while the queue is too full to carry `forget`.
const MAX_TRACKED_SESSIONS: usize = 4096;

/// Error type for [`InjectorDispatcher`].
///
/// The queueing variants hand the rejected job back, like
/// `tokio::sync::mpsc::error::TrySendError` does.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The queue is at capacity; the job was not queued.
    #[error("dispatch queue full, action dropped")]
    QueueFull(DispatchJob),
    /// The dispatcher has been shut down.
    #[error("dispatcher is shut down")]
    Closed(DispatchJob),
    /// The worker thread could not be started.
    #[error("failed to spawn dispatcher thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl DispatchError {
    /// The job that was not queued, if this error carries one.
    pub fn into_job(self) -> Option<DispatchJob> {
        match self {
            DispatchError::QueueFull(job) | DispatchError::Closed(job) => Some(job),
            DispatchError::Spawn(_) => None,
        }
    }
}

/// What travels through the queue.
#[derive(Debug)]
enum Message {
    Apply(DispatchJob),
    Forget(Uuid),
}

/// Owns the dispatch queue and its worker thread.
pub struct InjectorDispatcher {
    tx: Mutex<Option<mpsc::Sender<Message>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    capacity: usize,
    applied: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl std::fmt::Debug for InjectorDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectorDispatcher")
            .field("capacity", &self.capacity)
            .field("applied", &self.applied())
            .field("failed", &self.failed())
            .finish()
    }
}

impl InjectorDispatcher {
    /// Starts the worker thread.
    ///
    /// Injector failures are recorded in `log` at error level; the failing
    /// action is dropped and the worker moves on.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Spawn`] if the OS refuses to create the thread.
    pub fn start(
        injector: Arc<dyn InputInjector>,
        log: Arc<EventLog>,
        capacity: usize,
    ) -> Result<Self, DispatchError> {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let applied = Arc::new(AtomicU64::new(0));
        let failed = Arc::new(AtomicU64::new(0));

        let worker = {
            let applied = Arc::clone(&applied);
            let failed = Arc::clone(&failed);
            std::thread::Builder::new()
                .name("trackpad-dispatch".to_string())
                .spawn(move || dispatch_loop(rx, injector, log, applied, failed))
                .map_err(DispatchError::Spawn)?
        };

        debug!(capacity, "injector dispatcher started");
        Ok(Self {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            capacity,
            applied,
            failed,
        })
    }

    /// Queues a job without waiting.
    ///
    /// # Errors
    ///
    /// [`DispatchError::QueueFull`] when the queue is at capacity and
    /// [`DispatchError::Closed`] after [`shutdown`](Self::shutdown).  Both
    /// carry `job` back to the caller.
    pub fn enqueue(&self, job: DispatchJob) -> Result<(), DispatchError> {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = tx.as_ref() else {
            return Err(DispatchError::Closed(job));
        };
        let result = match tx.try_reserve() {
            Ok(permit) => {
                permit.send(Message::Apply(job));
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(())) => Err(DispatchError::QueueFull(job)),
            Err(mpsc::error::TrySendError::Closed(())) => Err(DispatchError::Closed(job)),
        };
        result
    }

    /// Discards the fractional remainders held for `session_id` once every
    /// job queued before this call has been applied.  Call it when a session
    /// ends or starts a new gesture.
    ///
    /// Best effort: when the queue is full or closed nothing is sent.
    pub fn forget(&self, session_id: Uuid) {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let sent = tx
            .as_ref()
            .is_some_and(|tx| tx.try_send(Message::Forget(session_id)).is_ok());
        if !sent {
            debug!(session = %session_id, "remainder reset not queued");
        }
    }

    /// Closes the queue, lets the worker drain what is already queued, and
    /// waits for it to exit.  Blocks the calling thread; from async code call
    /// it through `tokio::task::spawn_blocking`.
    ///
    /// Idempotent.
    pub fn shutdown(&self) {
        drop(self.tx.lock().unwrap_or_else(PoisonError::into_inner).take());
        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                error!("dispatcher thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Jobs waiting in the queue right now.
    pub fn queued(&self) -> usize {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, |tx| tx.max_capacity() - tx.capacity())
    }

    /// Actions the injector accepted.
    pub fn applied(&self) -> u64 {
        self.applied.load(Ordering::Relaxed)
    }

    /// Actions the injector rejected.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

// ── Worker ────────────────────────────────────────────────────────────────────

/// Fractional parts not yet sent to the injector.
#[derive(Debug, Default)]
struct Remainders {
    move_x: f64,
    move_y: f64,
    scroll_x: f64,
    scroll_y: f64,
}

/// Adds `delta` to `carry` and splits off the whole part.  A non-finite
/// `delta` yields 0 and leaves `carry` unchanged.
fn take_whole(carry: &mut f64, delta: f64) -> i32 {
    if !delta.is_finite() {
        return 0;
    }
    *carry += delta;
    let whole = carry.trunc();
    *carry -= whole;
    // Out-of-range values saturate; the request layer bounds inputs well below.
    whole as i32
}

fn dispatch_loop(
    mut rx: mpsc::Receiver<Message>,
    injector: Arc<dyn InputInjector>,
    log: Arc<EventLog>,
    applied: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
) {
    let mut remainders: HashMap<Uuid, Remainders> = HashMap::new();

    while let Some(message) = rx.blocking_recv() {
        let job = match message {
            Message::Apply(job) => job,
            Message::Forget(session_id) => {
                remainders.remove(&session_id);
                continue;
            }
        };
        if remainders.len() >= MAX_TRACKED_SESSIONS && !remainders.contains_key(&job.session_id) {
            remainders.clear();
        }
        let carry = remainders.entry(job.session_id).or_default();
        match apply(injector.as_ref(), carry, &job.action) {
            Ok(()) => {
                applied.fetch_add(1, Ordering::Relaxed);
                debug!(session = %job.session_id, seq = job.seq, action = %job.action, "applied");
            }
            Err(e) => {
                failed.fetch_add(1, Ordering::Relaxed);
                log.error(format!("Dropped {}: {e}", job.action));
            }
        }
    }

    info!("injector dispatcher stopped");
}

fn apply(
    injector: &dyn InputInjector,
    carry: &mut Remainders,
    action: &InputAction,
) -> Result<(), InjectorError> {
    match action {
        InputAction::MoveBy { dx, dy } => {
            let x = take_whole(&mut carry.move_x, *dx);
            let y = take_whole(&mut carry.move_y, *dy);
            if x != 0 || y != 0 {
                injector.move_cursor_by(x, y)?;
            }
            Ok(())
        }
        InputAction::Click(button) => injector.click(*button),
        InputAction::ScrollBy { dx, dy } => {
            let x = take_whole(&mut carry.scroll_x, *dx);
            let y = take_whole(&mut carry.scroll_y, *dy);
            if x != 0 || y != 0 {
                injector.scroll(x, y)?;
            }
            Ok(())
        }
        InputAction::ZoomBy { factor } => injector.zoom(*factor),
        InputAction::KeyPress(chord) => injector.press_key(chord),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use trackpad_core::{KeyChord, MouseButton};

    use super::*;
    use crate::application::event_log::LogLevel;
    use crate::infrastructure::injector::{InjectedCall, RecordingInjector};

    fn job(seq: u64, action: InputAction) -> DispatchJob {
        job_for(Uuid::nil(), seq, action)
    }

    fn job_for(session_id: Uuid, seq: u64, action: InputAction) -> DispatchJob {
        DispatchJob {
            session_id,
            seq,
            action,
        }
    }

    fn start(injector: &Arc<RecordingInjector>, log: &Arc<EventLog>) -> InjectorDispatcher {
        InjectorDispatcher::start(
            Arc::clone(injector) as Arc<dyn InputInjector>,
            Arc::clone(log),
            64,
        )
        .unwrap()
    }

    #[test]
    fn test_take_whole_carries_fraction() {
        let mut carry = 0.0;
        assert_eq!(take_whole(&mut carry, 0.6), 0);
        assert_eq!(take_whole(&mut carry, 0.6), 1);
        assert!((carry - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_take_whole_negative_truncates_toward_zero() {
        let mut carry = 0.0;
        assert_eq!(take_whole(&mut carry, -1.5), -1);
        assert_eq!(take_whole(&mut carry, -0.5), -1);
    }

    #[test]
    fn test_take_whole_ignores_non_finite_delta() {
        let mut carry = 0.5;
        assert_eq!(take_whole(&mut carry, f64::NAN), 0);
        assert_eq!(take_whole(&mut carry, f64::INFINITY), 0);
        assert_eq!(carry, 0.5);
        assert_eq!(take_whole(&mut carry, 0.5), 1);
    }

    #[test]
    fn test_jobs_are_applied_in_enqueue_order() {
        // Arrange
        let injector = Arc::new(RecordingInjector::new());
        let log = Arc::new(EventLog::new(16));
        let dispatcher = start(&injector, &log);

        // Act
        dispatcher.enqueue(job(0, InputAction::MoveBy { dx: 4.0, dy: 0.0 })).unwrap();
        dispatcher.enqueue(job(1, InputAction::Click(MouseButton::Right))).unwrap();
        dispatcher.enqueue(job(2, InputAction::ScrollBy { dx: 0.0, dy: -2.0 })).unwrap();
        dispatcher.shutdown();

        // Assert
        assert_eq!(
            injector.calls(),
            vec![
                InjectedCall::Move(4, 0),
                InjectedCall::Click(MouseButton::Right),
                InjectedCall::Scroll(0, -2),
            ]
        );
        assert_eq!(dispatcher.applied(), 3);
    }

    #[test]
    fn test_fractional_moves_accumulate() {
        let injector = Arc::new(RecordingInjector::new());
        let log = Arc::new(EventLog::new(16));
        let dispatcher = start(&injector, &log);

        for seq in 0..4 {
            dispatcher.enqueue(job(seq, InputAction::MoveBy { dx: 0.5, dy: 0.0 })).unwrap();
        }
        dispatcher.shutdown();

        assert_eq!(
            injector.calls(),
            vec![InjectedCall::Move(1, 0), InjectedCall::Move(1, 0)]
        );
    }

    #[test]
    fn test_fractions_are_not_shared_between_sessions() {
        // Arrange
        let injector = Arc::new(RecordingInjector::new());
        let log = Arc::new(EventLog::new(16));
        let dispatcher = start(&injector, &log);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        // Act: each phone moves 0.6 px, which is under one pixel for both.
        dispatcher.enqueue(job_for(a, 0, InputAction::MoveBy { dx: 0.6, dy: 0.0 })).unwrap();
        dispatcher.enqueue(job_for(b, 0, InputAction::MoveBy { dx: 0.6, dy: 0.0 })).unwrap();
        dispatcher.enqueue(job_for(a, 1, InputAction::ScrollBy { dx: 0.0, dy: 0.6 })).unwrap();
        dispatcher.enqueue(job_for(b, 1, InputAction::ScrollBy { dx: 0.0, dy: 0.6 })).unwrap();
        dispatcher.shutdown();

        // Assert
        assert!(injector.calls().is_empty());
    }

    #[test]
    fn test_forget_discards_session_fraction() {
        let injector = Arc::new(RecordingInjector::new());
        let log = Arc::new(EventLog::new(16));
        let dispatcher = start(&injector, &log);
        let a = Uuid::new_v4();

        dispatcher.enqueue(job_for(a, 0, InputAction::MoveBy { dx: 0.6, dy: 0.0 })).unwrap();
        dispatcher.forget(a);
        dispatcher.enqueue(job_for(a, 1, InputAction::MoveBy { dx: 0.6, dy: 0.0 })).unwrap();
        dispatcher.shutdown();

        assert!(injector.calls().is_empty());
    }

    #[test]
    fn test_nan_scroll_does_not_swallow_later_scrolls() {
        // Arrange
        let injector = Arc::new(RecordingInjector::new());
        let log = Arc::new(EventLog::new(16));
        let dispatcher = start(&injector, &log);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        // Act
        dispatcher.enqueue(job_for(a, 0, InputAction::ScrollBy { dx: 0.0, dy: f64::NAN })).unwrap();
        dispatcher.enqueue(job_for(a, 1, InputAction::ScrollBy { dx: 0.0, dy: -3.0 })).unwrap();
        dispatcher.enqueue(job_for(b, 0, InputAction::ScrollBy { dx: 0.0, dy: -3.0 })).unwrap();
        dispatcher.shutdown();

        // Assert
        assert_eq!(
            injector.calls(),
            vec![InjectedCall::Scroll(0, -3), InjectedCall::Scroll(0, -3)]
        );
    }

    #[test]
    fn test_zoom_and_key_reach_injector() {
        let injector = Arc::new(RecordingInjector::new());
        let log = Arc::new(EventLog::new(16));
        let dispatcher = start(&injector, &log);

        dispatcher.enqueue(job(0, InputAction::ZoomBy { factor: 2.0 })).unwrap();
        dispatcher
            .enqueue(job(1, InputAction::KeyPress("ctrl+c".parse::<KeyChord>().unwrap())))
            .unwrap();
        dispatcher.shutdown();

        assert_eq!(
            injector.calls(),
            vec![InjectedCall::Zoom(2.0), InjectedCall::Key("ctrl+c".into())]
        );
    }

    #[test]
    fn test_injector_failure_is_logged_and_worker_continues() {
        // Arrange: a failing injector.
        let injector = Arc::new(RecordingInjector::new());
        injector.set_should_fail(true);
        let log = Arc::new(EventLog::new(16));
        let dispatcher = start(&injector, &log);

        // Act
        dispatcher.enqueue(job(0, InputAction::Click(MouseButton::Left))).unwrap();
        dispatcher.enqueue(job(1, InputAction::Click(MouseButton::Left))).unwrap();
        dispatcher.shutdown();

        // Assert: both dropped, both logged at error level.
        assert_eq!(dispatcher.failed(), 2);
        let errors: Vec<_> = log
            .snapshot()
            .into_iter()
            .filter(|e| e.level == LogLevel::Error)
            .collect();
        assert_eq!(errors.len(), 2);
        assert!(injector.calls().is_empty());
    }

    #[test]
    fn test_enqueue_after_shutdown_is_closed() {
        let injector = Arc::new(RecordingInjector::new());
        let log = Arc::new(EventLog::new(16));
        let dispatcher = start(&injector, &log);

        dispatcher.shutdown();
        dispatcher.shutdown();

        let result = dispatcher.enqueue(job(0, InputAction::Click(MouseButton::Left)));
        assert!(matches!(result, Err(DispatchError::Closed(_))));
        assert!(!dispatcher.is_running());
    }

    #[test]
    fn test_full_queue_drops_job() {
        // Arrange: an injector that blocks until released, queue of one.
        let injector = Arc::new(RecordingInjector::new());
        let gate = injector.hold();
        let log = Arc::new(EventLog::new(16));
        let dispatcher = InjectorDispatcher::start(
            Arc::clone(&injector) as Arc<dyn InputInjector>,
            Arc::clone(&log),
            1,
        )
        .unwrap();

        // Act: the first job is taken by the worker (and blocks), the second
        // fills the queue, the third must be rejected.
        dispatcher.enqueue(job(0, InputAction::Click(MouseButton::Left))).unwrap();
        injector.wait_until_blocked();
        dispatcher.enqueue(job(1, InputAction::Click(MouseButton::Left))).unwrap();
        let third = dispatcher.enqueue(job(2, InputAction::Click(MouseButton::Left)));

        // Assert: the rejected job comes back to the caller.
        assert!(matches!(third, Err(DispatchError::QueueFull(_))));
        let returned = third.unwrap_err().into_job().unwrap();
        assert_eq!(returned.seq, 2);
        assert_eq!(dispatcher.queued(), 1);
        drop(gate);
        dispatcher.shutdown();
        assert_eq!(injector.calls().len(), 2);
    }
}
