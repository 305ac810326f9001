//! ControlService: the per-request use case.
//!
//! Every HTTP handler ends up here.  For a touch sample the steps are:
//!
//! ```text
//! resolve session ─► lock session ─► GestureInterpreter::interpret
//!                                  ─► InjectorDispatcher::enqueue ─► unlock
//! ```
//!
//! Discrete requests (buttons, keys, typed text) skip the interpreter and go
//! straight to the dispatcher, still under the session lock so they stay in
//! order with the touch stream of the same phone.
//!
//! Nothing in here waits on the injector.  A request costs one map lookup,
//! one short mutex section, and a `try_send`.

use std::sync::{Arc, PoisonError};
use std::time::Instant;

use tracing::debug;
use trackpad_core::{GestureInterpreter, InputAction, KeyChord, MouseButton, TouchPhase};

use super::dispatcher::{DispatchError, DispatchJob, InjectorDispatcher};
use super::event_log::EventLog;
use super::inject::InputInjector;
use super::session_registry::{Evicted, ResolveOutcome, Session, SessionRegistry};
use crate::domain::messages::{MoveRequest, ProtocolError};
use crate::domain::ServerConfig;

/// Wires the session registry, gesture interpreter, dispatcher, and event log
/// together.
#[derive(Debug)]
pub struct ControlService {
    registry: SessionRegistry,
    interpreter: GestureInterpreter,
    dispatcher: InjectorDispatcher,
    log: Arc<EventLog>,
    clock_origin: Instant,
}

impl ControlService {
    /// Builds the service and starts the dispatcher thread.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Spawn`] if the dispatcher thread cannot be started.
    pub fn new(
        config: &ServerConfig,
        injector: Arc<dyn InputInjector>,
        log: Arc<EventLog>,
    ) -> Result<Self, DispatchError> {
        let dispatcher =
            InjectorDispatcher::start(injector, Arc::clone(&log), config.dispatch_queue_capacity)?;
        Ok(Self {
            registry: SessionRegistry::new(config.session_timeout()),
            interpreter: GestureInterpreter::new(config.gesture.clone()),
            dispatcher,
            log,
            clock_origin: Instant::now(),
        })
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> &InjectorDispatcher {
        &self.dispatcher
    }

    pub fn event_log(&self) -> &Arc<EventLog> {
        &self.log
    }

    /// Milliseconds since this service was created; used to stamp samples
    /// that arrive without a client timestamp.
    pub fn now_ms(&self) -> u64 {
        u64::try_from(self.clock_origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    pub fn clients_connected(&self) -> usize {
        self.registry.len()
    }

    // ── Requests ──────────────────────────────────────────────────────────────

    /// Feeds one touch sample through the interpreter.  Returns the action it
    /// produced, if any, after queueing it.
    pub fn handle_touch(&self, client_key: &str, request: MoveRequest) -> Option<InputAction> {
        let sample = request.into_sample(self.now_ms());
        self.with_session(client_key, |session, service| {
            if sample.phase == TouchPhase::Start && session.state().is_idle() {
                service.dispatcher.forget(session.id());
            }
            let action = service.interpreter.interpret(session.state_mut(), &sample)?;
            match &action {
                InputAction::Click(button) => {
                    service.log.info(format!("{client_key}: tap, click {button}"));
                }
                InputAction::ZoomBy { .. } => {
                    service.log.info(format!("{client_key}: pinch, {action}"));
                }
                _ => debug!(client = client_key, %action, "gesture"),
            }
            service.dispatch_locked(session, client_key, action.clone());
            Some(action)
        })
    }

    pub fn click(&self, client_key: &str, button: MouseButton) {
        self.discrete(client_key, InputAction::Click(button));
    }

    pub fn scroll(&self, client_key: &str, dx: f64, dy: f64) {
        self.discrete(client_key, InputAction::ScrollBy { dx, dy });
    }

    pub fn zoom(&self, client_key: &str, factor: f64) {
        self.discrete(client_key, InputAction::ZoomBy { factor });
    }

    pub fn press_key(&self, client_key: &str, chord: KeyChord) {
        self.discrete(client_key, InputAction::KeyPress(chord));
    }

    /// Queues one key press per chord, in order, under a single session lock.
    pub fn type_text(&self, client_key: &str, chords: Vec<KeyChord>) {
        let count = chords.len();
        self.with_session(client_key, |session, service| {
            for chord in chords {
                service.dispatch_locked(session, client_key, InputAction::KeyPress(chord));
            }
        });
        self.log.info(format!("{client_key}: typed {count} characters"));
    }

    /// Ends the session for `client_key`.  Returns `false` if there was none.
    pub fn disconnect(&self, client_key: &str) -> bool {
        match self.registry.disconnect(client_key) {
            Some(evicted) => {
                self.release(&evicted);
                self.log.info(format!("Client disconnected: {client_key}"));
                true
            }
            None => false,
        }
    }

    /// Evicts idle sessions.  Returns how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let evicted = self.registry.sweep(now);
        for e in &evicted {
            self.release(e);
            self.log
                .info(format!("Session for {} timed out after inactivity", e.client_key));
        }
        evicted.len()
    }

    /// Records a rejected request.  Never touches the session registry.
    pub fn reject(&self, route: &str, client_key: &str, error: &ProtocolError) {
        self.log
            .warn(format!("Rejected {route} from {client_key}: {error}"));
    }

    /// Closes the dispatch queue and waits for queued actions to be applied.
    /// Blocking; see [`InjectorDispatcher::shutdown`].
    pub fn shutdown(&self) {
        self.dispatcher.shutdown();
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn release(&self, evicted: &Evicted) {
        self.dispatcher.forget(evicted.session_id);
        debug!(
            client = %evicted.client_key,
            lifetime = ?evicted.lifetime,
            was_controller = evicted.was_controller,
            "session ended"
        );
    }

    fn discrete(&self, client_key: &str, action: InputAction) {
        self.with_session(client_key, |session, service| {
            service.log.info(format!("{client_key}: {action}"));
            service.dispatch_locked(session, client_key, action);
        });
    }

    /// Resolves the session for `client_key` and runs `f` with it locked.
    fn with_session<R>(&self, client_key: &str, f: impl FnOnce(&mut Session, &Self) -> R) -> R {
        let resolved = self.registry.resolve(client_key, Instant::now());
        match resolved.outcome {
            ResolveOutcome::Created => {
                self.log.info(format!("Client connected: {client_key}"));
            }
            ResolveOutcome::Recreated => {
                self.log
                    .info(format!("Session for {client_key} had expired; started a new one"));
            }
            ResolveOutcome::Existing => {}
        }
        let mut session = resolved
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut *session, self)
    }

    /// Queues `action`.  Must be called with the session locked, so it must
    /// not take the registry lock.
    fn dispatch_locked(&self, session: &Session, client_key: &str, action: InputAction) {
        let session_id = session.id();
        let previous = self.registry.controller();
        if self.registry.claim(session_id) && previous.is_some() {
            self.log.info(format!("{client_key} now controls the input"));
        }
        let job = DispatchJob {
            session_id,
            seq: session.next_seq(),
            action,
        };
        if let Err(e) = self.dispatcher.enqueue(job) {
            let reason = e.to_string();
            if let Some(job) = e.into_job() {
                self.log
                    .warn(format!("Dropped {} from {client_key}: {reason}", job.action));
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
