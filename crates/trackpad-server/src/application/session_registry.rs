//! Session registry: one gesture session per connected phone.
//!
//! A *session* holds the [`GestureState`] of one client plus bookkeeping
//! (id, timestamps, a sequence counter for ordering).  The registry maps a
//! client key (the `X-Client-Id` header or peer IP) to its session.
//!
//! # Session lifecycle (for beginners)
//!
//! ```text
//!   first request ──► Created ──► Existing ──► ... ──► swept (idle)
//!                                    │                     │
//!                            POST /disconnect       next request
//!                                    │                     │
//!                                 removed             Recreated
//! ```
//!
//! A request that arrives after its session was swept is not an error: a
//! fresh session is created and the outcome is reported as
//! [`ResolveOutcome::Recreated`] so the caller can log it.
//!
//! # Locking
//!
//! - The map sits behind an `RwLock`.  Lookups of existing keys take the
//!   shared read lock, so phones never contend with each other.
//! - Creating a session takes the write lock and uses `HashMap::entry`, so two
//!   racing requests for the same new key still produce one session.
//! - Each session has its own `Mutex`; the gesture interpreter runs under it.
//!
//! Lock order is always registry first, then session.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use trackpad_core::{GestureState, SequenceCounter};
use uuid::Uuid;

/// Upper bound on remembered evicted keys.  Past this the memory is cleared
/// and late clients are reported as `Created` instead of `Recreated`.
const MAX_REMEMBERED_EXPIRED: usize = 1024;

/// Shared handle to a session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Server-side state for one controlling client.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    client_key: String,
    created_at: Instant,
    last_activity_at: Instant,
    state: GestureState,
    sequence: SequenceCounter,
}

impl Session {
    fn new(client_key: String, now: Instant) -> Self {
        Self {
            id: Uuid::new_v4(),
            client_key,
            created_at: now,
            last_activity_at: now,
            state: GestureState::new(),
            sequence: SequenceCounter::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn client_key(&self) -> &str {
        &self.client_key
    }

    pub fn last_activity_at(&self) -> Instant {
        self.last_activity_at
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GestureState {
        &mut self.state
    }

    /// Next per-session sequence number, starting at 0.
    pub fn next_seq(&self) -> u64 {
        self.sequence.next()
    }

    fn touch(&mut self, now: Instant) {
        if now > self.last_activity_at {
            self.last_activity_at = now;
        }
    }

    fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity_at)
    }
}

/// How [`SessionRegistry::resolve`] found its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The key already had a live session.
    Existing,
    /// First request from this key.
    Created,
    /// The key's previous session was evicted for inactivity.
    Recreated,
}

/// Result of [`SessionRegistry::resolve`].
#[derive(Debug, Clone)]
pub struct Resolved {
    pub session: SessionHandle,
    pub session_id: Uuid,
    pub outcome: ResolveOutcome,
}

/// A session removed by [`SessionRegistry::sweep`] or
/// [`SessionRegistry::disconnect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evicted {
    pub client_key: String,
    pub session_id: Uuid,
    /// `true` if the session held the injector claim, which is now released.
    pub was_controller: bool,
    /// Time from creation to removal.
    pub lifetime: Duration,
}

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<String, SessionHandle>,
    expired: HashSet<String>,
}

/// In-memory registry of live sessions.
#[derive(Debug)]
pub struct SessionRegistry {
    timeout: Duration,
    inner: RwLock<Inner>,
    controller: Mutex<Option<Uuid>>,
}

impl SessionRegistry {
    /// Creates an empty registry that evicts sessions idle longer than `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            inner: RwLock::new(Inner::default()),
            controller: Mutex::new(None),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the session for `client_key`, creating one if needed, and
    /// marks it active at `now`.
    pub fn resolve(&self, client_key: &str, now: Instant) -> Resolved {
        {
            let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(handle) = inner.sessions.get(client_key) {
                return Self::touch_existing(handle, now);
            }
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = inner.sessions.get(client_key) {
            // Another request created it between our two lock acquisitions.
            return Self::touch_existing(handle, now);
        }

        let outcome = if inner.expired.remove(client_key) {
            ResolveOutcome::Recreated
        } else {
            ResolveOutcome::Created
        };
        let session = Session::new(client_key.to_string(), now);
        let session_id = session.id;
        let handle = Arc::new(Mutex::new(session));
        inner
            .sessions
            .insert(client_key.to_string(), Arc::clone(&handle));

        Resolved {
            session: handle,
            session_id,
            outcome,
        }
    }

    fn touch_existing(handle: &SessionHandle, now: Instant) -> Resolved {
        let mut session = handle.lock().unwrap_or_else(PoisonError::into_inner);
        session.touch(now);
        Resolved {
            session: Arc::clone(handle),
            session_id: session.id,
            outcome: ResolveOutcome::Existing,
        }
    }

    /// Evicts every session idle for longer than the timeout as of `now`.
    ///
    /// A swept session that held the injector claim releases it.
    pub fn sweep(&self, now: Instant) -> Vec<Evicted> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        let stale: Vec<(String, Uuid, Duration)> = inner
            .sessions
            .iter()
            .filter_map(|(key, handle)| {
                let session = handle.lock().unwrap_or_else(PoisonError::into_inner);
                (session.idle_for(now) > self.timeout).then(|| {
                    let lifetime = now.saturating_duration_since(session.created_at);
                    (key.clone(), session.id, lifetime)
                })
            })
            .collect();

        if inner.expired.len() + stale.len() > MAX_REMEMBERED_EXPIRED {
            inner.expired.clear();
        }

        stale
            .into_iter()
            .map(|(key, session_id, lifetime)| {
                inner.sessions.remove(&key);
                inner.expired.insert(key.clone());
                Evicted {
                    was_controller: self.release_if_controller(session_id),
                    client_key: key,
                    session_id,
                    lifetime,
                }
            })
            .collect()
    }

    /// Removes the session for `client_key` at the client's request.
    ///
    /// The next request from that key is reported as `Created`, not
    /// `Recreated`.
    pub fn disconnect(&self, client_key: &str) -> Option<Evicted> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let handle = inner.sessions.remove(client_key)?;
        inner.expired.remove(client_key);
        let (session_id, created_at) = {
            let session = handle.lock().unwrap_or_else(PoisonError::into_inner);
            (session.id, session.created_at)
        };
        Some(Evicted {
            client_key: client_key.to_string(),
            session_id,
            was_controller: self.release_if_controller(session_id),
            lifetime: created_at.elapsed(),
        })
    }

    /// Records `session_id` as the session currently driving the injector.
    ///
    /// Returns `true` when control changed hands.
    pub fn claim(&self, session_id: Uuid) -> bool {
        let mut controller = self.controller.lock().unwrap_or_else(PoisonError::into_inner);
        if *controller == Some(session_id) {
            return false;
        }
        *controller = Some(session_id);
        true
    }

    /// The session that most recently drove the injector, if it is still live.
    pub fn controller(&self) -> Option<Uuid> {
        *self.controller.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release_if_controller(&self, session_id: Uuid) -> bool {
        let mut controller = self.controller.lock().unwrap_or_else(PoisonError::into_inner);
        if *controller == Some(session_id) {
            *controller = None;
            true
        } else {
            false
        }
    }

    /// Handle to the live session for `client_key`, without touching it.
    pub fn get(&self, client_key: &str) -> Option<SessionHandle> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.sessions.get(client_key).cloned()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .sessions
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
