//! TrackpadService: start/stop lifecycle for the whole server.
//!
//! A control panel (or `main.rs`) owns one `TrackpadService` and drives it
//! with four calls:
//!
//! | Call               | Effect                                             |
//! |--------------------|----------------------------------------------------|
//! | `start(port)`      | bind, spawn the HTTP server and the sweeper        |
//! | `stop()`           | graceful shutdown, drain the dispatch queue        |
//! | `subscribe()`      | live feed of [`LogEntry`] values                   |
//! | `current_status()` | running, sessions, queue depth, address, error     |
//!
//! There is no global server object: everything a running server needs is
//! created in `start` and torn down in `stop`.  The event log outlives
//! restarts so the panel keeps its history.
//!
//! # Bind failures
//!
//! A port that cannot be bound is reported once, as
//! [`ServiceError::Bind`], and recorded as `last_error` in the status.  The
//! service does not retry on its own.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::{ControlService, DispatchError, EventLog, InputInjector, LogEntry};
use crate::domain::ServerConfig;
use crate::infrastructure::http_server::{self, AppState};

/// How long `stop` waits for open connections before cutting them off.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Error type for [`TrackpadService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The listening socket could not be bound.  Terminal; not retried.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// `start` was called while the server is running.
    #[error("server is already running on {0}")]
    AlreadyRunning(SocketAddr),

    /// The injector dispatcher could not be started.
    #[error(transparent)]
    Dispatcher(#[from] DispatchError),
}

/// Snapshot of the service for a control panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub running: bool,
    pub clients_connected: usize,
    /// Actions waiting for the injector.
    pub queued_actions: usize,
    pub bound_addr: Option<SocketAddr>,
    pub last_error: Option<String>,
}

/// Everything that exists only while the server runs.
struct Running {
    addr: SocketAddr,
    control: Arc<ControlService>,
    shutdown_tx: oneshot::Sender<()>,
    server: JoinHandle<()>,
    sweeper: JoinHandle<()>,
}

#[derive(Default)]
struct StatusCell {
    control: Option<Arc<ControlService>>,
    bound_addr: Option<SocketAddr>,
    last_error: Option<String>,
}

/// The trackpad server with an explicit lifecycle.
pub struct TrackpadService {
    config: ServerConfig,
    injector: Arc<dyn InputInjector>,
    log: Arc<EventLog>,
    running_flag: Arc<AtomicBool>,
    running: Mutex<Option<Running>>,
    status: StdMutex<StatusCell>,
}

impl TrackpadService {
    /// Creates a stopped service.
    pub fn new(config: ServerConfig, injector: Arc<dyn InputInjector>) -> Self {
        let log = Arc::new(EventLog::new(config.log_capacity));
        Self {
            config,
            injector,
            log,
            running_flag: Arc::new(AtomicBool::new(false)),
            running: Mutex::new(None),
            status: StdMutex::new(StatusCell::default()),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Binds `config.bind_address:port` and starts serving.  Port `0` picks a
    /// free port; the returned address says which.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::AlreadyRunning`] if already started.
    /// - [`ServiceError::Bind`] if the port is unavailable.
    /// - [`ServiceError::Dispatcher`] if the dispatcher thread cannot start.
    pub async fn start(&self, port: u16) -> Result<SocketAddr, ServiceError> {
        let mut running = self.running.lock().await;
        if let Some(r) = running.as_ref() {
            return Err(ServiceError::AlreadyRunning(r.addr));
        }

        let requested = SocketAddr::new(self.config.bind_address, port);
        let listener = match TcpListener::bind(requested).await {
            Ok(listener) => listener,
            Err(source) => {
                let err = ServiceError::Bind {
                    addr: requested,
                    source,
                };
                self.log.error(format!("Server failed to start: {err}"));
                self.set_status(|s| s.last_error = Some(err.to_string()));
                return Err(err);
            }
        };
        let addr = listener.local_addr().unwrap_or(requested);

        let control =
            ControlService::new(&self.config, Arc::clone(&self.injector), Arc::clone(&self.log))
                .map_err(|e| {
                    self.set_status(|s| s.last_error = Some(e.to_string()));
                    ServiceError::from(e)
                })?;
        let control = Arc::new(control);

        self.running_flag.store(true, Ordering::Relaxed);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let state = AppState {
            control: Arc::clone(&control),
            running: Arc::clone(&self.running_flag),
        };

        let server = {
            let running_flag = Arc::clone(&self.running_flag);
            let log = Arc::clone(&self.log);
            tokio::spawn(async move {
                let shutdown = async {
                    // A dropped sender also means "stop".
                    let _ = shutdown_rx.await;
                };
                if let Err(e) = http_server::serve(listener, state, shutdown).await {
                    log.error(format!("HTTP server error: {e}"));
                }
                running_flag.store(false, Ordering::Relaxed);
            })
        };

        let sweeper = {
            let control = Arc::clone(&control);
            let period = self.config.sweep_interval();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    control.sweep(Instant::now());
                }
            })
        };

        self.set_status(|s| {
            s.control = Some(Arc::clone(&control));
            s.bound_addr = Some(addr);
            s.last_error = None;
        });
        self.log.info(format!("Server started on {addr}"));

        *running = Some(Running {
            addr,
            control,
            shutdown_tx,
            server,
            sweeper,
        });
        Ok(addr)
    }

    /// Stops serving and waits until every queued action has been applied.
    /// Does nothing when the server is not running.
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };

        self.running_flag.store(false, Ordering::Relaxed);
        let _ = running.shutdown_tx.send(());
        running.sweeper.abort();

        let mut server = running.server;
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await.is_err() {
            warn!("open connections did not close within {SHUTDOWN_GRACE:?}; aborting");
            server.abort();
        }

        let control = Arc::clone(&running.control);
        if tokio::task::spawn_blocking(move || control.shutdown())
            .await
            .is_err()
        {
            error!("dispatcher shutdown task panicked");
        }

        self.set_status(|s| {
            s.control = None;
            s.bound_addr = None;
        });
        self.log.info("Server stopped");
        info!(addr = %running.addr, "trackpad service stopped");
    }

    /// Live feed of log entries recorded from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.log.subscribe()
    }

    /// Copy of the retained log entries, oldest first.
    pub fn log_snapshot(&self) -> Vec<LogEntry> {
        self.log.snapshot()
    }

    pub fn event_log(&self) -> &Arc<EventLog> {
        &self.log
    }

    pub fn current_status(&self) -> ServiceStatus {
        let status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        let control = status.control.as_ref();
        ServiceStatus {
            running: self.running_flag.load(Ordering::Relaxed),
            clients_connected: control.map_or(0, |c| c.clients_connected()),
            queued_actions: control.map_or(0, |c| c.dispatcher().queued()),
            bound_addr: status.bound_addr,
            last_error: status.last_error.clone(),
        }
    }

    fn set_status(&self, f: impl FnOnce(&mut StatusCell)) {
        f(&mut self.status.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
