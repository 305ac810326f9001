//! In-memory injector for tests.
//!
//! # Why a recording injector?
//!
//! A real injector moves the cursor on the machine running the tests, which
//! can't be observed from Rust and would disturb whoever is using it.  The
//! `RecordingInjector` pushes every call into a `Mutex<Vec<...>>` so tests can
//! assert exactly what reached the host, and in what order.
//!
//! # Usage in tests
//!
//! ```rust
//! use std::sync::Arc;
//! use trackpad_core::MouseButton;
//! use trackpad_server::application::InputInjector;
//! use trackpad_server::infrastructure::injector::{InjectedCall, RecordingInjector};
//!
//! let injector = Arc::new(RecordingInjector::new());
//! injector.click(MouseButton::Left).unwrap();
//! assert_eq!(injector.calls(), vec![InjectedCall::Click(MouseButton::Left)]);
//! ```
//!
//! # Failure and blocking switches
//!
//! - [`set_should_fail`](RecordingInjector::set_should_fail) makes every call
//!   return [`InjectorError::Unavailable`], for error-path tests.
//! - [`hold`](RecordingInjector::hold) makes every call block until the
//!   returned guard is dropped, for back-pressure tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use trackpad_core::{KeyChord, MouseButton};

use crate::application::inject::{InjectorError, InputInjector};

/// One recorded injector call.
#[derive(Debug, Clone, PartialEq)]
pub enum InjectedCall {
    Move(i32, i32),
    Click(MouseButton),
    Scroll(i32, i32),
    /// Canonical chord text, e.g. `"ctrl+c"`.
    Key(String),
    Zoom(f64),
}

/// Injector that records calls instead of performing them.
#[derive(Debug, Default)]
pub struct RecordingInjector {
    calls: Mutex<Vec<InjectedCall>>,
    should_fail: AtomicBool,
    gate: Mutex<()>,
    entered: AtomicBool,
}

impl RecordingInjector {
    /// Creates an injector with no recorded calls that succeeds on every call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every call recorded so far, in order.
    pub fn calls(&self) -> Vec<InjectedCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Blocks every injector call until the returned guard is dropped.
    pub fn hold(&self) -> MutexGuard<'_, ()> {
        self.entered.store(false, Ordering::SeqCst);
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spins until some call has started (and is blocked by [`hold`](Self::hold)).
    pub fn wait_until_blocked(&self) {
        while !self.entered.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn record(&self, call: InjectedCall) -> Result<(), InjectorError> {
        self.entered.store(true, Ordering::SeqCst);
        drop(self.gate.lock().unwrap_or_else(PoisonError::into_inner));

        if self.should_fail.load(Ordering::SeqCst) {
            return Err(InjectorError::Unavailable("recording injector set to fail".into()));
        }
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        Ok(())
    }
}

impl InputInjector for RecordingInjector {
    fn move_cursor_by(&self, dx: i32, dy: i32) -> Result<(), InjectorError> {
        self.record(InjectedCall::Move(dx, dy))
    }

    fn click(&self, button: MouseButton) -> Result<(), InjectorError> {
        self.record(InjectedCall::Click(button))
    }

    fn scroll(&self, dx: i32, dy: i32) -> Result<(), InjectorError> {
        self.record(InjectedCall::Scroll(dx, dy))
    }

    fn press_key(&self, chord: &KeyChord) -> Result<(), InjectorError> {
        self.record(InjectedCall::Key(chord.to_string()))
    }

    /// Recorded as one `Zoom` call rather than the default key press.
    fn zoom(&self, factor: f64) -> Result<(), InjectorError> {
        self.record(InjectedCall::Zoom(factor))
    }
}
