//! Dry-run injector: logs each call through `tracing` and does nothing else.
//!
//! This is what the binary uses unless an OS backend is linked in.  Run with
//! `RUST_LOG=trackpad::inject=debug` to watch the stream of host calls.

use tracing::debug;
use trackpad_core::{KeyChord, MouseButton};

use crate::application::inject::{InjectorError, InputInjector};

const TARGET: &str = "trackpad::inject";

/// Injector that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingInjector;

impl TracingInjector {
    pub fn new() -> Self {
        Self
    }
}

impl InputInjector for TracingInjector {
    fn move_cursor_by(&self, dx: i32, dy: i32) -> Result<(), InjectorError> {
        debug!(target: TARGET, dx, dy, "move cursor");
        Ok(())
    }

    fn click(&self, button: MouseButton) -> Result<(), InjectorError> {
        debug!(target: TARGET, %button, "click");
        Ok(())
    }

    fn scroll(&self, dx: i32, dy: i32) -> Result<(), InjectorError> {
        debug!(target: TARGET, dx, dy, "scroll");
        Ok(())
    }

    fn press_key(&self, chord: &KeyChord) -> Result<(), InjectorError> {
        debug!(target: TARGET, %chord, "press key");
        Ok(())
    }
}
