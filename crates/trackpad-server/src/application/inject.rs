//! The host input-injection seam.
//!
//! Moving the real cursor or pressing a real key is an OS-specific call the
//! server does not implement itself.  It talks to an [`InputInjector`] and
//! the binary picks an implementation at startup (see
//! `infrastructure::injector`).
//!
//! Implementations are assumed to be non-reentrant: the
//! [`InjectorDispatcher`](super::dispatcher::InjectorDispatcher) guarantees
//! only one thread ever calls them.

use thiserror::Error;
use trackpad_core::{Key, KeyChord, Modifier, MouseButton};

/// Error type for host input injection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InjectorError {
    /// The host input API rejected the call or is not reachable.
    #[error("input injector unavailable: {0}")]
    Unavailable(String),
    /// This injector cannot perform the requested action.
    #[error("unsupported by this injector: {0}")]
    Unsupported(String),
}

/// Host input primitives.
///
/// All deltas are whole units (pixels, wheel lines); the dispatcher carries
/// fractional remainders between calls.
pub trait InputInjector: Send + Sync {
    /// Moves the cursor relative to its current position.
    fn move_cursor_by(&self, dx: i32, dy: i32) -> Result<(), InjectorError>;

    /// Presses and releases a mouse button.
    fn click(&self, button: MouseButton) -> Result<(), InjectorError>;

    /// Scrolls the wheel.  Positive `dy` scrolls the content as if the finger
    /// moved down.
    fn scroll(&self, dx: i32, dy: i32) -> Result<(), InjectorError>;

    /// Presses and releases a key chord.
    fn press_key(&self, chord: &KeyChord) -> Result<(), InjectorError>;

    /// Zooms the focused application.
    ///
    /// The default presses `ctrl+=` to zoom in and `ctrl+-` to zoom out,
    /// which most browsers and editors understand.  A factor of exactly 1 is
    /// a no-op.
    fn zoom(&self, factor: f64) -> Result<(), InjectorError> {
        let key = if factor > 1.0 {
            '='
        } else if factor < 1.0 {
            '-'
        } else {
            return Ok(());
        };
        self.press_key(&KeyChord::with_modifiers(vec![Modifier::Ctrl], Key::Char(key)))
    }
}
