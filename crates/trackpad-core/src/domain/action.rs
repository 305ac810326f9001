//! Discrete host input actions.
//!
//! An [`InputAction`] is the output of gesture interpretation and the input of
//! the injector dispatcher.  Actions are immutable values; each one is applied
//! to the host exactly once.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::keymap::KeyChord;

/// A mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    /// Primary button.  Taps on the trackpad always produce this.
    #[default]
    Left,
    /// Secondary (context menu) button.
    Right,
    /// Wheel button.
    Middle,
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        };
        f.write_str(name)
    }
}

/// One host input action.
#[derive(Debug, Clone, PartialEq)]
pub enum InputAction {
    /// Move the cursor relative to its current position, in host pixels.
    MoveBy { dx: f64, dy: f64 },
    /// Press and release a mouse button.
    Click(MouseButton),
    /// Scroll the wheel.  Positive `dy` follows the finger moving down the
    /// trackpad.  Units are wheel lines and may be fractional.
    ScrollBy { dx: f64, dy: f64 },
    /// Zoom by a multiplicative factor: `> 1.0` zooms in, `< 1.0` zooms out.
    ZoomBy { factor: f64 },
    /// Press and release a key chord.
    KeyPress(KeyChord),
}

impl InputAction {
    /// Short variant name, safe for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            InputAction::MoveBy { .. } => "MoveBy",
            InputAction::Click(_) => "Click",
            InputAction::ScrollBy { .. } => "ScrollBy",
            InputAction::ZoomBy { .. } => "ZoomBy",
            InputAction::KeyPress(_) => "KeyPress",
        }
    }
}

impl fmt::Display for InputAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputAction::MoveBy { dx, dy } => write!(f, "move ({dx:.1}, {dy:.1})"),
            InputAction::Click(button) => write!(f, "click {button}"),
            InputAction::ScrollBy { dx, dy } => write!(f, "scroll ({dx:.2}, {dy:.2})"),
            InputAction::ZoomBy { factor } => {
                let direction = if *factor >= 1.0 { "in" } else { "out" };
                write!(f, "zoom {direction} (x{factor:.2})")
            }
            InputAction::KeyPress(chord) => write!(f, "key {chord}"),
        }
    }
}
