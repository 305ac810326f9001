//! Raw touch samples.
//!
//! A [`TouchSample`] is one observation of one finger: where it is, when it
//! was seen, and whether it just landed, moved, or lifted.  The browser emits
//! one sample per changed finger per touch event, so a two-finger gesture
//! arrives as an interleaved stream of samples for two pointer ids.

use serde::{Deserialize, Serialize};

/// Identifier of one finger's contact, as assigned by the browser
/// (`Touch.identifier`).  Stable for the lifetime of the contact only.
pub type PointerId = u32;

/// Lifecycle phase of a single finger's contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchPhase {
    /// The finger touched down (`touchstart`).
    Start,
    /// The finger moved while in contact (`touchmove`).
    Move,
    /// The finger lifted or the contact was cancelled (`touchend`).
    End,
}

/// One observation of one finger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchSample {
    /// Which finger this sample belongs to.
    pub pointer_id: PointerId,
    /// Horizontal position in CSS pixels relative to the trackpad surface.
    pub x: f64,
    /// Vertical position in CSS pixels relative to the trackpad surface.
    pub y: f64,
    /// Time the sample was taken, in milliseconds on a clock that is
    /// monotonic for the lifetime of one session.
    pub timestamp_ms: u64,
    /// Lifecycle phase of the contact.
    pub phase: TouchPhase,
}

impl TouchSample {
    /// Convenience constructor used heavily by tests and benchmarks.
    pub fn new(pointer_id: PointerId, x: f64, y: f64, timestamp_ms: u64, phase: TouchPhase) -> Self {
        Self {
            pointer_id,
            x,
            y,
            timestamp_ms,
            phase,
        }
    }

    /// Euclidean distance between the positions of two samples.
    pub fn distance_to(&self, other: &TouchSample) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}
