//! JSON message types for the phone-facing HTTP protocol.
//!
//! Every gesture, button, and key event the phone sends is one small `POST`
//! with a JSON body.  Each route has its own request struct:
//!
//! | Route         | Body                                                   |
//! |---------------|--------------------------------------------------------|
//! | `/move`       | `{"pointerId":1,"x":10.5,"y":20,"phase":"move"}`       |
//! | `/click`      | `{"button":"right"}` (body optional, default left)     |
//! | `/scroll`     | `{"dx":0,"dy":-3}`                                     |
//! | `/zoom`       | `{"direction":"in"}`                                   |
//! | `/key`        | `{"code":"ctrl+c"}`                                    |
//! | `/type`       | `{"text":"hello"}`                                     |
//!
//! # Parse, then validate (for beginners)
//!
//! `serde_json` checks the *shape* of the body (field names and types).  A
//! body can be well-formed JSON and still be nonsense, for example a
//! coordinate of `1e300`.  [`WireRequest::validate`] checks the *values*.
//! [`parse_request`] runs both steps, so a handler holding a request value
//! knows it is safe to use.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use trackpad_core::{KeyChord, KeyParseError, MouseButton, PointerId, TouchPhase, TouchSample};

/// Largest accepted absolute touch coordinate, in trackpad pixels.
pub const MAX_COORDINATE: f64 = 100_000.0;

/// Largest accepted absolute scroll delta, in wheel lines.
pub const MAX_SCROLL_LINES: f64 = 10_000.0;

/// Longest text accepted by `/type`, in characters.
pub const MAX_TYPE_CHARS: usize = 1024;

/// Zoom factor applied by one press of the zoom-in button.  Zoom-out uses the
/// reciprocal.
pub const ZOOM_STEP: f64 = 1.25;

// ── Errors ────────────────────────────────────────────────────────────────────

/// A request the server refuses to act on.  Always answered with `400`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    /// The body is not JSON, or not the JSON shape this route expects.
    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    /// A numeric field is non-finite or outside its accepted range.
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    /// The key code does not name a key the server can press.
    #[error("invalid key code: {0}")]
    InvalidKey(#[from] KeyParseError),

    /// A text payload exceeds [`MAX_TYPE_CHARS`].
    #[error("text too long: {len} characters (max {max})")]
    TooLong { len: usize, max: usize },
}

/// Body of every `400` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl From<&ProtocolError> for ErrorBody {
    fn from(err: &ProtocolError) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// A request body that can be parsed from JSON and checked for sane values.
pub trait WireRequest: DeserializeOwned {
    /// Checks field values after a successful parse.  The default accepts
    /// anything that parsed.
    fn validate(&self) -> Result<(), ProtocolError> {
        Ok(())
    }
}

/// Parses and validates a request body.
///
/// An empty (or whitespace-only) body is read as `{}` so routes whose fields
/// all have defaults, like `/click`, accept a bare `POST`.
///
/// # Errors
///
/// [`ProtocolError::MalformedJson`] when `serde_json` rejects the body,
/// otherwise whatever [`WireRequest::validate`] returns.
pub fn parse_request<T: WireRequest>(body: &[u8]) -> Result<T, ProtocolError> {
    let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        body
    };
    let request: T =
        serde_json::from_slice(body).map_err(|e| ProtocolError::MalformedJson(e.to_string()))?;
    request.validate()?;
    Ok(request)
}

fn check_range(field: &'static str, value: f64, limit: f64) -> Result<(), ProtocolError> {
    if value.is_finite() && value.abs() <= limit {
        Ok(())
    } else {
        Err(ProtocolError::OutOfRange { field, value })
    }
}

// ── Requests ──────────────────────────────────────────────────────────────────

/// `POST /move`: one touch sample for one finger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub pointer_id: PointerId,
    pub x: f64,
    pub y: f64,
    pub phase: TouchPhase,
    /// Client-side timestamp.  When absent the server stamps receive time.
    #[serde(default)]
    pub timestamp_ms: Option<u64>,
}

impl WireRequest for MoveRequest {
    fn validate(&self) -> Result<(), ProtocolError> {
        check_range("x", self.x, MAX_COORDINATE)?;
        check_range("y", self.y, MAX_COORDINATE)
    }
}

impl MoveRequest {
    /// Converts to a [`TouchSample`], using `received_ms` when the client sent
    /// no timestamp.
    pub fn into_sample(self, received_ms: u64) -> TouchSample {
        TouchSample::new(
            self.pointer_id,
            self.x,
            self.y,
            self.timestamp_ms.unwrap_or(received_ms),
            self.phase,
        )
    }
}

/// `POST /click`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClickRequest {
    #[serde(default)]
    pub button: MouseButton,
}

impl WireRequest for ClickRequest {}

/// `POST /scroll`: a discrete wheel step from the on-screen scroll buttons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollRequest {
    #[serde(default)]
    pub dx: f64,
    pub dy: f64,
}

impl WireRequest for ScrollRequest {
    fn validate(&self) -> Result<(), ProtocolError> {
        check_range("dx", self.dx, MAX_SCROLL_LINES)?;
        check_range("dy", self.dy, MAX_SCROLL_LINES)
    }
}

/// Direction of a zoom button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomDirection {
    In,
    Out,
}

impl ZoomDirection {
    pub fn factor(self) -> f64 {
        match self {
            ZoomDirection::In => ZOOM_STEP,
            ZoomDirection::Out => 1.0 / ZOOM_STEP,
        }
    }
}

/// `POST /zoom`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoomRequest {
    pub direction: ZoomDirection,
}

impl WireRequest for ZoomRequest {}

/// `POST /key`: one key or chord, e.g. `"enter"` or `"ctrl+shift+t"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyRequest {
    pub code: String,
}

impl WireRequest for KeyRequest {
    fn validate(&self) -> Result<(), ProtocolError> {
        self.chord().map(|_| ())
    }
}

impl KeyRequest {
    pub fn chord(&self) -> Result<KeyChord, ProtocolError> {
        Ok(self.code.parse::<KeyChord>()?)
    }
}

/// `POST /type`: a string typed character by character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRequest {
    pub text: String,
}

impl WireRequest for TypeRequest {
    fn validate(&self) -> Result<(), ProtocolError> {
        let len = self.text.chars().count();
        if len > MAX_TYPE_CHARS {
            return Err(ProtocolError::TooLong {
                len,
                max: MAX_TYPE_CHARS,
            });
        }
        Ok(())
    }
}

impl TypeRequest {
    /// One chord per character, in order.
    pub fn chords(&self) -> Vec<KeyChord> {
        self.text.chars().map(KeyChord::from_char).collect()
    }
}

// ── Responses ─────────────────────────────────────────────────────────────────

/// `GET /status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub running: bool,
    pub clients_connected: usize,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
