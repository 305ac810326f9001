//! HTTP server: axum router and request handlers.
//!
//! Each phone event is one small JSON `POST`.  Handlers do three things:
//!
//! 1. Work out the client key (see [`ClientKey`]).
//! 2. Parse and validate the body with
//!    [`parse_request`](crate::domain::messages::parse_request).  A bad body
//!    is answered with `400 {"error": "..."}` and logged once.
//! 3. Hand the request to [`ControlService`] and answer `204 No Content`.
//!
//! Bodies are taken as raw [`Bytes`] rather than axum's `Json` extractor so
//! that every malformed body, including a wrong `Content-Type`, produces the
//! same `400` shape and the same log entry.
//!
//! # Routes
//!
//! | Method | Path                  | Purpose                               |
//! |--------|-----------------------|---------------------------------------|
//! | GET    | `/`, `/index.html`    | The mobile trackpad page              |
//! | GET    | `/status`             | `{running, clientsConnected}`         |
//! | GET    | `/logs`               | Event log snapshot                    |
//! | POST   | `/move`               | Touch sample                          |
//! | POST   | `/click`              | Mouse button                          |
//! | POST   | `/scroll`             | Wheel step                            |
//! | POST   | `/zoom`               | Zoom in / out                         |
//! | POST   | `/key`                | Key or chord                          |
//! | POST   | `/type`               | Text                                  |
//! | POST   | `/disconnect`         | End this phone's session              |

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

use crate::application::{ControlService, LogEntry};
use crate::domain::messages::{
    parse_request, ClickRequest, ErrorBody, KeyRequest, MoveRequest, ProtocolError, ScrollRequest,
    StatusResponse, TypeRequest, WireRequest, ZoomRequest,
};

/// The page served to the phone.
const INDEX_HTML: &str = include_str!("../../assets/index.html");

/// Header a phone may send to identify itself across IP changes.
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Longest accepted `X-Client-Id` value.
const MAX_CLIENT_ID_LEN: usize = 64;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub control: Arc<ControlService>,
    pub running: Arc<AtomicBool>,
}

// ── Client key ────────────────────────────────────────────────────────────────

/// Who sent the request.
///
/// The `X-Client-Id` header when present and sane (1 to 64 visible ASCII
/// characters), otherwise the peer IP, otherwise `"local"` (no socket info,
/// as in router tests).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey(pub String);

impl ClientKey {
    fn from_parts(parts: &Parts) -> Self {
        let header = parts
            .headers
            .get(CLIENT_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| is_valid_client_id(v));
        if let Some(id) = header {
            return Self(id.to_string());
        }
        match parts.extensions.get::<ConnectInfo<SocketAddr>>() {
            Some(ConnectInfo(addr)) => Self(addr.ip().to_string()),
            None => Self("local".to_string()),
        }
    }
}

fn is_valid_client_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_CLIENT_ID_LEN && id.chars().all(|c| c.is_ascii_graphic())
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ClientKey {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// A rejected request, rendered as `400` with an [`ErrorBody`].
#[derive(Debug)]
pub struct ApiError(pub ProtocolError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(ErrorBody::from(&self.0))).into_response()
    }
}

/// Parses a body, logging one warning on failure.
fn parse<T: WireRequest>(
    state: &AppState,
    route: &str,
    key: &ClientKey,
    body: &Bytes,
) -> Result<T, ApiError> {
    parse_request(body).map_err(|e| {
        state.control.reject(route, &key.0, &e);
        ApiError(e)
    })
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Builds the router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/status", get(status_handler))
        .route("/logs", get(logs_handler))
        .route("/move", post(move_handler))
        .route("/click", post(click_handler))
        .route("/scroll", post(scroll_handler))
        .route("/zoom", post(zoom_handler))
        .route("/key", post(key_handler))
        .route("/type", post(type_handler))
        .route("/disconnect", post(disconnect_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

/// Serves on `listener` until `shutdown` resolves, then waits for in-flight
/// requests to finish.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        running: state.running.load(Ordering::Relaxed),
        clients_connected: state.control.clients_connected(),
    })
}

async fn logs_handler(State(state): State<AppState>) -> Json<Vec<LogEntry>> {
    Json(state.control.event_log().snapshot())
}

async fn move_handler(
    State(state): State<AppState>,
    key: ClientKey,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let request: MoveRequest = parse(&state, "/move", &key, &body)?;
    state.control.handle_touch(&key.0, request);
    Ok(StatusCode::NO_CONTENT)
}

async fn click_handler(
    State(state): State<AppState>,
    key: ClientKey,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let request: ClickRequest = parse(&state, "/click", &key, &body)?;
    state.control.click(&key.0, request.button);
    Ok(StatusCode::NO_CONTENT)
}

async fn scroll_handler(
    State(state): State<AppState>,
    key: ClientKey,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let request: ScrollRequest = parse(&state, "/scroll", &key, &body)?;
    state.control.scroll(&key.0, request.dx, request.dy);
    Ok(StatusCode::NO_CONTENT)
}

async fn zoom_handler(
    State(state): State<AppState>,
    key: ClientKey,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let request: ZoomRequest = parse(&state, "/zoom", &key, &body)?;
    state.control.zoom(&key.0, request.direction.factor());
    Ok(StatusCode::NO_CONTENT)
}

async fn key_handler(
    State(state): State<AppState>,
    key: ClientKey,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let request: KeyRequest = parse(&state, "/key", &key, &body)?;
    let chord = request.chord().map_err(ApiError)?;
    state.control.press_key(&key.0, chord);
    Ok(StatusCode::NO_CONTENT)
}

async fn type_handler(
    State(state): State<AppState>,
    key: ClientKey,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let request: TypeRequest = parse(&state, "/type", &key, &body)?;
    state.control.type_text(&key.0, request.chords());
    Ok(StatusCode::NO_CONTENT)
}

async fn disconnect_handler(State(state): State<AppState>, key: ClientKey) -> StatusCode {
    state.control.disconnect(&key.0);
    StatusCode::NO_CONTENT
}

async fn not_found_handler() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "not found".to_string(),
        }),
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
