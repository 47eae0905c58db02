use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use formpilot_core::HoverTarget;
use formpilot_core::MoveProfile;
use formpilot_core::ProbeClient;
use formpilot_protocol::Action;
use formpilot_protocol::AutomationRequest;
use formpilot_protocol::CursorReport;
use formpilot_protocol::DomSnapshot;
use formpilot_protocol::HoverReport;
use formpilot_protocol::Point;
use formpilot_protocol::ScanResponse;
use formpilot_protocol::StatusResponse;
use formpilot_protocol::TestMoveRequest;
use serde_json::Value;
use serde_json::json;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::AppState;

/// Pause between the scheduled moves of a `/test-move` run.
const TEST_MOVE_SPACING: Duration = Duration::from_millis(400);

/// `POST /cursor-position`: cursor, hover, and (when present) viewport in
/// one intake. Zero/missing coordinates never overwrite the cursor.
pub(crate) async fn cursor_position(
    State(app): State<AppState>,
    Json(body): Json<Value>,
) -> StatusCode {
    let Ok(report) = serde_json::from_value::<CursorReport>(body) else {
        return StatusCode::BAD_REQUEST;
    };
    app.state.report_cursor(report.x, report.y);
    if let Some(id) = report.hovered_id {
        app.state.set_hover(HoverTarget {
            id,
            name: report.hovered_name.unwrap_or_default(),
        });
    }
    if let Some(bounds) = report.bounds.to_bounds() {
        app.state.set_viewport(bounds);
    }
    StatusCode::OK
}

/// `POST /cursor-hover`: hover only. Must never touch the cursor; older
/// probe builds send these with bogus coordinates attached.
pub(crate) async fn cursor_hover(
    State(app): State<AppState>,
    Json(body): Json<Value>,
) -> StatusCode {
    let Ok(report) = serde_json::from_value::<HoverReport>(body) else {
        return StatusCode::BAD_REQUEST;
    };
    if let Some(id) = report.hovered_id {
        app.state.set_hover(HoverTarget {
            id,
            name: report.hovered_name.unwrap_or_default(),
        });
    }
    StatusCode::OK
}

/// `GET /coord-request`: the probe polls for the pending DOM query.
/// Idempotent; an empty object means nothing is pending.
pub(crate) async fn coord_request(State(app): State<AppState>) -> Json<Value> {
    match app.state.pending_query() {
        Some(query) => Json(serde_json::to_value(query).unwrap_or_else(|_| json!({}))),
        None => Json(json!({})),
    }
}

/// `POST /coord-response`: resolve the waiter for a DOM query. Late
/// responses (unknown id) are dropped without effect.
pub(crate) async fn coord_response(
    State(app): State<AppState>,
    Json(body): Json<Value>,
) -> StatusCode {
    let Ok(snapshot) = serde_json::from_value::<DomSnapshot>(body) else {
        return StatusCode::BAD_REQUEST;
    };
    app.bridge.resolve_query(snapshot);
    StatusCode::OK
}

/// `GET /scan-request`: same polling contract as `/coord-request`.
pub(crate) async fn scan_request(State(app): State<AppState>) -> Json<Value> {
    match app.state.pending_scan() {
        Some(scan) => Json(serde_json::to_value(scan).unwrap_or_else(|_| json!({}))),
        None => Json(json!({})),
    }
}

/// `POST /scan-response`: resolve the waiter for a scan.
pub(crate) async fn scan_response(
    State(app): State<AppState>,
    Json(body): Json<Value>,
) -> StatusCode {
    let Ok(response) = serde_json::from_value::<ScanResponse>(body) else {
        return StatusCode::BAD_REQUEST;
    };
    app.bridge.resolve_scan(response);
    StatusCode::OK
}

/// `POST /automation`: parse and park a command list for a later `/start`.
/// One malformed entry rejects the whole body and parks nothing.
pub(crate) async fn automation(
    State(app): State<AppState>,
    Json(body): Json<Value>,
) -> StatusCode {
    let Ok(request) = serde_json::from_value::<AutomationRequest>(body) else {
        return StatusCode::BAD_REQUEST;
    };
    let mut actions = Vec::with_capacity(request.commands.len());
    for line in &request.commands {
        match Action::parse(line) {
            Ok(action) => actions.push(action),
            Err(err) => {
                warn!("rejecting automation list: {err}");
                return StatusCode::BAD_REQUEST;
            }
        }
    }
    if let (Some(x), Some(y)) = (request.cursor_x, request.cursor_y) {
        app.state.set_cursor(Point::new(x, y));
    }
    info!("parked {} actions", actions.len());
    app.state.park(actions);
    StatusCode::OK
}

/// `POST /start`: dispatch the most recently parked list, unless a run is
/// already in progress or nothing is parked.
pub(crate) async fn start(State(app): State<AppState>) -> StatusCode {
    if app.state.automating() {
        warn!("start refused: a sequence is already running");
        return StatusCode::BAD_REQUEST;
    }
    match app.state.take_parked() {
        Some(actions) => {
            info!("dispatching {} actions", actions.len());
            let engine = Arc::clone(&app.engine);
            tokio::spawn(async move { engine.run(actions).await });
            StatusCode::OK
        }
        None => StatusCode::BAD_REQUEST,
    }
}

/// `POST /dom-change`: diagnostic sink.
pub(crate) async fn dom_change(Json(body): Json<Value>) -> StatusCode {
    debug!("dom change: {body}");
    StatusCode::OK
}

/// `POST /form-fields`: remember the last detected form for `/status`.
pub(crate) async fn form_fields(
    State(app): State<AppState>,
    Json(body): Json<Value>,
) -> StatusCode {
    debug!("form fields reported");
    app.state.set_last_form_fields(body);
    StatusCode::OK
}

/// `POST /bottom-reached`: diagnostic sink.
pub(crate) async fn bottom_reached(Json(body): Json<Value>) -> StatusCode {
    debug!("bottom reached: {body}");
    StatusCode::OK
}

/// `GET /status`.
pub(crate) async fn status(State(app): State<AppState>) -> Json<StatusResponse> {
    let cursor = app.state.cursor();
    Json(StatusResponse {
        cursor_x: cursor.map(|p| p.x),
        cursor_y: cursor.map(|p| p.y),
        automating: app.state.automating(),
        last_form_fields: app.state.last_form_fields(),
    })
}

/// `POST /test-move`: debug helper scheduling a delayed sequence of
/// absolute moves.
pub(crate) async fn test_move(
    State(app): State<AppState>,
    Json(body): Json<Value>,
) -> StatusCode {
    let Ok(request) = serde_json::from_value::<TestMoveRequest>(body) else {
        return StatusCode::BAD_REQUEST;
    };
    let motion = Arc::clone(&app.motion);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(request.delay_ms)).await;
        for target in request.moves {
            if let Err(err) = motion.move_to(target, MoveProfile::Curved).await {
                warn!("test move aborted: {err}");
                break;
            }
            tokio::time::sleep(TEST_MOVE_SPACING).await;
        }
    });
    StatusCode::OK
}

/// `POST /trigger-scan`: synchronous debug scan; waits for the probe and
/// returns whatever came back.
pub(crate) async fn trigger_scan(State(app): State<AppState>) -> (StatusCode, Json<Value>) {
    match app.bridge.scan().await {
        Ok(response) => (
            StatusCode::OK,
            Json(serde_json::to_value(response).unwrap_or_else(|_| json!({}))),
        ),
        Err(err) => {
            warn!("scan failed: {err}");
            (
                StatusCode::GATEWAY_TIMEOUT,
                Json(json!({ "error": err.to_string() })),
            )
        }
    }
}
