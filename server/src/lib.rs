//! The HTTP control plane the probe talks to: state intake, query polling,
//! response delivery, automation parking, and the start trigger. Everything
//! lives on a loopback port with permissive CORS because the probe runs
//! inside a browser tab.

mod routes;

use std::sync::Arc;

use axum::Router;
use axum::http::Method;
use axum::http::header;
use axum::routing::get;
use axum::routing::post;
use formpilot_core::ActionEngine;
use formpilot_core::MotionEngine;
use formpilot_core::ProbeBridge;
use formpilot_core::StateStore;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub state: Arc<StateStore>,
    pub bridge: Arc<ProbeBridge>,
    pub engine: Arc<ActionEngine>,
    pub motion: Arc<MotionEngine>,
}

impl AppState {
    pub fn new(
        state: Arc<StateStore>,
        bridge: Arc<ProbeBridge>,
        engine: Arc<ActionEngine>,
        motion: Arc<MotionEngine>,
    ) -> Self {
        Self {
            state,
            bridge,
            engine,
            motion,
        }
    }
}

/// Build the control-plane router. Unknown paths fall through to the
/// router's default 404.
pub fn router(app: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/cursor-position", post(routes::cursor_position))
        .route("/cursor-hover", post(routes::cursor_hover))
        .route("/coord-request", get(routes::coord_request))
        .route("/coord-response", post(routes::coord_response))
        .route("/scan-request", get(routes::scan_request))
        .route("/scan-response", post(routes::scan_response))
        .route("/automation", post(routes::automation))
        .route("/start", post(routes::start))
        .route("/dom-change", post(routes::dom_change))
        .route("/form-fields", post(routes::form_fields))
        .route("/bottom-reached", post(routes::bottom_reached))
        .route("/status", get(routes::status))
        .route("/test-move", post(routes::test_move))
        .route("/trigger-scan", post(routes::trigger_scan))
        .layer(cors)
        .with_state(app)
}
