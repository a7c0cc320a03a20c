use axum::extract::State;
use axum::http::StatusCode;

use crate::server::AppState;

pub async fn livez() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Ready once at least one provider can be called.
pub async fn readyz(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.dispatcher.registry().has_usable_provider() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "no usable providers")
    }
}
