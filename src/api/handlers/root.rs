use axum::{http::StatusCode, response::IntoResponse};
use tracing::instrument;

// axum handler for the bare root, useful as a smoke probe
#[instrument]
pub async fn root() -> impl IntoResponse {
    (StatusCode::OK, crate::api::APP_USER_AGENT)
}
