//! Public liveness page for front-end identification.

use axum::Json;
use serde::Serialize;

/// Structured liveness blurb.
#[derive(Serialize)]
pub struct Status {
    message: String,
    status: &'static str,
    version: &'static str,
}

/// Public server status.
pub async fn status() -> Json<Status> {
    Json(Status {
        message: "The Vibe Check API is online!".to_owned(),
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
