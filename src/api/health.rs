//! Liveness and readiness endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyBody {
    pub ready: bool,
    pub database: bool,
    pub uploads: bool,
}

/// Liveness: the process is up and serving requests
async fn healthz() -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness: the database answers and the upload root exists. Not ready
/// maps to 503 so load balancers drain the instance.
async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<ReadyBody>) {
    let database = sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(state.db.pool())
        .await
        .is_ok();
    let uploads = state.uploads.root_exists();

    let ready = database && uploads;
    let code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(ReadyBody {
            ready,
            database,
            uploads,
        }),
    )
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
}
