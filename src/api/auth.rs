//! Signup and login endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::AppState;
use crate::error::ApiError;
use crate::services::RegisterInput;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// PUT /auth/signup
async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .auth
        .register(RegisterInput {
            name: body.name,
            email: body.email,
            password: body.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created!", "userId": user.id })),
    ))
}

/// POST /auth/login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (token, user_id) = state.auth.login(&body.email, &body.password).await?;
    Ok(Json(json!({ "token": token, "userId": user_id })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", put(signup))
        .route("/login", post(login))
}
