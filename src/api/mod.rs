//! REST API route definitions
//!
//! Handlers extract the requester identity, parse the request shape, and
//! delegate to the service layer; domain errors map to responses through
//! `ApiError`'s `IntoResponse`.

pub mod auth;
pub mod feed;
pub mod health;

use axum::RequestPartsExt;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};

use crate::AppState;
use crate::error::ApiError;
use crate::services::Identity;

/// Extractor that requires a valid bearer token; rejects with 401 otherwise.
impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| ApiError::Unauthorized("Not authenticated!".into()))?;

        state.auth.verify(bearer.token())
    }
}
