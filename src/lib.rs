//! Feedhub backend - multi-user blogging/feed service
//!
//! REST endpoints live under /auth and /feed; the same operations are
//! exposed via GraphQL at /graphql, with real-time feed events over
//! /graphql/ws.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod graphql;
pub mod services;

use std::sync::Arc;

use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::Router;
use axum::extract::{State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Database;
use crate::graphql::FeedSchema;
use crate::services::{AuthService, FeedService, UploadService};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub schema: FeedSchema,
    pub auth: AuthService,
    pub feed: Arc<FeedService>,
    pub uploads: Arc<UploadService>,
}

/// Assemble the full application router over a prepared state
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints (no auth required)
        .merge(api::health::router())
        // REST API endpoints
        .nest("/auth", api::auth::router())
        .nest("/feed", api::feed::router())
        .merge(api::feed::image_router())
        // Stored images are served statically
        .nest_service("/uploads", ServeDir::new(&state.config.uploads_path))
        // GraphQL endpoint (queries and mutations)
        .route("/graphql", get(graphiql).post(graphql_handler))
        // GraphQL WebSocket endpoint for subscriptions
        .route("/graphql/ws", get(graphql_ws_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Extract bearer token from Authorization header
fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .filter(|h| h.starts_with("Bearer "))
        .map(|h| h[7..].to_string())
}

/// GraphQL query/mutation handler with auth context
///
/// An invalid or missing token leaves the request unauthenticated; each
/// resolver decides whether that is acceptable.
async fn graphql_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let mut request = req.into_inner();

    if let Some(token) = extract_token(&headers)
        && let Ok(identity) = state.auth.verify(&token)
    {
        request = request.data(identity);
    }

    state.schema.execute(request).await.into()
}

/// GraphiQL interactive playground (only for browsers)
async fn graphiql(headers: HeaderMap) -> impl IntoResponse {
    let accepts_html = headers
        .get(axum::http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("text/html"))
        .unwrap_or(false);

    if accepts_html {
        axum::response::Html(
            GraphiQLSource::build()
                .endpoint("/graphql")
                .subscription_endpoint("/graphql/ws")
                .finish(),
        )
        .into_response()
    } else {
        (
            axum::http::StatusCode::METHOD_NOT_ALLOWED,
            axum::Json(serde_json::json!({
                "error": "GET requests are not supported for GraphQL queries. Use POST with Content-Type: application/json"
            })),
        )
            .into_response()
    }
}

/// GraphQL WebSocket handler for subscriptions with auth
async fn graphql_ws_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    protocol: async_graphql_axum::GraphQLProtocol,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    // Extract auth from headers for the initial connection
    let identity = extract_token(&headers).and_then(|token| state.auth.verify(&token).ok());
    let auth = state.auth.clone();

    ws.protocols(["graphql-transport-ws", "graphql-ws"])
        .on_upgrade(move |socket| {
            let mut ws = async_graphql_axum::GraphQLWebSocket::new(
                socket,
                state.schema.clone(),
                protocol,
            );

            if let Some(identity) = identity {
                let mut data = async_graphql::Data::default();
                data.insert(identity);
                ws = ws.with_data(data);
            }

            // Handle connection_init for auth via payload
            ws.on_connection_init(move |params| async move {
                if let Some(token) = params
                    .get("Authorization")
                    .or_else(|| params.get("authorization"))
                    .and_then(|v| v.as_str())
                {
                    let token = token.strip_prefix("Bearer ").unwrap_or(token);
                    if let Ok(identity) = auth.verify(token) {
                        let mut data = async_graphql::Data::default();
                        data.insert(identity);
                        return Ok(data);
                    }
                }
                Ok(async_graphql::Data::default())
            })
            .serve()
        })
}
