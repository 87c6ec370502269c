//! GraphQL API
//!
//! Mirrors the REST surface: the resolvers delegate to the same services and
//! add nothing of their own. Authentication is derived from the bearer token
//! once per request; an absent or invalid token leaves the request
//! unauthenticated and each resolver decides whether to reject.

pub mod auth;
mod schema;
mod subscriptions;
pub mod types;

pub use auth::AuthExt;
pub use schema::{FeedSchema, build_schema};
