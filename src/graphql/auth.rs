//! GraphQL authentication context
//!
//! The HTTP layer verifies the bearer token (if any) and inserts an
//! [`Identity`] into the request data. Resolvers pull it back out through
//! [`AuthExt`]; operations that require authentication fail there, not at
//! the transport.

use async_graphql::{Context, ErrorExtensions, Result};

use crate::error::ApiError;
use crate::services::Identity;

/// Extension trait to get the authenticated requester from GraphQL context
pub trait AuthExt {
    /// Get the authenticated identity, or fail with an unauthenticated error
    fn identity(&self) -> Result<&Identity>;
}

impl AuthExt for Context<'_> {
    fn identity(&self) -> Result<&Identity> {
        self.data_opt::<Identity>()
            .ok_or_else(|| ApiError::Unauthorized("Not authenticated!".into()).extend())
    }
}
