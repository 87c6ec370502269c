//! GraphQL schema definition with queries, mutations, and subscriptions

use std::sync::Arc;

use async_graphql::{Context, ErrorExtensions, Object, Result, Schema};

use crate::services::{AuthService, EventChannel, FeedService, RegisterInput};

use super::auth::AuthExt;
use super::subscriptions::SubscriptionRoot;
use super::types::{AuthData, Post, PostInput, PostPage, SignupInput, User};

/// The GraphQL schema type
pub type FeedSchema = Schema<QueryRoot, MutationRoot, SubscriptionRoot>;

/// Build the GraphQL schema with all resolvers and their dependencies
pub fn build_schema(
    auth_service: AuthService,
    feed_service: Arc<FeedService>,
    events: EventChannel,
) -> FeedSchema {
    Schema::build(QueryRoot, MutationRoot, SubscriptionRoot)
        .data(auth_service)
        .data(feed_service)
        .data(events)
        .finish()
}

// ============================================================================
// Query Root
// ============================================================================

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Authenticate with email and password, returning a bearer token.
    ///
    /// No authentication required.
    async fn login(&self, ctx: &Context<'_>, email: String, password: String) -> Result<AuthData> {
        let auth = ctx.data_unchecked::<AuthService>();
        let (token, user_id) = auth
            .login(&email, &password)
            .await
            .map_err(|e| e.extend())?;
        Ok(AuthData {
            user_id: user_id.into(),
            token,
        })
    }

    /// One page of the feed, newest first
    #[graphql(name = "getPosts")]
    async fn posts(&self, ctx: &Context<'_>, page: Option<i64>) -> Result<PostPage> {
        ctx.identity()?;
        let feed = ctx.data_unchecked::<Arc<FeedService>>();
        let (posts, total_items) = feed.list_posts(page).await.map_err(|e| e.extend())?;
        Ok(PostPage {
            posts: posts.into_iter().map(Post::from).collect(),
            total_items,
        })
    }

    /// A single post by id
    #[graphql(name = "getPost")]
    async fn post(&self, ctx: &Context<'_>, id: String) -> Result<Post> {
        ctx.identity()?;
        let feed = ctx.data_unchecked::<Arc<FeedService>>();
        Ok(feed.get_post(&id).await.map_err(|e| e.extend())?.into())
    }

    /// The current user's status line
    #[graphql(name = "getStatus")]
    async fn status(&self, ctx: &Context<'_>) -> Result<String> {
        let identity = ctx.identity()?;
        let feed = ctx.data_unchecked::<Arc<FeedService>>();
        feed.get_status(&identity.user_id)
            .await
            .map_err(|e| e.extend())
    }
}

// ============================================================================
// Mutation Root
// ============================================================================

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Register a new user account.
    ///
    /// No authentication required.
    async fn create_user(&self, ctx: &Context<'_>, input: SignupInput) -> Result<User> {
        let auth = ctx.data_unchecked::<AuthService>();
        let user = auth
            .register(RegisterInput {
                name: input.name,
                email: input.email,
                password: input.password,
            })
            .await
            .map_err(|e| e.extend())?;
        Ok(user.into())
    }

    /// Create a post owned by the current user
    async fn create_post(&self, ctx: &Context<'_>, input: PostInput) -> Result<Post> {
        let identity = ctx.identity()?.clone();
        let feed = ctx.data_unchecked::<Arc<FeedService>>();
        Ok(feed
            .create_post(&identity, input.into())
            .await
            .map_err(|e| e.extend())?
            .into())
    }

    /// Update a post; only its owner may do so
    async fn update_post(&self, ctx: &Context<'_>, id: String, input: PostInput) -> Result<Post> {
        let identity = ctx.identity()?.clone();
        let feed = ctx.data_unchecked::<Arc<FeedService>>();
        Ok(feed
            .update_post(&identity, &id, input.into())
            .await
            .map_err(|e| e.extend())?
            .into())
    }

    /// Delete a post; only its owner may do so
    async fn delete_post(&self, ctx: &Context<'_>, id: String) -> Result<Post> {
        let identity = ctx.identity()?.clone();
        let feed = ctx.data_unchecked::<Arc<FeedService>>();
        Ok(feed
            .delete_post(&identity, &id)
            .await
            .map_err(|e| e.extend())?
            .into())
    }

    /// Replace the current user's status line
    async fn update_status(&self, ctx: &Context<'_>, status: String) -> Result<String> {
        let identity = ctx.identity()?.clone();
        let feed = ctx.data_unchecked::<Arc<FeedService>>();
        feed.update_status(&identity.user_id, &status)
            .await
            .map_err(|e| e.extend())
    }
}
