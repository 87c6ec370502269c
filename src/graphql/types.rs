//! GraphQL object and input types

use async_graphql::{Enum, ID, InputObject, SimpleObject};

use crate::services::{self, FeedPost, PostEventKind};

/// A feed post
#[derive(Debug, Clone, SimpleObject)]
pub struct Post {
    pub id: ID,
    pub title: String,
    pub content: String,
    pub image_url: String,
    pub creator: Creator,
    pub created_at: String,
    pub updated_at: String,
}

/// The owner of a post, reduced to id and display name
#[derive(Debug, Clone, SimpleObject)]
pub struct Creator {
    pub id: ID,
    pub name: String,
}

impl From<FeedPost> for Post {
    fn from(post: FeedPost) -> Self {
        Self {
            id: ID(post.id),
            title: post.title,
            content: post.content,
            image_url: post.image_url,
            creator: Creator {
                id: ID(post.creator.id),
                name: post.creator.name,
            },
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

/// One page of the feed
#[derive(Debug, Clone, SimpleObject)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub total_items: i64,
}

/// A registered user (password hash never exposed)
#[derive(Debug, Clone, SimpleObject)]
pub struct User {
    pub id: ID,
    pub name: String,
    pub email: String,
    pub status: String,
}

impl From<crate::db::UserRecord> for User {
    fn from(user: crate::db::UserRecord) -> Self {
        Self {
            id: ID(user.id),
            name: user.name,
            email: user.email,
            status: user.status,
        }
    }
}

/// Token issued at login
#[derive(Debug, Clone, SimpleObject)]
pub struct AuthData {
    pub user_id: ID,
    pub token: String,
}

/// Input for user signup
#[derive(Debug, InputObject)]
pub struct SignupInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Input for creating or updating a post
#[derive(Debug, InputObject)]
pub struct PostInput {
    pub title: String,
    pub content: String,
    /// Reference to a previously uploaded image (see `PUT /post-image`)
    pub image_url: Option<String>,
}

impl From<PostInput> for services::PostInput {
    fn from(input: PostInput) -> Self {
        Self {
            title: input.title,
            content: input.content,
            image_url: input.image_url,
        }
    }
}

/// What happened to a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
pub enum PostEventType {
    Created,
    Updated,
    Deleted,
}

impl From<PostEventKind> for PostEventType {
    fn from(kind: PostEventKind) -> Self {
        match kind {
            PostEventKind::Created => Self::Created,
            PostEventKind::Updated => Self::Updated,
            PostEventKind::Deleted => Self::Deleted,
        }
    }
}

/// Subscription payload for feed changes
#[derive(Debug, Clone, SimpleObject)]
pub struct PostEventPayload {
    pub kind: PostEventType,
    pub post: Post,
}
