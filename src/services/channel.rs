//! Post event channel
//!
//! A broadcast channel for feed mutations, handed explicitly to the
//! components that publish or subscribe (no global handle). Delivery is
//! best-effort: a send with no live receivers is not an error.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::feed::FeedPost;

/// What happened to a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostEventKind {
    Created,
    Updated,
    Deleted,
}

/// Event broadcast whenever a post is mutated
#[derive(Debug, Clone)]
pub struct PostEvent {
    pub kind: PostEventKind,
    pub post: FeedPost,
}

/// Handle to the post event broadcast channel
#[derive(Clone)]
pub struct EventChannel {
    sender: broadcast::Sender<PostEvent>,
}

impl EventChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers
    pub fn publish(&self, kind: PostEventKind, post: FeedPost) {
        let receivers = self.sender.receiver_count();
        if self.sender.send(PostEvent { kind, post }).is_err() {
            tracing::debug!(?kind, "post event dropped, no subscribers");
        } else {
            tracing::debug!(?kind, receivers, "post event published");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PostEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new(256)
    }
}
