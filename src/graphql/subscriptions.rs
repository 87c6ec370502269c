//! GraphQL subscriptions for real-time feed updates

use async_graphql::{Context, Result, Subscription};
use futures::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use crate::services::EventChannel;

use super::auth::AuthExt;
use super::types::PostEventPayload;

pub struct SubscriptionRoot;

#[Subscription]
impl SubscriptionRoot {
    /// Subscribe to all feed mutations (created, updated, deleted)
    async fn post_events<'ctx>(
        &self,
        ctx: &Context<'ctx>,
    ) -> Result<impl Stream<Item = PostEventPayload> + 'ctx> {
        ctx.identity()?;
        let events = ctx.data_unchecked::<EventChannel>();
        let receiver = events.subscribe();

        Ok(BroadcastStream::new(receiver).filter_map(|result| {
            result.ok().map(|event| PostEventPayload {
                kind: event.kind.into(),
                post: event.post.into(),
            })
        }))
    }
}
