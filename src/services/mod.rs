//! Service layer
//!
//! Both API surfaces (REST handlers and GraphQL resolvers) delegate to these
//! services; no business logic lives in the transports.

pub mod auth;
pub mod channel;
pub mod feed;
pub mod uploads;

pub use auth::{AuthConfig, AuthService, Identity, RegisterInput};
pub use channel::{EventChannel, PostEvent, PostEventKind};
pub use feed::{FeedPost, FeedService, PostInput};
pub use uploads::UploadService;
