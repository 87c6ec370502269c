//! Feed service
//!
//! Paginated listing and CRUD over posts plus the user status line. Owns the
//! validation and ownership rules so that REST handlers and GraphQL
//! resolvers stay thin.

use std::sync::Arc;

use serde::Serialize;

use crate::db::{CreatePost, Database, PostWithCreator, UpdatePost};
use crate::error::{ApiError, FieldError};

use super::auth::Identity;
use super::channel::{EventChannel, PostEventKind};
use super::uploads::UploadService;

/// Page size for feed listings
pub const PER_PAGE: i64 = 2;

const MIN_FIELD_LEN: usize = 5;

/// A post as exposed by both API surfaces: the record plus its creator's
/// id and name, nothing else about the creator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPost {
    pub id: String,
    pub title: String,
    pub content: String,
    pub image_url: String,
    pub creator: Creator,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Creator {
    pub id: String,
    pub name: String,
}

impl From<PostWithCreator> for FeedPost {
    fn from(row: PostWithCreator) -> Self {
        Self {
            id: row.post.id,
            title: row.post.title,
            content: row.post.content,
            image_url: row.post.image_url,
            creator: Creator {
                id: row.post.creator_id,
                name: row.creator_name,
            },
            created_at: row.post.created_at,
            updated_at: row.post.updated_at,
        }
    }
}

/// Input for creating or updating a post
#[derive(Debug, Clone)]
pub struct PostInput {
    pub title: String,
    pub content: String,
    /// Reference to an already stored image; `None` means no image was
    /// supplied, which is a validation failure.
    pub image_url: Option<String>,
}

#[derive(Clone)]
pub struct FeedService {
    db: Database,
    uploads: Arc<UploadService>,
    events: EventChannel,
}

impl FeedService {
    pub fn new(db: Database, uploads: Arc<UploadService>, events: EventChannel) -> Self {
        Self {
            db,
            uploads,
            events,
        }
    }

    /// List one page of posts (newest first) with the total item count.
    /// Pages are 1-based; anything below 1 is treated as the first page,
    /// and the upper bound keeps the offset multiply from overflowing.
    pub async fn list_posts(&self, page: Option<i64>) -> Result<(Vec<FeedPost>, i64), ApiError> {
        let page = page.unwrap_or(1).clamp(1, i64::MAX / PER_PAGE);
        let posts_repo = self.db.posts();

        let total_items = posts_repo.count().await?;
        let posts = posts_repo
            .list_page(PER_PAGE, (page - 1) * PER_PAGE)
            .await?
            .into_iter()
            .map(FeedPost::from)
            .collect();

        Ok((posts, total_items))
    }

    /// Create a post owned by the requester
    pub async fn create_post(
        &self,
        owner: &Identity,
        input: PostInput,
    ) -> Result<FeedPost, ApiError> {
        let (title, content, image_url) = validate_post_input(&input)?;

        // The token may outlive the account.
        let user = self
            .db
            .users()
            .get_by_id(&owner.user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found.".into()))?;

        let post: FeedPost = self
            .db
            .posts()
            .create(CreatePost {
                title,
                content,
                image_url,
                creator_id: user.id,
            })
            .await?
            .into();

        tracing::info!(post_id = %post.id, user_id = %owner.user_id, "post created");
        self.events.publish(PostEventKind::Created, post.clone());
        Ok(post)
    }

    /// Fetch a single post
    pub async fn get_post(&self, id: &str) -> Result<FeedPost, ApiError> {
        self.db
            .posts()
            .get_by_id(id)
            .await?
            .map(FeedPost::from)
            .ok_or_else(|| ApiError::NotFound("Could not find post.".into()))
    }

    /// Update a post; only its owner may do so. A changed image reference
    /// schedules best-effort deletion of the previous file.
    pub async fn update_post(
        &self,
        requester: &Identity,
        id: &str,
        input: PostInput,
    ) -> Result<FeedPost, ApiError> {
        let (title, content, image_url) = validate_post_input(&input)?;

        let existing = self
            .db
            .posts()
            .get_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Could not find post.".into()))?;

        if existing.post.creator_id != requester.user_id {
            return Err(ApiError::Forbidden("Not authorized!".into()));
        }

        if image_url != existing.post.image_url {
            self.uploads.delete_stored(&existing.post.image_url);
        }

        let post: FeedPost = self
            .db
            .posts()
            .update(
                id,
                UpdatePost {
                    title,
                    content,
                    image_url,
                },
            )
            .await?
            .ok_or_else(|| ApiError::NotFound("Could not find post.".into()))?
            .into();

        tracing::info!(post_id = %post.id, user_id = %requester.user_id, "post updated");
        self.events.publish(PostEventKind::Updated, post.clone());
        Ok(post)
    }

    /// Delete a post; only its owner may do so. The stored image goes with
    /// it (best-effort), and the row removal is also the removal of the
    /// owner's back-reference.
    pub async fn delete_post(&self, requester: &Identity, id: &str) -> Result<FeedPost, ApiError> {
        let existing = self
            .db
            .posts()
            .get_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Could not find post.".into()))?;

        if existing.post.creator_id != requester.user_id {
            return Err(ApiError::Forbidden("Not authorized!".into()));
        }

        self.uploads.delete_stored(&existing.post.image_url);
        self.db.posts().delete(id).await?;

        let post: FeedPost = existing.into();
        tracing::info!(post_id = %post.id, user_id = %requester.user_id, "post deleted");
        self.events.publish(PostEventKind::Deleted, post.clone());
        Ok(post)
    }

    /// Get the requester's status line
    pub async fn get_status(&self, user_id: &str) -> Result<String, ApiError> {
        let user = self
            .db
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found.".into()))?;
        Ok(user.status)
    }

    /// Replace the requester's status line
    pub async fn update_status(&self, user_id: &str, status: &str) -> Result<String, ApiError> {
        let status = status.trim();
        if status.is_empty() {
            return Err(ApiError::validation(
                "Validation failed, form data is incorrect!",
                vec![FieldError::new("status", "Status must not be empty.")],
            ));
        }

        let user = self
            .db
            .users()
            .update_status(user_id, status)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found.".into()))?;
        Ok(user.status)
    }
}

/// Shared request-shape validation for create and update. Returns the
/// trimmed fields on success.
fn validate_post_input(input: &PostInput) -> Result<(String, String, String), ApiError> {
    let title = input.title.trim();
    let content = input.content.trim();

    let mut errors = Vec::new();
    if title.chars().count() < MIN_FIELD_LEN {
        errors.push(FieldError::new("title", "Title too short!"));
    }
    if content.chars().count() < MIN_FIELD_LEN {
        errors.push(FieldError::new("content", "Content too short!"));
    }
    let image_url = match input.image_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => {
            errors.push(FieldError::new("image", "No image provided."));
            String::new()
        }
    };

    if !errors.is_empty() {
        return Err(ApiError::validation(
            "Validation failed, form data is incorrect!",
            errors,
        ));
    }

    Ok((title.to_string(), content.to_string(), image_url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CreateUser;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    struct Harness {
        _dir: tempfile::TempDir,
        db: Database,
        feed: FeedService,
        events: EventChannel,
        uploads: Arc<UploadService>,
    }

    async fn setup() -> Harness {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}/test.db?mode=rwc", dir.path().display());
        let db = Database::connect(&url).await.expect("connect");
        db.migrate().await.expect("migrate");

        let uploads = Arc::new(UploadService::new(dir.path().join("uploads")));
        uploads.ensure_root().await.expect("uploads dir");
        let events = EventChannel::default();
        let feed = FeedService::new(db.clone(), uploads.clone(), events.clone());

        Harness {
            _dir: dir,
            db,
            feed,
            events,
            uploads,
        }
    }

    async fn make_user(db: &Database, name: &str, email: &str) -> Identity {
        let user = db
            .users()
            .create(CreateUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash: "x".to_string(),
                status: "I am new".to_string(),
            })
            .await
            .expect("create user");
        Identity {
            user_id: user.id,
            email: user.email,
        }
    }

    fn input(title: &str, image: Option<&str>) -> PostInput {
        PostInput {
            title: title.to_string(),
            content: "Some worthwhile content".to_string(),
            image_url: image.map(String::from),
        }
    }

    /// Poll until the spawned best-effort deletion has run.
    async fn wait_until_gone(path: &std::path::Path) -> bool {
        for _ in 0..100 {
            if !path.exists() {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn create_requires_title_content_and_image() {
        let h = setup().await;
        let owner = make_user(&h.db, "Al", "a@b.com").await;

        let err = h
            .feed
            .create_post(&owner, input("Hi", None))
            .await
            .unwrap_err();
        assert_matches!(&err, ApiError::Validation { data, .. } if data.len() == 2);

        let err = h
            .feed
            .create_post(&owner, input("Long enough", None))
            .await
            .unwrap_err();
        let fields: Vec<&str> = err.data().iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["image"]);
    }

    #[tokio::test]
    async fn create_for_vanished_owner_is_not_found() {
        let h = setup().await;
        let ghost = Identity {
            user_id: "no-such-user".to_string(),
            email: "ghost@b.com".to_string(),
        };
        let err = h
            .feed
            .create_post(&ghost, input("A fine title", Some("uploads/a.png")))
            .await
            .unwrap_err();
        assert_matches!(err, ApiError::NotFound(_));
    }

    #[tokio::test]
    async fn pagination_is_newest_first_with_total() {
        let h = setup().await;
        let owner = make_user(&h.db, "Al", "a@b.com").await;

        for i in 1..=5 {
            h.feed
                .create_post(&owner, input(&format!("Post number {i}"), Some("uploads/p.png")))
                .await
                .expect("create");
            tokio::time::sleep(std::time::Duration::from_millis(3)).await;
        }

        let (page1, total) = h.feed.list_posts(Some(1)).await.expect("page 1");
        assert_eq!(total, 5);
        assert_eq!(page1.len(), 2);
        assert_eq!(page1[0].title, "Post number 5");
        assert_eq!(page1[1].title, "Post number 4");

        // Page 2 over 5 posts holds exactly the 3rd and 4th newest.
        let (page2, total) = h.feed.list_posts(Some(2)).await.expect("page 2");
        assert_eq!(total, 5);
        assert_eq!(page2.len(), 2);
        assert_eq!(page2[0].title, "Post number 3");
        assert_eq!(page2[1].title, "Post number 2");

        let (page3, _) = h.feed.list_posts(Some(3)).await.expect("page 3");
        assert_eq!(page3.len(), 1);
        assert_eq!(page3[0].title, "Post number 1");

        // Absent and out-of-range pages default to the first page.
        let (default_page, _) = h.feed.list_posts(None).await.expect("default");
        assert_eq!(default_page[0].title, "Post number 5");
    }

    #[tokio::test]
    async fn absurd_page_numbers_yield_an_empty_page() {
        let h = setup().await;
        let owner = make_user(&h.db, "Al", "a@b.com").await;
        h.feed
            .create_post(&owner, input("A fine title", Some("uploads/a.png")))
            .await
            .expect("create");

        // Must not overflow the offset computation, just run off the end.
        let (posts, total) = h.feed.list_posts(Some(i64::MAX)).await.expect("list");
        assert_eq!(total, 1);
        assert!(posts.is_empty());

        let (posts, _) = h.feed.list_posts(Some(i64::MIN)).await.expect("list");
        assert_eq!(posts.len(), 1);
    }

    #[tokio::test]
    async fn only_the_owner_may_update_or_delete() {
        let h = setup().await;
        let owner = make_user(&h.db, "Al", "a@b.com").await;
        let intruder = make_user(&h.db, "Bo", "b@b.com").await;

        let post = h
            .feed
            .create_post(&owner, input("A fine title", Some("uploads/a.png")))
            .await
            .expect("create");

        let err = h
            .feed
            .update_post(&intruder, &post.id, input("Another title", Some("uploads/a.png")))
            .await
            .unwrap_err();
        assert_matches!(err, ApiError::Forbidden(_));

        let err = h.feed.delete_post(&intruder, &post.id).await.unwrap_err();
        assert_matches!(err, ApiError::Forbidden(_));

        // Still intact for the owner.
        let fetched = h.feed.get_post(&post.id).await.expect("get");
        assert_eq!(fetched.title, "A fine title");
    }

    #[tokio::test]
    async fn update_with_new_image_deletes_the_old_file() {
        let h = setup().await;
        let owner = make_user(&h.db, "Al", "a@b.com").await;

        let png = [
            0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D,
        ];
        let old_url = h
            .uploads
            .store_image("old.png", Some("image/png"), &png)
            .await
            .expect("store");
        let old_path = h.uploads.resolve_stored(&old_url).expect("resolve");

        let post = h
            .feed
            .create_post(&owner, input("A fine title", Some(&old_url)))
            .await
            .expect("create");

        let updated = h
            .feed
            .update_post(&owner, &post.id, input("A finer title", Some("uploads/new.png")))
            .await
            .expect("update");

        assert_eq!(updated.title, "A finer title");
        assert_eq!(updated.image_url, "uploads/new.png");
        assert!(wait_until_gone(&old_path).await, "old image not deleted");
    }

    #[tokio::test]
    async fn unchanged_image_is_kept_on_update() {
        let h = setup().await;
        let owner = make_user(&h.db, "Al", "a@b.com").await;

        let png = [
            0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D,
        ];
        let url = h
            .uploads
            .store_image("keep.png", Some("image/png"), &png)
            .await
            .expect("store");
        let path = h.uploads.resolve_stored(&url).expect("resolve");

        let post = h
            .feed
            .create_post(&owner, input("A fine title", Some(&url)))
            .await
            .expect("create");
        h.feed
            .update_post(&owner, &post.id, input("A finer title", Some(&url)))
            .await
            .expect("update");

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(path.exists(), "unchanged image must not be deleted");
    }

    #[tokio::test]
    async fn delete_removes_post_and_back_reference() {
        let h = setup().await;
        let owner = make_user(&h.db, "Al", "a@b.com").await;
        let mut rx = h.events.subscribe();

        let post = h
            .feed
            .create_post(&owner, input("A fine title", Some("uploads/a.png")))
            .await
            .expect("create");
        assert_eq!(h.db.posts().count_by_creator(&owner.user_id).await.unwrap(), 1);

        let deleted = h.feed.delete_post(&owner, &post.id).await.expect("delete");
        assert_eq!(deleted.id, post.id);

        assert_matches!(
            h.feed.get_post(&post.id).await.unwrap_err(),
            ApiError::NotFound(_)
        );
        assert_eq!(h.db.posts().count_by_creator(&owner.user_id).await.unwrap(), 0);

        // Created then Deleted events, in order.
        assert_eq!(rx.recv().await.unwrap().kind, PostEventKind::Created);
        assert_eq!(rx.recv().await.unwrap().kind, PostEventKind::Deleted);
    }

    #[tokio::test]
    async fn status_roundtrip_and_validation() {
        let h = setup().await;
        let owner = make_user(&h.db, "Al", "a@b.com").await;

        assert_eq!(h.feed.get_status(&owner.user_id).await.unwrap(), "I am new");

        let updated = h
            .feed
            .update_status(&owner.user_id, "Shipping things")
            .await
            .expect("update");
        assert_eq!(updated, "Shipping things");
        assert_eq!(
            h.feed.get_status(&owner.user_id).await.unwrap(),
            "Shipping things"
        );

        assert_matches!(
            h.feed.update_status(&owner.user_id, "   ").await.unwrap_err(),
            ApiError::Validation { .. }
        );
        assert_matches!(
            h.feed.get_status("missing").await.unwrap_err(),
            ApiError::NotFound(_)
        );
    }
}
