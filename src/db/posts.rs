//! Posts repository
//!
//! Listings are newest-first (`created_at DESC`) on every path; both API
//! surfaces share this ordering.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::helpers::now_rfc3339;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: String,
    pub title: String,
    pub content: String,
    pub image_url: String,
    pub creator_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A post joined with its creator's display name.
#[derive(Debug, Clone)]
pub struct PostWithCreator {
    pub post: PostRecord,
    pub creator_name: String,
}

#[derive(Debug, Clone)]
pub struct CreatePost {
    pub title: String,
    pub content: String,
    pub image_url: String,
    pub creator_id: String,
}

#[derive(Debug, Clone)]
pub struct UpdatePost {
    pub title: String,
    pub content: String,
    pub image_url: String,
}

pub struct PostsRepository {
    pool: SqlitePool,
}

type PostRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
);

fn row_to_post(r: PostRow) -> PostWithCreator {
    PostWithCreator {
        post: PostRecord {
            id: r.0,
            title: r.1,
            content: r.2,
            image_url: r.3,
            creator_id: r.4,
            created_at: r.5,
            updated_at: r.6,
        },
        creator_name: r.7,
    }
}

const POST_COLUMNS: &str = "p.id, p.title, p.content, p.image_url, p.creator_id, \
                            p.created_at, p.updated_at, u.name";

impl PostsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new post
    pub async fn create(&self, post: CreatePost) -> Result<PostWithCreator> {
        let id = Uuid::new_v4().to_string();
        let now = now_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO posts (id, title, content, image_url, creator_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.image_url)
        .bind(&post.creator_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to create post"))
    }

    /// Get a post with its creator name
    pub async fn get_by_id(&self, id: &str) -> Result<Option<PostWithCreator>> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts p JOIN users u ON u.id = p.creator_id WHERE p.id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_post))
    }

    /// List one page of posts, newest first
    pub async fn list_page(&self, limit: i64, offset: i64) -> Result<Vec<PostWithCreator>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts p JOIN users u ON u.id = p.creator_id \
             ORDER BY p.created_at DESC LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_post).collect())
    }

    /// Count all posts
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    /// Update a post's title, content and image reference
    pub async fn update(&self, id: &str, update: UpdatePost) -> Result<Option<PostWithCreator>> {
        let now = now_rfc3339();
        sqlx::query(
            "UPDATE posts SET title = ?, content = ?, image_url = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&update.title)
        .bind(&update.content)
        .bind(&update.image_url)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// Delete a post
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count posts owned by a user
    pub async fn count_by_creator(&self, creator_id: &str) -> Result<i64> {
        let row = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM posts WHERE creator_id = ?")
            .bind(creator_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}
