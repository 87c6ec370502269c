//! Feed endpoints: post CRUD, status, and image upload
//!
//! Post create/update arrive as multipart forms (the image travels with the
//! fields); everything else is JSON.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::AppState;
use crate::error::ApiError;
use crate::services::{Identity, PostInput};

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
}

fn bad_multipart(err: axum::extract::multipart::MultipartError) -> ApiError {
    tracing::debug!(error = %err, "malformed multipart request");
    ApiError::validation("Invalid multipart form data.", vec![])
}

/// Fields of a multipart post form. An `image` part with a file name (or
/// content type) is an upload; a bare text part carries an existing stored
/// reference, which is how update keeps the current image.
#[derive(Default)]
struct PostForm {
    title: String,
    content: String,
    image_url: Option<String>,
}

async fn read_post_form(state: &AppState, multipart: &mut Multipart) -> Result<PostForm, ApiError> {
    let mut form = PostForm::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => form.title = field.text().await.map_err(bad_multipart)?,
            "content" => form.content = field.text().await.map_err(bad_multipart)?,
            "image" => {
                if field.file_name().is_some() || field.content_type().is_some() {
                    let name = field.file_name().unwrap_or("image").to_string();
                    let declared = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(bad_multipart)?;
                    let url = state
                        .uploads
                        .store_image(&name, declared.as_deref(), &bytes)
                        .await?;
                    form.image_url = Some(url);
                } else {
                    let existing = field.text().await.map_err(bad_multipart)?;
                    if !existing.is_empty() {
                        form.image_url = Some(existing);
                    }
                }
            }
            other => {
                tracing::debug!(field = other, "ignoring unknown multipart field");
            }
        }
    }

    Ok(form)
}

impl From<PostForm> for PostInput {
    fn from(form: PostForm) -> Self {
        Self {
            title: form.title,
            content: form.content,
            image_url: form.image_url,
        }
    }
}

/// GET /feed/posts?page=N
async fn list_posts(
    State(state): State<AppState>,
    _identity: Identity,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (posts, total_items) = state.feed.list_posts(query.page).await?;
    Ok(Json(json!({
        "message": "Fetched posts successfully.",
        "posts": posts,
        "totalItems": total_items,
    })))
}

/// POST /feed/post
async fn create_post(
    State(state): State<AppState>,
    identity: Identity,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_post_form(&state, &mut multipart).await?;
    let post = state.feed.create_post(&identity, form.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Post created successfully!",
            "post": &post,
            "creator": &post.creator,
        })),
    ))
}

/// GET /feed/posts/{id}
async fn get_post(
    State(state): State<AppState>,
    _identity: Identity,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.feed.get_post(&id).await?;
    Ok(Json(json!({ "message": "Post fetched.", "post": post })))
}

/// PUT /feed/posts/{id}
async fn update_post(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_post_form(&state, &mut multipart).await?;
    let post = state.feed.update_post(&identity, &id, form.into()).await?;
    Ok(Json(json!({ "message": "Post updated!", "post": post })))
}

/// DELETE /feed/posts/{id}
async fn delete_post(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.feed.delete_post(&identity, &id).await?;
    Ok(Json(json!({ "message": "Deleted post.", "post": post })))
}

/// GET /feed/status
async fn get_status(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    let status = state.feed.get_status(&identity.user_id).await?;
    Ok(Json(json!({ "status": status })))
}

/// PUT /feed/status
async fn update_status(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<StatusBody>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state
        .feed
        .update_status(&identity.user_id, &body.status)
        .await?;
    Ok(Json(json!({ "message": "Status updated.", "status": status })))
}

/// PUT /post-image
///
/// Stores an image ahead of a GraphQL post mutation and returns its path.
/// An optional `oldPath` part names a superseded file, deleted best-effort.
async fn upload_post_image(
    State(state): State<AppState>,
    _identity: Identity,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut file_path: Option<String> = None;
    let mut old_path: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let part = field.name().unwrap_or_default().to_string();
        match part.as_str() {
            "image" => {
                let name = field.file_name().unwrap_or("image").to_string();
                let declared = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                file_path = Some(
                    state
                        .uploads
                        .store_image(&name, declared.as_deref(), &bytes)
                        .await?,
                );
            }
            "oldPath" => old_path = Some(field.text().await.map_err(bad_multipart)?),
            _ => {}
        }
    }

    let file_path = file_path.ok_or_else(|| {
        ApiError::validation(
            "Validation failed, form data is incorrect!",
            vec![crate::error::FieldError::new("image", "No image provided.")],
        )
    })?;

    if let Some(old) = old_path.filter(|p| !p.is_empty() && *p != file_path) {
        state.uploads.delete_stored(&old);
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "File stored.", "filePath": file_path })),
    ))
}

/// Routes nested under /feed
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts))
        .route("/post", post(create_post))
        .route(
            "/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/status", get(get_status).put(update_status))
}

/// Top-level upload route used by the GraphQL front-end
pub fn image_router() -> Router<AppState> {
    Router::new().route("/post-image", put(upload_post_image))
}
