use crate::server::{
    Result, ServerError, ServerRouter,
    events::{Announcement, EventHub},
    form::PostForm,
    json::Json,
};
use axum::{Router, extract::State};
use axum_extra::routing::{RouterExt, TypedPath};
use pinboard_common::model::post::{Post, PostContent, PostId};
use pinboard_store::{posts::PostStore, upload::UploadDir};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    Router::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_put(update_post)
        .typed_delete(delete_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct ListPostsPath();

async fn list_posts(
    ListPostsPath(): ListPostsPath,
    State(posts): State<Arc<PostStore>>,
) -> Json<Vec<Post>> {
    Json(posts.list().await)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/post", rejection(ServerError))]
struct CreatePostPath();

async fn create_post(
    CreatePostPath(): CreatePostPath,
    State(posts): State<Arc<PostStore>>,
    State(uploads): State<Arc<UploadDir>>,
    State(events): State<EventHub>,
    form: PostForm,
) -> Result<Json<Post>> {
    let image_url = uploads.save_optional(form.image.as_ref()).await?;
    let post = posts.create(PostContent::new(form.comment, image_url)).await;

    info!(id = %post.id, "Created post");
    events.publish(&Announcement::PostAdded(post.clone()));

    Ok(Json(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/post/{id}", rejection(ServerError))]
struct PostPath {
    id: PostId,
}

/// Replaces comment and image wholesale. Leaving out the image clears it.
async fn update_post(
    PostPath { id }: PostPath,
    State(posts): State<Arc<PostStore>>,
    State(uploads): State<Arc<UploadDir>>,
    State(events): State<EventHub>,
    form: PostForm,
) -> Result<Json<Post>> {
    let image_url = uploads.save_optional(form.image.as_ref()).await?;
    let content = PostContent::new(form.comment, image_url.clone());

    let post = match posts.replace(&id, content).await {
        Ok(post) => post,
        Err(err) => {
            if let Some(orphan) = image_url {
                uploads.discard(&orphan).await;
            }
            return Err(err.into());
        }
    };

    info!(%id, "Updated post");
    events.publish(&Announcement::PostUpdated(post.clone()));

    Ok(Json(post))
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
struct DeleteResponse {
    success: bool,
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(posts): State<Arc<PostStore>>,
    State(events): State<EventHub>,
) -> Result<Json<DeleteResponse>> {
    posts.remove(&id).await?;

    info!(%id, "Deleted post");
    events.publish(&Announcement::PostDeleted(id));

    Ok(Json(DeleteResponse { success: true }))
}
