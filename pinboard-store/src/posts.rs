use pinboard_common::model::post::{Post, PostContent, PostId};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Post with id {0} was not found.")]
pub struct PostNotFoundError(pub PostId);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Post with id {0} already exists.")]
pub struct DuplicatePostIdError(pub PostId);

/// Insertion-ordered posts held in memory for the lifetime of the process.
///
/// All mutations take the write lock, so concurrent requests never observe a
/// half-applied change.
#[derive(Debug, Default)]
pub struct PostStore {
    posts: RwLock<Vec<Post>>,
}

impl PostStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn list(&self) -> Vec<Post> {
        self.posts.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.posts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.posts.read().await.is_empty()
    }

    pub async fn append(&self, post: Post) -> Result<(), DuplicatePostIdError> {
        let mut posts = self.posts.write().await;
        if position(&posts, &post.id).is_some() {
            return Err(DuplicatePostIdError(post.id));
        }

        posts.push(post);
        Ok(())
    }

    /// Assigns a fresh id that is not yet in the store and appends the post.
    pub async fn create(&self, content: PostContent) -> Post {
        self.create_with(content, PostId::generate).await
    }

    async fn create_with(
        &self,
        content: PostContent,
        mut generate_id: impl FnMut() -> PostId,
    ) -> Post {
        let mut posts = self.posts.write().await;

        let id = loop {
            let id = generate_id();
            if position(&posts, &id).is_none() {
                break id;
            }
            warn!(%id, "Generated post id is already taken, retrying");
        };

        let post = Post { id, content };
        posts.push(post.clone());
        debug!(id = %post.id, count = posts.len(), "Appended post");

        post
    }

    /// Replaces the post's content in place, keeping its id and position.
    pub async fn replace(
        &self,
        id: &PostId,
        content: PostContent,
    ) -> Result<Post, PostNotFoundError> {
        let mut posts = self.posts.write().await;
        let index = position(&posts, id).ok_or_else(|| PostNotFoundError(id.clone()))?;

        let post = Post {
            id: id.clone(),
            content,
        };
        posts[index] = post.clone();

        Ok(post)
    }

    pub async fn remove(&self, id: &PostId) -> Result<Post, PostNotFoundError> {
        let mut posts = self.posts.write().await;
        let index = position(&posts, id).ok_or_else(|| PostNotFoundError(id.clone()))?;

        Ok(posts.remove(index))
    }
}

fn position(posts: &[Post], id: &PostId) -> Option<usize> {
    posts.iter().position(|post| post.id == *id)
}
