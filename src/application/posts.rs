use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostFilter, PostsRepo,
    RepoError, UpdatePostParams,
};
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};
use crate::domain::posts::{normalize_comment_text, validate_image, validate_post_text};
use crate::infra::uploads::{UploadStorage, UploadStorageError};

const SOURCE: &str = "application::posts";

/// Submitted post form, before validation.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostRecord,
    pub author_post_count: u64,
    pub comments: Vec<CommentRecord>,
}

#[derive(Debug, Error)]
pub enum PostError {
    #[error("post not found")]
    NotFound,
    #[error("only the author may edit post {0}")]
    NotOwner(i64),
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("failed to store image")]
    Storage(#[from] UploadStorageError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl PostError {
    fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    comments: Arc<dyn CommentsRepo>,
    uploads: Arc<UploadStorage>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        comments: Arc<dyn CommentsRepo>,
        uploads: Arc<UploadStorage>,
    ) -> Self {
        Self {
            posts,
            groups,
            comments,
            uploads,
        }
    }

    pub async fn groups(&self) -> Result<Vec<GroupRecord>, PostError> {
        Ok(self.groups.list_groups().await?)
    }

    pub async fn total_posts(&self) -> Result<u64, PostError> {
        Ok(self.posts.count_posts(PostFilter::All).await?)
    }

    pub async fn find(&self, id: i64) -> Result<PostRecord, PostError> {
        self.posts
            .find_post_by_id(id)
            .await?
            .ok_or(PostError::NotFound)
    }

    pub async fn detail(&self, id: i64) -> Result<PostDetail, PostError> {
        let post = self.find(id).await?;
        let author_post_count = self
            .posts
            .count_posts(PostFilter::Author(post.author_id))
            .await?;
        let comments = self.comments.list_comments_for_post(post.id).await?;

        Ok(PostDetail {
            post,
            author_post_count,
            comments,
        })
    }

    pub async fn create(
        &self,
        author: &UserRecord,
        draft: PostDraft,
    ) -> Result<PostRecord, PostError> {
        let text = validate_post_text(&draft.text)
            .map_err(|err| PostError::validation("text", err.to_string()))?;
        let group_id = self.resolve_group(draft.group_id).await?;
        let image = self.store_image(draft.image).await?;

        let params = CreatePostParams {
            author_id: author.id,
            text,
            group_id,
            image: image.clone(),
        };

        match self.posts.create_post(params).await {
            Ok(post) => {
                info!(
                    target = SOURCE,
                    post_id = post.id,
                    author = %author.username,
                    "post created"
                );
                Ok(post)
            }
            Err(err) => {
                self.discard_image(image.as_deref()).await;
                Err(err.into())
            }
        }
    }

    /// Replace text, group and (when a new one is uploaded) image of an existing post.
    pub async fn update(
        &self,
        editor: &UserRecord,
        post_id: i64,
        draft: PostDraft,
    ) -> Result<PostRecord, PostError> {
        let existing = self.find(post_id).await?;
        if existing.author_id != editor.id {
            return Err(PostError::NotOwner(post_id));
        }

        let text = validate_post_text(&draft.text)
            .map_err(|err| PostError::validation("text", err.to_string()))?;
        let group_id = self.resolve_group(draft.group_id).await?;
        let uploaded = self.store_image(draft.image).await?;
        let image = uploaded.clone().or(existing.image.clone());

        let params = UpdatePostParams {
            id: post_id,
            text,
            group_id,
            image,
        };

        match self.posts.update_post(params).await {
            Ok(post) => {
                info!(target = SOURCE, post_id = post.id, "post updated");
                if uploaded.is_some() {
                    self.discard_image(existing.image.as_deref()).await;
                }
                Ok(post)
            }
            Err(err) => {
                self.discard_image(uploaded.as_deref()).await;
                Err(err.into())
            }
        }
    }

    /// Store a comment; blank text is ignored and yields `None`.
    pub async fn add_comment(
        &self,
        author: &UserRecord,
        post_id: i64,
        text: &str,
    ) -> Result<Option<CommentRecord>, PostError> {
        let post = self.find(post_id).await?;
        let Some(text) = normalize_comment_text(text) else {
            return Ok(None);
        };

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id: post.id,
                author_id: author.id,
                text,
            })
            .await?;
        Ok(Some(comment))
    }

    async fn resolve_group(&self, group_id: Option<i64>) -> Result<Option<i64>, PostError> {
        let Some(id) = group_id else {
            return Ok(None);
        };
        match self.groups.find_group_by_id(id).await? {
            Some(group) => Ok(Some(group.id)),
            None => Err(PostError::validation(
                "group",
                "select a valid group from the list",
            )),
        }
    }

    async fn store_image(&self, image: Option<ImageUpload>) -> Result<Option<String>, PostError> {
        let Some(image) = image else {
            return Ok(None);
        };
        validate_image(&image.bytes)
            .map_err(|err| PostError::validation("image", err.to_string()))?;
        let stored = self
            .uploads
            .store(&image.filename, image.bytes)
            .await?;
        Ok(Some(stored.stored_path))
    }

    async fn discard_image(&self, stored_path: Option<&str>) {
        let Some(path) = stored_path else {
            return;
        };
        if let Err(err) = self.uploads.delete(path).await {
            warn!(
                target = SOURCE,
                path,
                error = %err,
                "failed to remove orphaned image"
            );
        }
    }
}
