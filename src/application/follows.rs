use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    Removed,
    NotFollowing,
    /// Following yourself is silently ignored.
    SelfIgnored,
}

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("unknown author `{0}`")]
    UnknownAuthor(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UsersRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { users, follows }
    }

    pub async fn follow(
        &self,
        follower: &UserRecord,
        username: &str,
    ) -> Result<FollowOutcome, FollowError> {
        let author = self.author(username).await?;
        if author.id == follower.id {
            return Ok(FollowOutcome::SelfIgnored);
        }

        let outcome = if self.follows.follow(follower.id, author.id).await? {
            FollowOutcome::Created
        } else {
            FollowOutcome::AlreadyFollowing
        };
        debug!(follower = %follower.username, author = %author.username, ?outcome, "follow");
        Ok(outcome)
    }

    pub async fn unfollow(
        &self,
        follower: &UserRecord,
        username: &str,
    ) -> Result<FollowOutcome, FollowError> {
        let author = self.author(username).await?;
        if author.id == follower.id {
            return Ok(FollowOutcome::SelfIgnored);
        }

        let outcome = if self.follows.unfollow(follower.id, author.id).await? {
            FollowOutcome::Removed
        } else {
            FollowOutcome::NotFollowing
        };
        debug!(follower = %follower.username, author = %author.username, ?outcome, "unfollow");
        Ok(outcome)
    }

    async fn author(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| FollowError::UnknownAuthor(username.to_string()))
    }
}
