use std::{num::NonZeroU32, sync::Arc};

use thiserror::Error;

use crate::application::pagination::{PageRequest, Paginated};
use crate::application::repos::{
    FollowsRepo, GroupsRepo, PostFilter, PostsRepo, RepoError, UsersRepo,
};
use crate::domain::entities::{GroupRecord, PostRecord, UserRecord};

/// Which posts a feed shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedKind {
    Public,
    Group(String),
    Author(String),
    Personalized { follower_id: i64 },
}

/// Header context that goes along with a feed page.
#[derive(Debug, Clone)]
pub enum FeedHeader {
    Public,
    Group(GroupRecord),
    Author(AuthorSummary),
    Personalized,
}

#[derive(Debug, Clone)]
pub struct AuthorSummary {
    pub author: UserRecord,
    pub post_count: u64,
    pub following: bool,
}

#[derive(Debug, Clone)]
pub struct FeedPage {
    pub header: FeedHeader,
    pub posts: Paginated<PostRecord>,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown group `{0}`")]
    UnknownGroup(String),
    #[error("unknown author `{0}`")]
    UnknownAuthor(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
    page_size: NonZeroU32,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        follows: Arc<dyn FollowsRepo>,
        page_size: NonZeroU32,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            follows,
            page_size,
        }
    }

    pub fn page_request(&self, raw_page: Option<&str>) -> PageRequest {
        PageRequest::from_query(raw_page, self.page_size.get())
    }

    /// Build one page of the requested feed, newest posts first.
    ///
    /// `viewer_id` only affects the author header's follow flag.
    pub async fn load(
        &self,
        kind: FeedKind,
        viewer_id: Option<i64>,
        page: PageRequest,
    ) -> Result<FeedPage, FeedError> {
        match kind {
            FeedKind::Public => {
                let posts = self.posts.list_posts(PostFilter::All, page).await?;
                Ok(FeedPage {
                    header: FeedHeader::Public,
                    posts,
                })
            }
            FeedKind::Group(slug) => {
                let group = self
                    .groups
                    .find_group_by_slug(&slug)
                    .await?
                    .ok_or(FeedError::UnknownGroup(slug))?;
                let posts = self
                    .posts
                    .list_posts(PostFilter::Group(group.id), page)
                    .await?;
                Ok(FeedPage {
                    header: FeedHeader::Group(group),
                    posts,
                })
            }
            FeedKind::Author(username) => {
                let author = self
                    .users
                    .find_user_by_username(&username)
                    .await?
                    .ok_or(FeedError::UnknownAuthor(username))?;
                let posts = self
                    .posts
                    .list_posts(PostFilter::Author(author.id), page)
                    .await?;
                let following = match viewer_id {
                    Some(viewer) if viewer != author.id => {
                        self.follows.is_following(viewer, author.id).await?
                    }
                    _ => false,
                };
                Ok(FeedPage {
                    header: FeedHeader::Author(AuthorSummary {
                        post_count: posts.total,
                        author,
                        following,
                    }),
                    posts,
                })
            }
            FeedKind::Personalized { follower_id } => {
                let posts = self
                    .posts
                    .list_posts(PostFilter::FollowedBy(follower_id), page)
                    .await?;
                Ok(FeedPage {
                    header: FeedHeader::Personalized,
                    posts,
                })
            }
        }
    }
}
