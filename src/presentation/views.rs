use crate::application::error::{ErrorReport, HttpError};
use crate::application::feed::AuthorSummary;
use crate::application::guard::Viewer;
use crate::application::pagination::Paginated;
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

const DISPLAY_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[day] [month repr:short] [year], [hour]:[minute]");

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(navigation: NavigationView) -> Response {
    let view = LayoutContext::new(navigation, "Page not found", ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Top bar state: who is signed in, if anyone.
#[derive(Clone, Default)]
pub struct NavigationView {
    pub viewer: Option<String>,
}

impl NavigationView {
    pub fn for_viewer(viewer: &Viewer) -> Self {
        Self {
            viewer: viewer.username().map(str::to_string),
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub navigation: NavigationView,
    pub title: String,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(navigation: NavigationView, title: impl Into<String>, content: T) -> Self {
        Self {
            navigation,
            title: title.into(),
            content,
        }
    }
}

pub fn format_date(value: OffsetDateTime) -> String {
    value.format(DISPLAY_DATE).unwrap_or_default()
}

pub fn media_url(stored_path: &str) -> String {
    format!("/media/{stored_path}")
}

#[derive(Clone)]
pub struct GroupLink {
    pub slug: String,
    pub title: String,
}

#[derive(Clone)]
pub struct PostCard {
    pub id: i64,
    pub text: String,
    pub image_url: Option<String>,
    pub published: String,
    pub author_username: String,
    pub group: Option<GroupLink>,
}

impl From<PostRecord> for PostCard {
    fn from(post: PostRecord) -> Self {
        Self {
            id: post.id,
            image_url: post.image.as_deref().map(media_url),
            published: format_date(post.created_at),
            author_username: post.author_username,
            group: post.group.map(|group| GroupLink {
                slug: group.slug,
                title: group.title,
            }),
            text: post.text,
        }
    }
}

/// Page links rendered below a feed.
#[derive(Clone)]
pub struct PaginationView {
    pub number: u32,
    pub num_pages: u32,
    pub previous: Option<u32>,
    pub next: Option<u32>,
}

impl PaginationView {
    pub fn from_page<T>(page: &Paginated<T>) -> Self {
        Self {
            number: page.number,
            num_pages: page.num_pages(),
            previous: page.previous_number(),
            next: page.next_number(),
        }
    }

    pub fn is_paginated(&self) -> bool {
        self.num_pages > 1
    }
}

pub struct FeedContent {
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
}

impl FeedContent {
    pub fn from_page(page: Paginated<PostRecord>) -> Self {
        let pagination = PaginationView::from_page(&page);
        Self {
            posts: page.items.into_iter().map(PostCard::from).collect(),
            pagination,
        }
    }
}

#[derive(Template)]
#[template(path = "posts/index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<FeedContent>,
}

pub struct GroupFeedContent {
    pub title: String,
    pub description: String,
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
}

impl GroupFeedContent {
    pub fn new(group: GroupRecord, feed: FeedContent) -> Self {
        Self {
            title: group.title,
            description: group.description,
            posts: feed.posts,
            pagination: feed.pagination,
        }
    }
}

#[derive(Template)]
#[template(path = "posts/group_list.html")]
pub struct GroupFeedTemplate {
    pub view: LayoutContext<GroupFeedContent>,
}

pub struct ProfileContent {
    pub username: String,
    pub post_count: u64,
    /// Signed-in visitor looking at someone else's profile.
    pub can_follow: bool,
    pub following: bool,
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
}

impl ProfileContent {
    pub fn new(summary: AuthorSummary, viewer: &Viewer, feed: FeedContent) -> Self {
        let can_follow = viewer
            .id()
            .is_some_and(|viewer_id| viewer_id != summary.author.id);
        Self {
            username: summary.author.username,
            post_count: summary.post_count,
            can_follow,
            following: summary.following,
            posts: feed.posts,
            pagination: feed.pagination,
        }
    }
}

#[derive(Template)]
#[template(path = "posts/profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileContent>,
}

#[derive(Template)]
#[template(path = "posts/follow.html")]
pub struct FollowFeedTemplate {
    pub view: LayoutContext<FeedContent>,
}

pub struct CommentView {
    pub author_username: String,
    pub text: String,
    pub published: String,
}

impl From<CommentRecord> for CommentView {
    fn from(comment: CommentRecord) -> Self {
        Self {
            author_username: comment.author_username,
            text: comment.text,
            published: format_date(comment.created_at),
        }
    }
}

pub struct PostDetailContent {
    pub post: PostCard,
    pub author_post_count: u64,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
    pub can_comment: bool,
}

#[derive(Template)]
#[template(path = "posts/post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailContent>,
}

pub struct GroupOption {
    pub id: i64,
    pub title: String,
    pub selected: bool,
}

/// Create and edit share one form.
pub struct PostFormContent {
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOption>,
    pub current_image: Option<String>,
    pub errors: Vec<String>,
}

impl PostFormContent {
    pub fn new(
        action: impl Into<String>,
        is_edit: bool,
        groups: Vec<GroupRecord>,
        selected_group: Option<i64>,
    ) -> Self {
        Self {
            is_edit,
            action: action.into(),
            text: String::new(),
            groups: groups
                .into_iter()
                .map(|group| GroupOption {
                    selected: selected_group == Some(group.id),
                    id: group.id,
                    title: group.title,
                })
                .collect(),
            current_image: None,
            errors: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_current_image(mut self, stored_path: Option<&str>) -> Self {
        self.current_image = stored_path.map(media_url);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.errors.push(message.into());
        self
    }
}

#[derive(Template)]
#[template(path = "posts/create_post.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormContent>,
}

#[derive(Template)]
#[template(path = "about/author.html")]
pub struct AboutAuthorTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "about/tech.html")]
pub struct AboutTechTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Default)]
pub struct LoginContent {
    pub username: String,
    pub next: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginContent>,
}

#[derive(Default)]
pub struct SignupContent {
    pub username: String,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub view: LayoutContext<SignupContent>,
}

#[derive(Template)]
#[template(path = "auth/logged_out.html")]
pub struct LoggedOutTemplate {
    pub view: LayoutContext<()>,
}

pub struct ErrorPageView {
    pub status_code: u16,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            status_code: 404,
            message: "The page you requested does not exist.".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::application::pagination::PageRequest;
    use crate::domain::entities::GroupRef;

    fn post(id: i64) -> PostRecord {
        PostRecord {
            id,
            text: format!("post number {id}"),
            image: Some("posts/abc-small.gif".to_string()),
            created_at: datetime!(2024-03-05 14:07 UTC),
            author_id: 1,
            author_username: "leo".to_string(),
            group: Some(GroupRef {
                id: 1,
                slug: "cats".to_string(),
                title: "Cats".to_string(),
            }),
        }
    }

    #[test]
    fn post_card_links_media_and_group() {
        let card = PostCard::from(post(3));
        assert_eq!(card.image_url.as_deref(), Some("/media/posts/abc-small.gif"));
        assert_eq!(card.published, "05 Mar 2024, 14:07");
        assert_eq!(card.group.map(|group| group.slug).as_deref(), Some("cats"));
    }

    #[test]
    fn index_renders_cards_and_pagination() {
        let page = Paginated::new(vec![post(1), post(2)], 12, PageRequest::new(1, 10));
        let view = LayoutContext::new(
            NavigationView::default(),
            "Latest posts",
            FeedContent::from_page(page),
        );
        let html = IndexTemplate { view }.render().expect("render");

        assert!(html.contains("post number 1"));
        assert!(html.contains("/posts/2/"));
        assert!(html.contains("?page=2"));
        assert!(html.contains("/auth/login/"));
    }

    #[test]
    fn signed_in_navigation_shows_username() {
        let view = LayoutContext::new(
            NavigationView {
                viewer: Some("leo".to_string()),
            },
            "About the author",
            (),
        );
        let html = AboutAuthorTemplate { view }.render().expect("render");
        assert!(html.contains("leo"));
        assert!(html.contains("/auth/logout/"));
    }

    #[test]
    fn text_is_escaped() {
        let mut record = post(1);
        record.text = "<script>alert(1)</script>".to_string();
        let page = Paginated::new(vec![record], 1, PageRequest::new(1, 10));
        let view = LayoutContext::new(NavigationView::default(), "Latest posts", FeedContent::from_page(page));
        let html = IndexTemplate { view }.render().expect("render");
        assert!(!html.contains("<script>alert"));
    }
}
