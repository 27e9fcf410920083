use std::{io::ErrorKind, num::NonZeroU32, sync::Arc, time::Duration};

use axum::{
    Router,
    body::Body,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use tracing::error;

use crate::{
    application::{
        accounts::AccountService,
        error::{ErrorReport, HttpError},
        feed::{FeedError, FeedHeader, FeedKind, FeedService},
        follows::FollowService,
        guard::Viewer,
        posts::{PostError, PostService},
        repos::{
            CommentsRepo, FollowsRepo, GroupsRepo, PostsRepo, SessionsRepo, UsersRepo,
        },
    },
    cache::{CacheConfig, CacheState, page_cache_layer},
    infra::{
        db::SqliteRepositories,
        uploads::{UploadStorage, UploadStorageError},
    },
    presentation::views::{
        AboutAuthorTemplate, AboutTechTemplate, FeedContent, GroupFeedContent, GroupFeedTemplate,
        IndexTemplate, LayoutContext, NavigationView, PostCard, PostDetailContent,
        PostDetailTemplate, ProfileContent, ProfileTemplate, render_not_found_response,
        render_template_response,
    },
};

use super::{
    PageQuery, accounts, auth::CurrentViewer, auth::resolve_viewer, db_health_response, follows,
    middleware::{log_responses, set_request_context},
    parse_post_id, posts,
};

const SOURCE: &str = "infra::http::public";

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub follows: Arc<FollowService>,
    pub accounts: Arc<AccountService>,
    pub db: Arc<SqliteRepositories>,
    pub upload_storage: Arc<UploadStorage>,
    pub cache: Option<CacheState>,
}

/// Runtime knobs the HTTP surface needs beyond its repositories.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub page_size: NonZeroU32,
    pub session_ttl: Duration,
    /// `None` or a disabled config turns the page cache off.
    pub cache: Option<CacheConfig>,
}

impl HttpState {
    pub fn new(
        db: Arc<SqliteRepositories>,
        upload_storage: Arc<UploadStorage>,
        options: HttpOptions,
    ) -> Self {
        let users: Arc<dyn UsersRepo> = db.clone();
        let groups: Arc<dyn GroupsRepo> = db.clone();
        let posts: Arc<dyn PostsRepo> = db.clone();
        let comments: Arc<dyn CommentsRepo> = db.clone();
        let follows: Arc<dyn FollowsRepo> = db.clone();
        let sessions: Arc<dyn SessionsRepo> = db.clone();

        let feed = Arc::new(FeedService::new(
            posts.clone(),
            groups.clone(),
            users.clone(),
            follows.clone(),
            options.page_size,
        ));
        let post_service = Arc::new(PostService::new(
            posts,
            groups,
            comments,
            upload_storage.clone(),
        ));
        let follow_service = Arc::new(FollowService::new(users.clone(), follows));
        let accounts = Arc::new(AccountService::new(users, sessions, options.session_ttl));

        let cache = options
            .cache
            .filter(|config| config.enabled)
            .map(CacheState::new);

        Self {
            feed,
            posts: post_service,
            follows: follow_service,
            accounts,
            db,
            upload_storage,
            cache,
        }
    }
}

pub fn build_router(state: HttpState, body_limit: usize) -> Router {
    // Only the public feed goes through the page cache.
    let cached_routes = Router::new().route("/", get(index));
    let cached_routes = if let Some(cache_state) = state.cache.clone() {
        cached_routes.layer(middleware::from_fn_with_state(
            cache_state,
            page_cache_layer,
        ))
    } else {
        cached_routes
    };

    let routes = Router::new()
        .route("/group/{slug}/", get(group_feed))
        .route("/profile/{username}/", get(profile))
        .route("/posts/{id}/", get(post_detail))
        .route(
            "/create/",
            get(posts::create_form).post(posts::create_submit),
        )
        .route(
            "/posts/{id}/edit/",
            get(posts::edit_form).post(posts::edit_submit),
        )
        .route("/posts/{id}/comment/", post(posts::add_comment))
        .route("/follow/", get(follows::follow_index))
        .route("/profile/{username}/follow/", post(follows::profile_follow))
        .route(
            "/profile/{username}/unfollow/",
            post(follows::profile_unfollow),
        )
        .route("/about/author/", get(about_author))
        .route("/about/tech/", get(about_tech))
        .route(
            "/auth/signup/",
            get(accounts::signup_form).post(accounts::signup_submit),
        )
        .route(
            "/auth/login/",
            get(accounts::login_form).post(accounts::login_submit),
        )
        .route("/auth/logout/", post(accounts::logout))
        .route("/media/{*path}", get(serve_media))
        .route("/_health/db", get(public_health));

    cached_routes
        .merge(routes)
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(state.clone(), resolve_viewer))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
        .with_state(state)
}

async fn index(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Query(query): Query<PageQuery>,
) -> Response {
    let page = state.feed.page_request(query.page.as_deref());
    match state.feed.load(FeedKind::Public, viewer.id(), page).await {
        Ok(feed) => {
            let content = FeedContent::from_page(feed.posts);
            let view = LayoutContext::new(NavigationView::for_viewer(&viewer), "Latest posts", content);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, &viewer),
    }
}

async fn group_feed(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let page = state.feed.page_request(query.page.as_deref());
    let feed = match state.feed.load(FeedKind::Group(slug), viewer.id(), page).await {
        Ok(feed) => feed,
        Err(err) => return feed_error_to_response(err, &viewer),
    };

    let FeedHeader::Group(group) = feed.header else {
        return unexpected_header("group");
    };
    let title = format!("Posts in {}", group.title);
    let content = GroupFeedContent::new(group, FeedContent::from_page(feed.posts));
    let view = LayoutContext::new(NavigationView::for_viewer(&viewer), title, content);
    render_template_response(GroupFeedTemplate { view }, StatusCode::OK)
}

async fn profile(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let page = state.feed.page_request(query.page.as_deref());
    let feed = match state
        .feed
        .load(FeedKind::Author(username), viewer.id(), page)
        .await
    {
        Ok(feed) => feed,
        Err(err) => return feed_error_to_response(err, &viewer),
    };

    let FeedHeader::Author(summary) = feed.header else {
        return unexpected_header("author");
    };
    let title = format!("Profile of {}", summary.author.username);
    let content = ProfileContent::new(summary, &viewer, FeedContent::from_page(feed.posts));
    let view = LayoutContext::new(NavigationView::for_viewer(&viewer), title, content);
    render_template_response(ProfileTemplate { view }, StatusCode::OK)
}

async fn post_detail(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(raw_id): Path<String>,
) -> Response {
    let navigation = NavigationView::for_viewer(&viewer);
    let Some(post_id) = parse_post_id(&raw_id) else {
        return render_not_found_response(navigation);
    };

    let detail = match state.posts.detail(post_id).await {
        Ok(detail) => detail,
        Err(PostError::NotFound) => return render_not_found_response(navigation),
        Err(err) => return HttpError::from(err).into_response(),
    };

    let title = format!("Post {}", detail.post);
    let content = PostDetailContent {
        can_edit: viewer.id() == Some(detail.post.author_id),
        can_comment: viewer.is_authenticated(),
        author_post_count: detail.author_post_count,
        comments: detail.comments.into_iter().map(Into::into).collect(),
        post: PostCard::from(detail.post),
    };
    let view = LayoutContext::new(navigation, title, content);
    render_template_response(PostDetailTemplate { view }, StatusCode::OK)
}

async fn about_author(CurrentViewer(viewer): CurrentViewer) -> Response {
    let view = LayoutContext::new(NavigationView::for_viewer(&viewer), "About the author", ());
    render_template_response(AboutAuthorTemplate { view }, StatusCode::OK)
}

async fn about_tech(CurrentViewer(viewer): CurrentViewer) -> Response {
    let view = LayoutContext::new(NavigationView::for_viewer(&viewer), "Technologies", ());
    render_template_response(AboutTechTemplate { view }, StatusCode::OK)
}

async fn fallback(CurrentViewer(viewer): CurrentViewer) -> Response {
    render_not_found_response(NavigationView::for_viewer(&viewer))
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.health_check().await)
}

async fn serve_media(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(path): Path<String>,
) -> Response {
    const SOURCE: &str = "infra::http::public::serve_media";

    match state.upload_storage.read(&path).await {
        Ok(bytes) => build_media_response(&path, bytes),
        Err(UploadStorageError::InvalidPath) => {
            render_not_found_response(NavigationView::for_viewer(&viewer))
        }
        Err(UploadStorageError::Io(err)) if err.kind() == ErrorKind::NotFound => {
            render_not_found_response(NavigationView::for_viewer(&viewer))
        }
        Err(err) => {
            error!(
                target = SOURCE,
                path = %path,
                error = %err,
                "failed to read stored image"
            );
            HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read stored image",
                err.to_string(),
            )
            .into_response()
        }
    }
}

fn build_media_response(path: &str, bytes: Bytes) -> Response {
    let length = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&length.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    // Stored names embed a fresh uuid, so the bytes behind a path never change.
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}

fn feed_error_to_response(err: FeedError, viewer: &Viewer) -> Response {
    match err {
        FeedError::UnknownGroup(_) | FeedError::UnknownAuthor(_) => {
            let mut response = render_not_found_response(NavigationView::for_viewer(viewer));
            ErrorReport::from_error(SOURCE, StatusCode::NOT_FOUND, &err).attach(&mut response);
            response
        }
        other => HttpError::from(other).into_response(),
    }
}

fn unexpected_header(expected: &'static str) -> Response {
    HttpError::new(
        SOURCE,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
        format!("feed did not return the {expected} header"),
    )
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_response_guesses_content_type() {
        let response = build_media_response("posts/abc-small.gif", Bytes::from_static(b"GIF89a"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("image/gif")
        );
        assert_eq!(
            response.headers().get(CONTENT_LENGTH).and_then(|v| v.to_str().ok()),
            Some("6")
        );
    }
}
