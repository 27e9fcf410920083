#![allow(dead_code)]

use std::{num::NonZeroU32, sync::Arc, time::Duration};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Method, Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, LOCATION},
    },
    response::Response,
};
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;
use tower::ServiceExt;
use yatube::{
    application::repos::{
        CreateGroupParams, CreatePostParams, FollowsRepo, GroupsRepo, PostsRepo, UsersRepo,
    },
    cache::CacheConfig,
    domain::entities::{GroupRecord, PostRecord, UserRecord},
    infra::{
        db::SqliteRepositories,
        http::{HttpOptions, HttpState, SESSION_COOKIE, build_router},
        uploads::UploadStorage,
    },
};

pub const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00, 0x00, 0x00,
    0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
];

const BOUNDARY: &str = "yatube-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub state: HttpState,
    pub repos: Arc<SqliteRepositories>,
    _media: TempDir,
}

pub async fn test_repositories() -> Arc<SqliteRepositories> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    SqliteRepositories::run_migrations(&pool)
        .await
        .expect("migrations apply");
    Arc::new(SqliteRepositories::new(pool))
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_cache(None).await
}

pub async fn spawn_app_with_cache(cache: Option<CacheConfig>) -> TestApp {
    let repos = test_repositories().await;
    let media = tempfile::tempdir().expect("media dir");
    let uploads = Arc::new(UploadStorage::new(media.path().to_path_buf()).expect("storage"));

    let options = HttpOptions {
        page_size: NonZeroU32::new(10).expect("non-zero"),
        session_ttl: Duration::from_secs(3600),
        cache,
    };
    let state = HttpState::new(repos.clone(), uploads, options);
    let router = build_router(state.clone(), 10 * 1024 * 1024);

    TestApp {
        router,
        state,
        repos,
        _media: media,
    }
}

impl TestApp {
    pub async fn user(&self, username: &str) -> UserRecord {
        let users: &dyn UsersRepo = &*self.repos;
        users
            .create_user(username, "not-a-real-hash")
            .await
            .expect("create user")
    }

    pub async fn group(&self, slug: &str) -> GroupRecord {
        let groups: &dyn GroupsRepo = &*self.repos;
        groups
            .create_group(CreateGroupParams {
                title: format!("Group {slug}"),
                slug: slug.to_string(),
                description: format!("About {slug}"),
            })
            .await
            .expect("create group")
    }

    pub async fn post(&self, author: &UserRecord, text: &str, group: Option<&GroupRecord>) -> PostRecord {
        let posts: &dyn PostsRepo = &*self.repos;
        posts
            .create_post(CreatePostParams {
                author_id: author.id,
                text: text.to_string(),
                group_id: group.map(|group| group.id),
                image: None,
            })
            .await
            .expect("create post")
    }

    pub async fn follow(&self, follower: &UserRecord, author: &UserRecord) {
        let follows: &dyn FollowsRepo = &*self.repos;
        follows
            .follow(follower.id, author.id)
            .await
            .expect("follow");
    }

    pub async fn is_following(&self, follower: &UserRecord, author: &UserRecord) -> bool {
        let follows: &dyn FollowsRepo = &*self.repos;
        follows
            .is_following(follower.id, author.id)
            .await
            .expect("is_following")
    }

    pub async fn post_count(&self) -> u64 {
        self.state.posts.total_posts().await.expect("count posts")
    }

    /// A `Cookie` header value for a fresh session of `user`.
    pub async fn login_cookie(&self, user: &UserRecord) -> String {
        let session = self
            .state
            .accounts
            .open_session(user)
            .await
            .expect("open session");
        format!("{SESSION_COOKIE}={}", session.token)
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router responds")
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).expect("request"))
            .await
    }

    pub async fn post_form(&self, path: &str, body: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).expect("request"))
            .await
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        image: Option<(&str, &[u8])>,
        cookie: Option<&str>,
    ) -> Response {
        let body = multipart_body(fields, image);
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).expect("request"))
            .await
    }
}

fn multipart_body(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: image/gif\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub fn location(response: &Response) -> Option<String> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

pub fn assert_redirect(response: &Response, expected: &str) {
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(response).as_deref(), Some(expected));
}

/// Number of post cards rendered on a feed page.
pub fn card_count(html: &str) -> usize {
    html.matches("<article class=\"post\">").count()
}
