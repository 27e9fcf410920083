//! Access decisions for restricted actions.
//!
//! Every request carries a [`Viewer`]. Restricted actions either require any
//! signed-in user (create post, comment, follow) or the owner of the post
//! being changed (edit). Anonymous visitors are sent to the login page with
//! the original destination preserved in `next`; signed-in non-owners are
//! quietly sent back to the post they tried to edit.

use url::form_urlencoded;

use crate::domain::entities::{PostRecord, UserRecord};

pub const LOGIN_PATH: &str = "/auth/login/";

/// The account, if any, behind the current request.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<UserRecord>);

impl Viewer {
    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn user(&self) -> Option<&UserRecord> {
        self.0.as_ref()
    }

    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|user| user.id)
    }

    pub fn username(&self) -> Option<&str> {
        self.0.as_ref().map(|user| user.username.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }
}

/// How the viewer relates to the post they want to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Anonymous,
    NonOwner,
    Owner,
}

/// What a handler should do after consulting the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    RedirectToLogin(String),
    RedirectToPost(String),
}

pub fn classify(viewer: &Viewer, post: &PostRecord) -> Access {
    match viewer.id() {
        None => Access::Anonymous,
        Some(id) if id == post.author_id => Access::Owner,
        Some(_) => Access::NonOwner,
    }
}

/// Actions that need a signed-in user but no ownership.
pub fn require_authenticated(viewer: &Viewer, destination: &str) -> GuardDecision {
    if viewer.is_authenticated() {
        GuardDecision::Proceed
    } else {
        GuardDecision::RedirectToLogin(login_url(destination))
    }
}

/// Editing a post: only its author may proceed.
pub fn require_owner(viewer: &Viewer, post: &PostRecord, destination: &str) -> GuardDecision {
    match classify(viewer, post) {
        Access::Owner => GuardDecision::Proceed,
        Access::NonOwner => GuardDecision::RedirectToPost(post_detail_path(post.id)),
        Access::Anonymous => GuardDecision::RedirectToLogin(login_url(destination)),
    }
}

/// `/auth/login/?next=<destination>` with `/` left readable in the parameter.
pub fn login_url(destination: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(destination.as_bytes()).collect();
    format!("{LOGIN_PATH}?next={}", encoded.replace("%2F", "/"))
}

pub fn post_detail_path(post_id: i64) -> String {
    format!("/posts/{post_id}/")
}

pub fn profile_path(username: &str) -> String {
    format!("/profile/{username}/")
}

/// Only same-site absolute paths are honoured as post-login destinations.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}
