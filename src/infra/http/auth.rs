//! Session cookie handling and viewer extractors.

use std::{convert::Infallible, time::Duration};

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, Uri, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::warn;

use crate::{
    application::guard::{Viewer, login_url, require_authenticated},
    domain::entities::UserRecord,
};

use super::{HttpState, guard_response};

pub const SESSION_COOKIE: &str = "yatube_session";

const SOURCE: &str = "infra::http::auth";

/// Resolve the session cookie into a [`Viewer`] for everything further in.
///
/// The viewer is also attached to the response so outer layers can log it.
pub async fn resolve_viewer(
    State(state): State<HttpState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(request.headers());
    let viewer = match jar.get(SESSION_COOKIE) {
        Some(cookie) => match state.accounts.resolve(cookie.value()).await {
            Ok(user) => Viewer(user),
            Err(err) => {
                warn!(target = SOURCE, error = %err, "failed to resolve session");
                Viewer::anonymous()
            }
        },
        None => Viewer::anonymous(),
    };

    request.extensions_mut().insert(viewer.clone());
    let mut response = next.run(request).await;
    response.extensions_mut().insert(viewer);
    response
}

/// The viewer of the current request; anonymous when nobody is signed in.
pub struct CurrentViewer(pub Viewer);

impl<S> FromRequestParts<S> for CurrentViewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts.extensions.get::<Viewer>().cloned().unwrap_or_default(),
        ))
    }
}

/// A signed-in user. Anonymous requests are redirected to the login page
/// with the requested path and query preserved in `next`.
pub struct RequireUser(pub UserRecord);

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let viewer = parts.extensions.get::<Viewer>().cloned().unwrap_or_default();
        let destination = login_destination(&parts.uri);

        if let Some(redirect) = guard_response(require_authenticated(&viewer, destination)) {
            return Err(redirect);
        }

        viewer
            .0
            .map(Self)
            .ok_or_else(|| super::found(&login_url(destination)))
    }
}

/// Path and query of the request, used as the post-login `next`.
pub(crate) fn login_destination(uri: &Uri) -> &str {
    uri.path_and_query()
        .map(|value| value.as_str())
        .unwrap_or_else(|| uri.path())
}

pub(crate) fn session_cookie(token: String, ttl: Duration) -> Cookie<'static> {
    let max_age = time::Duration::try_from(ttl).unwrap_or(time::Duration::WEEK);
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

pub(crate) fn clear_session_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}
