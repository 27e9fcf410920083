//! Sign-up, login and logout pages.

use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    application::{
        accounts::{AccountError, SignupForm},
        error::HttpError,
        guard::{Viewer, safe_next},
    },
    presentation::views::{
        LayoutContext, LoggedOutTemplate, LoginContent, LoginTemplate, NavigationView,
        SignupContent, SignupTemplate, render_template_response,
    },
};

use super::{
    HttpState, RequireUser, SESSION_COOKIE,
    auth::{CurrentViewer, clear_session_cookie, session_cookie},
    found, repo_error_to_http,
};

const SOURCE: &str = "infra::http::accounts";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SignupFields {
    username: String,
    password1: String,
    password2: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct LoginFields {
    username: String,
    password: String,
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct LoginQuery {
    next: Option<String>,
}

fn account_error_to_response(err: AccountError) -> Response {
    match err {
        AccountError::Repo(err) => repo_error_to_http(SOURCE, err).into_response(),
        other => HttpError::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Account operation failed",
            &other,
        )
        .into_response(),
    }
}

fn render_signup(navigation: NavigationView, content: SignupContent) -> Response {
    let view = LayoutContext::new(navigation, "Sign up", content);
    render_template_response(SignupTemplate { view }, StatusCode::OK)
}

fn render_login(navigation: NavigationView, content: LoginContent) -> Response {
    let view = LayoutContext::new(navigation, "Log in", content);
    render_template_response(LoginTemplate { view }, StatusCode::OK)
}

pub(crate) async fn signup_form(CurrentViewer(viewer): CurrentViewer) -> Response {
    render_signup(NavigationView::for_viewer(&viewer), SignupContent::default())
}

pub(crate) async fn signup_submit(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    jar: CookieJar,
    Form(fields): Form<SignupFields>,
) -> Response {
    let form = SignupForm {
        username: fields.username.clone(),
        password: fields.password1,
        password_confirmation: fields.password2,
    };

    let user = match state.accounts.signup(form).await {
        Ok(user) => user,
        Err(err) if err.is_user_facing() => {
            let content = SignupContent {
                username: fields.username,
                errors: vec![err.to_string()],
            };
            return render_signup(NavigationView::for_viewer(&viewer), content);
        }
        Err(err) => return account_error_to_response(err),
    };

    let session = match state.accounts.open_session(&user).await {
        Ok(session) => session,
        Err(err) => return account_error_to_response(err),
    };

    let jar = jar.add(session_cookie(session.token, state.accounts.session_ttl()));
    (jar, found("/")).into_response()
}

pub(crate) async fn login_form(
    CurrentViewer(viewer): CurrentViewer,
    Query(query): Query<LoginQuery>,
) -> Response {
    let content = LoginContent {
        next: query.next.unwrap_or_default(),
        ..LoginContent::default()
    };
    render_login(NavigationView::for_viewer(&viewer), content)
}

pub(crate) async fn login_submit(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    jar: CookieJar,
    Form(fields): Form<LoginFields>,
) -> Response {
    match state
        .accounts
        .login(&fields.username, &fields.password)
        .await
    {
        Ok((user, session)) => {
            info!(target = SOURCE, username = %user.username, "signed in");
            let destination = safe_next(fields.next.as_deref()).to_string();
            let jar = jar.add(session_cookie(session.token, state.accounts.session_ttl()));
            (jar, found(&destination)).into_response()
        }
        Err(err) if err.is_user_facing() => {
            let content = LoginContent {
                username: fields.username,
                next: fields.next.unwrap_or_default(),
                error: Some(err.to_string()),
            };
            render_login(NavigationView::for_viewer(&viewer), content)
        }
        Err(err) => account_error_to_response(err),
    }
}

pub(crate) async fn logout(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    jar: CookieJar,
) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Err(err) = state.accounts.logout(cookie.value()).await {
            warn!(target = SOURCE, error = %err, "failed to delete session");
        }
    }
    info!(target = SOURCE, username = %user.username, "signed out");

    let jar = clear_session_cookie(jar);
    let view = LayoutContext::new(
        NavigationView::for_viewer(&Viewer::anonymous()),
        "Logged out",
        (),
    );
    (jar, render_template_response(LoggedOutTemplate { view }, StatusCode::OK)).into_response()
}
