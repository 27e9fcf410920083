mod accounts;
mod auth;
mod follows;
mod middleware;
mod posts;
mod public;

pub use auth::{CurrentViewer, RequireUser, SESSION_COOKIE, resolve_viewer};
pub use public::{HttpOptions, HttpState, build_router};

use crate::application::error::{ErrorReport, HttpError};
use crate::application::guard::GuardDecision;
use crate::application::repos::RepoError;
use axum::http::{StatusCode, header::LOCATION};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use sqlx::Error as SqlxError;

fn db_health_response(result: Result<(), SqlxError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// Map a repository error to a consistent HTTP error response.
pub fn repo_error_to_http(source: &'static str, err: RepoError) -> HttpError {
    match err {
        RepoError::Duplicate { constraint } => {
            HttpError::new(source, StatusCode::CONFLICT, "Duplicate record", constraint)
        }
        RepoError::NotFound => HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Resource not found",
            "resource not found",
        ),
        RepoError::InvalidInput { message } => {
            HttpError::new(source, StatusCode::BAD_REQUEST, "Invalid input", message)
        }
        RepoError::Integrity { message } => HttpError::new(
            source,
            StatusCode::CONFLICT,
            "Integrity constraint violated",
            message,
        ),
        RepoError::Timeout => HttpError::new(
            source,
            StatusCode::SERVICE_UNAVAILABLE,
            "Database timeout",
            "Database timeout",
        ),
        RepoError::Persistence(message) => HttpError::new(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Persistence error",
            message,
        ),
    }
}

/// `302 Found`; axum's `Redirect::to` answers 303.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

/// Turn a guard decision into the redirect it calls for, if any.
pub(crate) fn guard_response(decision: GuardDecision) -> Option<Response> {
    match decision {
        GuardDecision::Proceed => None,
        GuardDecision::RedirectToLogin(location) | GuardDecision::RedirectToPost(location) => {
            Some(found(&location))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageQuery {
    page: Option<String>,
}

/// Post ids that are not integers simply do not exist.
fn parse_post_id(raw: &str) -> Option<i64> {
    raw.parse().ok()
}
