use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::{
    application::{
        error::HttpError,
        feed::FeedKind,
        follows::{FollowError, FollowOutcome},
        guard::{Viewer, profile_path},
    },
    domain::entities::UserRecord,
    presentation::views::{
        FeedContent, FollowFeedTemplate, LayoutContext, NavigationView,
        render_not_found_response, render_template_response,
    },
};

use super::{HttpState, PageQuery, RequireUser, found, repo_error_to_http};

const SOURCE: &str = "infra::http::follows";

/// Posts by everyone the signed-in user follows.
pub(crate) async fn follow_index(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Query(query): Query<PageQuery>,
) -> Response {
    let page = state.feed.page_request(query.page.as_deref());
    let kind = FeedKind::Personalized {
        follower_id: user.id,
    };

    match state.feed.load(kind, Some(user.id), page).await {
        Ok(loaded) => {
            let navigation = NavigationView::for_viewer(&Viewer(Some(user)));
            let view = LayoutContext::new(
                navigation,
                "Posts from authors you follow",
                FeedContent::from_page(loaded.posts),
            );
            render_template_response(FollowFeedTemplate { view }, StatusCode::OK)
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(crate) async fn profile_follow(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(username): Path<String>,
) -> Response {
    let result = state.follows.follow(&user, &username).await;
    follow_response(result, &user, &username)
}

pub(crate) async fn profile_unfollow(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(username): Path<String>,
) -> Response {
    let result = state.follows.unfollow(&user, &username).await;
    follow_response(result, &user, &username)
}

fn follow_response(
    result: Result<FollowOutcome, FollowError>,
    user: &UserRecord,
    username: &str,
) -> Response {
    match result {
        Ok(outcome) => {
            info!(
                target = SOURCE,
                follower = %user.username,
                author = %username,
                ?outcome,
                "subscription changed"
            );
            found(&profile_path(username))
        }
        Err(FollowError::UnknownAuthor(_)) => {
            render_not_found_response(NavigationView::for_viewer(&Viewer(Some(user.clone()))))
        }
        Err(FollowError::Repo(err)) => repo_error_to_http(SOURCE, err).into_response(),
    }
}
