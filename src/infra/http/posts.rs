//! Post authoring: create, edit and comment.

use axum::{
    Form,
    body::Body,
    extract::{FromRequest, Multipart, Path, State},
    http::{Request, StatusCode, Uri, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::warn;

use crate::{
    application::{
        error::HttpError,
        guard::{
            Viewer, login_url, post_detail_path, profile_path, require_authenticated,
            require_owner,
        },
        posts::{ImageUpload, PostDraft, PostError},
    },
    domain::entities::{GroupRecord, PostRecord, UserRecord},
    presentation::views::{
        LayoutContext, NavigationView, PostFormContent, PostFormTemplate,
        render_not_found_response, render_template_response,
    },
};

use super::{
    HttpState, RequireUser,
    auth::{CurrentViewer, login_destination},
    found, guard_response, parse_post_id,
};

const SOURCE: &str = "infra::http::posts";

const CREATE_ACTION: &str = "/create/";

/// Post form as submitted, either multipart (with an optional image) or urlencoded.
#[derive(Debug, Default)]
pub(crate) struct PostFormInput {
    pub(crate) text: String,
    pub(crate) group: Option<String>,
    pub(crate) image: Option<ImageUpload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UrlencodedPostForm {
    text: String,
    group: Option<String>,
}

impl PostFormInput {
    /// The chosen group id; an empty selection means no group.
    fn group_id(&self) -> Result<Option<i64>, String> {
        match self.group.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| "Select a valid group from the list.".to_string()),
        }
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, Response> {
        let mut input = Self::default();
        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(err) => {
                    warn!(target = SOURCE, error = %err, "failed to read multipart payload");
                    return Err(HttpError::new(
                        SOURCE,
                        err.status(),
                        "Invalid form data",
                        err.to_string(),
                    )
                    .into_response());
                }
            };

            match field.name() {
                Some("text") => input.text = field_text(field.text().await)?,
                Some("group") => input.group = Some(field_text(field.text().await)?),
                Some("image") => {
                    let filename = field
                        .file_name()
                        .map(str::to_string)
                        .filter(|value| !value.trim().is_empty());
                    let bytes = field_bytes(field.bytes().await)?;
                    // Browsers send an empty part when no file was chosen.
                    if let Some(filename) = filename.filter(|_| !bytes.is_empty()) {
                        input.image = Some(ImageUpload { filename, bytes });
                    }
                }
                _ => {}
            }
        }
        Ok(input)
    }
}

fn field_text(
    result: Result<String, axum::extract::multipart::MultipartError>,
) -> Result<String, Response> {
    result.map_err(multipart_rejection)
}

fn field_bytes(
    result: Result<Bytes, axum::extract::multipart::MultipartError>,
) -> Result<Bytes, Response> {
    result.map_err(multipart_rejection)
}

fn multipart_rejection(err: axum::extract::multipart::MultipartError) -> Response {
    HttpError::new(SOURCE, err.status(), "Invalid form data", err.to_string()).into_response()
}

impl<S> FromRequest<S> for PostFormInput
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(request: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(request, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Self::from_multipart(multipart).await
        } else {
            let Form(form) = Form::<UrlencodedPostForm>::from_request(request, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self {
                text: form.text,
                group: form.group,
                image: None,
            })
        }
    }
}

fn navigation_for(user: &UserRecord) -> NavigationView {
    NavigationView::for_viewer(&Viewer(Some(user.clone())))
}

fn edit_action(post_id: i64) -> String {
    format!("/posts/{post_id}/edit/")
}

/// Render the shared post form, optionally carrying error messages.
async fn render_post_form(
    state: &HttpState,
    navigation: NavigationView,
    content: impl FnOnce(Vec<GroupRecord>) -> PostFormContent,
) -> Response {
    let groups = match state.posts.groups().await {
        Ok(groups) => groups,
        Err(err) => return HttpError::from(err).into_response(),
    };
    let content = content(groups);
    let title = if content.is_edit {
        "Edit post"
    } else {
        "New post"
    };
    let view = LayoutContext::new(navigation, title, content);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}

pub(crate) async fn create_form(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
) -> Response {
    render_post_form(&state, navigation_for(&user), |groups| {
        PostFormContent::new(CREATE_ACTION, false, groups, None)
    })
    .await
}

pub(crate) async fn create_submit(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    input: PostFormInput,
) -> Response {
    let group_id = match input.group_id() {
        Ok(group_id) => group_id,
        Err(message) => {
            return render_post_form(&state, navigation_for(&user), |groups| {
                PostFormContent::new(CREATE_ACTION, false, groups, None)
                    .with_text(input.text)
                    .with_error(message)
            })
            .await;
        }
    };

    let text = input.text.clone();
    let draft = PostDraft {
        text: input.text,
        group_id,
        image: input.image,
    };

    match state.posts.create(&user, draft).await {
        Ok(_) => found(&profile_path(&user.username)),
        Err(PostError::Validation { message, .. }) => {
            render_post_form(&state, navigation_for(&user), |groups| {
                PostFormContent::new(CREATE_ACTION, false, groups, group_id)
                    .with_text(text)
                    .with_error(message)
            })
            .await
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

/// Check that the viewer is signed in, then load the post behind `raw_id`
/// and check that the viewer may edit it.
async fn editable_post(
    state: &HttpState,
    viewer: &Viewer,
    raw_id: &str,
    uri: &Uri,
) -> Result<(UserRecord, PostRecord), Response> {
    let destination = login_destination(uri);
    if let Some(redirect) = guard_response(require_authenticated(viewer, destination)) {
        return Err(redirect);
    }
    let Some(user) = viewer.user() else {
        return Err(found(&login_url(destination)));
    };

    let navigation = NavigationView::for_viewer(viewer);
    let Some(post_id) = parse_post_id(raw_id) else {
        return Err(render_not_found_response(navigation));
    };

    let post = match state.posts.find(post_id).await {
        Ok(post) => post,
        Err(PostError::NotFound) => return Err(render_not_found_response(navigation)),
        Err(err) => return Err(HttpError::from(err).into_response()),
    };

    if let Some(redirect) = guard_response(require_owner(viewer, &post, destination)) {
        return Err(redirect);
    }

    Ok((user.clone(), post))
}

pub(crate) async fn edit_form(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(raw_id): Path<String>,
    uri: Uri,
) -> Response {
    let (user, post) = match editable_post(&state, &viewer, &raw_id, &uri).await {
        Ok(loaded) => loaded,
        Err(response) => return response,
    };

    render_post_form(&state, navigation_for(&user), |groups| {
        PostFormContent::new(edit_action(post.id), true, groups, post.group_id())
            .with_text(post.text.clone())
            .with_current_image(post.image.as_deref())
    })
    .await
}

/// The ownership guard runs before the body is read, so anonymous and
/// foreign submissions never reach the form parser.
pub(crate) async fn edit_submit(
    State(state): State<HttpState>,
    CurrentViewer(viewer): CurrentViewer,
    Path(raw_id): Path<String>,
    uri: Uri,
    request: Request<Body>,
) -> Response {
    let (user, post) = match editable_post(&state, &viewer, &raw_id, &uri).await {
        Ok(loaded) => loaded,
        Err(response) => return response,
    };

    let input = match PostFormInput::from_request(request, &state).await {
        Ok(input) => input,
        Err(rejection) => return rejection,
    };

    let rerender = |text: String, group_id: Option<i64>, message: String| {
        let post = &post;
        move |groups: Vec<GroupRecord>| {
            PostFormContent::new(edit_action(post.id), true, groups, group_id)
                .with_text(text)
                .with_current_image(post.image.as_deref())
                .with_error(message)
        }
    };

    let group_id = match input.group_id() {
        Ok(group_id) => group_id,
        Err(message) => {
            return render_post_form(
                &state,
                navigation_for(&user),
                rerender(input.text, post.group_id(), message),
            )
            .await;
        }
    };

    let text = input.text.clone();
    let draft = PostDraft {
        text: input.text,
        group_id,
        image: input.image,
    };

    match state.posts.update(&user, post.id, draft).await {
        Ok(updated) => found(&post_detail_path(updated.id)),
        Err(PostError::NotOwner(id)) => found(&post_detail_path(id)),
        Err(PostError::Validation { message, .. }) => {
            render_post_form(
                &state,
                navigation_for(&user),
                rerender(text, group_id, message),
            )
            .await
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CommentForm {
    text: String,
}

pub(crate) async fn add_comment(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    Path(raw_id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    let Some(post_id) = parse_post_id(&raw_id) else {
        return render_not_found_response(navigation_for(&user));
    };

    match state.posts.add_comment(&user, post_id, &form.text).await {
        Ok(_) => found(&post_detail_path(post_id)),
        Err(PostError::NotFound) => render_not_found_response(navigation_for(&user)),
        Err(err) => HttpError::from(err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(group: Option<&str>) -> PostFormInput {
        PostFormInput {
            text: "hello".to_string(),
            group: group.map(str::to_string),
            image: None,
        }
    }

    #[test]
    fn empty_group_selection_means_no_group() {
        assert_eq!(input(None).group_id(), Ok(None));
        assert_eq!(input(Some("")).group_id(), Ok(None));
        assert_eq!(input(Some(" 7 ")).group_id(), Ok(Some(7)));
    }

    #[test]
    fn garbage_group_is_a_form_error() {
        assert!(input(Some("cats")).group_id().is_err());
    }
}
