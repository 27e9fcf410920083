mod common;

use axum::http::StatusCode;
use common::{SMALL_GIF, assert_redirect, body_text, location, spawn_app};

#[tokio::test]
async fn create_form_requires_login() {
    let app = spawn_app().await;

    let response = app.get("/create/", None).await;
    assert_redirect(&response, "/auth/login/?next=/create/");

    let user = app.user("leo").await;
    let response = app.get("/create/", Some(&app.login_cookie(&user).await)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("name=\"text\""));
    assert!(html.contains("name=\"group\""));
    assert!(html.contains("name=\"image\""));
}

#[tokio::test]
async fn anonymous_create_is_redirected_and_stores_nothing() {
    let app = spawn_app().await;

    let response = app.post_form("/create/", "text=sneaky", None).await;
    assert_redirect(&response, "/auth/login/?next=/create/");
    assert_eq!(app.post_count().await, 0);
}

#[tokio::test]
async fn create_with_image_and_group_redirects_to_profile() {
    let app = spawn_app().await;
    let user = app.user("leo").await;
    let group = app.group("cats").await;
    let cookie = app.login_cookie(&user).await;
    let group_id = group.id.to_string();

    let response = app
        .post_multipart(
            "/create/",
            &[("text", "Тестовый текст"), ("group", group_id.as_str())],
            Some(("small.gif", SMALL_GIF)),
            Some(&cookie),
        )
        .await;
    assert_redirect(&response, "/profile/leo/");
    assert_eq!(app.post_count().await, 1);

    let posts = app
        .state
        .feed
        .load(
            yatube::application::feed::FeedKind::Public,
            None,
            yatube::application::pagination::PageRequest::new(1, 10),
        )
        .await
        .expect("feed");
    let created = posts.posts.items.first().expect("created post");
    assert_eq!(created.text, "Тестовый текст");
    assert_eq!(created.group_id(), Some(group.id));
    assert_eq!(created.author_id, user.id);
    let image = created.image.as_deref().expect("image stored");
    assert!(image.starts_with("posts/"));
    assert!(image.ends_with("small.gif"));

    let media = app.get(&format!("/media/{image}"), None).await;
    assert_eq!(media.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_accepts_urlencoded_forms_without_group() {
    let app = spawn_app().await;
    let user = app.user("leo").await;
    let cookie = app.login_cookie(&user).await;

    let response = app
        .post_form("/create/", "text=plain+post&group=", Some(&cookie))
        .await;
    assert_redirect(&response, "/profile/leo/");

    let html = body_text(app.get("/profile/leo/", None).await).await;
    assert!(html.contains("plain post"));
    assert!(html.contains("Total posts: 1"));
}

#[tokio::test]
async fn invalid_post_form_is_shown_again() {
    let app = spawn_app().await;
    let user = app.user("leo").await;
    let cookie = app.login_cookie(&user).await;

    let blank = app.post_form("/create/", "text=+++", Some(&cookie)).await;
    assert_eq!(blank.status(), StatusCode::OK);
    assert!(body_text(blank).await.contains("class=\"error\""));

    let bad_group = app
        .post_form("/create/", "text=hello&group=999", Some(&cookie))
        .await;
    assert_eq!(bad_group.status(), StatusCode::OK);

    let not_an_image = app
        .post_multipart(
            "/create/",
            &[("text", "with a broken image")],
            Some(("notes.gif", &b"definitely not a gif"[..])),
            Some(&cookie),
        )
        .await;
    assert_eq!(not_an_image.status(), StatusCode::OK);
    let html = body_text(not_an_image).await;
    assert!(html.contains("with a broken image"));

    assert_eq!(app.post_count().await, 0);
}

#[tokio::test]
async fn author_edits_post_in_place() {
    let app = spawn_app().await;
    let user = app.user("leo").await;
    let group = app.group("cats").await;
    let post = app.post(&user, "original text", None).await;
    let cookie = app.login_cookie(&user).await;
    let edit_path = format!("/posts/{}/edit/", post.id);

    let form = app.get(&edit_path, Some(&cookie)).await;
    assert_eq!(form.status(), StatusCode::OK);
    assert!(body_text(form).await.contains("original text"));

    let response = app
        .post_form(
            &edit_path,
            &format!("text=edited+text&group={}", group.id),
            Some(&cookie),
        )
        .await;
    assert_redirect(&response, &format!("/posts/{}/", post.id));
    assert_eq!(app.post_count().await, 1);

    let updated = app.state.posts.find(post.id).await.expect("post");
    assert_eq!(updated.text, "edited text");
    assert_eq!(updated.group_id(), Some(group.id));
    assert_eq!(updated.created_at, post.created_at);
}

#[tokio::test]
async fn non_owner_is_sent_to_the_post() {
    let app = spawn_app().await;
    let author = app.user("leo").await;
    let intruder = app.user("mia").await;
    let post = app.post(&author, "mine", None).await;
    let cookie = app.login_cookie(&intruder).await;
    let edit_path = format!("/posts/{}/edit/", post.id);
    let detail_path = format!("/posts/{}/", post.id);

    let form = app.get(&edit_path, Some(&cookie)).await;
    assert_redirect(&form, &detail_path);

    let submit = app
        .post_form(&edit_path, "text=hijacked", Some(&cookie))
        .await;
    assert_redirect(&submit, &detail_path);

    let unchanged = app.state.posts.find(post.id).await.expect("post");
    assert_eq!(unchanged.text, "mine");
}

#[tokio::test]
async fn anonymous_edit_goes_to_login() {
    let app = spawn_app().await;
    let author = app.user("leo").await;
    let post = app.post(&author, "mine", None).await;
    let edit_path = format!("/posts/{}/edit/", post.id);
    let expected = format!("/auth/login/?next=/posts/{}/edit/", post.id);

    assert_redirect(&app.get(&edit_path, None).await, &expected);
    assert_redirect(
        &app.post_form(&edit_path, "text=hijacked", None).await,
        &expected,
    );
}

#[tokio::test]
async fn anonymous_edit_of_missing_post_goes_to_login() {
    let app = spawn_app().await;

    for path in ["/posts/999/edit/", "/posts/abc/edit/"] {
        let expected = format!("/auth/login/?next={path}");
        assert_redirect(&app.get(path, None).await, &expected);
        assert_redirect(&app.post_form(path, "text=hijacked", None).await, &expected);
    }

    let user = app.user("leo").await;
    let cookie = app.login_cookie(&user).await;
    let missing = app.get("/posts/999/edit/", Some(&cookie)).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn anonymous_edit_keeps_query_in_next() {
    let app = spawn_app().await;
    let author = app.user("leo").await;
    let post = app.post(&author, "mine", None).await;

    let response = app
        .get(&format!("/posts/{}/edit/?page=2", post.id), None)
        .await;
    let target = location(&response).expect("redirect location");
    assert!(target.starts_with(&format!("/auth/login/?next=/posts/{}/edit/", post.id)));
    assert!(target.contains("page"));
}

#[tokio::test]
async fn edit_keeps_image_when_none_uploaded() {
    let app = spawn_app().await;
    let user = app.user("leo").await;
    let cookie = app.login_cookie(&user).await;

    let created = app
        .post_multipart(
            "/create/",
            &[("text", "with image")],
            Some(("small.gif", SMALL_GIF)),
            Some(&cookie),
        )
        .await;
    assert_eq!(created.status(), StatusCode::FOUND);

    let post = app
        .state
        .feed
        .load(
            yatube::application::feed::FeedKind::Author("leo".to_string()),
            None,
            yatube::application::pagination::PageRequest::new(1, 10),
        )
        .await
        .expect("feed")
        .posts
        .items
        .remove(0);
    let image = post.image.clone().expect("image");

    let response = app
        .post_multipart(
            &format!("/posts/{}/edit/", post.id),
            &[("text", "new words"), ("group", "")],
            None,
            Some(&cookie),
        )
        .await;
    assert_eq!(location(&response), Some(format!("/posts/{}/", post.id)));

    let updated = app.state.posts.find(post.id).await.expect("post");
    assert_eq!(updated.text, "new words");
    assert_eq!(updated.image.as_deref(), Some(image.as_str()));
}

#[tokio::test]
async fn replacing_image_removes_previous_file() {
    let app = spawn_app().await;
    let user = app.user("leo").await;
    let cookie = app.login_cookie(&user).await;

    let created = app
        .post_multipart(
            "/create/",
            &[("text", "first image")],
            Some(("first.gif", SMALL_GIF)),
            Some(&cookie),
        )
        .await;
    assert_eq!(created.status(), StatusCode::FOUND);

    let post = app
        .state
        .feed
        .load(
            yatube::application::feed::FeedKind::Author("leo".to_string()),
            None,
            yatube::application::pagination::PageRequest::new(1, 10),
        )
        .await
        .expect("feed")
        .posts
        .items
        .remove(0);
    let old_image = post.image.clone().expect("image");
    let old_url = format!("/media/{old_image}");
    assert_eq!(app.get(&old_url, None).await.status(), StatusCode::OK);

    let response = app
        .post_multipart(
            &format!("/posts/{}/edit/", post.id),
            &[("text", "second image")],
            Some(("second.gif", SMALL_GIF)),
            Some(&cookie),
        )
        .await;
    assert_eq!(location(&response), Some(format!("/posts/{}/", post.id)));

    let updated = app.state.posts.find(post.id).await.expect("post");
    let new_image = updated.image.expect("new image");
    assert_ne!(new_image, old_image);
    assert_eq!(
        app.get(&format!("/media/{new_image}"), None).await.status(),
        StatusCode::OK
    );
    assert_eq!(app.get(&old_url, None).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_need_login_and_show_on_detail() {
    let app = spawn_app().await;
    let author = app.user("leo").await;
    let reader = app.user("mia").await;
    let post = app.post(&author, "discuss me", None).await;
    let comment_path = format!("/posts/{}/comment/", post.id);
    let detail_path = format!("/posts/{}/", post.id);

    let anonymous = app.post_form(&comment_path, "text=hello", None).await;
    assert_redirect(&anonymous, &format!("/auth/login/?next={comment_path}"));

    let cookie = app.login_cookie(&reader).await;
    let response = app
        .post_form(&comment_path, "text=first+comment", Some(&cookie))
        .await;
    assert_redirect(&response, &detail_path);

    let blank = app.post_form(&comment_path, "text=+++", Some(&cookie)).await;
    assert_redirect(&blank, &detail_path);

    let detail = app.state.posts.detail(post.id).await.expect("detail");
    assert_eq!(detail.comments.len(), 1);
    assert_eq!(detail.comments[0].text, "first comment");
    assert_eq!(detail.comments[0].author_id, reader.id);

    let html = body_text(app.get(&detail_path, None).await).await;
    assert!(html.contains("first comment"));
    assert!(html.contains("/profile/mia/"));
}

#[tokio::test]
async fn comment_on_missing_post_is_not_found() {
    let app = spawn_app().await;
    let reader = app.user("mia").await;
    let cookie = app.login_cookie(&reader).await;

    let response = app
        .post_form("/posts/404/comment/", "text=hello", Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn moving_a_post_removes_it_from_the_old_group() {
    let app = spawn_app().await;
    let user = app.user("leo").await;
    let cats = app.group("cats").await;
    let dogs = app.group("dogs").await;
    let post = app.post(&user, "wandering post", Some(&cats)).await;
    let cookie = app.login_cookie(&user).await;

    let response = app
        .post_form(
            &format!("/posts/{}/edit/", post.id),
            &format!("text=wandering+post&group={}", dogs.id),
            Some(&cookie),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let old_group = body_text(app.get("/group/cats/", None).await).await;
    assert_eq!(common::card_count(&old_group), 0);
    let new_group = body_text(app.get("/group/dogs/", None).await).await;
    assert_eq!(common::card_count(&new_group), 1);
}
