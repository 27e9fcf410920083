mod common;

use std::time::Duration;

use common::test_repositories;
use time::OffsetDateTime;
use yatube::application::{
    accounts::AccountService,
    pagination::PageRequest,
    repos::{
        CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams, FollowsRepo,
        GroupsRepo, PostFilter, PostsRepo, RepoError, SessionsRepo, UpdatePostParams, UsersRepo,
    },
};

#[tokio::test]
async fn usernames_are_unique() {
    let repos = test_repositories().await;
    repos.create_user("leo", "hash").await.expect("first user");

    let duplicate = repos.create_user("leo", "hash").await;
    assert!(matches!(duplicate, Err(RepoError::Duplicate { .. })));

    let found = repos
        .find_user_by_username("leo")
        .await
        .expect("lookup")
        .expect("user exists");
    assert_eq!(found.username, "leo");
    assert!(repos.find_user_by_username("nobody").await.expect("lookup").is_none());
}

#[tokio::test]
async fn group_slugs_are_unique() {
    let repos = test_repositories().await;
    let params = CreateGroupParams {
        title: "Cats".to_string(),
        slug: "cats".to_string(),
        description: String::new(),
    };
    let group = repos.create_group(params.clone()).await.expect("group");
    assert_eq!(
        repos.find_group_by_slug("cats").await.expect("lookup"),
        Some(group.clone())
    );
    assert_eq!(repos.list_groups().await.expect("list"), vec![group]);
    assert!(matches!(
        repos.create_group(params).await,
        Err(RepoError::Duplicate { .. })
    ));
}

#[tokio::test]
async fn listings_filter_and_order_newest_first() {
    let repos = test_repositories().await;
    let leo = repos.create_user("leo", "hash").await.expect("leo");
    let mia = repos.create_user("mia", "hash").await.expect("mia");
    let group = repos
        .create_group(CreateGroupParams {
            title: "Cats".to_string(),
            slug: "cats".to_string(),
            description: String::new(),
        })
        .await
        .expect("group");

    let mut ids = Vec::new();
    for (author, group_id) in [(&leo, Some(group.id)), (&mia, None), (&leo, None)] {
        let post = repos
            .create_post(CreatePostParams {
                author_id: author.id,
                text: format!("by {}", author.username),
                group_id,
                image: None,
            })
            .await
            .expect("post");
        ids.push(post.id);
    }
    repos.follow(mia.id, leo.id).await.expect("follow");

    let all = repos
        .list_posts(PostFilter::All, PageRequest::new(1, 10))
        .await
        .expect("all");
    let listed: Vec<i64> = all.items.iter().map(|post| post.id).collect();
    assert_eq!(listed, vec![ids[2], ids[1], ids[0]]);
    assert_eq!(all.total, 3);

    let by_group = repos
        .list_posts(PostFilter::Group(group.id), PageRequest::new(1, 10))
        .await
        .expect("group");
    assert_eq!(by_group.items.len(), 1);
    assert_eq!(
        by_group.items[0].group.as_ref().map(|group| group.slug.as_str()),
        Some("cats")
    );

    assert_eq!(
        repos.count_posts(PostFilter::Author(leo.id)).await.expect("count"),
        2
    );
    assert_eq!(
        repos.count_posts(PostFilter::FollowedBy(mia.id)).await.expect("count"),
        2
    );
    assert_eq!(
        repos.count_posts(PostFilter::FollowedBy(leo.id)).await.expect("count"),
        0
    );

    let second_page = repos
        .list_posts(PostFilter::All, PageRequest::new(2, 2))
        .await
        .expect("page two");
    assert_eq!(second_page.items.len(), 1);
    assert_eq!(second_page.items[0].id, ids[0]);
}

#[tokio::test]
async fn update_keeps_author_and_creation_time() {
    let repos = test_repositories().await;
    let leo = repos.create_user("leo", "hash").await.expect("leo");
    let post = repos
        .create_post(CreatePostParams {
            author_id: leo.id,
            text: "before".to_string(),
            group_id: None,
            image: Some("posts/a.gif".to_string()),
        })
        .await
        .expect("post");

    let updated = repos
        .update_post(UpdatePostParams {
            id: post.id,
            text: "after".to_string(),
            group_id: None,
            image: post.image.clone(),
        })
        .await
        .expect("update");

    assert_eq!(updated.text, "after");
    assert_eq!(updated.author_id, leo.id);
    assert_eq!(updated.created_at, post.created_at);
    assert_eq!(updated.image.as_deref(), Some("posts/a.gif"));
}

#[tokio::test]
async fn follow_edges_are_unique() {
    let repos = test_repositories().await;
    let leo = repos.create_user("leo", "hash").await.expect("leo");
    let mia = repos.create_user("mia", "hash").await.expect("mia");

    assert!(repos.follow(mia.id, leo.id).await.expect("follow"));
    assert!(!repos.follow(mia.id, leo.id).await.expect("follow again"));
    assert!(repos.is_following(mia.id, leo.id).await.expect("check"));
    assert!(!repos.is_following(leo.id, mia.id).await.expect("reverse"));

    assert!(repos.unfollow(mia.id, leo.id).await.expect("unfollow"));
    assert!(!repos.unfollow(mia.id, leo.id).await.expect("unfollow again"));
}

#[tokio::test]
async fn comments_list_oldest_first() {
    let repos = test_repositories().await;
    let leo = repos.create_user("leo", "hash").await.expect("leo");
    let post = repos
        .create_post(CreatePostParams {
            author_id: leo.id,
            text: "post".to_string(),
            group_id: None,
            image: None,
        })
        .await
        .expect("post");

    for text in ["first", "second"] {
        repos
            .create_comment(CreateCommentParams {
                post_id: post.id,
                author_id: leo.id,
                text: text.to_string(),
            })
            .await
            .expect("comment");
    }

    let comments = repos.list_comments_for_post(post.id).await.expect("list");
    let texts: Vec<&str> = comments.iter().map(|comment| comment.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "second"]);
    assert_eq!(comments[0].author_username, "leo");
}

#[tokio::test]
async fn expired_sessions_do_not_resolve() {
    let repos = test_repositories().await;
    let leo = repos.create_user("leo", "hash").await.expect("leo");

    repos
        .create_session(
            "stale",
            leo.id,
            OffsetDateTime::now_utc() - time::Duration::minutes(1),
        )
        .await
        .expect("session");

    let accounts = AccountService::new(repos.clone(), repos.clone(), Duration::from_secs(60));
    assert!(accounts.resolve("stale").await.expect("resolve").is_none());
    assert!(repos.find_session("stale").await.expect("lookup").is_none());

    let fresh = accounts.open_session(&leo).await.expect("open");
    let resolved = accounts.resolve(&fresh.token).await.expect("resolve");
    assert_eq!(resolved.map(|user| user.id), Some(leo.id));
}
