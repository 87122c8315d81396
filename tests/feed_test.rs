//! Integration tests for the post feed: paging, likes and inline comments.

use std::sync::Arc;

use blog_client::config::Config;
use blog_client::feed::Feed;
use blog_client::models::User;
use blog_client::notify::NoticeKind;
use blog_client::storage::{self, keys, MemoryStorage, Storage};
use blog_client::{ClientError, Context};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn setup(server: &MockServer) -> (Context, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let ctx = Context::new(Config::for_testing(&server.uri()), storage.clone()).expect("context");
    (ctx, storage)
}

fn login(ctx: &Context) {
    let me = User {
        id: 1,
        username: "alice".to_string(),
        email: String::new(),
        avatar: String::new(),
        is_admin: false,
    };
    ctx.session.store("t", &me).expect("store session");
}

fn post(id: i64) -> Value {
    json!({
        "id": id,
        "title": format!("Post {id}"),
        "content": "body",
        "hashtags": "rust,web",
        "username": "bob",
        "like_count": "7",
        "comment_count": 2,
        "created_at": "2024-01-01 10:00:00"
    })
}

async fn mount_page(server: &MockServer, page: &str, ids: impl IntoIterator<Item = i64>) {
    let posts: Vec<Value> = ids.into_iter().map(post).collect();
    Mock::given(method("GET"))
        .and(path("/api.php"))
        .and(query_param("action", "posts"))
        .and(query_param("page", page))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "posts": posts
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_load_more_appends_without_duplicates() {
    let server = MockServer::start().await;
    mount_page(&server, "1", 1..=10).await;
    // The second page overlaps the first by one post.
    mount_page(&server, "2", 10..=12).await;

    let (ctx, _) = setup(&server);
    let mut feed = Feed::new(ctx);

    assert_eq!(feed.load().await.expect("first page"), 10);
    assert!(feed.has_more());

    assert_eq!(feed.load_more().await.expect("second page"), 2);
    let ids: Vec<i64> = feed.posts().iter().map(|p| p.id).collect();
    assert_eq!(ids, (1..=12).collect::<Vec<_>>());
    assert!(!feed.has_more());
}

#[tokio::test]
async fn test_search_sends_query_and_resets_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("action", "posts"))
        .and(query_param("search", "rust"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "posts": [post(42)]
        })))
        .mount(&server)
        .await;
    mount_page(&server, "1", 1..=3).await;

    let (ctx, _) = setup(&server);
    let mut feed = Feed::new(ctx);
    feed.load().await.expect("load");
    assert_eq!(feed.posts().len(), 3);

    feed.search("  rust ").await.expect("search");
    assert_eq!(feed.search_query(), "rust");
    let ids: Vec<i64> = feed.posts().iter().map(|p| p.id).collect();
    assert_eq!(ids, [42]);
}

#[tokio::test]
async fn test_rejected_search_keeps_query_and_paging() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("action", "posts"))
        .and(query_param("search", "rust"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Search is unavailable"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("action", "posts"))
        .and(query_param("page", "2"))
        .and(query_param("search", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "posts": [post(11)]
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "1", 1..=10).await;

    let (ctx, _) = setup(&server);
    let notifier = ctx.notifier.clone();
    let mut feed = Feed::new(ctx);
    feed.load().await.expect("first page");

    feed.search("rust").await.expect_err("rejected");
    assert_eq!(feed.search_query(), "");
    assert_eq!(feed.posts().len(), 10);
    assert_eq!(notifier.drain().len(), 1);

    // Paging continues the unfiltered list.
    assert_eq!(feed.load_more().await.expect("second page"), 1);
    let ids: Vec<i64> = feed.posts().iter().map(|p| p.id).collect();
    assert_eq!(ids, (1..=11).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_rejected_load_keeps_list_and_queues_one_notice() {
    let server = MockServer::start().await;
    mount_page(&server, "1", 1..=10).await;
    Mock::given(method("GET"))
        .and(query_param("action", "posts"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Database busy"
        })))
        .mount(&server)
        .await;

    let (ctx, _) = setup(&server);
    let notifier = ctx.notifier.clone();
    let mut feed = Feed::new(ctx);
    feed.load().await.expect("first page");

    let err = feed.load_more().await.expect_err("rejected");
    assert_eq!(err.server_message(), Some("Database busy"));
    assert_eq!(feed.posts().len(), 10);

    let notices = notifier.drain();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::Error);
    assert_eq!(notices[0].message, "Database busy");
}

#[tokio::test]
async fn test_toggle_like_uses_server_count_and_persists() {
    let server = MockServer::start().await;
    mount_page(&server, "1", [5]).await;
    Mock::given(method("POST"))
        .and(query_param("action", "like"))
        .and(body_partial_json(json!({ "post_id": 5, "token": "t" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "like_count": "8"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let (ctx, storage) = setup(&server);
    login(&ctx);
    let mut feed = Feed::new(ctx);
    feed.load().await.expect("load");

    assert!(feed.toggle_like(5).await.expect("like"));
    assert!(feed.is_liked(5));
    assert_eq!(feed.posts()[0].like_count, 8);
    let stored: Vec<i64> =
        storage::get_json(storage.as_ref(), keys::LIKED_POSTS).expect("liked list stored");
    assert_eq!(stored, [5]);

    assert!(!feed.toggle_like(5).await.expect("unlike"));
    assert!(!feed.is_liked(5));
    let stored: Vec<i64> =
        storage::get_json(storage.as_ref(), keys::LIKED_POSTS).expect("liked list stored");
    assert!(stored.is_empty());
}

#[tokio::test]
async fn test_like_while_logged_out_asks_to_log_in() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("action", "like"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(0)
        .mount(&server)
        .await;

    let (ctx, _) = setup(&server);
    let notifier = ctx.notifier.clone();
    let mut feed = Feed::new(ctx);

    let result = feed.toggle_like(5).await;
    assert!(matches!(result, Err(ClientError::NotAuthenticated)));
    assert_eq!(notifier.current().map(|n| n.kind), Some(NoticeKind::Info));
}

#[tokio::test]
async fn test_hydrate_likes_replaces_local_set() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("action", "get-user-likes"))
        .and(query_param("token", "t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "liked_posts": ["3", 4]
        })))
        .mount(&server)
        .await;

    let (ctx, storage) = setup(&server);
    login(&ctx);
    storage::set_json(storage.as_ref(), keys::LIKED_POSTS, &[9_i64]).expect("seed");
    let mut feed = Feed::new(ctx);
    assert!(feed.is_liked(9));

    feed.hydrate_likes().await;
    assert!(feed.is_liked(3));
    assert!(feed.is_liked(4));
    assert!(!feed.is_liked(9));
}

#[tokio::test]
async fn test_add_comment_bumps_counter_and_reloads() {
    let server = MockServer::start().await;
    mount_page(&server, "1", [5]).await;
    Mock::given(method("POST"))
        .and(query_param("action", "comments"))
        .and(body_partial_json(json!({ "post_id": 5, "content": "nice", "token": "t" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("action", "comments"))
        .and(query_param("post_id", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "comments": [
                { "id": 1, "content": "first", "username": "bob" },
                { "id": 2, "content": "nice", "username": "alice" }
            ]
        })))
        .mount(&server)
        .await;

    let (ctx, _) = setup(&server);
    login(&ctx);
    let mut feed = Feed::new(ctx);
    feed.load().await.expect("load");

    assert!(feed.add_comment(5, " nice ").await.expect("comment"));
    assert_eq!(feed.posts()[0].comment_count, 3);
    let (post_id, comments) = feed.comments().expect("comments open");
    assert_eq!(post_id, 5);
    assert_eq!(comments.len(), 2);
}

#[tokio::test]
async fn test_blank_comment_is_ignored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("action", "comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(0)
        .mount(&server)
        .await;

    let (ctx, _) = setup(&server);
    login(&ctx);
    let mut feed = Feed::new(ctx);
    assert!(!feed.add_comment(5, "   ").await.expect("no-op"));
}

#[tokio::test]
async fn test_logout_forgets_session_and_likes() {
    let server = MockServer::start().await;
    let (ctx, storage) = setup(&server);
    login(&ctx);
    storage::set_json(storage.as_ref(), keys::LIKED_POSTS, &[1_i64]).expect("seed");
    let session = ctx.session.clone();
    let mut feed = Feed::new(ctx);

    feed.logout().expect("logout");
    assert!(!session.is_authenticated());
    assert!(!feed.is_liked(1));
    assert_eq!(storage.get(keys::TOKEN), None);
    assert_eq!(storage.get(keys::LIKED_POSTS), None);
}

#[tokio::test]
async fn test_hashtag_click_searches_without_hash() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("action", "posts"))
        .and(query_param("search", "rust"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "posts": [post(3)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (ctx, _) = setup(&server);
    let mut feed = Feed::new(ctx);
    feed.search_by_category("#rust").await.expect("search");

    assert_eq!(feed.search_query(), "rust");
    assert_eq!(feed.posts()[0].hashtag_list(), ["rust", "web"]);
}
