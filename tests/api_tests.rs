// tests/api_tests.rs

use std::sync::Arc;

use blog_backend::{
    error::AppError,
    routes,
    state::AppState,
    storage::MemoryStore,
    utils::{
        hash::{Argon2Credentials, CredentialService},
        jwt::{JwtTokens, TokenService},
    },
};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

const SECRET: &str = "test_secret_for_integration_tests";

/// Fast stand-in for Argon2 so registrations don't dominate test time.
struct PlainCredentials;

impl CredentialService for PlainCredentials {
    fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        Ok(format!("plain${plaintext}"))
    }

    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, AppError> {
        Ok(hash == format!("plain${plaintext}"))
    }
}

/// Spawns the app on a random port over a fresh in-memory store.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app_with(credentials: Arc<dyn CredentialService>) -> String {
    let tokens = Arc::new(JwtTokens::new(SECRET, 600));
    let state = AppState::new(Arc::new(MemoryStore::new()), tokens, credentials);
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

async fn spawn_app() -> String {
    spawn_app_with(Arc::new(PlainCredentials)).await
}

fn token_for(user_id: i64) -> String {
    JwtTokens::new(SECRET, 600).issue(user_id).unwrap()
}

async fn register(client: &Client, address: &str, email: &str) -> Value {
    let response = client
        .post(format!("{}/users", address))
        .json(&json!({ "email": email, "password": "pw123456" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.unwrap()
}

async fn create_post(client: &Client, address: &str, user_id: i64, title: &str) -> Value {
    let response = client
        .post(format!("{}/posts", address))
        .bearer_auth(token_for(user_id))
        .json(&json!({ "title": title, "content": "World" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.unwrap()
}

#[tokio::test]
async fn unknown_path_is_404() {
    let address = spawn_app().await;
    let response = Client::new()
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn full_post_lifecycle() {
    let address = spawn_app().await;
    let client = Client::new();

    // Register two users.
    let user = register(&client, &address, "a@x.com").await;
    assert_eq!(user["id"], 1);
    assert_eq!(user["email"], "a@x.com");
    assert!(user.get("password").is_none());
    register(&client, &address, "b@x.com").await;

    // Create a post as user 1; the create shape carries no vote count.
    let post = create_post(&client, &address, 1, "Hello").await;
    assert_eq!(post["owner_id"], 1);
    assert_eq!(post["owner"]["email"], "a@x.com");
    assert_eq!(post["published"], true);
    assert!(post.get("votes").is_none());
    let post_id = post["id"].as_i64().unwrap();

    let fetched: Value = client
        .get(format!("{}/posts/{}", address, post_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["title"], "Hello");
    assert_eq!(fetched["content"], "World");
    assert_eq!(fetched["votes"], 0);

    // Upvote as user 1.
    let vote = client
        .post(format!("{}/vote", address))
        .bearer_auth(token_for(1))
        .json(&json!({ "post_id": post_id, "dir": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(vote.status(), StatusCode::CREATED);

    let fetched: Value = client
        .get(format!("{}/posts/{}", address, post_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["votes"], 1);

    // Non-owner delete is forbidden.
    let forbidden = client
        .delete(format!("{}/posts/{}", address, post_id))
        .bearer_auth(token_for(2))
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    // Owner delete succeeds with no content.
    let deleted = client
        .delete(format!("{}/posts/{}", address, post_id))
        .bearer_auth(token_for(1))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    assert!(deleted.bytes().await.unwrap().is_empty());

    let gone = client
        .get(format!("{}/posts/{}", address, post_id))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    let body: Value = gone.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn list_filters_by_title_and_paginates() {
    let address = spawn_app().await;
    let client = Client::new();
    register(&client, &address, "a@x.com").await;
    for title in ["Hello", "Other", "Help"] {
        create_post(&client, &address, 1, title).await;
    }

    let hits: Vec<Value> = client
        .get(format!("{}/posts?search=Hel", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let titles: Vec<_> = hits.iter().map(|p| p["title"].as_str().unwrap()).collect();
    assert_eq!(titles, ["Hello", "Help"]);
    assert!(hits.iter().all(|p| p["votes"] == 0));

    let none: Vec<Value> = client
        .get(format!("{}/posts?search=zzz", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(none.is_empty());

    let page: Vec<Value> = client
        .get(format!("{}/posts?limit=1&skip=1", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["title"], "Other");

    let negative = client
        .get(format!("{}/posts?limit=-1", address))
        .send()
        .await
        .unwrap();
    assert_eq!(negative.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let nul_search = client
        .get(format!("{}/posts?search=a%00b", address))
        .send()
        .await
        .unwrap();
    assert_eq!(nul_search.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let nul_title = client
        .post(format!("{}/posts", address))
        .bearer_auth(token_for(1))
        .json(&json!({ "title": "a\u{0}b", "content": "World" }))
        .send()
        .await
        .unwrap();
    assert_eq!(nul_title.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn writes_require_a_valid_token() {
    let address = spawn_app().await;
    let client = Client::new();
    register(&client, &address, "a@x.com").await;

    let missing = client
        .post(format!("{}/posts", address))
        .json(&json!({ "title": "Hello", "content": "World" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let forged = client
        .post(format!("{}/posts", address))
        .bearer_auth(JwtTokens::new("another_secret", 600).issue(1).unwrap())
        .json(&json!({ "title": "Hello", "content": "World" }))
        .send()
        .await
        .unwrap();
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);

    let vote = client
        .post(format!("{}/vote", address))
        .json(&json!({ "post_id": 1, "dir": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(vote.status(), StatusCode::UNAUTHORIZED);

    let post = create_post(&client, &address, 1, "Hello").await;
    let url = format!("{}/posts/{}", address, post["id"]);
    let forged_token = JwtTokens::new("another_secret", 600).issue(1).unwrap();

    let put_missing = client
        .put(&url)
        .json(&json!({ "title": "Hi", "content": "There" }))
        .send()
        .await
        .unwrap();
    assert_eq!(put_missing.status(), StatusCode::UNAUTHORIZED);

    let put_forged = client
        .put(&url)
        .bearer_auth(&forged_token)
        .json(&json!({ "title": "Hi", "content": "There" }))
        .send()
        .await
        .unwrap();
    assert_eq!(put_forged.status(), StatusCode::UNAUTHORIZED);

    // Authentication is checked before existence and body validation.
    let put_nowhere = client
        .put(format!("{}/posts/999", address))
        .json(&json!({ "title": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(put_nowhere.status(), StatusCode::UNAUTHORIZED);

    let put_nowhere_forged = client
        .put(format!("{}/posts/999", address))
        .bearer_auth(&forged_token)
        .json(&json!({ "title": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(put_nowhere_forged.status(), StatusCode::UNAUTHORIZED);

    let delete_missing = client.delete(&url).send().await.unwrap();
    assert_eq!(delete_missing.status(), StatusCode::UNAUTHORIZED);

    let delete_forged = client
        .delete(&url)
        .bearer_auth(&forged_token)
        .send()
        .await
        .unwrap();
    assert_eq!(delete_forged.status(), StatusCode::UNAUTHORIZED);

    let delete_nowhere = client
        .delete(format!("{}/posts/999", address))
        .send()
        .await
        .unwrap();
    assert_eq!(delete_nowhere.status(), StatusCode::UNAUTHORIZED);

    // The post survived untouched.
    let kept: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(kept["title"], "Hello");
    assert_eq!(kept["content"], "World");
}

#[tokio::test]
async fn rejected_writes_create_nothing() {
    let address = spawn_app().await;
    let client = Client::new();
    register(&client, &address, "a@x.com").await;

    let missing = client
        .post(format!("{}/posts", address))
        .json(&json!({ "title": "Hello", "content": "World" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    // Nothing was created.
    let posts: Vec<Value> = client
        .get(format!("{}/posts", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(posts.is_empty());
}

#[tokio::test]
async fn non_owner_update_is_forbidden_even_with_an_invalid_body() {
    let address = spawn_app().await;
    let client = Client::new();
    register(&client, &address, "a@x.com").await;
    register(&client, &address, "b@x.com").await;
    let post = create_post(&client, &address, 1, "Hello").await;
    let url = format!("{}/posts/{}", address, post["id"]);

    let invalid_body = client
        .put(&url)
        .bearer_auth(token_for(2))
        .json(&json!({ "title": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(invalid_body.status(), StatusCode::FORBIDDEN);

    let valid_body = client
        .put(&url)
        .bearer_auth(token_for(2))
        .json(&json!({ "title": "Mine", "content": "now" }))
        .send()
        .await
        .unwrap();
    assert_eq!(valid_body.status(), StatusCode::FORBIDDEN);

    // The owner with a bad body gets a validation error naming the field.
    let owner_invalid = client
        .put(&url)
        .bearer_auth(token_for(1))
        .json(&json!({ "title": "", "content": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(owner_invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = owner_invalid.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("title"));

    let updated: Value = client
        .put(&url)
        .bearer_auth(token_for(1))
        .json(&json!({ "title": "Hi", "content": "There", "published": false }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["title"], "Hi");
    assert_eq!(updated["published"], false);

    let missing = client
        .put(format!("{}/posts/999", address))
        .bearer_auth(token_for(1))
        .json(&json!({ "title": "Hi", "content": "There" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let address = spawn_app().await;
    let client = Client::new();
    register(&client, &address, "a@x.com").await;

    let dup = client
        .post(format!("{}/users", address))
        .json(&json!({ "email": "a@x.com", "password": "different" }))
        .send()
        .await
        .unwrap();
    assert_eq!(dup.status(), StatusCode::CONFLICT);

    let user: Value = client
        .get(format!("{}/users/1", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(user["email"], "a@x.com");

    let missing = client
        .get(format!("{}/users/2", address))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn registration_validates_the_body() {
    let address = spawn_app().await;
    let client = Client::new();

    let bad_email = client
        .post(format!("{}/users", address))
        .json(&json!({ "email": "not-an-email", "password": "pw123456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_email.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let missing_field = client
        .post(format!("{}/users", address))
        .json(&json!({ "email": "a@x.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing_field.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn vote_rules() {
    let address = spawn_app().await;
    let client = Client::new();
    register(&client, &address, "a@x.com").await;
    let post = create_post(&client, &address, 1, "Hello").await;

    let cast = |dir: i64, post_id: Value| {
        client
            .post(format!("{}/vote", address))
            .bearer_auth(token_for(1))
            .json(&json!({ "post_id": post_id, "dir": dir }))
            .send()
    };

    let unvote_first = cast(0, post["id"].clone()).await.unwrap();
    assert_eq!(unvote_first.status(), StatusCode::NOT_FOUND);

    assert_eq!(cast(1, post["id"].clone()).await.unwrap().status(), StatusCode::CREATED);
    assert_eq!(cast(1, post["id"].clone()).await.unwrap().status(), StatusCode::CONFLICT);
    assert_eq!(cast(0, post["id"].clone()).await.unwrap().status(), StatusCode::CREATED);

    let missing_post = cast(1, json!(999)).await.unwrap();
    assert_eq!(missing_post.status(), StatusCode::NOT_FOUND);

    let bad_dir = cast(2, post["id"].clone()).await.unwrap();
    assert_eq!(bad_dir.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn login_issues_a_usable_token() {
    let address = spawn_app_with(Arc::new(Argon2Credentials)).await;
    let client = Client::new();
    register(&client, &address, "a@x.com").await;

    let wrong = client
        .post(format!("{}/login", address))
        .json(&json!({ "email": "a@x.com", "password": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let login: Value = client
        .post(format!("{}/login", address))
        .json(&json!({ "email": "a@x.com", "password": "pw123456" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(login["token_type"], "bearer");
    let token = login["access_token"].as_str().expect("Token not found");

    let created = client
        .post(format!("{}/posts", address))
        .bearer_auth(token)
        .json(&json!({ "title": "Hello", "content": "World" }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn serves_openapi_document() {
    let address = spawn_app().await;
    let doc: Value = Client::new()
        .get(format!("{}/api-docs/openapi.json", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(doc["paths"]["/posts/{id}"].is_object());
    assert!(doc["paths"]["/vote"]["post"].is_object());
}
