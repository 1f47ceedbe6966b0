use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header::AUTHORIZATION, Method, Request, StatusCode},
    Router,
};
use donelist_common::{
    service::TodoService,
    types::{Role, Session, UserId},
};
use donelist_relay::{auth::jwt::JwtAccessTokenService, build_router, store::TodoStore};
use serde_json::Value;
use tower::ServiceExt;

const TEST_SECRET: &str = "donelist_test_secret_that_is_definitely_long_enough";

fn setup() -> (Router, TodoStore, Arc<JwtAccessTokenService>) {
    let tokens =
        Arc::new(JwtAccessTokenService::new(TEST_SECRET).expect("jwt service should initialize"));
    let store = TodoStore::new();
    (build_router(store.clone(), Arc::clone(&tokens), None), store, tokens)
}

async fn call(router: &Router, method: Method, uri: &str, token: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request should build"),
        )
        .await
        .expect("request should return a response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body should read");
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json") };
    (status, value)
}

#[tokio::test]
async fn foreign_toggle_is_reported_exactly_like_a_missing_row() {
    let (router, store, tokens) = setup();
    let owner = Session::new(UserId::new_v4(), Role::Member);
    let todo = store.create(&owner, "private").await.expect("seed todo");
    let intruder = tokens.issue_token(UserId::new_v4(), Role::Member).expect("token");

    let (foreign_status, foreign_body) =
        call(&router, Method::POST, &format!("/v1/todos/{}/toggle", todo.id), &intruder).await;
    let (missing_status, missing_body) = call(
        &router,
        Method::POST,
        &format!("/v1/todos/{}/toggle", uuid::Uuid::new_v4()),
        &intruder,
    )
    .await;
    let (garbage_status, _) =
        call(&router, Method::POST, "/v1/todos/temp-1/toggle", &intruder).await;

    assert_eq!(foreign_status, StatusCode::NOT_FOUND);
    assert_eq!(foreign_status, missing_status);
    assert_eq!(garbage_status, StatusCode::NOT_FOUND);
    assert_eq!(foreign_body["error"]["message"], missing_body["error"]["message"]);

    let rows = store.list(&owner).await.expect("list");
    assert!(!rows[0].completed, "foreign toggle must not change the row");
}

#[tokio::test]
async fn member_delete_is_forbidden_even_for_own_rows() {
    let (router, store, tokens) = setup();
    let user_id = UserId::new_v4();
    let token = tokens.issue_token(user_id, Role::Member).expect("token");
    let todo = store.create(&Session::new(user_id, Role::Member), "mine").await.expect("seed");

    let (status, body) = call(&router, Method::DELETE, &format!("/v1/todos/{}", todo.id), &token).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "AUTH_FORBIDDEN");
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn member_delete_of_unknown_id_is_still_forbidden() {
    let (router, _, tokens) = setup();
    let token = tokens.issue_token(UserId::new_v4(), Role::Member).expect("token");

    let (status, _) =
        call(&router, Method::DELETE, &format!("/v1/todos/{}", uuid::Uuid::new_v4()), &token).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_delete_removes_any_users_row() {
    let (router, store, tokens) = setup();
    let todo = store
        .create(&Session::new(UserId::new_v4(), Role::Member), "spam")
        .await
        .expect("seed");
    let admin = tokens.issue_token(UserId::new_v4(), Role::Admin).expect("token");
    let uri = format!("/v1/todos/{}", todo.id);

    let (status, _) = call(&router, Method::DELETE, &uri, &admin).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(store.len().await, 0);

    let (status, body) = call(&router, Method::DELETE, &uri, &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn list_never_exposes_other_users_rows() {
    let (router, store, tokens) = setup();
    store
        .create(&Session::new(UserId::new_v4(), Role::Member), "not yours")
        .await
        .expect("seed");
    let viewer = tokens.issue_token(UserId::new_v4(), Role::Admin).expect("token");

    let (status, body) = call(&router, Method::GET, "/v1/todos", &viewer).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["todos"], serde_json::json!([]));
}
