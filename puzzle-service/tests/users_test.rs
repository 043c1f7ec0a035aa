mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, TestApp, PASSWORD};
use puzzle_service::models::PermissionCode;
use puzzle_service::services::Store;

fn new_user(email: &str, display_name: &str) -> serde_json::Value {
    serde_json::json!({
        "email": email,
        "full_name": "Ada Setter",
        "display_name": display_name,
        "password": "correct-horse",
    })
}

async fn login(app: &TestApp, password: &str) -> axum::response::Response {
    app.json(
        Method::POST,
        "/v1/tokens/authentication",
        None,
        serde_json::json!({ "email": "setter@example.com", "password": password }),
    )
    .await
}

#[tokio::test]
async fn add_user_needs_users_create() {
    let app = TestApp::new();
    let (_, editor) = app.editor("setter").await;

    let res = app
        .json(
            Method::POST,
            "/v1/users",
            Some(&editor),
            new_user("ada@example.com", "ada"),
        )
        .await;

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn add_user_creates_an_activated_standard_account() {
    let app = TestApp::new();
    let admin = app
        .create_user("admin", true, &[PermissionCode::UsersCreate])
        .await;
    let token = app.token_for(&admin).await;

    let res = app
        .json(
            Method::POST,
            "/v1/users",
            Some(&token),
            new_user("ada@example.com", "ada"),
        )
        .await;

    assert_eq!(res.status(), StatusCode::CREATED);
    let body = body_json(res).await;
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["activated"], true);
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("credential").is_none());

    let id = body["user"]["id"].as_i64().unwrap();
    let permissions = app.store.get_permissions_for_user(id).await.unwrap();
    for code in PermissionCode::STANDARD {
        assert!(permissions.includes(code), "{} missing", code);
    }
    assert!(!permissions.includes(PermissionCode::UsersCreate));
}

#[tokio::test]
async fn add_user_rejects_duplicates_per_field() {
    let app = TestApp::new();
    let admin = app
        .create_user("admin", true, &[PermissionCode::UsersCreate])
        .await;
    let token = app.token_for(&admin).await;

    let first = app
        .json(Method::POST, "/v1/users", Some(&token), new_user("ada@example.com", "ada"))
        .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let same_email = app
        .json(Method::POST, "/v1/users", Some(&token), new_user("ada@example.com", "lovelace"))
        .await;
    assert_eq!(same_email.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body_json(same_email).await["error"]["email"][0],
        "a user with this email address already exists"
    );

    let same_name = app
        .json(Method::POST, "/v1/users", Some(&token), new_user("other@example.com", "ada"))
        .await;
    assert_eq!(same_name.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body_json(same_name).await["error"]["display_name"][0],
        "this display name is already in use"
    );
}

#[tokio::test]
async fn add_user_trims_profile_fields_before_storing() {
    let app = TestApp::new();
    let admin = app
        .create_user("admin", true, &[PermissionCode::UsersCreate])
        .await;
    let token = app.token_for(&admin).await;

    let res = app
        .json(
            Method::POST,
            "/v1/users",
            Some(&token),
            new_user(" ada@example.com ", "  ada "),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = body_json(res).await;
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["display_name"], "ada");

    let padded_twin = app
        .json(Method::POST, "/v1/users", Some(&token), new_user("twin@example.com", "ada "))
        .await;
    assert_eq!(padded_twin.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body_json(padded_twin).await["error"]["display_name"][0],
        "this display name is already in use"
    );

    let blank = app
        .json(Method::POST, "/v1/users", Some(&token), new_user("blank@example.com", "   "))
        .await;
    assert_eq!(blank.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body_json(blank).await["error"]["display_name"][0],
        "must be provided"
    );
}

#[tokio::test]
async fn add_user_validates_every_field() {
    let app = TestApp::new();
    let admin = app
        .create_user("admin", true, &[PermissionCode::UsersCreate])
        .await;
    let token = app.token_for(&admin).await;

    let res = app
        .json(
            Method::POST,
            "/v1/users",
            Some(&token),
            serde_json::json!({ "email": "nope", "password": "x".repeat(73) }),
        )
        .await;

    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let errors = body_json(res).await["error"].clone();
    assert_eq!(errors["email"][0], "must be a valid email address");
    assert_eq!(errors["full_name"][0], "must be provided");
    assert_eq!(errors["display_name"][0], "must be provided");
    assert_eq!(errors["password"][0], "must not be more than 72 bytes long");
}

#[tokio::test]
async fn show_current_user_lists_permissions() {
    let app = TestApp::new();
    let (user, token) = app.editor("setter").await;

    let res = app.get("/v1/user", Some(&token)).await;

    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["user"]["id"], user.id);
    let codes: Vec<_> = body["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_str().unwrap().to_string())
        .collect();
    assert!(codes.contains(&"puzzles:update".to_string()));
    assert!(codes.contains(&"users:read".to_string()));
    assert_eq!(codes.len(), PermissionCode::STANDARD.len());
}

#[tokio::test]
async fn update_current_user_replaces_profile() {
    let app = TestApp::new();
    let (user, token) = app.editor("setter").await;

    let res = app
        .json(
            Method::PUT,
            "/v1/user",
            Some(&token),
            serde_json::json!({
                "email": "renamed@example.com",
                "full_name": "Renamed Setter",
                "display_name": "renamed",
            }),
        )
        .await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["user"]["display_name"], "renamed");

    let stored = app.store.get_user(user.id).await.unwrap();
    assert_eq!(stored.email, "renamed@example.com");
    assert_eq!(stored.version, user.version + 1);
}

#[tokio::test]
async fn update_current_user_rejects_taken_display_name() {
    let app = TestApp::new();
    app.create_user("taken", true, &[]).await;
    let (_, token) = app.editor("setter").await;

    let res = app
        .json(
            Method::PUT,
            "/v1/user",
            Some(&token),
            serde_json::json!({
                "email": "setter@example.com",
                "full_name": "Setter",
                "display_name": "taken",
            }),
        )
        .await;

    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body_json(res).await["error"]["display_name"][0],
        "this display name is already in use"
    );
}

#[tokio::test]
async fn change_password_then_login_with_the_new_one() {
    let app = TestApp::new();
    let (_, token) = app.editor("setter").await;

    let res = app
        .json(
            Method::PUT,
            "/v1/user/password",
            Some(&token),
            serde_json::json!({ "password": "brand-new-secret" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["message"], "password successfully changed");

    assert_eq!(login(&app, PASSWORD).await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(login(&app, "brand-new-secret").await.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn change_password_rejects_short_password() {
    let app = TestApp::new();
    let (_, token) = app.editor("setter").await;

    let res = app
        .json(
            Method::PUT,
            "/v1/user/password",
            Some(&token),
            serde_json::json!({ "password": "short" }),
        )
        .await;

    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body_json(res).await["error"]["password"][0],
        "must be at least 8 bytes long"
    );
}
