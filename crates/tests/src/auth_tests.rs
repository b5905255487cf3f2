use serde_json::Value;

use crate::fixtures::{TestApp, seed};

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn register_then_login() {
    let app = TestApp::spawn().await.unwrap();
    let user = seed::register_user(&app, "ada").await.unwrap();
    assert!(!user.access_token.is_empty());

    let res = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&serde_json::json!({
            "username": "ada",
            "password": "correct-horse-battery",
        }))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user"]["username"], "ada");
    assert!(body["tokens"]["access_token"].as_str().is_some());
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn login_with_wrong_password_is_rejected() {
    let app = TestApp::spawn().await.unwrap();
    seed::register_user(&app, "grace").await.unwrap();

    let res = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&serde_json::json!({ "username": "grace", "password": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn duplicate_username_conflicts() {
    let app = TestApp::spawn().await.unwrap();
    seed::register_user(&app, "alan").await.unwrap();

    let res = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&serde_json::json!({
            "email": "other@example.com",
            "username": "alan",
            "display_name": "Alan",
            "password": "correct-horse-battery",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 409);
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn me_requires_a_token() {
    let app = TestApp::spawn().await.unwrap();

    let res = app.client.get(app.url("/api/auth/me")).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 401);

    let user = seed::register_user(&app, "edsger").await.unwrap();
    let res = app
        .client
        .get(app.url("/api/auth/me"))
        .bearer_auth(&user.access_token)
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["username"], "edsger");
}
