use serde_json::Value;

use crate::fixtures::{TestApp, seed};

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn create_and_fetch_meeting() {
    let app = TestApp::spawn().await.unwrap();
    let user = seed::register_user(&app, "lecturer1").await.unwrap();
    let meeting_id = seed::create_meeting(&app, &user, "Compilers 101").await.unwrap();

    let res = app
        .client
        .get(app.url(&format!("/api/meeting/{meeting_id}")))
        .bearer_auth(&user.access_token)
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["title"], "Compilers 101");
    assert_eq!(body["status"], "scheduled");
    assert!(!body["room_id"].as_str().unwrap_or_default().is_empty());
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn list_shows_created_meetings() {
    let app = TestApp::spawn().await.unwrap();
    let user = seed::register_user(&app, "lecturer2").await.unwrap();
    seed::create_meeting(&app, &user, "Algorithms").await.unwrap();
    seed::create_meeting(&app, &user, "Databases").await.unwrap();

    let res = app
        .client
        .get(app.url("/api/meeting"))
        .bearer_auth(&user.access_token)
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn start_then_end_closes_active_sessions() {
    let app = TestApp::spawn().await.unwrap();
    let lecturer = seed::register_user(&app, "lecturer3").await.unwrap();
    let student = seed::register_user(&app, "student3").await.unwrap();
    let meeting_id = seed::create_meeting(&app, &lecturer, "Operating Systems")
        .await
        .unwrap();

    let res = app
        .client
        .post(app.url(&format!("/api/meeting/{meeting_id}/start")))
        .bearer_auth(&lecturer.access_token)
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());

    seed::join_meeting(&app, &student, &meeting_id).await.unwrap();

    let res = app
        .client
        .post(app.url(&format!("/api/meeting/{meeting_id}/end")))
        .bearer_auth(&lecturer.access_token)
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ended");
    assert_eq!(body["sessions_ended"], 1);

    let res = app
        .client
        .get(app.url(&format!("/api/meeting/{meeting_id}/active-sessions")))
        .bearer_auth(&lecturer.access_token)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn zero_pagination_values_are_tolerated() {
    let app = TestApp::spawn().await.unwrap();
    let user = seed::register_user(&app, "lecturer4").await.unwrap();
    seed::create_meeting(&app, &user, "Networks").await.unwrap();

    let res = app
        .client
        .get(app.url("/api/meeting?page=0&per_page=0"))
        .bearer_auth(&user.access_token)
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["page"], 1);
    assert_eq!(body["per_page"], 1);
    assert_eq!(body["total"], 1);
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn only_the_creator_can_delete() {
    let app = TestApp::spawn().await.unwrap();
    let owner = seed::register_user(&app, "owner").await.unwrap();
    let other = seed::register_user(&app, "intruder").await.unwrap();
    let meeting_id = seed::create_meeting(&app, &owner, "Private").await.unwrap();

    let res = app
        .client
        .delete(app.url(&format!("/api/meeting/{meeting_id}")))
        .bearer_auth(&other.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);

    let res = app
        .client
        .delete(app.url(&format!("/api/meeting/{meeting_id}")))
        .bearer_auth(&owner.access_token)
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
}
