use bson::oid::ObjectId;
use serde_json::Value;

use crate::fixtures::{TestApp, seed};

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn join_creates_a_session_and_heartbeat_sees_it() {
    let app = TestApp::spawn().await.unwrap();
    let user = seed::register_user(&app, "s1").await.unwrap();
    let lecturer = seed::register_user(&app, "l1").await.unwrap();
    let meeting_id = seed::create_meeting(&app, &lecturer, "Lecture").await.unwrap();

    let joined = seed::join_meeting(&app, &user, &meeting_id).await.unwrap();
    assert_eq!(joined["status"], "joined");
    assert_eq!(joined["is_existing_session"], false);
    let session_id = joined["id"].as_str().unwrap().to_string();

    let res = app
        .client
        .post(app.url(&format!("/api/meeting/{meeting_id}/heartbeat")))
        .bearer_auth(&user.access_token)
        .json(&serde_json::json!({ "session_id": session_id }))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert!(body["current_duration"].as_i64().unwrap() >= 0);
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn heartbeat_for_unknown_session_is_a_soft_miss() {
    let app = TestApp::spawn().await.unwrap();
    let user = seed::register_user(&app, "s2").await.unwrap();
    let meeting_id = seed::create_meeting(&app, &user, "Lecture").await.unwrap();

    let res = app
        .client
        .post(app.url(&format!("/api/meeting/{meeting_id}/heartbeat")))
        .bearer_auth(&user.access_token)
        .json(&serde_json::json!({ "session_id": ObjectId::new().to_hex() }))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "session_not_found");
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn leave_is_idempotent() {
    let app = TestApp::spawn().await.unwrap();
    let user = seed::register_user(&app, "s3").await.unwrap();
    let meeting_id = seed::create_meeting(&app, &user, "Lecture").await.unwrap();

    let joined = seed::join_meeting(&app, &user, &meeting_id).await.unwrap();
    let session_id = joined["id"].as_str().unwrap().to_string();

    let leave = |body: serde_json::Value| {
        app.client
            .post(app.url(&format!("/api/meeting/{meeting_id}/leave")))
            .bearer_auth(&user.access_token)
            .json(&body)
            .send()
    };

    let res = leave(serde_json::json!({ "session_id": session_id, "reason": "navigation" }))
        .await
        .unwrap();
    let first: Value = res.json().await.unwrap();
    assert_eq!(first["status"], "left");
    assert_eq!(first["reason"], "navigation");

    let res = leave(serde_json::json!({ "session_id": session_id }))
        .await
        .unwrap();
    let second: Value = res.json().await.unwrap();
    assert_eq!(second["status"], "already_left");
    assert_eq!(second["leave_time"], first["leave_time"]);
    assert_eq!(second["duration_minutes"], first["duration_minutes"]);
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn short_session_is_not_resumed_and_hidden_from_history() {
    let app = TestApp::spawn().await.unwrap();
    let user = seed::register_user(&app, "s4").await.unwrap();
    let meeting_id = seed::create_meeting(&app, &user, "Lecture").await.unwrap();

    // Join and leave within a second: a zero-length ended session is
    // connection noise, not a resume candidate.
    let joined = seed::join_meeting(&app, &user, &meeting_id).await.unwrap();
    let session_id = joined["id"].as_str().unwrap().to_string();
    app.client
        .post(app.url(&format!("/api/meeting/{meeting_id}/leave")))
        .bearer_auth(&user.access_token)
        .json(&serde_json::json!({ "session_id": session_id }))
        .send()
        .await
        .unwrap();

    let res = app
        .client
        .post(app.url(&format!("/api/meeting/{meeting_id}/check-recent-session")))
        .bearer_auth(&user.access_token)
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["can_resume"], false);

    let rejoined = seed::join_meeting(&app, &user, &meeting_id).await.unwrap();
    assert_eq!(rejoined["is_existing_session"], false);
    assert_ne!(rejoined["id"], joined["id"]);

    // History shows only the new active session; the noise stays out.
    let res = app
        .client
        .get(app.url(&format!("/api/meeting/{meeting_id}/attendance")))
        .bearer_auth(&user.access_token)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["id"], rejoined["id"]);
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn resume_of_unknown_session_is_rejected() {
    let app = TestApp::spawn().await.unwrap();
    let user = seed::register_user(&app, "s5").await.unwrap();
    let meeting_id = seed::create_meeting(&app, &user, "Lecture").await.unwrap();

    let res = app
        .client
        .post(app.url(&format!("/api/meeting/{meeting_id}/resume-session")))
        .bearer_auth(&user.access_token)
        .json(&serde_json::json!({ "session_id": ObjectId::new().to_hex() }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn resume_of_active_session_reports_already_active() {
    let app = TestApp::spawn().await.unwrap();
    let user = seed::register_user(&app, "s6").await.unwrap();
    let meeting_id = seed::create_meeting(&app, &user, "Lecture").await.unwrap();

    let joined = seed::join_meeting(&app, &user, &meeting_id).await.unwrap();
    let session_id = joined["id"].as_str().unwrap().to_string();

    let res = app
        .client
        .post(app.url(&format!("/api/meeting/{meeting_id}/resume-session")))
        .bearer_auth(&user.access_token)
        .json(&serde_json::json!({ "session_id": session_id }))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "already_active");
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn concurrent_joins_all_survive() {
    let app = TestApp::spawn().await.unwrap();
    let lecturer = seed::register_user(&app, "l7").await.unwrap();
    let meeting_id = seed::create_meeting(&app, &lecturer, "Busy lecture")
        .await
        .unwrap();

    let mut users = Vec::new();
    for i in 0..8 {
        users.push(seed::register_user(&app, &format!("s7_{i}")).await.unwrap());
    }

    // Fire all joins at once; the per-meeting writer discipline must not
    // lose any of them.
    let results = futures_join_all(&app, &meeting_id, &users).await;
    assert_eq!(results.len(), 8);

    let res = app
        .client
        .get(app.url(&format!("/api/meeting/{meeting_id}/active-sessions")))
        .bearer_auth(&lecturer.access_token)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body.as_array().map(Vec::len), Some(8));
}

async fn futures_join_all(
    app: &TestApp,
    meeting_id: &str,
    users: &[seed::SeededUser],
) -> Vec<Value> {
    let futures = users
        .iter()
        .map(|user| seed::join_meeting(app, user, meeting_id));
    let mut results = Vec::new();
    for outcome in futures::future::join_all(futures).await {
        results.push(outcome.unwrap());
    }
    results
}

#[tokio::test]
#[ignore = "requires MongoDB"]
async fn cleanup_reports_dropped_noise() {
    let app = TestApp::spawn().await.unwrap();
    let user = seed::register_user(&app, "s8").await.unwrap();
    let meeting_id = seed::create_meeting(&app, &user, "Lecture").await.unwrap();

    // Leave immediately to plant a noise session.
    let joined = seed::join_meeting(&app, &user, &meeting_id).await.unwrap();
    let session_id = joined["id"].as_str().unwrap().to_string();
    app.client
        .post(app.url(&format!("/api/meeting/{meeting_id}/leave")))
        .bearer_auth(&user.access_token)
        .json(&serde_json::json!({ "session_id": session_id }))
        .send()
        .await
        .unwrap();

    let res = app
        .client
        .post(app.url(&format!("/api/meeting/{meeting_id}/attendance/cleanup")))
        .bearer_auth(&user.access_token)
        .send()
        .await
        .unwrap();
    assert!(res.status().is_success());
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "cleaned");
    assert_eq!(body["dropped_noise"], 1);
}
