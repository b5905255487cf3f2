use serde_json::Value;

use super::TestApp;

pub struct SeededUser {
    pub id: String,
    pub username: String,
    pub access_token: String,
}

pub async fn register_user(app: &TestApp, username: &str) -> anyhow::Result<SeededUser> {
    let res = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&serde_json::json!({
            "email": format!("{username}@example.com"),
            "username": username,
            "display_name": username,
            "password": "correct-horse-battery",
        }))
        .send()
        .await?;
    anyhow::ensure!(
        res.status().as_u16() == 201,
        "register failed with {}",
        res.status()
    );

    let body: Value = res.json().await?;
    Ok(SeededUser {
        id: body["user"]["id"].as_str().unwrap_or_default().to_string(),
        username: username.to_string(),
        access_token: body["tokens"]["access_token"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
    })
}

pub async fn create_meeting(app: &TestApp, user: &SeededUser, title: &str) -> anyhow::Result<String> {
    let res = app
        .client
        .post(app.url("/api/meeting"))
        .bearer_auth(&user.access_token)
        .json(&serde_json::json!({ "title": title }))
        .send()
        .await?;
    anyhow::ensure!(
        res.status().as_u16() == 201,
        "create meeting failed with {}",
        res.status()
    );

    let body: Value = res.json().await?;
    Ok(body["id"].as_str().unwrap_or_default().to_string())
}

pub async fn join_meeting(
    app: &TestApp,
    user: &SeededUser,
    meeting_id: &str,
) -> anyhow::Result<Value> {
    let res = app
        .client
        .post(app.url(&format!("/api/meeting/{meeting_id}/join")))
        .bearer_auth(&user.access_token)
        .json(&serde_json::json!({}))
        .send()
        .await?;
    anyhow::ensure!(res.status().is_success(), "join failed with {}", res.status());
    Ok(res.json().await?)
}
