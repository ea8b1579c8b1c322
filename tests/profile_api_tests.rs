
use chrono::Utc;
use reqwest::StatusCode;
use serde_json::{json, Value};
use test_utils::*;
use uuid::Uuid;

#[actix_rt::test]
async fn profile_defaults_to_session_data() {
    let app = TestApp::spawn().await;
    let user = Uuid::new_v4();

    let response = app.get("/profile", &app.token_for(user)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["id"], user.to_string());
    assert_eq!(body["email"], "ana@example.com");
    assert_eq!(body["nome"], "");
}

#[actix_rt::test]
async fn update_profile_persists_fields() {
    let app = TestApp::spawn().await;
    let user = Uuid::new_v4();
    let token = app.token_for(user);

    let response = app
        .put_json(
            "/profile",
            &token,
            &json!({ "nome": "Ana Souza", "telefone": "11999990000", "data_nascimento": "2015-03-09" }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["nome"], "Ana Souza");
    assert_eq!(body["telefone"], "11999990000");
    assert_eq!(body["data_nascimento"], "2015-03-09");

    let cleared: Value = app
        .put_json("/profile", &token, &json!({ "telefone": null }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(cleared["telefone"], Value::Null);
    assert_eq!(cleared["nome"], "Ana Souza");
}

#[actix_rt::test]
async fn avatar_upload_then_removal() {
    let app = TestApp::spawn().await;
    let user = Uuid::new_v4();
    let token = app.token_for(user);

    let uploaded = app
        .post_json("/profile/avatar", &token, &json!({ "image": png_data_uri() }))
        .await;
    assert_eq!(uploaded.status(), StatusCode::OK);
    let uploaded: Value = uploaded.json().await.unwrap();
    let avatar_url = uploaded["avatar_url"].as_str().unwrap().to_string();
    assert!(avatar_url.starts_with(&format!("{STORAGE_BASE}/object/public/avatars/{user}/avatar_")));
    assert!(uploaded["display_url"].as_str().unwrap().contains("t="));

    let objects = app.store.objects();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].bucket, "avatars");

    let removed = app.delete("/profile/avatar", &token).await;
    assert_eq!(removed.status(), StatusCode::OK);
    let removed: Value = removed.json().await.unwrap();
    assert_eq!(removed["avatar_url"], Value::Null);
    assert!(removed["display_url"].as_str().unwrap().starts_with("https://ui-avatars.com/api/"));

    assert_eq!(app.store.removed(), vec![("avatars".to_string(), objects[0].path.clone())]);
    assert_eq!(app.profiles.get(&user).unwrap().avatar_url, None);
}

#[actix_rt::test]
async fn failed_avatar_upload_keeps_previous_avatar() {
    let app = TestApp::spawn().await;
    let user = Uuid::new_v4();
    let token = app.token_for(user);
    app.post_json("/profile/avatar", &token, &json!({ "image": png_data_uri() }))
        .await;
    let before = app.profiles.get(&user).unwrap().avatar_url;

    app.store.reject_writes(true);
    let response = app
        .post_json("/profile/avatar", &token, &json!({ "image": png_data_uri() }))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(app.profiles.get(&user).unwrap().avatar_url, before);
}

#[actix_rt::test]
async fn protected_routes_require_a_valid_session() {
    let app = TestApp::spawn().await;

    let missing = app.client.get(app.url("/gestures")).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["code"], "unauthenticated");

    let forged = app.get("/profile", "not.a.jwt").await;
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);

    let expired = sign_token(json!({
        "sub": Uuid::new_v4().to_string(),
        "aud": "authenticated",
        "exp": Utc::now().timestamp() - 3600,
    }));
    let response = app.get("/profile", &expired).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "session_expired");

    let wrong_audience = sign_token(json!({
        "sub": Uuid::new_v4().to_string(),
        "aud": "anon",
        "exp": Utc::now().timestamp() + 3600,
    }));
    assert_eq!(app.get("/profile", &wrong_audience).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn public_routes_need_no_token() {
    let app = TestApp::spawn().await;

    let health = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let categories = app.client.get(app.url("/categories")).send().await.unwrap();
    assert_eq!(categories.status(), StatusCode::OK);
    let body: Value = categories.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), 9);
}

#[actix_rt::test]
async fn malformed_json_gets_a_json_error() {
    let app = TestApp::spawn().await;
    let token = app.token_for(Uuid::new_v4());

    let response = app
        .client
        .put(app.url("/profile"))
        .bearer_auth(&token)
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "invalid_json");
}
