//! Integration tests for accounts: signup, login, profile, suspension, and
//! role management.

mod common;

use common::*;
use serde_json::json;

#[tokio::test]
async fn test_signup_and_me() {
    let (base_url, _addr) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/auth/signup", base_url))
        .json(&json!({
            "name": "Ana",
            "email": "Ana@Example.com",
            "password": "secret123",
            "country": "FR",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    let token = body["token"].as_str().unwrap();
    // Emails are normalized to lowercase
    assert_eq!(body["user"]["email"], "ana@example.com");
    assert_eq!(body["user"]["role"], "member");

    let me: serde_json::Value = client
        .get(format!("{}/api/auth/me", base_url))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["name"], "Ana");
    assert_eq!(me["country"], "FR");

    // Duplicate email is rejected
    let resp = client
        .post(format!("{}/api/auth/signup", base_url))
        .json(&json!({
            "name": "Ana2",
            "email": "ana@example.com",
            "password": "secret123",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let (base_url, _addr) = start_test_server().await;
    let client = reqwest::Client::new();
    signup(&base_url, "Ben", "ben@example.com").await;

    let resp = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&json!({ "email": "ben@example.com", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&json!({ "email": "nobody@example.com", "password": "secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&json!({ "email": "ben@example.com", "password": "secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let (base_url, _addr) = start_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/auth/me", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .get(format!("{}/api/notifs", base_url))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_profile_update_and_password_change() {
    let (base_url, _addr) = start_test_server().await;
    let client = reqwest::Client::new();
    let token = signup(&base_url, "Cleo", "cleo@example.com").await;

    let me: serde_json::Value = client
        .put(format!("{}/api/auth/me", base_url))
        .bearer_auth(&token)
        .json(&json!({ "bio": "Choriste", "country": "CM" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["bio"], "Choriste");
    assert_eq!(me["country"], "CM");

    // Too-short password is rejected
    let resp = client
        .put(format!("{}/api/auth/password", base_url))
        .bearer_auth(&token)
        .json(&json!({ "newPassword": "abc" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .put(format!("{}/api/auth/password", base_url))
        .bearer_auth(&token)
        .json(&json!({ "newPassword": "newsecret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&json!({ "email": "cleo@example.com", "password": "newsecret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_suspension_blocks_login_until_restore_date() {
    let (base_url, _addr) = start_test_server().await;
    let client = reqwest::Client::new();
    let admin = admin_token(&base_url).await;
    signup(&base_url, "Dov", "dov@example.com").await;

    let users: serde_json::Value = client
        .get(format!("{}/api/admin/users", base_url))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let dov_id = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == "dov@example.com")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    // Suspend with no restore date: login stays blocked
    let resp = client
        .patch(format!("{}/api/admin/users/{}/suspend", base_url, dov_id))
        .bearer_auth(&admin)
        .json(&json!({ "suspended": true, "reason": "spam" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&json!({ "email": "dov@example.com", "password": "secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // Suspend with a restore date in the past: login lifts it automatically
    let resp = client
        .patch(format!("{}/api/admin/users/{}/suspend", base_url, dov_id))
        .bearer_auth(&admin)
        .json(&json!({
            "suspended": true,
            "restoreDate": "2020-01-01T00:00:00Z",
            "reason": "spam",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&json!({ "email": "dov@example.com", "password": "secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["suspended"], false);
}

#[tokio::test]
async fn test_role_changes_are_primary_admin_only() {
    let (base_url, _addr) = start_test_server().await;
    let client = reqwest::Client::new();
    let admin = admin_token(&base_url).await;
    let member = signup(&base_url, "Eve", "eve@example.com").await;

    let users: serde_json::Value = client
        .get(format!("{}/api/admin/users", base_url))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let eve_id = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == "eve@example.com")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    // Members cannot even list users
    let resp = client
        .get(format!("{}/api/admin/users", base_url))
        .bearer_auth(&member)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // Primary admin promotes Eve to subadmin
    let promoted: serde_json::Value = client
        .patch(format!("{}/api/admin/users/{}/role", base_url, eve_id))
        .bearer_auth(&admin)
        .json(&json!({ "role": "subadmin" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(promoted["role"], "subadmin");

    // A subadmin token may moderate but not change roles
    let sub_token = {
        let resp = client
            .post(format!("{}/api/auth/login", base_url))
            .json(&json!({ "email": "eve@example.com", "password": "secret123" }))
            .send()
            .await
            .unwrap();
        let body: serde_json::Value = resp.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    };
    let resp = client
        .patch(format!("{}/api/admin/users/{}/role", base_url, eve_id))
        .bearer_auth(&sub_token)
        .json(&json!({ "role": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // Unknown roles are rejected
    let resp = client
        .patch(format!("{}/api/admin/users/{}/role", base_url, eve_id))
        .bearer_auth(&admin)
        .json(&json!({ "role": "superuser" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}
