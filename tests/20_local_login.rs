mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

// Skipped without DATABASE_URL; with it set, an unreachable database fails them.

#[tokio::test]
async fn register_then_login_then_whoami() -> Result<()> {
    let server = common::ensure_server().await?;
    if common::database(server).await?.is_none() {
        return Ok(());
    }

    let email = common::unique_email("parent");
    let (status, body) = common::register(server, &email, "correct horse").await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["formData"]["user"]["email"], email.as_str());
    assert_eq!(body["formData"]["user"]["tokenSource"], "local");

    let res = reqwest::Client::new()
        .post(server.url("/auth/local/login"))
        .json(&json!({ "email": email.to_uppercase(), "password": "correct horse" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let login: Value = res.json().await?;
    let token = login["formData"]["token"].as_str().unwrap_or_default().to_string();
    assert!(!token.is_empty());

    let (status, whoami) = common::get_local(server, &token, "/auth/whoami").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(whoami["formData"]["user"]["email"], email.as_str());
    Ok(())
}

#[tokio::test]
async fn duplicate_registration_conflicts() -> Result<()> {
    let server = common::ensure_server().await?;
    if common::database(server).await?.is_none() {
        return Ok(());
    }

    let email = common::unique_email("dup");
    let (first, _) = common::register(server, &email, "long enough").await?;
    assert_eq!(first, StatusCode::CREATED);

    let (second, body) = common::register(server, &email, "long enough").await?;
    assert_eq!(second, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn short_password_is_a_field_error() -> Result<()> {
    let server = common::ensure_server().await?;
    if common::database(server).await?.is_none() {
        return Ok(());
    }

    let (status, body) = common::register(server, &common::unique_email("short"), "abc").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fieldErrors"]["password"].is_string());
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_unauthorized() -> Result<()> {
    let server = common::ensure_server().await?;
    if common::database(server).await?.is_none() {
        return Ok(());
    }

    let email = common::unique_email("wrongpw");
    common::register(server, &email, "right password").await?;

    let res = reqwest::Client::new()
        .post(server.url("/auth/local/login"))
        .json(&json!({ "email": email, "password": "wrong password" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn plain_users_cannot_create_tenants() -> Result<()> {
    let server = common::ensure_server().await?;
    if common::database(server).await?.is_none() {
        return Ok(());
    }

    let (_, body) = common::register(server, &common::unique_email("notadmin"), "long enough").await?;
    let token = body["formData"]["token"].as_str().unwrap_or_default().to_string();

    let res = reqwest::Client::new()
        .post(server.url("/Tenant"))
        .header("tokensource", "local")
        .bearer_auth(&token)
        .json(&json!({ "name": "Sneaky Tenant" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}
