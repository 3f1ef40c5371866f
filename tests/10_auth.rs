mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::get(server.url("/health")).await?;
    assert!(
        res.status() == StatusCode::OK || res.status() == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status: {}",
        res.status()
    );

    let body: Value = res.json().await?;
    assert!(body["formData"]["timestamp"].is_string());
    Ok(())
}

#[tokio::test]
async fn root_lists_resources() -> Result<()> {
    let server = common::ensure_server().await?;

    let body: Value = reqwest::get(server.url("/")).await?.json().await?;
    assert_eq!(body["success"], true);
    let resources = body["formData"]["resources"].as_array().cloned().unwrap_or_default();
    assert!(resources.iter().any(|r| r == "Application"));
    assert!(resources.iter().any(|r| r == "PageElementProperty"));
    Ok(())
}

#[tokio::test]
async fn resource_requests_need_a_token_source() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::Client::new()
        .get(server.url("/Application"))
        .bearer_auth("whatever")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], 401);
    Ok(())
}

#[tokio::test]
async fn unknown_token_source_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::Client::new()
        .get(server.url("/Application"))
        .header("tokensource", "facebook")
        .bearer_auth("whatever")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn malformed_passport_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;

    let res = reqwest::Client::new()
        .get(server.url("/auth/whoami"))
        .header("tokensource", "passport")
        .bearer_auth("%%%not-base64%%%")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn invalid_local_token_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;

    let (status, body) = common::get_local(server, "not.a.jwt", "/auth/whoami").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
    Ok(())
}
