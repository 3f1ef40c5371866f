use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use creche_api::auth::{encode_claims, Claims};
use creche_api::database::DatabaseManager;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use sqlx::postgres::{PgPool, PgPoolOptions};

static SERVER: OnceLock<TestServer> = OnceLock::new();

/// Signing secret shared by the spawned server and locally minted tokens
pub const TEST_JWT_SECRET: &str = "creche-integration-secret";

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    #[allow(dead_code)]
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // DATABASE_URL comes from the environment or .env
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_creche-api"));
        cmd.arg("serve")
            .env("CRECHE_API_PORT", port.to_string())
            .env("DATABASE_CONNECTION_TIMEOUT", "2")
            .env("DATABASE_AUTO_MIGRATE", "true")
            .env("JWT_SECRET", TEST_JWT_SECRET)
            .env("APP_ENV", "development")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;
        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(15)).await?;
    Ok(server)
}

/// True when /health reports a reachable database
async fn database_ready(server: &TestServer) -> bool {
    match reqwest::get(server.url("/health")).await {
        Ok(resp) => resp.status() == StatusCode::OK,
        Err(_) => false,
    }
}

/// Pool for seeding rows directly. `None` only when DATABASE_URL is unset;
/// once it is set, an unreachable database or an unhealthy server fails the test.
#[allow(dead_code)]
pub async fn database(server: &TestServer) -> Result<Option<PgPool>> {
    let _ = dotenvy::dotenv();
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping database test");
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&url)
        .await
        .with_context(|| "DATABASE_URL is set but the database is unreachable")?;
    DatabaseManager::migrate(&pool).await?;

    anyhow::ensure!(
        database_ready(server).await,
        "DATABASE_URL is set but {}/health does not report a healthy database",
        server.base_url
    );
    Ok(Some(pool))
}

#[allow(dead_code)]
pub fn unique_name(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{} {} {}", prefix, std::process::id(), nanos)
}

/// One tenant with an app and an organization beneath it
#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub struct TenantSeed {
    pub tenant_id: i32,
    pub app_id: i32,
    pub org_id: i32,
}

#[allow(dead_code)]
pub async fn seed_tenant(pool: &PgPool, label: &str) -> Result<TenantSeed> {
    let tenant_id: i32 = sqlx::query_scalar("INSERT INTO tenants (name) VALUES ($1) RETURNING id")
        .bind(unique_name(label))
        .fetch_one(pool)
        .await?;
    let app_id: i32 = sqlx::query_scalar("INSERT INTO apps (tenant_id, name) VALUES ($1, $2) RETURNING id")
        .bind(tenant_id)
        .bind(format!("{} app", label))
        .fetch_one(pool)
        .await?;
    let org_id: i32 =
        sqlx::query_scalar("INSERT INTO organizations (tenant_id, app_id, name) VALUES ($1, $2, $3) RETURNING id")
            .bind(tenant_id)
            .bind(app_id)
            .bind(format!("{} org", label))
            .fetch_one(pool)
            .await?;
    Ok(TenantSeed { tenant_id, app_id, org_id })
}

/// Local-token caller backed by a seeded user row
#[allow(dead_code)]
pub struct Caller {
    pub user_id: i32,
    pub token: String,
}

/// Inserts a user bound to `tenant_id` holding `roles` and mints a local token for it
#[allow(dead_code)]
pub async fn seed_user(pool: &PgPool, tenant_id: Option<i32>, roles: &[&str]) -> Result<Caller> {
    let email = unique_email("seeded");
    let user_id: i32 = sqlx::query_scalar("INSERT INTO users (tenant_id, email) VALUES ($1, $2) RETURNING id")
        .bind(tenant_id)
        .bind(&email)
        .fetch_one(pool)
        .await?;

    for role in roles {
        let tenant_id = tenant_id.context("roles are tenant-owned; seed the user into a tenant")?;
        let role_id: i32 = sqlx::query_scalar("INSERT INTO roles (tenant_id, role_name) VALUES ($1, $2) RETURNING id")
            .bind(tenant_id)
            .bind(role)
            .fetch_one(pool)
            .await?;
        sqlx::query("INSERT INTO user_roles (tenant_id, user_id, role_id) VALUES ($1, $2, $3)")
            .bind(tenant_id)
            .bind(user_id)
            .bind(role_id)
            .execute(pool)
            .await?;
    }

    let token = encode_claims(&Claims::with_expiry(user_id, email, tenant_id, 1), TEST_JWT_SECRET)?;
    Ok(Caller { user_id, token })
}

/// Global element type with properties named in `sort_order` order
#[allow(dead_code)]
pub async fn seed_element_type(pool: &PgPool, properties: &[&str]) -> Result<(i32, Vec<i32>)> {
    let type_id: i32 = sqlx::query_scalar("INSERT INTO element_types (name) VALUES ($1) RETURNING id")
        .bind(unique_name("element"))
        .fetch_one(pool)
        .await?;
    let mut property_ids = Vec::new();
    for (order, name) in properties.iter().enumerate() {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO element_type_properties (element_type_id, property_name, sort_order) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(type_id)
        .bind(name)
        .bind(order as i32)
        .fetch_one(pool)
        .await?;
        property_ids.push(id);
    }
    Ok((type_id, property_ids))
}

/// Local-token request returning status and JSON body
#[allow(dead_code)]
pub async fn send(
    server: &TestServer,
    caller: &Caller,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut req = reqwest::Client::new()
        .request(method, server.url(path))
        .header("tokensource", "local")
        .bearer_auth(&caller.token);
    if let Some(body) = body {
        req = req.json(&body);
    }
    let res = req.send().await?;
    let status = res.status();
    Ok((status, res.json().await?))
}

/// Record id from a `{ success, formData }` envelope
#[allow(dead_code)]
pub fn id_of(body: &Value) -> i32 {
    body["formData"]["id"].as_i64().and_then(|id| i32::try_from(id).ok()).unwrap_or_default()
}

#[allow(dead_code)]
pub fn unique_email(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{}-{}-{}@example.test", prefix, std::process::id(), nanos)
}

/// Registers a local account and returns the token response envelope
#[allow(dead_code)]
pub async fn register(server: &TestServer, email: &str, password: &str) -> Result<(StatusCode, Value)> {
    let res = reqwest::Client::new()
        .post(server.url("/auth/local/register"))
        .json(&json!({ "email": email, "password": password, "firstName": "Test", "lastName": "User" }))
        .send()
        .await?;
    let status = res.status();
    Ok((status, res.json().await?))
}

/// Local-token GET returning status and JSON body
#[allow(dead_code)]
pub async fn get_local(server: &TestServer, token: &str, path: &str) -> Result<(StatusCode, Value)> {
    let res = reqwest::Client::new()
        .get(server.url(path))
        .header("tokensource", "local")
        .bearer_auth(token)
        .send()
        .await?;
    let status = res.status();
    Ok((status, res.json().await?))
}
