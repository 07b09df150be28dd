use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Result};
use mcs_dal::user::{CreateUser, UserRepository};
use mcs_server::config::{Parser, ServerConfig};
use mcs_types::claim::Role;
use rand::Rng as _;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use tempfile::TempDir;
use tracing::debug;

pub mod rest;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const USER_EMAIL: &str = "user@example.com";
pub const PASSWORD: &str = "test-password-123";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestUser {
    Admin,
    User,
    Anonymous,
}

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, std::time::Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str, base_dir: &Path) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix_in(format!("{}_", test_name), base_dir)?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?;
    let port = port.to_string();
    let base_url = format!("http://localhost:{}", port);
    let args = &[
        "mcs-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--base-url",
        &base_url,
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

/// Test config in a temp dir with the schema already migrated, so tests can
/// seed rows through the DAL before the server starts.
pub async fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let (config, guard) = test_config(test_name, &std::env::temp_dir())?;
    let pool = mcs_dal::new_pool(&config.database_url()).await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;
    pool.close().await;
    Ok((config, guard))
}

pub struct ServerGuard {
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<Result<(), mcs_server::Error>>,
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            shutdown.send(()).ok();
        }
        self.handle.abort();
    }
}

async fn seed_accounts(pool: &mcs_dal::Pool) -> Result<()> {
    let users = UserRepository::new(pool.clone());
    users
        .create(CreateUser {
            email: ADMIN_EMAIL.parse().map_err(|e| anyhow!("{e}"))?,
            name: Some("Test Admin".to_string()),
            password: Some(PASSWORD.to_string()),
            roles: Some(vec![Role::Admin.to_string(), Role::User.to_string()]),
        })
        .await?;
    users
        .create(CreateUser {
            email: USER_EMAIL.parse().map_err(|e| anyhow!("{e}"))?,
            name: Some("Test User".to_string()),
            password: Some(PASSWORD.to_string()),
            roles: Some(vec![Role::User.to_string()]),
        })
        .await?;
    Ok(())
}

async fn wait_for_health(base_url: &Url) -> Result<()> {
    let health_url = base_url.join("health")?;
    let client = reqwest::Client::new();
    for _ in 0..100 {
        if let Ok(response) = client.get(health_url.clone()).send().await {
            if response.status().is_success() {
                return Ok(());
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    Err(anyhow!("Server did not come up"))
}

/// Client authenticated through the regular login endpoint.
pub async fn api_client(base_url: &Url, user: TestUser) -> Result<reqwest::Client> {
    let email = match user {
        TestUser::Admin => ADMIN_EMAIL,
        TestUser::User => USER_EMAIL,
        TestUser::Anonymous => return Ok(reqwest::Client::new()),
    };
    let token = rest::login(&reqwest::Client::new(), base_url, email, PASSWORD).await?;
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}"))?,
    );
    let client = reqwest::Client::builder()
        .default_headers(headers)
        .build()?;
    Ok(client)
}

/// Starts the server on its random port, seeds the two test accounts and
/// returns a client logged in as the requested user.
pub async fn launch_env(args: ServerConfig, user: TestUser) -> Result<(reqwest::Client, ServerGuard)> {
    let state = mcs_server::build_state(&args).await?;
    seed_accounts(state.pool()).await?;

    let (shutdown, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server_args = args.clone();
    let handle = tokio::spawn(mcs_server::run_graceful_with_state(
        server_args,
        state,
        async move {
            shutdown_rx.await.ok();
        },
    ));
    wait_for_health(&args.base_url).await?;
    debug!("Server is up on {}", args.base_url);

    let client = api_client(&args.base_url, user).await?;
    Ok((
        client,
        ServerGuard {
            shutdown: Some(shutdown),
            handle,
        },
    ))
}

pub fn extend_url(url: &Url, suffix: impl std::fmt::Display) -> Url {
    let mut url = url.clone();
    url.path_segments_mut()
        .expect("URL cannot be a base")
        .push(&suffix.to_string());
    url
}
