use std::path::Path;

use crate::config::ServerConfig;
use crate::error::Result;
use axum::http::StatusCode;
use axum::{response::IntoResponse, routing::get, Router};
use futures::FutureExt;
use mcs_app::state::{AppConfig, AppState};
use mcs_app::{account, auth::TokenLayer, rest_api};
use mcs_auth::TokenManager;
use mcs_dal::user::{CreateUser, UserRepository};
use mcs_store::FileStore;
use mcs_types::claim::Role;
use tokio::{fs, io::AsyncWriteExt as _};
use tracing::{debug, info, warn};

pub async fn run(args: ServerConfig) -> Result<()> {
    let state = build_state(&args).await?;
    run_with_state(args, state).await
}

pub async fn run_with_state(args: ServerConfig, state: AppState) -> Result<()> {
    let shutdown = tokio::signal::ctrl_c().map(|_| ());
    run_graceful_with_state(args, state, shutdown).await
}

pub async fn run_graceful_with_state<S>(
    args: ServerConfig,
    state: AppState,
    shutdown_signal: S,
) -> Result<()>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let mut app = main_router(state, &args.media_dir());

    if args.cors {
        app = app.layer(tower_http::cors::CorsLayer::very_permissive());
    }

    let ip: std::net::IpAddr = args.listen_address.parse()?;
    let addr = std::net::SocketAddr::from((ip, args.port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    debug!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

fn main_router(state: AppState, media_dir: &Path) -> Router<()> {
    let upload_limit_mb = state.config().upload_limit_mb;
    Router::new()
        .nest("/api/genre", rest_api::genre::router())
        .nest("/api/actor", rest_api::actor::router())
        .nest("/api/cinema", rest_api::cinema::router())
        .nest("/api/movie", rest_api::movie::router())
        .nest("/api/account", account::router())
        .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024 * upload_limit_mb))
        .layer(TokenLayer::new(state.clone()))
        .with_state(state)
        // uploaded images are public, read-only
        .nest_service(
            "/media",
            tower_http::services::ServeDir::new(media_dir),
        )
        .route("/health", get(health))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub async fn build_state(config: &ServerConfig) -> Result<AppState> {
    let data_dir = config.data_dir();
    if !data_dir.is_dir() {
        fs::create_dir_all(&data_dir).await?;
        info!("Created data directory {data_dir:?}");
    }
    let media_dir = config.media_dir();
    if !media_dir.is_dir() {
        fs::create_dir_all(&media_dir).await?;
        info!("Created directory for uploaded images");
    }

    let pool = mcs_dal::new_pool(&config.database_url()).await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;

    let secret = read_secret(&data_dir).await?;
    assert!(secret.len() == 64);
    let tokens = TokenManager::new(&secret, config.token_validity);
    let store = FileStore::new(&media_dir);

    let app_config = AppConfig {
        base_url: config.base_url.clone(),
        default_page_size: config.default_page_size,
        upload_limit_mb: config.upload_limit_mb,
    };

    let state = AppState::new(app_config, pool, tokens, store);
    bootstrap_admin(config, &state).await?;
    Ok(state)
}

async fn bootstrap_admin(config: &ServerConfig, state: &AppState) -> Result<()> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        if config.admin_email.is_some() || config.admin_password.is_some() {
            warn!("Both admin email and password must be set to bootstrap the admin account");
        }
        return Ok(());
    };

    let users = UserRepository::new(state.pool().clone());
    if users.find_by_email(email).await.is_ok() {
        debug!("Admin account {email} already exists");
        return Ok(());
    }

    users
        .create(CreateUser {
            email: email
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid admin email: {e}"))?,
            name: None,
            password: Some(password.clone()),
            roles: Some(vec![Role::Admin.to_string(), Role::User.to_string()]),
        })
        .await?;
    info!("Created admin account {email}");
    Ok(())
}

async fn read_secret(data_dir: &Path) -> Result<Vec<u8>, std::io::Error> {
    let secret_file = data_dir.join("secret");

    let secret = if fs::try_exists(&secret_file).await? {
        fs::read(&secret_file).await?
    } else {
        let random_bytes = rand::random::<[u8; 64]>();
        #[cfg(unix)]
        let mut file = {
            use std::fs::OpenOptions;
            use std::os::unix::fs::OpenOptionsExt;
            {
                // Make sure the file is only accessible by the current user
                let _f = OpenOptions::new()
                    .mode(0o600)
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(&secret_file)?;
            }
            fs::File::options().write(true).open(&secret_file).await?
        };
        #[cfg(not(unix))]
        let mut file = fs::File::create(&secret_file).await?;

        file.write_all(&random_bytes).await?;
        random_bytes.as_ref().to_vec()
    };
    Ok(secret)
}
