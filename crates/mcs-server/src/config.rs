use core::panic;
use std::{fs, path::PathBuf, time::Duration};

use crate::error::Result;
pub use clap::Parser;
use url::Url;

#[derive(Debug, Clone, clap::Parser)]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 3000,
        env = "MCS_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,
    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "MCS_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        env = "MCS_BASE_URL",
        default_value = "http://localhost:3000",
        help = "Base URL of the server, as visible to users"
    )]
    pub base_url: Url,

    #[arg(
        long,
        env = "MCS_DATABASE_URL",
        help = "Database URL e.g. sqlite://file.db, default is sqlite://[data-dir]/mcs.db, where data-dir is set by --data-dir"
    )]
    database_url: Option<String>,

    #[arg(
        long,
        env = "MCS_DATA_DIR",
        help = "Data directory (database, secrets, media etc.), default is system default like ~/.local/share/mcs",
        default_value_t = default_data_dir()
    )]
    data_dir: String,

    #[arg(
        long,
        env = "MCS_MEDIA_DIR",
        help = "Directory for uploaded images, default data_dir/media"
    )]
    media_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "MCS_TOKEN_VALIDITY",
        default_value = "1 day",
        help = "Default token validity in human friendly format (e.g. 1d, 1h, 1m, 1s - or combined)",
        value_parser = humantime::parse_duration
    )]
    pub token_validity: Duration,

    #[arg(
        long,
        env = "MCS_UPLOAD_LIMIT_MB",
        default_value = "8",
        help = "Maximum request body size in MB"
    )]
    pub upload_limit_mb: usize,

    #[arg(
        long,
        env = "MCS_DEFAULT_PAGE_SIZE",
        default_value = "10",
        help = "Default page size"
    )]
    pub default_page_size: u32,

    #[arg(
        long,
        env = "MCS_ADMIN_EMAIL",
        help = "Bootstrap admin account email, created on start when missing"
    )]
    pub admin_email: Option<String>,

    #[arg(
        long,
        env = "MCS_ADMIN_PASSWORD",
        help = "Bootstrap admin account password"
    )]
    pub admin_password: Option<String>,

    #[arg(long, env = "MCS_CORS", help = "Enable permissive CORS")]
    pub cors: bool,
}

fn default_data_dir() -> String {
    let dir = dirs::data_dir()
        .map(|p| p.join("mcs"))
        .unwrap_or_else(|| PathBuf::from("mcs"));

    if !fs::exists(&dir).expect("Failed to check if data directory exists") {
        fs::create_dir_all(&dir).expect("Failed to create data directory");
    } else if !dir.is_dir() {
        panic!("Data directory is not a directory",)
    }

    dir.to_string_lossy().to_string()
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        ServerConfig::try_parse().map_err(|e| e.into())
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn media_dir(&self) -> PathBuf {
        self.media_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("media"))
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| format!("sqlite://{}/mcs.db", self.data_dir))
    }
}
