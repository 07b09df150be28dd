use std::sync::Arc;

use anyhow::Result;
use mcs_auth::TokenManager;
use mcs_dal::Pool;
use mcs_store::FileStore;
use url::Url;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(app_config: AppConfig, pool: Pool, tokens: TokenManager, store: FileStore) -> Self {
        AppState {
            state: Arc::new(AppStateInner {
                app_config,
                pool,
                tokens,
                store,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    pub fn build_url(&self, relative_url: &str) -> Result<Url> {
        let base = &self.config().base_url;
        let url = base.join(relative_url)?;
        Ok(url)
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.state.tokens
    }

    pub fn store(&self) -> &FileStore {
        &self.state.store
    }
}

/// The garde-based validation extractors (`axum_valid::Garde`) require the
/// validation context to be extractable from the router state. Every validated
/// type in this crate uses the unit context `()`, so axum-valid needs
/// `() : FromRef<AppState>`.
impl axum::extract::FromRef<AppState> for () {
    fn from_ref(_: &AppState) -> Self {}
}

struct AppStateInner {
    pool: Pool,
    tokens: TokenManager,
    store: FileStore,
    app_config: AppConfig,
}

pub struct AppConfig {
    pub base_url: Url,
    pub default_page_size: u32,
    pub upload_limit_mb: usize,
}
