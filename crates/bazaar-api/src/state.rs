use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use tracing::error;

use bazaar_auth::AuthConfig;
use bazaar_db::Database;
use bazaar_gateway::Dispatcher;
use bazaar_types::error::{MarketError, MarketResult};

use crate::images::ImageStore;

/// Shared application state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub dispatcher: Dispatcher,
    pub images: Arc<ImageStore>,
    pub auth: AuthConfig,
    pub cookie_key: Key,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

impl AppState {
    /// Run blocking DB work off the async runtime.
    pub async fn run<F, T>(&self, f: F) -> MarketResult<T>
    where
        F: FnOnce(&Database) -> MarketResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                MarketError::Storage(e.into())
            })?
    }
}
