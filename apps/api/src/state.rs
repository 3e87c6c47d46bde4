//! Shared application state.

use std::sync::Arc;

use duka_db::Database;

use crate::config::AppConfig;

/// Handed to every handler. Cheap to clone: the pool and config are shared.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        AppState {
            db,
            config: Arc::new(config),
        }
    }
}
