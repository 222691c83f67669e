use std::sync::Arc;

use reqwest::Client;

use crate::{
    config::AppConfig,
    db::{self, DbPool},
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub http_client: Client,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            db_pool: db::create_pool(&config.database),
            http_client: Client::new(),
            config: Arc::new(config),
        }
    }
}
