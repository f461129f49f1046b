use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::payment::gateway::PaymentGateway;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: AppConfig,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
