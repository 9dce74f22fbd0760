use crate::baas::BaasClient;
use crate::catalog::ExamGate;
use crate::config::Config;
use crate::db::Database;

/// Shared by every handler behind an `Arc`. Holds no mutable state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub baas: BaasClient,
}

impl AppState {
    pub fn new(config: Config, db: Database, baas: BaasClient) -> Self {
        AppState { config, db, baas }
    }

    pub fn gate(&self) -> ExamGate<'_> {
        ExamGate::new(&self.config.features)
    }
}
