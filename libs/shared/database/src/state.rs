use std::sync::Arc;

use shared_config::AppConfig;

use crate::supabase::SupabaseClient;

/// Process-wide state: one data-service client shared by every cell.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub supabase: Arc<SupabaseClient>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(&config));
        Self { config, supabase }
    }

    pub fn shared(config: AppConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }
}
