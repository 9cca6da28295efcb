use crate::config::settings::AppConfig;
use crate::modules::media::repository::StatusStore;
use crate::workers::encode_queue::EncodeQueue;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub status_store: Arc<dyn StatusStore>,
    pub encode_queue: EncodeQueue,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        status_store: Arc<dyn StatusStore>,
        encode_queue: EncodeQueue,
    ) -> Self {
        Self {
            config,
            status_store,
            encode_queue,
        }
    }
}
