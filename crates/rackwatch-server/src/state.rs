use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use rackwatch_alert::engine::AlertEvaluator;
use rackwatch_alert::settings::SettingsProvider;
use rackwatch_notify::AlertBroadcaster;
use rackwatch_storage::MonitorStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MonitorStore>,
    pub evaluator: Arc<AlertEvaluator>,
    pub settings: Arc<SettingsProvider>,
    pub broadcaster: Arc<AlertBroadcaster>,
    pub config: Arc<ServerConfig>,
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub async fn build(store: Arc<MonitorStore>, config: ServerConfig) -> anyhow::Result<Self> {
        let settings = Arc::new(SettingsProvider::load(store.clone()).await?);
        let broadcaster = Arc::new(AlertBroadcaster::new(config.stream_buffer_size));
        let evaluator = Arc::new(AlertEvaluator::new(
            store.clone(),
            settings.clone(),
            broadcaster.clone(),
        ));
        Ok(Self {
            store,
            evaluator,
            settings,
            broadcaster,
            config: Arc::new(config),
            start_time: Utc::now(),
        })
    }
}
