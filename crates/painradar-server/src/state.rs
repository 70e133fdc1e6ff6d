//! Shared handler state: the pool plus the pipeline services built on it.

use std::sync::Arc;

use painradar_core::AppConfig;
use painradar_radar::{
    default_adapters, Analyzer, DashboardReader, InferenceClient, OpenRouterClient, PainStore,
    PgStore, RadarConfig, RateLimiter, ScanOrchestrator, SearchAggregator,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub radar: RadarServices,
}

/// Pipeline components shared by every request and the scheduler.
#[derive(Clone)]
pub struct RadarServices {
    pub config: RadarConfig,
    pub aggregator: SearchAggregator,
    pub scans: ScanOrchestrator,
    /// `None` when no inference API key is configured.
    pub analyzer: Option<Analyzer>,
    pub dashboard: DashboardReader,
}

impl RadarServices {
    pub fn new(
        store: Arc<dyn PainStore>,
        aggregator: SearchAggregator,
        inference: Option<Arc<dyn InferenceClient>>,
        config: RadarConfig,
    ) -> Self {
        let scans = ScanOrchestrator::new(Arc::clone(&store), aggregator.clone(), &config);
        let analyzer =
            inference.map(|client| Analyzer::new(Arc::clone(&store), client, &config));
        Self {
            scans,
            analyzer,
            dashboard: DashboardReader::new(store),
            aggregator,
            config,
        }
    }

    /// Wire the production adapters, rate limiter and inference client.
    pub fn from_app_config(pool: PgPool, app: &AppConfig) -> anyhow::Result<Self> {
        let config = RadarConfig::from_app_config(app);
        let limiter = RateLimiter::new();
        let aggregator = SearchAggregator::new(default_adapters(&config, &limiter)?);

        let inference: Option<Arc<dyn InferenceClient>> =
            match OpenRouterClient::from_app_config(app)? {
                Some(client) => Some(Arc::new(client)),
                None => {
                    tracing::warn!("OPENROUTER_API_KEY not set; post analysis is disabled");
                    None
                }
            };

        Ok(Self::new(
            Arc::new(PgStore::new(pool)),
            aggregator,
            inference,
            config,
        ))
    }
}
