use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryCalculationRepository};
use crate::routes::with_scoring_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use maturity_engine::config::AppConfig;
use maturity_engine::error::AppError;
use maturity_engine::scoring::{
    load_taxonomy, InMemoryScoreCache, RuleCatalog, ScoringService, Taxonomy,
};
use maturity_engine::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let catalog = match &config.scoring.rules_path {
        Some(path) => RuleCatalog::from_path(path)?,
        None => RuleCatalog::standard(),
    };
    let taxonomy = match &config.scoring.taxonomy_path {
        Some(path) => load_taxonomy(path)?,
        None => {
            warn!("SCORING_TAXONOMY_PATH not set; serving an empty taxonomy");
            Taxonomy::default()
        }
    };

    let repository = Arc::new(InMemoryCalculationRepository::default());
    let cache = Arc::new(InMemoryScoreCache::new(config.scoring.cache_capacity));
    let scoring_service = Arc::new(ScoringService::new(catalog, taxonomy, repository, cache));

    let app = with_scoring_routes(scoring_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        cache_capacity = config.scoring.cache_capacity,
        "maturity scoring service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
