use crate::cli::ServeArgs;
use crate::infra::{AppState, LoggingNotifier};
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use equipment_trust::config::AppConfig;
use equipment_trust::error::AppError;
use equipment_trust::telemetry;
use equipment_trust::trust::{
    event_queue, Clock, MemoryCache, MemoryStore, SystemClock, TrustEngine,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

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
    let readiness_flag = Arc::new(AtomicBool::new(false));

    let store = Arc::new(MemoryStore::default());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = Arc::new(MemoryCache::new(clock.clone()));
    let (queue, worker) = event_queue(config.trust.event_queue_capacity);
    let engine = Arc::new(TrustEngine::new(
        store,
        cache,
        clock,
        Arc::new(queue.clone()),
        Arc::new(LoggingNotifier),
        &config.trust,
    ));
    tokio::spawn(worker.run(engine.events.clone()));

    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        events: queue,
    };

    let app = with_operational_routes(engine)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        queue_capacity = config.trust.event_queue_capacity,
        "equipment trust engine ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
