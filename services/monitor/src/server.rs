use crate::cli::ServeArgs;
use crate::infra::{portal_source, AppState};
use crate::routes::with_feed_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use condusef_monitor::config::AppConfig;
use condusef_monitor::error::AppError;
use condusef_monitor::monitor::FeedService;
use condusef_monitor::telemetry;
use std::sync::atomic::Ordering;
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
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let feed_service = Arc::new(FeedService::new(
        portal_source(&config)?,
        config.roster.clone(),
    ));

    let app = with_feed_routes(feed_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        institutions = config.roster.len(),
        "period feed ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
