use condusef_monitor::config::AppConfig;
use condusef_monitor::error::AppError;
use condusef_monitor::monitor::HttpPortalSource;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Portal adapter bound to the ambient tokio runtime. Callers must invoke it
/// from a blocking task.
pub(crate) fn portal_source(config: &AppConfig) -> Result<Arc<HttpPortalSource>, AppError> {
    Ok(Arc::new(HttpPortalSource::with_current_runtime(
        &config.portal,
    )?))
}
