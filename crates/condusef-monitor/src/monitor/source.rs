use std::fmt::Debug;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::debug;

use super::institution::Institution;
use crate::config::PortalConfig;

/// Portal content fetched for one institution. The body is opaque here; the
/// parser decides what it means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawListing {
    pub institution: Institution,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("portal request timed out after {0:?}")]
    Timeout(Duration),
    #[error("portal request failed: {0}")]
    Transport(String),
    #[error("portal returned status {status}")]
    Status { status: u16 },
    #[error("portal returned an empty listing")]
    Empty,
    #[error("portal runtime unavailable: {0}")]
    Runtime(String),
}

/// Retrieves the portal listing for a single institution.
///
/// Implementations surface every failure as a [`FetchError`] so callers can
/// tell "nothing new" apart from "could not check".
pub trait PortalSource: Send + Sync {
    fn fetch(&self, institution: &Institution) -> Result<RawListing, FetchError>;
}

/// Async HTTP client for the CONDUSEF portfolio page.
#[derive(Debug, Clone)]
pub struct PortalClient {
    client: reqwest::Client,
    url: String,
    section: String,
    currency: String,
    timeout: Duration,
}

impl PortalClient {
    pub fn new(config: &PortalConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            section: config.section.clone(),
            currency: config.currency.clone(),
            timeout: config.timeout,
        })
    }

    pub async fn fetch_listing(&self, institution: &Institution) -> Result<RawListing, FetchError> {
        debug!(url = %self.url, institution = %institution, "fetching portal listing");
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("sec", self.section.as_str()),
                ("mone_s", self.currency.as_str()),
                ("institucion", institution.search_name.as_str()),
            ])
            .send()
            .await
            .map_err(|err| self.classify(err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|err| self.classify(err))?;
        if body.trim().is_empty() {
            return Err(FetchError::Empty);
        }

        debug!(institution = %institution, bytes = body.len(), "portal listing received");
        Ok(RawListing {
            institution: institution.clone(),
            body,
        })
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Blocking [`PortalSource`] over [`PortalClient`], driven through a tokio
/// runtime handle. Call it off the async executor (e.g. inside
/// `spawn_blocking`), since the handle blocks the calling thread.
pub struct HttpPortalSource {
    client: PortalClient,
    handle: Handle,
}

impl HttpPortalSource {
    pub fn new(client: PortalClient, handle: Handle) -> Self {
        Self { client, handle }
    }

    pub fn with_current_runtime(config: &PortalConfig) -> Result<Self, FetchError> {
        let handle = Handle::try_current().map_err(|err| FetchError::Runtime(err.to_string()))?;
        Ok(Self::new(PortalClient::new(config)?, handle))
    }
}

impl Debug for HttpPortalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPortalSource")
            .field("url", &self.client.url)
            .finish_non_exhaustive()
    }
}

impl PortalSource for HttpPortalSource {
    fn fetch(&self, institution: &Institution) -> Result<RawListing, FetchError> {
        self.handle.block_on(self.client.fetch_listing(institution))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_portal() -> PortalConfig {
        PortalConfig {
            url: "http://127.0.0.1:9/reco/cartera_credito_institucion.php".to_string(),
            section: "27".to_string(),
            currency: "peso".to_string(),
            timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn without_runtime_reports_runtime_error() {
        let error = HttpPortalSource::with_current_runtime(&unreachable_portal())
            .expect_err("no runtime in plain test thread");
        assert!(matches!(error, FetchError::Runtime(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn connection_failures_surface_as_fetch_errors() {
        let source = HttpPortalSource::with_current_runtime(&unreachable_portal())
            .expect("runtime available");
        let institution = Institution::new("Klar Technologies", "Klar");

        let result = tokio::task::spawn_blocking(move || source.fetch(&institution))
            .await
            .expect("blocking task joins");

        match result {
            Err(FetchError::Transport(_)) | Err(FetchError::Timeout(_)) => {}
            other => panic!("expected transport failure, got {other:?}"),
        }
    }
}
