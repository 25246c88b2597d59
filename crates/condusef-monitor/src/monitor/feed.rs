//! Read-only period feed for the dashboard.
//!
//! Mirrors what the portal currently lists without consulting or touching
//! the state store. Unlike a monitor run, a failed fetch only marks that
//! institution unavailable.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use super::institution::{Institution, Roster};
use super::parser::{ParseWarning, PeriodParser, PortfolioFigures};
use super::period::{self, Period};
use super::source::PortalSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStatus {
    Available,
    Unparsed,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntry {
    pub institution: Institution,
    pub status: FeedStatus,
    pub latest: Option<Period>,
    pub periods: Vec<Period>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub figures: Option<PortfolioFigures>,
    pub warnings: Vec<ParseWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedSnapshot {
    pub generated_at: DateTime<Utc>,
    pub latest: Option<Period>,
    pub entries: Vec<FeedEntry>,
}

pub struct FeedService<P> {
    source: Arc<P>,
    roster: Roster,
}

impl<P> FeedService<P>
where
    P: PortalSource,
{
    pub fn new(source: Arc<P>, roster: Roster) -> Self {
        Self { source, roster }
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.snapshot_at(Utc::now())
    }

    pub fn snapshot_at(&self, now: DateTime<Utc>) -> FeedSnapshot {
        let parser = PeriodParser::with_horizon(Period::containing(now));
        let entries: Vec<FeedEntry> = self
            .roster
            .iter()
            .map(|institution| match self.source.fetch(institution) {
                Ok(listing) => {
                    let parsed = parser.parse_listing(&listing);
                    let latest = parsed.latest();
                    FeedEntry {
                        institution: parsed.institution,
                        status: if latest.is_some() {
                            FeedStatus::Available
                        } else {
                            FeedStatus::Unparsed
                        },
                        latest,
                        periods: parsed.periods.into_iter().collect(),
                        figures: parsed.figures,
                        warnings: parsed.warnings,
                        error: None,
                    }
                }
                Err(err) => {
                    warn!(institution = %institution, error = %err, "feed fetch failed");
                    FeedEntry {
                        institution: institution.clone(),
                        status: FeedStatus::Unavailable,
                        latest: None,
                        periods: Vec::new(),
                        figures: None,
                        warnings: Vec::new(),
                        error: Some(err.to_string()),
                    }
                }
            })
            .collect();

        FeedSnapshot {
            generated_at: now,
            latest: period::latest(entries.iter().filter_map(|entry| entry.latest)),
            entries,
        }
    }
}

/// Router exposing the feed at `/api/v1/periods`.
pub fn feed_router<P>(service: Arc<FeedService<P>>) -> Router
where
    P: PortalSource + 'static,
{
    Router::new()
        .route("/api/v1/periods", get(periods_handler::<P>))
        .with_state(service)
}

pub(crate) async fn periods_handler<P>(State(service): State<Arc<FeedService<P>>>) -> Response
where
    P: PortalSource + 'static,
{
    match tokio::task::spawn_blocking(move || service.snapshot()).await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(err) => {
            let payload = json!({ "error": format!("feed collection aborted: {err}") });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}
