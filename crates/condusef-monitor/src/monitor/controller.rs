use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::institution::Roster;
use super::notifier::{Notifier, NotifyError};
use super::observed::ObservedReport;
use super::parser::PeriodParser;
use super::period::{self, Period};
use super::source::{FetchError, PortalSource, RawListing};
use super::store::{PersistError, StateCorruptError, StateRecord, StateStore};

/// Stages of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Fetching,
    Comparing,
    NoChange,
    Notifying,
    Committing,
    Done,
    Failed,
}

impl RunPhase {
    pub fn label(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Fetching => "fetching",
            RunPhase::Comparing => "comparing",
            RunPhase::NoChange => "no_change",
            RunPhase::Notifying => "notifying",
            RunPhase::Committing => "committing",
            RunPhase::Done => "done",
            RunPhase::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Live,
    /// Fetch and compare only; never notify or commit.
    DryRun,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    NoChange {
        baseline: Period,
        latest: Option<Period>,
    },
    Notified {
        previous: Period,
        record: StateRecord,
        reports: Vec<ObservedReport>,
    },
    DryRun {
        baseline: Period,
        period: Period,
        reports: Vec<ObservedReport>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("could not load monitor state: {0}")]
    State(#[from] StateCorruptError),
    #[error("portal fetch failed for {institution}: {source}")]
    Fetch {
        institution: String,
        #[source]
        source: FetchError,
    },
    #[error("alert for {period} was not delivered: {source}")]
    Notify {
        period: Period,
        #[source]
        source: NotifyError,
    },
    #[error("alert for {period} was sent but the state could not be recorded: {source}")]
    CommitAfterNotify {
        period: Period,
        #[source]
        source: PersistError,
    },
}

impl RunError {
    /// Phase the run was in when it failed.
    pub fn phase(&self) -> RunPhase {
        match self {
            RunError::State(_) | RunError::Fetch { .. } => RunPhase::Fetching,
            RunError::Notify { .. } => RunPhase::Notifying,
            RunError::CommitAfterNotify { .. } => RunPhase::Committing,
        }
    }

    /// Alert delivered but not recorded; needs manual reconciliation.
    pub fn is_critical(&self) -> bool {
        matches!(self, RunError::CommitAfterNotify { .. })
    }
}

struct PhaseTracker {
    current: RunPhase,
}

impl PhaseTracker {
    fn new() -> Self {
        Self {
            current: RunPhase::Idle,
        }
    }

    fn enter(&mut self, next: RunPhase) {
        debug!(from = self.current.label(), to = next.label(), "run phase");
        self.current = next;
    }

    fn fail(&mut self, err: RunError) -> RunError {
        if err.is_critical() {
            error!(
                critical = true,
                phase = self.current.label(),
                error = %err,
                "alert sent but state not advanced; record the period by hand before the next run"
            );
        } else {
            warn!(phase = self.current.label(), error = %err, "run failed");
        }
        self.current = RunPhase::Failed;
        err
    }
}

/// Orchestrates one fetch, compare, notify, commit cycle.
///
/// The state store is only advanced after the notifier confirms delivery, so
/// a period is alerted at most once per successful commit. A failed send
/// leaves the baseline untouched and the next run alerts again.
pub struct RunController<P, S, N> {
    source: Arc<P>,
    store: Arc<S>,
    notifier: Arc<N>,
    roster: Roster,
    mode: RunMode,
}

impl<P, S, N> RunController<P, S, N>
where
    P: PortalSource,
    S: StateStore,
    N: Notifier,
{
    pub fn new(source: Arc<P>, store: Arc<S>, notifier: Arc<N>, roster: Roster) -> Self {
        Self {
            source,
            store,
            notifier,
            roster,
            mode: RunMode::Live,
        }
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn run(&self) -> Result<RunOutcome, RunError> {
        self.run_at(Utc::now())
    }

    /// Runs as if the current time were `now`. Periods after `now`'s month
    /// are ignored and the committed record is stamped with `now`.
    pub fn run_at(&self, now: DateTime<Utc>) -> Result<RunOutcome, RunError> {
        let mut phases = PhaseTracker::new();

        phases.enter(RunPhase::Fetching);
        let record = self
            .store
            .load()
            .map_err(|err| phases.fail(RunError::State(err)))?;
        let baseline = record.last_known_period;
        info!(
            baseline = %baseline,
            institutions = self.roster.len(),
            dry_run = self.mode == RunMode::DryRun,
            "freshness check started"
        );
        let listings = self.fetch_all(&mut phases)?;

        phases.enter(RunPhase::Comparing);
        let parser = PeriodParser::with_horizon(Period::containing(now));
        let observed = observe(&parser, &listings);
        let latest = period::latest(observed.iter().map(|report| report.period));

        let advanced = latest.and_then(|found| Some((found, record.advance(found, now)?)));
        let (period, next) = match advanced {
            Some(found) => found,
            None => {
                phases.enter(RunPhase::NoChange);
                info!(baseline = %baseline, latest = ?latest, "no new period");
                phases.enter(RunPhase::Done);
                return Ok(RunOutcome::NoChange { baseline, latest });
            }
        };

        let reports: Vec<ObservedReport> = observed
            .into_iter()
            .filter(|report| report.period == period)
            .collect();
        info!(
            baseline = %baseline,
            period = %period,
            institutions = reports.len(),
            "new period detected"
        );

        if self.mode == RunMode::DryRun {
            phases.enter(RunPhase::Done);
            return Ok(RunOutcome::DryRun {
                baseline,
                period,
                reports,
            });
        }

        phases.enter(RunPhase::Notifying);
        self.notifier
            .notify(period, &reports)
            .map_err(|source| phases.fail(RunError::Notify { period, source }))?;

        phases.enter(RunPhase::Committing);
        self.store
            .commit(&next)
            .map_err(|source| phases.fail(RunError::CommitAfterNotify { period, source }))?;

        phases.enter(RunPhase::Done);
        Ok(RunOutcome::Notified {
            previous: baseline,
            record: next,
            reports,
        })
    }

    /// Every institution must fetch cleanly; partial results never reach
    /// the comparison.
    fn fetch_all(&self, phases: &mut PhaseTracker) -> Result<Vec<RawListing>, RunError> {
        self.roster
            .iter()
            .map(|institution| {
                self.source.fetch(institution).map_err(|source| {
                    phases.fail(RunError::Fetch {
                        institution: institution.short_name.clone(),
                        source,
                    })
                })
            })
            .collect()
    }
}

fn observe(parser: &PeriodParser, listings: &[RawListing]) -> Vec<ObservedReport> {
    listings
        .iter()
        .filter_map(|listing| {
            let parsed = parser.parse_listing(listing);
            for warning in &parsed.warnings {
                warn!(institution = %parsed.institution, warning = %warning, "parse warning");
            }
            let period = parsed.latest()?;
            debug!(institution = %parsed.institution, period = %period, "latest listed period");
            Some(ObservedReport {
                institution: parsed.institution,
                period,
                figures: parsed.figures,
            })
        })
        .collect()
}
