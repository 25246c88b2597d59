use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tracing_subscriber::fmt::MakeWriter;

use crate::monitor::institution::{Institution, Roster};
use crate::monitor::notifier::{EmailNotifier, MailTransport, NotifyError, OutboundMail};
use crate::monitor::period::Period;
use crate::monitor::source::{FetchError, PortalSource, RawListing};
use crate::monitor::store::{PersistError, StateCorruptError, StateRecord, StateStore};
use crate::monitor::RunController;

pub(super) fn period(year: i32, month: u32) -> Period {
    Period::new(year, month).expect("valid period")
}

/// Mid-January 2026, so the parse horizon is 2026-01.
pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn klar() -> Institution {
    Institution::new("Klar Technologies", "Klar")
}

pub(super) fn stori() -> Institution {
    Institution::new("Stori México", "Stori")
}

pub(super) fn roster() -> Roster {
    Roster::new(vec![klar(), stori()]).expect("non-empty roster")
}

pub(super) fn listing_page(institution: &Institution, periods: &[&str]) -> String {
    let options: String = periods
        .iter()
        .map(|label| format!("<option>{label}</option>"))
        .collect();
    format!(
        "<html><body><h2>{}</h2><select name=\"periodo\">{options}</select>\
         <table><tr><td>{}</td><td>1,240,000,000</td><td>1,100,000,000</td>\
         <td>140,000,000</td><td>11.3%</td></tr></table></body></html>",
        institution.search_name, institution.search_name
    )
}

/// A listing page that mentions `periods` but carries no table row for
/// `institution`.
pub(super) fn page_without_row(institution: &Institution, periods: &[&str]) -> String {
    let options: String = periods
        .iter()
        .map(|label| format!("<option>{label}</option>"))
        .collect();
    format!(
        "<html><body><select name=\"institucion\"><option>{}</option></select>\
         <select name=\"periodo\">{options}</select><p>Sin informaci&oacute;n</p></body></html>",
        institution.search_name
    )
}

#[derive(Debug, Clone)]
pub(super) enum Canned {
    Body(String),
    Status(u16),
}

/// Portal double keyed by search name.
#[derive(Default)]
pub(super) struct StaticSource {
    listings: Mutex<HashMap<String, Canned>>,
    fetches: Mutex<usize>,
}

impl StaticSource {
    pub(super) fn with(entries: Vec<(Institution, Canned)>) -> Self {
        let source = Self::default();
        for (institution, canned) in entries {
            source.set(&institution, canned);
        }
        source
    }

    pub(super) fn set(&self, institution: &Institution, canned: Canned) {
        self.listings
            .lock()
            .expect("source mutex poisoned")
            .insert(institution.search_name.clone(), canned);
    }

    pub(super) fn fetches(&self) -> usize {
        *self.fetches.lock().expect("source mutex poisoned")
    }
}

impl PortalSource for StaticSource {
    fn fetch(&self, institution: &Institution) -> Result<RawListing, FetchError> {
        *self.fetches.lock().expect("source mutex poisoned") += 1;
        let canned = self
            .listings
            .lock()
            .expect("source mutex poisoned")
            .get(&institution.search_name)
            .cloned();
        match canned {
            Some(Canned::Body(body)) => Ok(RawListing {
                institution: institution.clone(),
                body,
            }),
            Some(Canned::Status(status)) => Err(FetchError::Status { status }),
            None => Err(FetchError::Transport("connection refused".to_string())),
        }
    }
}

/// State store double. `fail_commits` simulates a read-only disk.
#[derive(Default)]
pub(super) struct MemoryStateStore {
    record: Mutex<Option<StateRecord>>,
    commits: Mutex<Vec<StateRecord>>,
    fail_commits: bool,
    corrupt: bool,
}

impl MemoryStateStore {
    pub(super) fn at(period: Period) -> Self {
        Self {
            record: Mutex::new(Some(StateRecord {
                last_known_period: period,
                updated_at: None,
            })),
            ..Self::default()
        }
    }

    pub(super) fn read_only(period: Period) -> Self {
        Self {
            fail_commits: true,
            ..Self::at(period)
        }
    }

    pub(super) fn corrupt() -> Self {
        Self {
            corrupt: true,
            ..Self::default()
        }
    }

    pub(super) fn commits(&self) -> Vec<StateRecord> {
        self.commits.lock().expect("store mutex poisoned").clone()
    }

    pub(super) fn current(&self) -> StateRecord {
        self.record
            .lock()
            .expect("store mutex poisoned")
            .unwrap_or_else(StateRecord::first_run)
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<StateRecord, StateCorruptError> {
        if self.corrupt {
            return Err(StateCorruptError::InvalidPeriod {
                path: "memory".into(),
                year: 2025,
                month: 13,
            });
        }
        Ok(self.current())
    }

    fn commit(&self, record: &StateRecord) -> Result<(), PersistError> {
        if self.fail_commits {
            return Err(PersistError::Io {
                path: "memory".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        *self.record.lock().expect("store mutex poisoned") = Some(*record);
        self.commits
            .lock()
            .expect("store mutex poisoned")
            .push(*record);
        Ok(())
    }
}

/// Captures every outbound mail; `failing` rejects them all.
#[derive(Default)]
pub(super) struct RecordingTransport {
    sent: Mutex<Vec<OutboundMail>>,
    failing: Mutex<bool>,
}

impl RecordingTransport {
    pub(super) fn failing() -> Self {
        Self {
            failing: Mutex::new(true),
            ..Self::default()
        }
    }

    pub(super) fn recover(&self) {
        *self.failing.lock().expect("transport mutex poisoned") = false;
    }

    pub(super) fn sent(&self) -> Vec<OutboundMail> {
        self.sent.lock().expect("transport mutex poisoned").clone()
    }
}

impl MailTransport for RecordingTransport {
    fn send(&self, mail: &OutboundMail) -> Result<(), NotifyError> {
        if *self.failing.lock().expect("transport mutex poisoned") {
            return Err(NotifyError::Transport("smtp relay unreachable".to_string()));
        }
        self.sent
            .lock()
            .expect("transport mutex poisoned")
            .push(mail.clone());
        Ok(())
    }
}

pub(super) type TestController =
    RunController<StaticSource, MemoryStateStore, EmailNotifier<RecordingTransport>>;

pub(super) fn controller(
    source: Arc<StaticSource>,
    store: Arc<MemoryStateStore>,
    transport: Arc<RecordingTransport>,
) -> TestController {
    let notifier = EmailNotifier::new(transport, vec!["ops@example.com".to_string()]);
    RunController::new(source, store, Arc::new(notifier), roster())
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// In-memory sink for formatted log lines.
#[derive(Clone, Default)]
pub(super) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("log mutex poisoned")).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .expect("log mutex poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Runs `f` under a scoped subscriber and returns its result with the log
/// output it produced.
pub(super) fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, logs.contents())
}
