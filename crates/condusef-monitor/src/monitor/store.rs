use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::period::{is_newer, Period};

/// The one fact that survives between runs: the last period an alert was
/// delivered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    pub last_known_period: Period,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StateRecord {
    /// Baseline for a monitor that has never alerted.
    pub fn first_run() -> Self {
        Self {
            last_known_period: Period::SENTINEL,
            updated_at: None,
        }
    }

    /// Record for `period`, or `None` when that would not move the marker
    /// forward.
    pub fn advance(&self, period: Period, at: DateTime<Utc>) -> Option<Self> {
        is_newer(period, self.last_known_period).then_some(Self {
            last_known_period: period,
            updated_at: Some(at),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateCorruptError {
    #[error("failed to read state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("state file {path} is not a valid record: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("state file {path} holds an invalid period ({year}, {month})")]
    InvalidPeriod { path: PathBuf, year: i32, month: u32 },
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("failed to write state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode state record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Durable home of the [`StateRecord`]. Read once per run, written at most
/// once.
pub trait StateStore: Send + Sync {
    fn load(&self) -> Result<StateRecord, StateCorruptError>;
    fn commit(&self, record: &StateRecord) -> Result<(), PersistError>;
}

/// Accepts both the current layout and the older `last_year`/`last_month`
/// layout.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    Current {
        last_known_period: RawPeriod,
        #[serde(default)]
        updated_at: Option<DateTime<Utc>>,
    },
    Legacy {
        last_year: i32,
        last_month: u32,
    },
}

#[derive(Debug, Deserialize)]
struct RawPeriod {
    year: i32,
    month: u32,
}

/// JSON file store. Absence of the file means "never run before".
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode(&self, bytes: &[u8]) -> Result<StateRecord, StateCorruptError> {
        let stored: StoredRecord =
            serde_json::from_slice(bytes).map_err(|source| StateCorruptError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        let (year, month, updated_at) = match stored {
            StoredRecord::Current {
                last_known_period,
                updated_at,
            } => (last_known_period.year, last_known_period.month, updated_at),
            StoredRecord::Legacy {
                last_year,
                last_month,
            } => (last_year, last_month, None),
        };

        let last_known_period =
            Period::new(year, month).ok_or_else(|| StateCorruptError::InvalidPeriod {
                path: self.path.clone(),
                year,
                month,
            })?;

        Ok(StateRecord {
            last_known_period,
            updated_at,
        })
    }

    fn write_err(&self, source: std::io::Error) -> PersistError {
        PersistError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<StateRecord, StateCorruptError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no state file, starting from sentinel");
                return Ok(StateRecord::first_run());
            }
            Err(source) => {
                return Err(StateCorruptError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        self.decode(&bytes)
    }

    /// Writes to a temp file beside the target, syncs it, then renames it
    /// into place. Readers see the old record or the new one, never a mix.
    fn commit(&self, record: &StateRecord) -> Result<(), PersistError> {
        let encoded = serde_json::to_vec_pretty(record)?;
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&directory).map_err(|err| self.write_err(err))?;

        let mut staged = NamedTempFile::new_in(&directory).map_err(|err| self.write_err(err))?;
        staged
            .write_all(&encoded)
            .map_err(|err| self.write_err(err))?;
        staged
            .as_file()
            .sync_all()
            .map_err(|err| self.write_err(err))?;
        staged
            .persist(&self.path)
            .map_err(|err| self.write_err(err.error))?;

        info!(
            path = %self.path.display(),
            period = %record.last_known_period,
            "state record committed"
        );
        Ok(())
    }
}
