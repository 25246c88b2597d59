use std::fmt;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// A tracked SOFIPO. `search_name` is how the portal spells it, `short_name`
/// is what recipients see.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Institution {
    pub search_name: String,
    pub short_name: String,
}

impl Institution {
    pub fn new(search_name: impl Into<String>, short_name: impl Into<String>) -> Self {
        Self {
            search_name: search_name.into(),
            short_name: short_name.into(),
        }
    }

    /// True when `text` mentions this institution, ignoring case and
    /// whitespace runs.
    pub fn is_named_in(&self, text: &str) -> bool {
        normalize_name(text).contains(&normalize_name(&self.search_name))
    }
}

impl fmt::Display for Institution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name)
    }
}

/// Static set of institutions checked on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    institutions: Vec<Institution>,
}

impl Roster {
    pub fn new(institutions: Vec<Institution>) -> Result<Self, RosterError> {
        if institutions.is_empty() {
            return Err(RosterError::Empty);
        }
        Ok(Self { institutions })
    }

    /// The five SOFIPOs the monitor was built for.
    pub fn sofipos() -> Self {
        Self {
            institutions: vec![
                Institution::new("Klar Technologies", "Klar"),
                Institution::new("Libertad Servicios Financieros", "Libertad"),
                Institution::new("Stori México", "Stori"),
                Institution::new("Financiera Sustentable", "Sustentable"),
                Institution::new("NU México Financiera", "NU México"),
            ],
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RosterError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Reads a `search_name,short_name` CSV with a header row.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RosterError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut institutions = Vec::new();

        for row in csv_reader.deserialize::<RosterRow>() {
            let row = row?;
            if row.search_name.is_empty() {
                continue;
            }
            let short_name = if row.short_name.is_empty() {
                row.search_name.clone()
            } else {
                row.short_name
            };
            institutions.push(Institution::new(row.search_name, short_name));
        }

        Self::new(institutions)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Institution> {
        self.institutions.iter()
    }

    pub fn len(&self) -> usize {
        self.institutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.institutions.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    search_name: String,
    #[serde(default)]
    short_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("failed to read roster: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid roster CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("roster lists no institutions")]
    Empty,
}

pub(crate) fn normalize_name(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}', '\u{a0}'], " ");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase()
}
