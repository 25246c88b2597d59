//! Freshness detection and idempotent notification.
//!
//! Leaf first: [`source`] fetches portal listings, [`parser`] turns them into
//! periods, [`period`] orders them, [`store`] keeps the last alerted period,
//! [`notifier`] sends the alert, and [`controller`] ties one run together.
//! [`feed`] is a read-only mirror for the dashboard.

pub mod controller;
pub mod feed;
pub mod institution;
pub mod notifier;
pub mod observed;
pub mod parser;
pub mod period;
pub mod source;
pub mod store;

#[cfg(test)]
mod tests;

pub use controller::{RunController, RunError, RunMode, RunOutcome, RunPhase};
pub use feed::{feed_router, FeedEntry, FeedService, FeedSnapshot, FeedStatus};
pub use institution::{Institution, Roster, RosterError};
pub use notifier::{
    EmailNotifier, MailTransport, Notifier, NotifyError, OutboundMail, SmtpMailTransport,
};
pub use observed::ObservedReport;
pub use parser::{
    parse_periods, ParseWarning, ParsedListing, PeriodParse, PeriodParser, PortfolioFigures,
};
pub use period::{is_newer, Period};
pub use source::{FetchError, HttpPortalSource, PortalClient, PortalSource, RawListing};
pub use store::{FileStateStore, PersistError, StateCorruptError, StateRecord, StateStore};
