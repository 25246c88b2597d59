//! Alert composition and delivery.

mod email;
mod smtp;

use std::sync::Arc;

use tracing::info;

use super::observed::ObservedReport;
use super::period::Period;

pub use email::{render_alert_html, subject_for};
pub use smtp::SmtpMailTransport;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("no alert recipients configured")]
    NoRecipients,
    #[error("mail credentials are not set (MONITOR_SMTP_USER / MONITOR_SMTP_PASSWORD)")]
    MissingCredentials,
    #[error("invalid mail address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("could not compose alert: {0}")]
    Compose(String),
    #[error("mail transport failed: {0}")]
    Transport(String),
}

/// Fully composed message handed to a [`MailTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMail {
    pub subject: String,
    pub html_body: String,
    pub recipients: Vec<String>,
}

/// Delivery capability: `send(subject, html_body, recipients)`.
pub trait MailTransport: Send + Sync {
    fn send(&self, mail: &OutboundMail) -> Result<(), NotifyError>;
}

/// Dispatches one alert summarizing every institution that reported `period`.
pub trait Notifier: Send + Sync {
    fn notify(&self, period: Period, reports: &[ObservedReport]) -> Result<(), NotifyError>;
}

/// [`Notifier`] that renders an HTML e-mail and sends it to a fixed list.
pub struct EmailNotifier<T> {
    transport: Arc<T>,
    recipients: Vec<String>,
}

impl<T> EmailNotifier<T>
where
    T: MailTransport,
{
    pub fn new(transport: Arc<T>, recipients: Vec<String>) -> Self {
        Self {
            transport,
            recipients,
        }
    }

    pub fn compose(&self, period: Period, reports: &[ObservedReport]) -> OutboundMail {
        OutboundMail {
            subject: subject_for(period),
            html_body: render_alert_html(period, reports),
            recipients: self.recipients.clone(),
        }
    }
}

impl<T> Notifier for EmailNotifier<T>
where
    T: MailTransport,
{
    fn notify(&self, period: Period, reports: &[ObservedReport]) -> Result<(), NotifyError> {
        if self.recipients.is_empty() {
            return Err(NotifyError::NoRecipients);
        }

        let mail = self.compose(period, reports);
        self.transport.send(&mail)?;
        info!(
            period = %period,
            recipients = self.recipients.len(),
            institutions = reports.len(),
            "alert delivered"
        );
        Ok(())
    }
}
