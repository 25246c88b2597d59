use std::fmt::Debug;
use std::time::Duration;

use lettre::address::Address;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use super::{MailTransport, NotifyError, OutboundMail};
use crate::config::{MailConfig, SmtpCredentials};

const SENDER_NAME: &str = "CONDUSEF Monitor";

/// SMTP over implicit TLS, authenticating with the configured credentials.
pub struct SmtpMailTransport {
    host: String,
    port: u16,
    credentials: Option<SmtpCredentials>,
    timeout: Duration,
}

impl SmtpMailTransport {
    pub fn from_config(config: &MailConfig) -> Self {
        Self {
            host: config.smtp_host.clone(),
            port: config.smtp_port,
            credentials: config.credentials.clone(),
            timeout: config.timeout,
        }
    }

    fn build_message(
        &self,
        sender: &SmtpCredentials,
        mail: &OutboundMail,
    ) -> Result<Message, NotifyError> {
        let sender_address: Address =
            sender
                .user
                .parse()
                .map_err(|err: lettre::address::AddressError| NotifyError::InvalidAddress {
                    address: sender.user.clone(),
                    reason: err.to_string(),
                })?;

        let mut builder = Message::builder()
            .from(Mailbox::new(Some(SENDER_NAME.to_string()), sender_address))
            .subject(mail.subject.clone());

        for recipient in &mail.recipients {
            let mailbox: Mailbox =
                recipient
                    .parse()
                    .map_err(|err: lettre::address::AddressError| NotifyError::InvalidAddress {
                        address: recipient.clone(),
                        reason: err.to_string(),
                    })?;
            builder = builder.to(mailbox);
        }

        builder
            .header(ContentType::TEXT_HTML)
            .body(mail.html_body.clone())
            .map_err(|err| NotifyError::Compose(err.to_string()))
    }
}

impl Debug for SmtpMailTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailTransport")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl MailTransport for SmtpMailTransport {
    fn send(&self, mail: &OutboundMail) -> Result<(), NotifyError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(NotifyError::MissingCredentials)?;
        let message = self.build_message(credentials, mail)?;

        let transport = SmtpTransport::relay(&self.host)
            .map_err(|err| NotifyError::Transport(err.to_string()))?
            .port(self.port)
            .credentials(Credentials::new(
                credentials.user.clone(),
                credentials.password.clone(),
            ))
            .timeout(Some(self.timeout))
            .build();

        transport
            .send(&message)
            .map_err(|err| NotifyError::Transport(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(credentials: Option<SmtpCredentials>) -> MailConfig {
        MailConfig {
            recipients: vec!["analyst@example.com".to_string()],
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 465,
            credentials,
            timeout: Duration::from_secs(5),
        }
    }

    fn mail(recipients: Vec<&str>) -> OutboundMail {
        OutboundMail {
            subject: "CONDUSEF SOFIPO Update - December 2025".to_string(),
            html_body: "<p>hi</p>".to_string(),
            recipients: recipients.into_iter().map(str::to_string).collect(),
        }
    }

    #[test]
    fn missing_credentials_fail_before_connecting() {
        let transport = SmtpMailTransport::from_config(&config(None));
        let error = transport
            .send(&mail(vec!["analyst@example.com"]))
            .expect_err("no credentials");
        assert!(matches!(error, NotifyError::MissingCredentials));
    }

    #[test]
    fn invalid_recipient_is_reported() {
        let credentials = SmtpCredentials {
            user: "monitor@example.com".to_string(),
            password: "secret".to_string(),
        };
        let transport = SmtpMailTransport::from_config(&config(Some(credentials.clone())));
        let error = transport
            .build_message(&credentials, &mail(vec!["not an address"]))
            .expect_err("bad address");
        match error {
            NotifyError::InvalidAddress { address, .. } => assert_eq!(address, "not an address"),
            other => panic!("expected invalid address, got {other:?}"),
        }
    }

    #[test]
    fn debug_output_omits_credentials() {
        let transport = SmtpMailTransport::from_config(&config(Some(SmtpCredentials {
            user: "monitor@example.com".to_string(),
            password: "secret".to_string(),
        })));
        assert!(!format!("{transport:?}").contains("secret"));
    }
}
