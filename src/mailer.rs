//! Outgoing email.
//!
//! Controllers only see the [`Mailer`] trait. Which transport backs it is
//! decided once at startup by [`from_config`]: SMTP when `mail.smtp_host` is
//! set, otherwise emails are written to the log.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::MailConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()>;
}

pub fn from_config(cfg: &MailConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    match cfg.smtp_host.as_deref() {
        Some(host) if !host.trim().is_empty() => Ok(Arc::new(SmtpMailer::new(cfg, host)?)),
        _ => {
            tracing::info!("mail.smtp_host not set; emails will be logged instead of sent");
            Ok(Arc::new(LogMailer))
        }
    }
}

/// Writes emails to the tracing log. Default for local development.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
        tracing::info!(to = %email.to, subject = %email.subject, "email (not sent):\n{}", email.body);
        Ok(())
    }
}

pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Authenticated relays use STARTTLS; an unauthenticated host is treated
    /// as a local plain-text relay.
    pub fn new(cfg: &MailConfig, host: &str) -> anyhow::Result<Self> {
        let from: Mailbox = cfg.from.parse()?;
        let transport = match (&cfg.smtp_username, &cfg.smtp_password) {
            (Some(user), Some(pass)) => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
                .port(cfg.smtp_port)
                .credentials(Credentials::new(user.clone(), pass.clone()))
                .build(),
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(cfg.smtp_port).build(),
        };
        Ok(Self { from, transport })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(email.to.parse()?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())?;
        let response = self.transport.send(message).await?;
        tracing::debug!(to = %email.to, code = %response.code(), "email sent");
        Ok(())
    }
}

/// Keeps every email in memory. Used by tests to read back issued tokens.
#[derive(Clone, Default)]
pub struct MemoryMailer {
    outbox: Arc<Mutex<Vec<OutgoingEmail>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.outbox.lock().map(|outbox| outbox.clone()).unwrap_or_default()
    }

    /// Most recent email addressed to `to`.
    pub fn last_to(&self, to: &str) -> Option<OutgoingEmail> {
        self.sent().into_iter().rev().find(|e| e.to == to)
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
        self.outbox
            .lock()
            .map_err(|_| anyhow::anyhow!("outbox lock poisoned"))?
            .push(email.clone());
        Ok(())
    }
}

fn link(cfg: &MailConfig, path: &str, token: &str) -> String {
    format!("{}/{}?token={}", cfg.app_base_url.trim_end_matches('/'), path, token)
}

pub fn verification_email(cfg: &MailConfig, to: &str, name: &str, token: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "Verify your Book Exchange email address".to_string(),
        body: format!(
            "Hi {},\n\nPlease confirm your email address by opening the link below:\n\n{}\n\n\
             If you did not create an account you can ignore this message.\n",
            name,
            link(cfg, "verify-email", token)
        ),
    }
}

pub fn password_reset_email(cfg: &MailConfig, to: &str, name: &str, token: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "Reset your Book Exchange password".to_string(),
        body: format!(
            "Hi {},\n\nA password reset was requested for your account. Open the link below to choose a new password:\n\n{}\n\n\
             If you did not request this, no action is needed.\n",
            name,
            link(cfg, "reset-password", token)
        ),
    }
}

/// Pulls the `token=` query value back out of an email body.
pub fn extract_token(body: &str) -> Option<String> {
    let rest = body.split("token=").nth(1)?;
    let token: String = rest.chars().take_while(|c| c.is_ascii_alphanumeric()).collect();
    (!token.is_empty()).then_some(token)
}
