//! mailer.rs
//!
//! Отправка транзакционных писем через HTTP API почтового провайдера
//! (совместимо с Resend: `POST {api_url}/emails`).
//!
//! Ключевые компоненты:
//! 1.  **Mailer**: клиент reqwest с таймаутом и ключом API.
//! 2.  **Circuit breaker** (`failsafe`): после серии подряд неудачных отправок
//!     запросы к провайдеру временно блокируются, чтобы не держать обработчики
//!     на таймаутах.
//! 3.  **Шаблоны**: приветствие, напоминание о событии и письмо в поддержку.

use failsafe::backoff::{self, Constant};
use failsafe::failure_policy::{consecutive_failures, ConsecutiveFailures};
use failsafe::futures::CircuitBreaker;
use failsafe::StateMachine;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::EmailConfig;

// Порог подряд идущих сбоев и пауза перед пробным запросом
const FAILURE_THRESHOLD: u32 = 3;
const OPEN_STATE_SECONDS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("email delivery is not configured")]
    NotConfigured,
    #[error("email provider is temporarily unavailable")]
    CircuitOpen,
    #[error("email provider rejected message: {status} {body}")]
    Rejected { status: u16, body: String },
    #[error("email request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Транзакционные письма. Адресат и данные подставляет сервер, не клиент.
#[derive(Debug, Clone)]
pub enum TransactionalEmail {
    Welcome { name: String },
    EventReminder { name: String, event_title: String },
}

#[derive(Clone)]
pub struct Mailer {
    client: reqwest::Client,
    config: EmailConfig,
    breaker: StateMachine<ConsecutiveFailures<Constant>, ()>,
}

impl Mailer {
    pub fn new(config: EmailConfig) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        let breaker = failsafe::Config::new()
            .failure_policy(consecutive_failures(
                FAILURE_THRESHOLD,
                backoff::constant(Duration::from_secs(OPEN_STATE_SECONDS)),
            ))
            .build();
        Ok(Self {
            client,
            config,
            breaker,
        })
    }

    /// Отправляет письмо через провайдера, защищено circuit breaker.
    pub async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let api_key = self.config.api_key.as_deref().ok_or(MailError::NotConfigured)?;
        let url = format!("{}/emails", self.config.api_url.trim_end_matches('/'));

        let request = async {
            let response = self
                .client
                .post(&url)
                .bearer_auth(api_key)
                .json(&email)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                let body = response.text().await.unwrap_or_default();
                Err(MailError::Rejected {
                    status: status.as_u16(),
                    body,
                })
            }
        };

        match self.breaker.call(request).await {
            Ok(()) => {
                info!("Email '{}' sent to {:?}", email.subject, email.to);
                Ok(())
            }
            Err(failsafe::Error::Rejected) => {
                warn!("Email circuit breaker is open, dropping '{}'", email.subject);
                Err(MailError::CircuitOpen)
            }
            Err(failsafe::Error::Inner(e)) => {
                error!("Failed to send email '{}': {}", email.subject, e);
                Err(e)
            }
        }
    }

    pub async fn send_transactional(
        &self,
        to: &str,
        kind: TransactionalEmail,
        site_url: &str,
    ) -> Result<(), MailError> {
        let email = match kind {
            TransactionalEmail::Welcome { name } => OutgoingEmail {
                from: self.config.from.clone(),
                to: vec![to.to_string()],
                subject: "Welcome to EventForm+!".to_string(),
                html: render_email(
                    "Welcome to EventForm+!",
                    &format!(
                        "<p>Hello {}!</p>\
                         <p>With EventForm+ you can build registration forms for your events, \
                         manage responses and follow check-ins in real time.</p>\
                         <p><a href=\"{}\" class=\"button\">Open EventForm+</a></p>",
                        escape_html(&name),
                        escape_html(site_url)
                    ),
                    None,
                ),
            },
            TransactionalEmail::EventReminder { name, event_title } => OutgoingEmail {
                from: self.config.from.clone(),
                to: vec![to.to_string()],
                subject: format!("Reminder: {}", event_title),
                html: render_email(
                    "Event reminder",
                    &format!(
                        "<p>Hello {}!</p><p>Don't forget: your event is today.</p>",
                        escape_html(&name)
                    ),
                    Some(&event_title),
                ),
            },
        };
        self.send(email).await
    }

    /// Письмо в поддержку всегда уходит на настроенный адрес поддержки.
    pub async fn send_support(
        &self,
        user_email: Option<&str>,
        subject: &str,
        message: &str,
    ) -> Result<(), MailError> {
        let sender = user_email.unwrap_or("unauthenticated user");
        let email = OutgoingEmail {
            from: self.config.from.clone(),
            to: vec![self.config.support_to.clone()],
            subject: format!("[EventForm+ Support] {}", subject),
            html: render_email(
                subject,
                &format!(
                    "<p><strong>From:</strong> {}</p><p>{}</p>",
                    escape_html(sender),
                    escape_html(message).replace('\n', "<br>")
                ),
                None,
            ),
        };
        self.send(email).await
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_email(title: &str, body_html: &str, event_title: Option<&str>) -> String {
    let event = event_title
        .map(|t| format!("<p class=\"event-title\">{}</p>", escape_html(t)))
        .unwrap_or_default();
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body><div class=\"container\"><h1>{title}</h1>{body_html}{event}</div></body></html>",
        title = escape_html(title),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html("<b>\"Ana\" & 'Bia'</b>"),
            "&lt;b&gt;&quot;Ana&quot; &amp; &#39;Bia&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn event_title_is_escaped_in_template() {
        let html = render_email("Event reminder", "<p>Hi</p>", Some("<script>x</script>"));
        assert!(html.contains("&lt;script&gt;x&lt;/script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[tokio::test]
    async fn refuses_to_send_without_api_key() {
        let mailer = Mailer::new(crate::config::Config::development().email).unwrap();
        let result = mailer.send_support(None, "Help", "It broke").await;
        assert!(matches!(result, Err(MailError::NotConfigured)));
    }
}
