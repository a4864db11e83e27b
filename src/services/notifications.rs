//! Reader notifications for holds that became ready
//!
//! Delivery is best effort: failures are logged and never fail the request
//! that promoted the hold.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::{str::FromStr, sync::Arc};

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
    models::reservation::HoldNotice,
    repository::Repository,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn hold_ready(&self, notice: &HoldNotice) -> AppResult<()>;
}

/// Sends hold notices over SMTP
pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    async fn send_email(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let from_name = self.config.smtp_from_name.as_deref().unwrap_or("Thư viện");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Internal(format!("Invalid to address: {}", e)))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(format!(
                                r#"<html><body><pre>{}</pre></body></html>"#,
                                escape_html(body).replace('\n', "<br>")
                            )),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer_builder
        };

        let mailer = mailer_builder.build();

        // SmtpTransport blocks
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::Internal(format!("Email task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn hold_ready(&self, notice: &HoldNotice) -> AppResult<()> {
        let Some(ref to) = notice.reader_email else {
            tracing::info!(
                "Reservation {} ready for {} but no email on file",
                notice.reservation_id,
                notice.reader_name
            );
            return Ok(());
        };

        let until = notice
            .hold_expires_at
            .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_default();
        let body = format!(
            r#"
Hello {name},

The book "{title}" you reserved is now waiting for you at the library.

It will be held for you until {until}.
"#,
            name = notice.reader_name,
            title = notice.book_title,
            until = until
        );

        self.send_email(to, "Your reserved book is ready for pickup", &body).await
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

/// Writes hold notices to the log only
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn hold_ready(&self, notice: &HoldNotice) -> AppResult<()> {
        tracing::info!(
            "Reservation {}: '{}' ready for {} until {:?}",
            notice.reservation_id,
            notice.book_title,
            notice.reader_name,
            notice.hold_expires_at
        );
        Ok(())
    }
}

/// Sends one notice per hold; returns how many were delivered
pub async fn send_hold_notices(notifier: &dyn Notifier, notices: &[HoldNotice]) -> usize {
    let mut delivered = 0;
    for notice in notices {
        match notifier.hold_ready(notice).await {
            Ok(()) => delivered += 1,
            Err(e) => tracing::warn!(
                "Failed to notify reader of reservation {}: {}",
                notice.reservation_id,
                e
            ),
        }
    }
    delivered
}

#[derive(Clone)]
pub struct NotificationService {
    repository: Repository,
    notifier: Arc<dyn Notifier>,
}

impl NotificationService {
    pub fn new(repository: Repository, config: &EmailConfig) -> Self {
        let notifier: Arc<dyn Notifier> = if config.enabled {
            Arc::new(EmailNotifier::new(config.clone()))
        } else {
            Arc::new(LogNotifier)
        };
        Self { repository, notifier }
    }

    /// Notify the readers of freshly promoted reservations
    pub async fn holds_ready(&self, reservation_ids: &[i32]) {
        if reservation_ids.is_empty() {
            return;
        }
        match self.repository.reservations.hold_notices(reservation_ids).await {
            Ok(notices) => {
                send_hold_notices(self.notifier.as_ref(), &notices).await;
            }
            Err(e) => tracing::warn!("Failed to load hold notices: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(id: i32) -> HoldNotice {
        HoldNotice {
            reservation_id: id,
            reader_name: "Nguyễn Văn An".to_string(),
            reader_email: Some("an@example.com".to_string()),
            book_title: "Dế Mèn phiêu lưu ký".to_string(),
            hold_expires_at: None,
        }
    }

    #[test]
    fn html_body_escapes_markup() {
        assert_eq!(
            escape_html(r#"<Tom & Jerry> "1" 'x'"#),
            "&lt;Tom &amp; Jerry&gt; &quot;1&quot; &#39;x&#39;"
        );
        assert_eq!(escape_html("Dế Mèn"), "Dế Mèn");
    }

    #[tokio::test]
    async fn every_notice_is_sent() {
        let mut mock = MockNotifier::new();
        mock.expect_hold_ready().times(3).returning(|_| Ok(()));

        let delivered = send_hold_notices(&mock, &[notice(1), notice(2), notice(3)]).await;
        assert_eq!(delivered, 3);
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_fan_out() {
        let mut mock = MockNotifier::new();
        mock.expect_hold_ready().times(3).returning(|n| {
            if n.reservation_id == 2 {
                Err(AppError::Internal("smtp down".to_string()))
            } else {
                Ok(())
            }
        });

        let delivered = send_hold_notices(&mock, &[notice(1), notice(2), notice(3)]).await;
        assert_eq!(delivered, 2);
    }

    #[tokio::test]
    async fn log_notifier_never_fails() {
        assert!(LogNotifier.hold_ready(&notice(9)).await.is_ok());
    }
}
