use anyhow::Result;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::env;

/// Delivery seam for one-time codes. The auth service only depends on this
/// trait; delivery failures are logged by the dispatcher and never reach
/// token or session logic.
pub trait Notifier: Send + Sync {
    fn send_confirmation_code(&self, to_email: &str, code: &str) -> Result<()>;
    fn send_recovery_code(&self, to_email: &str, code: &str) -> Result<()>;
}

pub struct EmailService {
    mailer: SmtpTransport,
    from_address: String,
    frontend_url: String,
}

impl EmailService {
    pub fn new() -> Result<Self> {
        let smtp_host = env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string());
        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .unwrap_or(587);
        let smtp_username = env::var("SMTP_USERNAME").unwrap_or_default();
        let smtp_password = env::var("SMTP_PASSWORD").unwrap_or_default();
        let from_address = env::var("SMTP_FROM_ADDRESS")
            .unwrap_or_else(|_| "noreply@bloggers.local".to_string());
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let mailer = if smtp_username.is_empty() {
            SmtpTransport::builder_dangerous(&smtp_host)
                .port(smtp_port)
                .build()
        } else {
            let creds = Credentials::new(smtp_username, smtp_password);
            SmtpTransport::relay(&smtp_host)?
                .port(smtp_port)
                .credentials(creds)
                .build()
        };

        Ok(Self {
            mailer,
            from_address,
            frontend_url,
        })
    }

    fn send_plain(&self, to_email: &str, subject: &str, body: String) -> Result<()> {
        if env::var("SMTP_SKIP_SEND").unwrap_or_default() == "true" {
            return Ok(());
        }

        let email = Message::builder()
            .from(self.from_address.parse()?)
            .to(to_email.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        self.mailer.send(&email)?;
        Ok(())
    }
}

impl Notifier for EmailService {
    fn send_confirmation_code(&self, to_email: &str, code: &str) -> Result<()> {
        let confirm_url = format!("{}/confirm-email?code={}", self.frontend_url, code);
        let body = format!(
            r#"
Thanks for registering on the Bloggers platform.

To finish registration, follow the link below:

{}

The link is valid for 24 hours. If you did not register, ignore this message.

---
Bloggers platform
"#,
            confirm_url
        );
        self.send_plain(to_email, "Finish registration - Bloggers", body)
    }

    fn send_recovery_code(&self, to_email: &str, code: &str) -> Result<()> {
        let recovery_url = format!("{}/password-recovery?recoveryCode={}", self.frontend_url, code);
        let body = format!(
            r#"
We received a password recovery request for your account.

To set a new password, follow the link below:

{}

The link is valid for 1 hour. If you did not request recovery, ignore this message.

---
Bloggers platform
"#,
            recovery_url
        );
        self.send_plain(to_email, "Password recovery - Bloggers", body)
    }
}

/// Drops every message; used by tests and local setups without SMTP.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn send_confirmation_code(&self, _to_email: &str, _code: &str) -> Result<()> {
        Ok(())
    }

    fn send_recovery_code(&self, _to_email: &str, _code: &str) -> Result<()> {
        Ok(())
    }
}
