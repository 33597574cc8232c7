//! Account notifications
//!
//! Messages are built here and handed to a [`Mailer`]. Delivery failures are logged and
//! never surface to the caller.

use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail delivery failed: {0}")]
    Delivery(String),
}

/// A plain-text email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    pub fn login_alert(to: &str, full_name: &str) -> Self {
        Self::new(
            to,
            "New login to your HealthSure account",
            format!(
                "Hello {},\n\nWe noticed a new login to your account. If this was not you, change your password immediately.",
                full_name
            ),
        )
    }

    pub fn password_changed(to: &str, full_name: &str) -> Self {
        Self::new(
            to,
            "Your HealthSure password was changed",
            format!(
                "Hello {},\n\nYour password was changed. If you did not make this change, reset your password now.",
                full_name
            ),
        )
    }

    pub fn password_reset_link(to: &str, full_name: &str, link: &str) -> Self {
        Self::new(
            to,
            "Reset your HealthSure password",
            format!(
                "Hello {},\n\nUse the link below to reset your password. It expires in one hour.\n\n{}",
                full_name, link
            ),
        )
    }

    pub fn password_reset_confirmation(to: &str, full_name: &str) -> Self {
        Self::new(
            to,
            "Your HealthSure password has been reset",
            format!("Hello {},\n\nYour password has been reset successfully.", full_name),
        )
    }

    pub fn otp_code(to: &str, otp: &str, expires_in_minutes: u64) -> Self {
        Self::new(
            to,
            "Your HealthSure verification code",
            format!(
                "Your one-time code is {}. It expires in {} minutes.",
                otp, expires_in_minutes
            ),
        )
    }

    /// Sent to the previous address after an email change
    pub fn email_changed(old_address: &str, new_address: &str) -> Self {
        Self::new(
            old_address,
            "Your HealthSure email address was changed",
            format!(
                "The email address on your account was changed to {}. If this was not you, contact support.",
                new_address
            ),
        )
    }

    /// Sent to the new address after an email change
    pub fn email_change_confirmation(new_address: &str, full_name: &str) -> Self {
        Self::new(
            new_address,
            "Your HealthSure email address is confirmed",
            format!(
                "Hello {},\n\nThis address is now the email on your HealthSure account.",
                full_name
            ),
        )
    }
}

/// Outgoing mail transport
#[cfg_attr(test, mockall::automock)]
pub trait Mailer: Send + Sync {
    fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Writes outgoing mail to the log instead of delivering it
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        info!(to = %message.to, subject = %message.subject, "Outgoing email");
        Ok(())
    }
}

/// Send `message`, logging rather than returning any failure
pub fn send_quietly(mailer: &dyn Mailer, message: EmailMessage) {
    if let Err(e) = mailer.send(&message) {
        warn!(to = %message.to, subject = %message.subject, "Failed to send email: {}", e);
    }
}
