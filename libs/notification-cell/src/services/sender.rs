use async_trait::async_trait;
use tracing::info;

use crate::{Channel, NotificationError, NotificationJob};

/// Adds `country_code` to numbers written without one. Blank input and spreadsheet
/// `nan` placeholders yield `None`.
pub fn format_phone_number(phone: &str, country_code: &str) -> Option<String> {
    let phone = phone.trim();
    if phone.is_empty() || phone.eq_ignore_ascii_case("nan") {
        return None;
    }
    if phone.starts_with('+') {
        return Some(phone.to_string());
    }
    Some(format!("{}{}", country_code, phone))
}

/// Delivery seam for SMS and email providers.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn deliver(&self, job: &NotificationJob) -> Result<(), NotificationError>;
}

/// Logs messages instead of sending them. Used when no provider is configured.
#[derive(Debug, Default, Clone)]
pub struct SimulatedSender;

#[async_trait]
impl NotificationSender for SimulatedSender {
    async fn deliver(&self, job: &NotificationJob) -> Result<(), NotificationError> {
        match job.channel {
            Channel::Sms => info!("[SMS Simulation] To: {}, Body: {}", job.recipient, job.body),
            Channel::Email => info!(
                "[Email Simulation] To: {}, Subject: {}, Attachment: {}",
                job.recipient,
                job.subject.as_deref().unwrap_or("-"),
                job.attachment
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "-".to_string())
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_numbers_get_country_code() {
        assert_eq!(format_phone_number(" 9876543210 ", "+91").as_deref(), Some("+919876543210"));
        assert_eq!(format_phone_number("+14155550100", "+91").as_deref(), Some("+14155550100"));
        assert_eq!(format_phone_number("NaN", "+91"), None);
        assert_eq!(format_phone_number("   ", "+91"), None);
    }
}
