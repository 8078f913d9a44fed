use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use shared_utils::parse_flexible_date;

use crate::models::{ConversationError, ExtractedInfo};

static NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i:my name is|name is|name:|i am|i'm|this is)\s+([A-Z][A-Za-z.'-]*(?:\s+[A-Z][A-Za-z.'-]*)*)")
        .expect("NAME_REGEX is a compile-time constant")
});

static DATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,4}[-/]\d{1,2}[-/]\d{1,4})\b").expect("DATE_REGEX is a compile-time constant")
});

static DOCTOR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?i:dr\.?|doctor)\s+([A-Z][A-Za-z]*(?:\s+[A-Z][A-Za-z]*)*)")
        .expect("DOCTOR_REGEX is a compile-time constant")
});

static LOCATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:[Ii]n|[Ff]rom|[Cc]ity(?:\s+is)?:?)\s+([A-Z][A-Za-z]+(?:\s+[A-Z][A-Za-z]+)*)")
        .expect("LOCATION_REGEX is a compile-time constant")
});

/// Pulls patient details out of a free-text reply. Implementations are best
/// effort: a partial result is normal and an error is treated as "nothing found".
#[async_trait]
pub trait InfoExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<ExtractedInfo, ConversationError>;
}

/// Rule-based extractor for "name, dob, doctor, city" replies and a handful of
/// phrase patterns ("my name is", "Dr.", "in <City>").
#[derive(Debug, Default, Clone)]
pub struct PatternExtractor;

impl PatternExtractor {
    pub fn new() -> Self {
        Self
    }

    fn from_phrases(text: &str) -> ExtractedInfo {
        let capture = |regex: &Regex| {
            regex
                .captures(text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
        };

        ExtractedInfo {
            name: capture(&NAME_REGEX),
            dob: capture(&DATE_REGEX),
            doctor: capture(&DOCTOR_REGEX).map(|name| format!("Dr. {}", name)),
            location: capture(&LOCATION_REGEX),
        }
    }

    /// Fills fields the phrase patterns missed from a comma-separated reply. The first
    /// plain part is the name and the last one the city.
    fn fill_from_parts(text: &str, info: &mut ExtractedInfo) {
        let parts: Vec<&str> = text
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        if parts.len() < 2 {
            return;
        }

        let mut plain = Vec::new();
        for part in &parts {
            if parse_flexible_date(part).is_some() {
                if info.dob.is_none() {
                    info.dob = Some(part.to_string());
                }
            } else if is_doctor_part(part) {
                if info.doctor.is_none() {
                    info.doctor = Some(part.to_string());
                }
            } else if !part.chars().any(|c| c.is_ascii_digit()) {
                plain.push(*part);
            }
        }

        if info.name.is_none() {
            info.name = plain.first().map(|part| part.to_string());
        }
        if info.location.is_none() && plain.len() > 1 {
            info.location = plain.last().map(|part| part.to_string());
        }
    }
}

fn is_doctor_part(part: &str) -> bool {
    let lower = part.to_lowercase();
    lower.starts_with("dr ") || lower.starts_with("dr.") || lower.starts_with("doctor ")
}

#[async_trait]
impl InfoExtractor for PatternExtractor {
    async fn extract(&self, text: &str) -> Result<ExtractedInfo, ConversationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ConversationError::EmptyMessage);
        }

        let mut info = Self::from_phrases(text);
        Self::fill_from_parts(text, &mut info);
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_comma_separated_reply() {
        let info = PatternExtractor::new()
            .extract("Anita Rao, 05/07/1988, Dr. Meena Iyer, Chennai")
            .await
            .unwrap();

        assert_eq!(info.name.as_deref(), Some("Anita Rao"));
        assert_eq!(info.dob.as_deref(), Some("05/07/1988"));
        assert_eq!(info.doctor.as_deref(), Some("Dr. Meena Iyer"));
        assert_eq!(info.location.as_deref(), Some("Chennai"));
    }

    #[tokio::test]
    async fn test_phrase_reply() {
        let info = PatternExtractor::new()
            .extract("Hi, my name is Kishore Kumar and I was born 12-03-1990. I'd like to see Dr. Ravi Varma in Bangalore")
            .await
            .unwrap();

        assert_eq!(info.name.as_deref(), Some("Kishore Kumar"));
        assert_eq!(info.dob.as_deref(), Some("12-03-1990"));
        assert_eq!(info.doctor.as_deref(), Some("Dr. Ravi Varma"));
        assert_eq!(info.location.as_deref(), Some("Bangalore"));
    }

    #[tokio::test]
    async fn test_partial_reply_leaves_fields_empty() {
        let info = PatternExtractor::new().extract("Dr. Meena please").await.unwrap();

        assert_eq!(info.doctor.as_deref(), Some("Dr. Meena"));
        assert!(info.name.is_none());
        assert!(info.dob.is_none());
    }

    #[tokio::test]
    async fn test_blank_reply_is_an_error() {
        assert!(PatternExtractor::new().extract("   ").await.is_err());
    }
}
