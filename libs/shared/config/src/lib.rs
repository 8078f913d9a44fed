use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.87;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub patient_store_path: PathBuf,
    pub schedule_store_path: PathBuf,
    pub ledger_store_path: PathBuf,
    pub intake_form_path: PathBuf,
    pub fuzzy_threshold: f64,
    pub sms_country_code: String,
    pub reminder_interval_hours: u64,
    pub session_idle_minutes: u64,
    pub outbox_retention_hours: u64,
    pub bind_addr: String,
    pub fallback_doctors: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let data_dir = PathBuf::from(env::var("CURA_DATA_DIR").unwrap_or_else(|_| {
            warn!("CURA_DATA_DIR not set, using default");
            "data".to_string()
        }));

        let config = Self {
            patient_store_path: path_var("CURA_PATIENT_STORE", &data_dir, "patients.csv"),
            schedule_store_path: path_var("CURA_SCHEDULE_STORE", &data_dir, "doctor_schedule.json"),
            ledger_store_path: path_var("CURA_LEDGER_STORE", &data_dir, "appointments.json"),
            intake_form_path: path_var("CURA_INTAKE_FORM", &data_dir, "New_Patient_Intake_Form.pdf"),
            fuzzy_threshold: parsed_var("CURA_FUZZY_THRESHOLD", DEFAULT_FUZZY_THRESHOLD),
            sms_country_code: env::var("CURA_SMS_COUNTRY_CODE").unwrap_or_else(|_| {
                warn!("CURA_SMS_COUNTRY_CODE not set, using default");
                "+91".to_string()
            }),
            reminder_interval_hours: parsed_var("CURA_REMINDER_INTERVAL_HOURS", 6),
            session_idle_minutes: parsed_var("CURA_SESSION_IDLE_MINUTES", 30),
            outbox_retention_hours: parsed_var("CURA_OUTBOX_RETENTION_HOURS", 168),
            bind_addr: env::var("CURA_BIND_ADDR").unwrap_or_else(|_| {
                warn!("CURA_BIND_ADDR not set, using default");
                "0.0.0.0:3000".to_string()
            }),
            fallback_doctors: env::var("CURA_FALLBACK_DOCTORS")
                .map(|list| split_list(&list))
                .unwrap_or_else(|_| default_fallback_doctors()),
            data_dir,
        };

        if !config.is_configured() {
            warn!("Fuzzy threshold {} is outside [0, 1], identity matching will misbehave", config.fuzzy_threshold);
        }

        config
    }

    /// Config rooted at `data_dir` with every store under it. Used by tests and tooling.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            patient_store_path: data_dir.join("patients.csv"),
            schedule_store_path: data_dir.join("doctor_schedule.json"),
            ledger_store_path: data_dir.join("appointments.json"),
            intake_form_path: data_dir.join("New_Patient_Intake_Form.pdf"),
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            sms_country_code: "+91".to_string(),
            reminder_interval_hours: 6,
            session_idle_minutes: 30,
            outbox_retention_hours: 168,
            bind_addr: "127.0.0.1:3000".to_string(),
            fallback_doctors: default_fallback_doctors(),
            data_dir,
        }
    }

    pub fn is_configured(&self) -> bool {
        (0.0..=1.0).contains(&self.fuzzy_threshold)
    }
}

fn path_var(name: &str, data_dir: &Path, file_name: &str) -> PathBuf {
    env::var(name).map(PathBuf::from).unwrap_or_else(|_| {
        warn!("{} not set, using {}", name, data_dir.join(file_name).display());
        data_dir.join(file_name)
    })
}

fn parsed_var<T: FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", name, raw, default);
            default
        }),
        Err(_) => {
            warn!("{} not set, using default {}", name, default);
            default
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn default_fallback_doctors() -> Vec<String> {
    vec![
        "Dr. Arjun Reddy".to_string(),
        "Dr. Meena Iyer".to_string(),
        "Dr. Ravi Varma".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_data_dir_places_stores_under_dir() {
        let config = AppConfig::with_data_dir("/tmp/cura");
        assert_eq!(config.patient_store_path, PathBuf::from("/tmp/cura/patients.csv"));
        assert_eq!(config.ledger_store_path, PathBuf::from("/tmp/cura/appointments.json"));
        assert!(config.is_configured());
    }

    #[test]
    fn test_split_list_drops_blanks() {
        assert_eq!(split_list(" Dr. A , ,Dr. B"), vec!["Dr. A", "Dr. B"]);
    }
}
