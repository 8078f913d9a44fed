use serde_json::{json, Value};
use tempfile::TempDir;

use shared_config::AppConfig;
use shared_database::{Row, Table};

pub const PATIENT_HEADERS: [&str; 8] = [
    "Name",
    "DOB",
    "Location",
    "Insurance Carrier",
    "Member ID",
    "Group Number",
    "Email",
    "Phone",
];

pub const SCHEDULE_HEADERS: [&str; 4] = ["Doctor Name", "Date", "Time Slot", "Status"];

/// Config whose stores all live in a private temp directory.
pub struct TestConfig {
    pub dir: TempDir,
    pub config: AppConfig,
}

impl TestConfig {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = AppConfig::with_data_dir(dir.path());
        Self { dir, config }
    }
}

impl Default for TestConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub fn row(value: Value) -> Row {
    value.as_object().cloned().unwrap_or_default()
}

pub fn patient_row(name: &str, dob: &str, location: &str) -> Row {
    row(json!({
        "Name": name,
        "DOB": dob,
        "Location": location,
        "Insurance Carrier": "Star Health",
        "Member ID": "MEM-1001",
        "Group Number": "GRP-77",
        "Email": "",
        "Phone": "",
    }))
}

/// Patient store with the given `(name, dob)` rows.
pub fn patient_table(patients: &[(&str, &str)]) -> Table {
    let mut table = Table::new(&PATIENT_HEADERS);
    for (name, dob) in patients {
        table.push_row(patient_row(name, dob, "Bangalore"));
    }
    table
}

pub fn slot_row(doctor: &str, date: &str, time: &str, status: &str) -> Row {
    row(json!({
        "Doctor Name": doctor,
        "Date": date,
        "Time Slot": time,
        "Status": status,
    }))
}

/// Schedule store with the given `(doctor, date, time, status)` rows, in order.
pub fn schedule_table(slots: &[(&str, &str, &str, &str)]) -> Table {
    let mut table = Table::new(&SCHEDULE_HEADERS);
    for (doctor, date, time, status) in slots {
        table.push_row(slot_row(doctor, date, time, status));
    }
    table
}

/// A morning and afternoon day for one doctor, every slot open.
pub fn open_day(doctor: &str, date: &str) -> Table {
    let times = [
        "10:00-10:30",
        "10:30-11:00",
        "11:00-11:30",
        "02:00-02:30",
        "02:30-03:00",
        "03:00-03:30",
    ];
    let slots: Vec<(&str, &str, &str, &str)> = times
        .iter()
        .map(|time| (doctor, date, *time, "Available"))
        .collect();
    schedule_table(&slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_tables_keep_store_order() {
        let table = open_day("Dr. Meena Iyer", "08-09-2025");
        assert_eq!(table.len(), 6);
        assert_eq!(table.columns, SCHEDULE_HEADERS.map(String::from).to_vec());
        assert_eq!(table.rows[3].get("Time Slot"), Some(&json!("02:00-02:30")));
    }

    #[test]
    fn test_temp_config_points_into_temp_dir() {
        let test_config = TestConfig::new();
        assert!(test_config.config.patient_store_path.starts_with(test_config.dir.path()));
    }
}
