use std::collections::HashMap;

use serde_json::Value;

use crate::error::SchemaError;
use crate::table::{cell_text, Row, Table};

/// One logical column and the header spellings accepted for it.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub key: &'static str,
    pub aliases: &'static [&'static str],
    pub required: bool,
}

impl ColumnSpec {
    pub const fn required(key: &'static str, aliases: &'static [&'static str]) -> Self {
        Self { key, aliases, required: true }
    }

    pub const fn optional(key: &'static str, aliases: &'static [&'static str]) -> Self {
        Self { key, aliases, required: false }
    }
}

/// Declarative mapping from logical keys to the header spellings of a store.
///
/// Headers are compared trimmed, case-insensitively, with `_` and spaces treated alike,
/// so `Member ID`, `member_id` and `MEMBER ID` all resolve to the same alias.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub table: &'static str,
    pub columns: &'static [ColumnSpec],
}

impl TableSchema {
    pub const fn new(table: &'static str, columns: &'static [ColumnSpec]) -> Self {
        Self { table, columns }
    }

    pub fn resolve(&self, headers: &[String]) -> Result<ResolvedColumns, SchemaError> {
        let normalized: Vec<(String, &String)> = headers
            .iter()
            .map(|header| (normalize_header(header), header))
            .collect();

        let mut columns = HashMap::new();
        let mut missing = Vec::new();

        for spec in self.columns {
            let found = spec.aliases.iter().find_map(|alias| {
                let alias = normalize_header(alias);
                normalized
                    .iter()
                    .find(|(header, _)| *header == alias)
                    .map(|(_, original)| (*original).clone())
            });

            match found {
                Some(header) => {
                    columns.insert(spec.key, header);
                }
                None if spec.required => missing.push(spec.key.to_string()),
                None => {}
            }
        }

        if !missing.is_empty() {
            return Err(SchemaError::MissingColumns {
                table: self.table.to_string(),
                missing,
                found: headers.to_vec(),
            });
        }

        Ok(ResolvedColumns { columns })
    }

    /// Resolves columns for a write, first adding a default-spelled header for every
    /// logical column the table does not carry yet.
    pub fn resolve_for_write(&self, table: &mut Table) -> Result<ResolvedColumns, SchemaError> {
        for spec in self.columns {
            let present = spec.aliases.iter().any(|alias| {
                let alias = normalize_header(alias);
                table.columns.iter().any(|header| normalize_header(header) == alias)
            });
            if !present {
                if let Some(default) = spec.aliases.first() {
                    table.ensure_column(default);
                }
            }
        }
        self.resolve(&table.columns)
    }

    /// Header spelling used when a store has to be created from scratch.
    pub fn default_headers(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter_map(|spec| spec.aliases.first().map(|alias| alias.to_string()))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedColumns {
    columns: HashMap<&'static str, String>,
}

impl ResolvedColumns {
    pub fn column(&self, key: &str) -> Option<&str> {
        self.columns.get(key).map(String::as_str)
    }

    pub fn has(&self, key: &str) -> bool {
        self.columns.contains_key(key)
    }

    pub fn text(&self, row: &Row, key: &str) -> Option<String> {
        self.column(key).and_then(|column| cell_text(row, column))
    }

    /// Writes `value` under the header resolved for `key`. Returns false when the
    /// store has no such column.
    pub fn set(&self, row: &mut Row, key: &str, value: impl Into<Value>) -> bool {
        match self.column(key) {
            Some(column) => {
                row.insert(column.to_string(), value.into());
                true
            }
            None => false,
        }
    }
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    const COLUMNS: &[ColumnSpec] = &[
        ColumnSpec::required("doctor", &["Doctor Name", "doctor", "dr"]),
        ColumnSpec::required("date", &["Date"]),
        ColumnSpec::optional("room", &["Room"]),
    ];
    const SCHEDULE: TableSchema = TableSchema::new("schedule", COLUMNS);

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_resolves_case_and_separator_variants() {
        let resolved = SCHEDULE.resolve(&headers(&[" DOCTOR_NAME ", "date"])).unwrap();
        assert_eq!(resolved.column("doctor"), Some(" DOCTOR_NAME "));
        assert_eq!(resolved.column("date"), Some("date"));
        assert!(!resolved.has("room"));
    }

    #[test]
    fn test_earlier_alias_wins() {
        let resolved = SCHEDULE.resolve(&headers(&["dr", "Doctor Name", "Date"])).unwrap();
        assert_eq!(resolved.column("doctor"), Some("Doctor Name"));
    }

    #[test]
    fn test_missing_required_columns_are_listed() {
        let err = SCHEDULE.resolve(&headers(&["Room", "Time"])).unwrap_err();
        assert_matches!(err, SchemaError::MissingColumns { ref missing, .. } if missing == &vec!["doctor".to_string(), "date".to_string()]);
    }

    #[test]
    fn test_set_and_text_use_resolved_header() {
        let resolved = SCHEDULE.resolve(&headers(&["doctor", "Date"])).unwrap();
        let mut row = Row::new();
        assert!(resolved.set(&mut row, "doctor", "Dr. Meena Iyer"));
        assert!(!resolved.set(&mut row, "room", "4B"));
        assert_eq!(row.get("doctor"), Some(&json!("Dr. Meena Iyer")));
        assert_eq!(resolved.text(&row, "doctor").as_deref(), Some("Dr. Meena Iyer"));
    }

    #[test]
    fn test_resolve_for_write_adds_absent_columns() {
        let mut table = Table::new(&["dr", "Date"]);
        let resolved = SCHEDULE.resolve_for_write(&mut table).unwrap();
        assert_eq!(table.columns, headers(&["dr", "Date", "Room"]));
        assert_eq!(resolved.column("doctor"), Some("dr"));
        assert_eq!(resolved.column("room"), Some("Room"));
    }

    #[test]
    fn test_default_headers_use_first_alias() {
        assert_eq!(SCHEDULE.default_headers(), headers(&["Doctor Name", "Date", "Room"]));
    }
}
