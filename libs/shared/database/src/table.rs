use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;

pub type Row = Map<String, Value>;

/// A tabular store snapshot: header order plus rows keyed by header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn ensure_column(&mut self, column: &str) -> bool {
        if self.columns.iter().any(|existing| existing == column) {
            return false;
        }
        self.columns.push(column.to_string());
        true
    }

    /// Appends a row, registering any header the table did not know yet.
    pub fn push_row(&mut self, row: Row) {
        for key in row.keys() {
            if !self.columns.iter().any(|existing| existing == key) {
                self.columns.push(key.clone());
            }
        }
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Reads a cell as trimmed text. Empty strings and nulls read as absent.
pub fn cell_text(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A persisted table. Every `save` is write-through.
#[async_trait]
pub trait TableStore: Send + Sync {
    fn name(&self) -> &str;

    /// Fails with [`StoreError::Missing`] when the store does not exist yet.
    async fn load(&self) -> Result<Table, StoreError>;

    async fn save(&self, table: &Table) -> Result<(), StoreError>;

    async fn load_or_create(&self, columns: &[String]) -> Result<Table, StoreError> {
        match self.load().await {
            Err(e) if e.is_missing() => Ok(Table::new(columns)),
            other => other,
        }
    }
}

async fn read_store(name: &str, path: &Path) -> Result<Vec<u8>, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::Missing {
            store: name.to_string(),
            location: path.display().to_string(),
        }),
        Err(source) => Err(StoreError::Io {
            store: name.to_string(),
            source,
        }),
    }
}

/// Writes through a sibling `.tmp` file and renames it over `path`, so readers
/// never see a half-written table.
async fn write_store(name: &str, path: &Path, body: Vec<u8>) -> Result<(), StoreError> {
    let io_error = |source| StoreError::Io {
        store: name.to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
    }

    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, body).await.map_err(io_error)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(io_error)?;
    Ok(())
}

/// Picks a file backend from the extension: `.json` is a JSON document,
/// anything else is read as comma-delimited rows.
pub fn open_file_table(name: impl Into<String>, path: impl Into<PathBuf>) -> Arc<dyn TableStore> {
    let path = path.into();
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        Arc::new(JsonFileTable::new(name, path))
    } else {
        Arc::new(CsvFileTable::new(name, path))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TableDocument {
    Framed(Table),
    Rows(Vec<Row>),
}

/// JSON document store. Accepts both `{"columns": [...], "rows": [...]}` and a bare
/// array of row objects; always writes the framed form.
pub struct JsonFileTable {
    name: String,
    path: PathBuf,
}

impl JsonFileTable {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TableStore for JsonFileTable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> Result<Table, StoreError> {
        let bytes = read_store(&self.name, &self.path).await?;

        let document: TableDocument =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Malformed {
                store: self.name.clone(),
                message: e.to_string(),
            })?;

        let table = match document {
            TableDocument::Framed(table) => table,
            TableDocument::Rows(rows) => {
                let mut table = Table::default();
                for row in rows {
                    table.push_row(row);
                }
                table
            }
        };

        debug!("Loaded {} rows from {}", table.len(), self.name);
        Ok(table)
    }

    async fn save(&self, table: &Table) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(table).map_err(|e| StoreError::WriteFailed {
            store: self.name.clone(),
            message: e.to_string(),
        })?;
        write_store(&self.name, &self.path, body).await?;

        debug!("Saved {} rows to {}", table.len(), self.name);
        Ok(())
    }
}

/// Comma-delimited store with a header row. Every cell reads back as text;
/// rows shorter than the header simply lack the trailing columns.
pub struct CsvFileTable {
    name: String,
    path: PathBuf,
}

impl CsvFileTable {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn malformed(&self, error: csv::Error) -> StoreError {
        StoreError::Malformed {
            store: self.name.clone(),
            message: error.to_string(),
        }
    }

    fn encode(&self, table: &Table) -> Result<Vec<u8>, StoreError> {
        let write_failed = |message: String| StoreError::WriteFailed {
            store: self.name.clone(),
            message,
        };

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(&table.columns)
            .map_err(|e| write_failed(e.to_string()))?;
        for row in &table.rows {
            let record: Vec<String> = table
                .columns
                .iter()
                .map(|column| match row.get(column) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                })
                .collect();
            writer
                .write_record(&record)
                .map_err(|e| write_failed(e.to_string()))?;
        }
        writer.into_inner().map_err(|e| write_failed(e.to_string()))
    }
}

#[async_trait]
impl TableStore for CsvFileTable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> Result<Table, StoreError> {
        let bytes = read_store(&self.name, &self.path).await?;

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(bytes.as_slice());
        let headers = reader.headers().map_err(|e| self.malformed(e))?.clone();
        let names: Vec<&str> = headers.iter().map(str::trim).collect();
        let mut table = Table::new(names.as_slice());

        for record in reader.records() {
            let record = record.map_err(|e| self.malformed(e))?;
            let row: Row = table
                .columns
                .iter()
                .zip(record.iter())
                .map(|(column, value)| (column.clone(), Value::String(value.to_string())))
                .collect();
            table.rows.push(row);
        }

        debug!("Loaded {} rows from {}", table.len(), self.name);
        Ok(table)
    }

    async fn save(&self, table: &Table) -> Result<(), StoreError> {
        let body = self.encode(table)?;
        write_store(&self.name, &self.path, body).await?;

        debug!("Saved {} rows to {}", table.len(), self.name);
        Ok(())
    }
}

/// In-process table, used by tests and as a scratch store.
pub struct MemoryTable {
    name: String,
    table: RwLock<Option<Table>>,
    fail_writes: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryTable {
    /// A store that does not exist yet.
    pub fn missing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: RwLock::new(None),
            fail_writes: AtomicBool::new(false),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn with_table(name: impl Into<String>, table: Table) -> Self {
        Self {
            name: name.into(),
            table: RwLock::new(Some(table)),
            fail_writes: AtomicBool::new(false),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> Option<Table> {
        self.table.read().await.clone()
    }
}

#[async_trait]
impl TableStore for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> Result<Table, StoreError> {
        self.table
            .read()
            .await
            .clone()
            .ok_or_else(|| StoreError::Missing {
                store: self.name.clone(),
                location: "memory".to_string(),
            })
    }

    async fn save(&self, table: &Table) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed {
                store: self.name.clone(),
                message: "store is read-only".to_string(),
            });
        }
        *self.table.write().await = Some(table.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_cell_text_trims_and_skips_blank() {
        let r = row(json!({"a": "  x ", "b": "   ", "c": 42, "d": null}));
        assert_eq!(cell_text(&r, "a").as_deref(), Some("x"));
        assert_eq!(cell_text(&r, "b"), None);
        assert_eq!(cell_text(&r, "c").as_deref(), Some("42"));
        assert_eq!(cell_text(&r, "d"), None);
        assert_eq!(cell_text(&r, "missing"), None);
    }

    #[test]
    fn test_push_row_registers_new_headers() {
        let mut table = Table::new(&["Name"]);
        table.push_row(row(json!({"Name": "A", "Email": "a@x.io"})));
        assert_eq!(table.columns, vec!["Name".to_string(), "Email".to_string()]);
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_json_file_table_missing_then_saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileTable::new("patients", dir.path().join("nested/patients.json"));

        assert_matches!(store.load().await, Err(StoreError::Missing { .. }));

        let mut table = store.load_or_create(&["Name".to_string()]).await.unwrap();
        table.push_row(row(json!({"Name": "Priya Sharma"})));
        store.save(&table).await.unwrap();

        let reloaded = store.load().await.unwrap();
        assert_eq!(reloaded, table);
    }

    #[tokio::test]
    async fn test_json_file_table_accepts_bare_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedule.json");
        std::fs::write(&path, r#"[{"Doctor Name": "Dr. X", "Status": "Available"}]"#).unwrap();

        let table = JsonFileTable::new("schedule", &path).load().await.unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.columns.contains(&"Doctor Name".to_string()));
    }

    #[tokio::test]
    async fn test_json_file_table_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "not json").unwrap();

        assert_matches!(
            JsonFileTable::new("broken", &path).load().await,
            Err(StoreError::Malformed { .. })
        );
    }

    #[tokio::test]
    async fn test_csv_file_table_reads_delimited_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patients.csv");
        std::fs::write(
            &path,
            "Full Name, DOB ,Location\nKishore Kumar K,1990-03-12,\"Bangalore, KA\"\nPriya Sharma,05-11-1988\n",
        )
        .unwrap();

        let table = CsvFileTable::new("patients", &path).load().await.unwrap();

        assert_eq!(table.columns, vec!["Full Name", "DOB", "Location"]);
        assert_eq!(table.len(), 2);
        assert_eq!(cell_text(&table.rows[0], "Location").as_deref(), Some("Bangalore, KA"));
        assert_eq!(cell_text(&table.rows[1], "DOB").as_deref(), Some("05-11-1988"));
        assert!(table.rows[1].get("Location").is_none());
    }

    #[tokio::test]
    async fn test_csv_file_table_saves_every_column() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvFileTable::new("patients", dir.path().join("patients.csv"));
        assert_matches!(store.load().await, Err(StoreError::Missing { .. }));

        let mut table = Table::new(&["Name", "DOB"]);
        table.push_row(row(json!({"Name": "Anita Rao", "DOB": "05-07-1988"})));
        table.push_row(row(json!({"Name": "Ravi, Jr.", "Visits": 2})));
        store.save(&table).await.unwrap();

        let reloaded = store.load().await.unwrap();
        assert_eq!(reloaded.columns, vec!["Name", "DOB", "Visits"]);
        assert_eq!(cell_text(&reloaded.rows[1], "Name").as_deref(), Some("Ravi, Jr."));
        assert_eq!(cell_text(&reloaded.rows[1], "DOB"), None);
        assert_eq!(cell_text(&reloaded.rows[1], "Visits").as_deref(), Some("2"));
    }

    #[test]
    fn test_open_file_table_picks_backend_by_extension() {
        assert_eq!(open_file_table("ledger", "data/appointments.JSON").name(), "ledger");
        let store = open_file_table("patients", "data/patients.csv");
        assert_eq!(store.name(), "patients");
    }

    #[tokio::test]
    async fn test_memory_table_write_failure() {
        let store = MemoryTable::with_table("ledger", Table::new(&["Status"]));
        store.set_fail_writes(true);
        assert_matches!(
            store.save(&Table::default()).await,
            Err(StoreError::WriteFailed { .. })
        );
        assert_eq!(store.save_count(), 0);
    }
}
