pub mod error;
pub mod schema;
pub mod table;

pub use error::{SchemaError, StoreError};
pub use schema::{ColumnSpec, ResolvedColumns, TableSchema};
pub use table::{
    cell_text, open_file_table, CsvFileTable, JsonFileTable, MemoryTable, Row, Table, TableStore,
};
