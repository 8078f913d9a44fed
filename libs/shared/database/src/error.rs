use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("{table} is missing columns {missing:?}. Found: {found:?}")]
    MissingColumns {
        table: String,
        missing: Vec<String>,
        found: Vec<String>,
    },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{store} not found at {location}")]
    Missing { store: String, location: String },

    #[error("I/O error on {store}: {source}")]
    Io {
        store: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{store} is malformed: {message}")]
    Malformed { store: String, message: String },

    #[error("write to {store} failed: {message}")]
    WriteFailed { store: String, message: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl StoreError {
    pub fn is_missing(&self) -> bool {
        matches!(self, StoreError::Missing { .. })
    }
}
