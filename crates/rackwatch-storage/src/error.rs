/// Errors that can occur within the storage layer.
///
/// Store methods on `MonitorStore` return `anyhow::Result` at the seam;
/// the variants here give the recurring failure shapes a stable type so
/// callers can match on them when it matters.
///
/// # Examples
///
/// ```rust
/// use rackwatch_storage::error::StorageError;
///
/// let err = StorageError::NotFound {
///     entity: "alert_record",
///     id: "alert-42".to_string(),
/// };
/// assert!(err.to_string().contains("alert_record"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A required record was not found in the database.
    #[error("Storage: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// An insert lost an insert race and the winning row could not be
    /// read back, which should be unreachable given the unique indexes.
    #[error("Storage: insert of {entity} raced but the winning row could not be read back")]
    InsertReadback { entity: &'static str },

    /// A stored enum column held a value no variant matches.
    #[error("Storage: invalid value in column '{column}': {value}")]
    InvalidColumnValue { column: &'static str, value: String },
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
