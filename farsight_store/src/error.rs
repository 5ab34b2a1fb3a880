#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("found {count} rows in '{table}' for key {key}")]
    DuplicateRows {
        table: &'static str,
        key: String,
        count: usize,
    },

    #[error("store schema version {found} is newer than supported version {supported}")]
    SchemaFromTheFuture { found: i64, supported: i64 },

    #[error("no migration step from schema version {from}")]
    UnsupportedMigration { from: i64 },

    #[error("bundled type dataset is corrupt: {0}")]
    TypeDataset(String),
}
