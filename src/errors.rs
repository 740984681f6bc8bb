#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("Storage backend unavailable")]
    StorageUnavailable,

    #[error("Storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}
