use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceStoreError {
    #[error("No record found for id {0}")]
    NotFound(String),
    #[error("A record with id {0} already exists")]
    DuplicateId(String),
    #[error("The backing store failed. {0}")]
    StorageError(String),
}
