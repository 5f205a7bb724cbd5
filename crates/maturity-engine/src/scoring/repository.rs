use super::answers::SessionId;
use super::record::CalculationRecord;

/// Storage abstraction for calculation records so the service can be exercised in isolation.
///
/// Records are append-only: a newer record for the same session supersedes, never mutates,
/// the previous one. A record may appear more than once in a history when a session returns
/// to earlier answers; `insert` reports `Conflict` only for a record identical to the
/// session's current latest.
pub trait CalculationRepository: Send + Sync {
    fn insert(&self, record: CalculationRecord) -> Result<CalculationRecord, RepositoryError>;
    fn latest(&self, session_id: &SessionId) -> Result<Option<CalculationRecord>, RepositoryError>;
    fn history(&self, session_id: &SessionId) -> Result<Vec<CalculationRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
