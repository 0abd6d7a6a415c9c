/// A durable write failed.
///
/// The arena never rolls back in-memory state because of one of these;
/// the queue logs it and moves on.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// The store could not be reached (network, pool exhausted, ...).
    #[error("persistence backend unavailable: {0}")]
    Unavailable(String),

    /// The store refused the write (constraint violation, bad data, ...).
    #[error("persistence write rejected: {0}")]
    Rejected(String),
}
