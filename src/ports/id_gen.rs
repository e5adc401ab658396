//! ID generator port for producing unique identifiers.

/// Generates unique identifiers.
///
/// Used for lock-owner tokens so a lock marker can be traced back to the
/// process that wrote it.
pub trait IdGenerator: Send + Sync {
    /// Generates a new unique identifier string.
    fn generate_id(&self) -> String;
}
