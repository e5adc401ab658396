//! Live lock-owner tokens backed by random UUIDs.

use uuid::Uuid;

use crate::ports::IdGenerator;

/// Produces a fresh hyphen-free UUID for every lock acquisition.
#[derive(Debug, Default)]
pub struct LiveIdGenerator;

impl IdGenerator for LiveIdGenerator {
    fn generate_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_tokens_are_unique_hex() {
        let first = LiveIdGenerator.generate_id();
        let second = LiveIdGenerator.generate_id();

        assert_ne!(first, second);
        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
