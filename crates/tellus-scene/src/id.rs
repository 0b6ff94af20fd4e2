//! Process-wide entity id sequence.

use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_ENTITY_ID: AtomicU32 = AtomicU32::new(0);

/// Unique id minted at entity construction.
///
/// Ids come from one process-wide counter, so two live entities never share
/// an id regardless of which buffers they ship into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(u32);

impl EntityId {
    /// Mint the next id in the sequence.
    pub fn next() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw sequence number.
    pub fn raw(self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let a = EntityId::next();
        let b = EntityId::next();
        let c = EntityId::next();
        assert!(a < b && b < c);
        assert_ne!(a, c);
    }
}
