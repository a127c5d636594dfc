//! Entity id allocation.
//!
//! Ids start at 1 and grow monotonically. Released ids go to a pool and are
//! handed out again most-recent-first. The world only releases an id after
//! its quarantine delay has passed, so a stale reference taken just before
//! a destroy never resolves to a newborn.

/// Entity identifier. 0 is never allocated.
pub type EntityId = u32;

/// Monotonic id allocator with a reuse pool.
#[derive(Clone, Debug)]
pub struct IdAllocator {
    next: EntityId,
    free: Vec<EntityId>,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    /// Create an allocator whose first id is 1.
    pub fn new() -> Self {
        Self { next: 1, free: Vec::new() }
    }

    /// Allocate an id, reusing the most recently released one if any.
    pub fn allocate(&mut self) -> EntityId {
        if let Some(id) = self.free.pop() {
            return id;
        }
        let id = self.next;
        self.next = self.next.wrapping_add(1).max(1);
        id
    }

    /// Return an id to the pool. Ids never handed out are ignored.
    pub fn release(&mut self, id: EntityId) -> bool {
        if id == 0 || id >= self.next {
            return false;
        }
        self.free.push(id);
        true
    }

    /// Number of ids currently handed out.
    pub fn in_use(&self) -> usize {
        (self.next as usize - 1).saturating_sub(self.free.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_one() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.allocate(), 1);
        assert_eq!(ids.allocate(), 2);
        assert_eq!(ids.in_use(), 2);
    }

    #[test]
    fn test_release_and_reuse() {
        let mut ids = IdAllocator::new();
        let a = ids.allocate();
        let b = ids.allocate();
        assert!(ids.release(a));
        assert!(ids.release(b));
        assert_eq!(ids.allocate(), b);
        assert_eq!(ids.allocate(), a);
        assert_eq!(ids.allocate(), 3);
    }

    #[test]
    fn test_release_unknown_id_ignored() {
        let mut ids = IdAllocator::new();
        ids.allocate();
        assert!(!ids.release(0));
        assert!(!ids.release(7));
        assert_eq!(ids.allocate(), 2);
    }
}
