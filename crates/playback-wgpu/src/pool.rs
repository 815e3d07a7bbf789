//! Fixed-size pool of reusable frame slots
//!
//! The pool is an arena of pre-allocated slot resources (GPU render targets in the
//! player, plain values in tests) indexed by [`SlotId`]. Two index sequences track
//! membership: `ready` holds filled slots in ascending timestamp order and `free`
//! holds slots available for the next decoded image. Every slot is in exactly one of
//! the two at any observable point; a slot taken with [`FramePool::acquire_free`] is
//! held by a [`SlotLease`] that either publishes it or hands it back on drop.

use std::collections::VecDeque;

/// Number of frame slots used when nothing else is configured
pub const DEFAULT_SLOT_COUNT: usize = 5;

/// Index of a slot inside its [`FramePool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(usize);

impl SlotId {
    /// Position of the slot in the pool's arena
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct FrameSlot<S> {
    resource: S,
    /// Presentation time in milliseconds, `None` while the slot is free
    timestamp: Option<u64>,
}

/// A bounded set of frame slots split into ready and free sequences
#[derive(Debug)]
pub struct FramePool<S> {
    slots: Vec<FrameSlot<S>>,
    ready: VecDeque<SlotId>,
    free: Vec<SlotId>,
}

impl<S> FramePool<S> {
    /// Creates a pool owning the given slot resources, all of them free
    pub fn new(resources: impl IntoIterator<Item = S>) -> Self {
        let slots: Vec<_> = resources.into_iter().map(|resource| FrameSlot { resource, timestamp: None }).collect();
        // Reversed so that `acquire_free` hands out slot 0 first
        let free = (0..slots.len()).rev().map(SlotId).collect();

        Self {
            ready: VecDeque::with_capacity(slots.len()),
            slots,
            free,
        }
    }

    /// Total number of slots, fixed at construction
    pub fn total(&self) -> usize {
        self.slots.len()
    }

    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Takes one slot out of the free sequence
    ///
    /// Returns `None` when the pool is exhausted; the pool never blocks and never
    /// grows. Call [`reclaim_consumed`](Self::reclaim_consumed) before retrying.
    pub fn acquire_free(&mut self) -> Option<SlotLease<'_, S>> {
        let id = self.free.pop()?;
        Some(SlotLease { pool: self, id, published: false })
    }

    /// Returns stale ready slots to the free sequence
    ///
    /// Every ready slot with a timestamp at or before `now` is freed, except the most
    /// recent such slot, which stays ready as the frame currently on display. Nothing
    /// is reclaimed while no ready slot is displayable yet.
    ///
    /// # Returns
    /// The number of slots moved to the free sequence
    pub fn reclaim_consumed(&mut self, now: u64) -> usize {
        let stale = self.displayable_count(now).saturating_sub(1);

        for id in self.ready.drain(..stale) {
            self.slots[id.0].timestamp = None;
            self.free.push(id);
        }

        stale
    }

    /// The latest ready slot whose timestamp does not exceed `now`
    pub fn current_for(&self, now: u64) -> Option<SlotId> {
        match self.displayable_count(now) {
            0 => None,
            count => Some(self.ready[count - 1]),
        }
    }

    /// Timestamp of the newest ready slot
    pub fn newest_timestamp(&self) -> Option<u64> {
        self.ready.back().and_then(|id| self.slots[id.0].timestamp)
    }

    /// Timestamp assigned to a slot, `None` while it is free
    pub fn timestamp(&self, id: SlotId) -> Option<u64> {
        self.slots[id.0].timestamp
    }

    /// Borrows the resource behind a slot
    pub fn resource(&self, id: SlotId) -> &S {
        &self.slots[id.0].resource
    }

    /// Iterates the ready sequence, oldest first
    pub fn ready(&self) -> impl Iterator<Item = (SlotId, u64)> + '_ {
        self.ready.iter().map(|id| (*id, self.slots[id.0].timestamp.unwrap_or_default()))
    }

    /// Iterates the free sequence in no particular order
    pub fn free(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.free.iter().copied()
    }

    /// Number of leading ready slots with a timestamp at or before `now`
    fn displayable_count(&self, now: u64) -> usize {
        self.ready.partition_point(|id| self.slots[id.0].timestamp.is_some_and(|t| t <= now))
    }

    fn publish(&mut self, id: SlotId, timestamp: u64) {
        self.slots[id.0].timestamp = Some(timestamp);

        // Decode order normally appends at the tail; the search only matters for
        // sources that emit a timestamp behind the newest ready frame.
        let position = self.ready.partition_point(|ready| self.slots[ready.0].timestamp.is_some_and(|t| t <= timestamp));
        self.ready.insert(position, id);
    }
}

/// A free slot checked out of its pool
///
/// The lease borrows the pool mutably, so pool membership cannot be observed while a
/// slot is out. [`publish`](Self::publish) moves the slot into the ready sequence;
/// dropping the lease unpublished puts it back into the free sequence.
#[derive(Debug)]
pub struct SlotLease<'a, S> {
    pool: &'a mut FramePool<S>,
    id: SlotId,
    published: bool,
}

impl<S> SlotLease<'_, S> {
    pub fn id(&self) -> SlotId {
        self.id
    }

    /// The slot's resource, for the conversion stage to write into
    pub fn resource(&self) -> &S {
        &self.pool.slots[self.id.0].resource
    }

    /// Stamps the slot and inserts it into the ready sequence
    pub fn publish(mut self, timestamp: u64) -> SlotId {
        self.published = true;
        self.pool.publish(self.id, timestamp);
        self.id
    }
}

impl<S> Drop for SlotLease<'_, S> {
    fn drop(&mut self) {
        if !self.published {
            self.pool.free.push(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Checks the pool invariants: full coverage, disjoint sequences, ordered ready
    fn assert_pool_invariants<S>(pool: &FramePool<S>) {
        assert_eq!(pool.ready_len() + pool.free_len(), pool.total(), "ready and free must cover every slot");

        let mut seen = vec![false; pool.total()];
        for id in pool.ready().map(|(id, _)| id).chain(pool.free()) {
            assert!(!seen[id.index()], "slot {} appears in both sequences", id.index());
            seen[id.index()] = true;
        }

        let timestamps: Vec<_> = pool.ready().map(|(_, t)| t).collect();
        assert!(timestamps.windows(2).all(|w| w[0] <= w[1]), "ready sequence out of order: {timestamps:?}");
    }

    fn pool_with_ready(timestamps: &[u64]) -> FramePool<()> {
        let mut pool = FramePool::new(vec![(); DEFAULT_SLOT_COUNT]);
        for &timestamp in timestamps {
            pool.acquire_free().unwrap().publish(timestamp);
        }
        pool
    }

    #[test]
    fn test_new_pool_is_all_free() {
        let pool = FramePool::new(vec![(); DEFAULT_SLOT_COUNT]);

        assert_pool_invariants(&pool);
        assert_eq!(pool.free_len(), DEFAULT_SLOT_COUNT);
        assert_eq!(pool.ready_len(), 0);
        assert_eq!(pool.current_for(u64::MAX), None);
        assert_eq!(pool.newest_timestamp(), None);
    }

    #[test]
    fn test_reclaim_keeps_latest_displayable() {
        let mut pool = pool_with_ready(&[10, 20, 30]);

        let reclaimed = pool.reclaim_consumed(25);

        assert_pool_invariants(&pool);
        assert_eq!(reclaimed, 1);
        assert_eq!(pool.ready().map(|(_, t)| t).collect::<Vec<_>>(), vec![20, 30]);
        assert_eq!(pool.free_len(), 3);
    }

    #[test]
    fn test_reclaim_before_anything_is_displayable() {
        let mut pool = pool_with_ready(&[10, 20, 30]);

        assert_eq!(pool.reclaim_consumed(5), 0);
        assert_eq!(pool.ready_len(), 3);
        assert_pool_invariants(&pool);
    }

    #[test]
    fn test_reclaim_with_everything_in_the_past() {
        let mut pool = pool_with_ready(&[10, 20, 30, 40, 50]);

        assert_eq!(pool.reclaim_consumed(1_000), 4);
        assert_eq!(pool.ready().map(|(_, t)| t).collect::<Vec<_>>(), vec![50]);
        assert_pool_invariants(&pool);
    }

    #[test]
    fn test_reclaimed_slot_has_no_timestamp() {
        let mut pool = pool_with_ready(&[10, 20]);
        let oldest = pool.current_for(10).unwrap();

        pool.reclaim_consumed(20);

        assert_eq!(pool.timestamp(oldest), None);
    }

    #[test]
    fn test_current_for_selection() {
        let pool = pool_with_ready(&[20, 30]);

        assert_eq!(pool.current_for(25).and_then(|id| pool.timestamp(id)), Some(20));
        assert_eq!(pool.current_for(15), None);
        assert_eq!(pool.current_for(30).and_then(|id| pool.timestamp(id)), Some(30));
    }

    #[test]
    fn test_exhausted_pool_returns_none() {
        let mut pool = pool_with_ready(&[100, 200, 300, 400, 500]);

        assert!(pool.acquire_free().is_none());
        // Nothing is at or before now, so nothing can be reclaimed either
        assert_eq!(pool.reclaim_consumed(50), 0);
        assert!(pool.acquire_free().is_none());
        assert_eq!(pool.ready_len(), DEFAULT_SLOT_COUNT);
        assert_pool_invariants(&pool);
    }

    #[test]
    fn test_dropped_lease_returns_slot() {
        let mut pool = FramePool::new(vec![(); 2]);

        let id = {
            let lease = pool.acquire_free().unwrap();
            lease.id()
        };

        assert_pool_invariants(&pool);
        assert_eq!(pool.free_len(), 2);
        assert!(pool.free().any(|free| free == id));
    }

    #[test]
    fn test_lease_exposes_resource() {
        let mut pool = FramePool::new(vec!["a", "b"]);

        let lease = pool.acquire_free().unwrap();
        assert_eq!(lease.id().index(), 0);
        assert_eq!(*lease.resource(), "a");
        let id = lease.publish(7);

        assert_eq!(*pool.resource(id), "a");
        assert_eq!(pool.timestamp(id), Some(7));
    }

    #[test]
    fn test_out_of_order_publish_keeps_ready_sorted() {
        let mut pool = pool_with_ready(&[10, 30]);

        pool.acquire_free().unwrap().publish(20);
        pool.acquire_free().unwrap().publish(30);

        assert_pool_invariants(&pool);
        assert_eq!(pool.ready().map(|(_, t)| t).collect::<Vec<_>>(), vec![10, 20, 30, 30]);
    }

    #[test]
    fn test_invariants_hold_over_a_playback_sequence() {
        let mut pool = FramePool::new(vec![(); DEFAULT_SLOT_COUNT]);
        let mut next_timestamp = 0;

        for now in (0..2_000).step_by(16) {
            while pool.newest_timestamp().is_none_or(|newest| newest <= now) {
                if pool.free_len() == 0 {
                    pool.reclaim_consumed(now);
                }
                let Some(lease) = pool.acquire_free() else { break };
                lease.publish(next_timestamp);
                next_timestamp += 40;
                assert_pool_invariants(&pool);
            }

            let current = pool.current_for(now).and_then(|id| pool.timestamp(id));
            assert!(current.is_some_and(|t| t <= now));
        }
    }
}
