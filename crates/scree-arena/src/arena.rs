//! The generic generational slot arena.
//!
//! [`SlotArena`] composes a bump region and a generation store into
//! fixed-size slots. `alloc` is a bump-pointer advance plus one
//! generation write; `reset` rewinds the region, bumps the arena
//! generation, and leaves the generation store untouched. Every
//! pre-reset handle goes stale because its generation no longer matches
//! (lazy invalidation), which is what makes reset O(1).

use std::fmt;

use scree_core::{BumpRegion, GenStore};

use crate::gens::VecGenStore;
use crate::handle::SlotHandle;
use crate::region::VecRegion;

/// Slot alignment in bytes. Sufficient for `f64`, the widest value the
/// typed accessors carry.
const SLOT_ALIGN: i32 = 8;

/// A fixed-capacity arena of fixed-size slots with generational handles.
///
/// The arena is generic over its two storage capabilities and
/// monomorphized per backend pairing, so accessor calls are direct. All
/// slots share a single lifetime that ends at [`SlotArena::reset`];
/// there is no individual free.
///
/// # Validity
///
/// A handle `h` is valid iff `0 <= h.slot < len()`, `h.generation`
/// equals the arena's current generation, and the generation store
/// records `h.generation` for that slot. Every accessor checks validity
/// and fails closed (`false`/`None`) on a stale or foreign handle.
pub struct SlotArena<B, G> {
    /// Owned bump region holding slot bytes.
    bump: B,
    /// Owned per-slot generation array.
    gens: G,
    /// Current generation. Starts at 1; bumped once per reset.
    generation: i32,
    /// Slots allocated since the last reset.
    count: i32,
    /// Fixed bytes per slot. At least 1.
    slot_size: i32,
    /// Maximum slots per generation.
    max_slots: i32,
}

impl SlotArena<VecRegion, VecGenStore> {
    /// Create an arena over the managed backends.
    ///
    /// Capacity is `slot_count * slot_size` bytes. Non-positive inputs
    /// or an overflowing product produce a zero-capacity arena whose
    /// `alloc` always returns `None`.
    pub fn new(slot_count: i32, slot_size: i32) -> Self {
        let capacity = if slot_count > 0 && slot_size > 0 {
            slot_count.checked_mul(slot_size)
        } else {
            None
        };
        match capacity {
            Some(capacity) => Self::with_parts(
                VecRegion::new(capacity),
                VecGenStore::new(slot_count),
                slot_count,
                slot_size,
            ),
            None => Self::with_parts(VecRegion::new(0), VecGenStore::new(0), 0, 1),
        }
    }
}

impl<B: BumpRegion, G: GenStore> SlotArena<B, G> {
    /// Create an arena from already-built capabilities.
    ///
    /// `slot_count` is clamped to what the region and generation store
    /// can actually hold: `min(slot_count, capacity / slot_size,
    /// gens.len())`. A non-positive `slot_size` yields a zero-capacity
    /// arena.
    ///
    /// # Panics
    ///
    /// Panics if `bump` has outstanding allocations (`used() != 0`); slot
    /// offsets are computed as `slot * slot_size` from the start of the
    /// region, so a non-empty region would desync every offset.
    pub fn with_parts(bump: B, gens: G, slot_count: i32, slot_size: i32) -> Self {
        assert!(
            bump.used() == 0,
            "bump region must be empty at arena construction (used = {})",
            bump.used()
        );
        let (slot_size, max_slots) = if slot_size > 0 {
            let by_capacity = bump.capacity() / slot_size;
            (slot_size, slot_count.max(0).min(by_capacity).min(gens.len()))
        } else {
            (1, 0)
        };
        Self {
            bump,
            gens,
            generation: 1,
            count: 0,
            slot_size,
            max_slots,
        }
    }

    /// Allocate the next slot.
    ///
    /// Returns `None` when the arena is at `max_slots` or the region is
    /// exhausted. A returned handle is always valid until the next
    /// [`SlotArena::reset`].
    pub fn alloc(&mut self) -> Option<SlotHandle> {
        if self.count >= self.max_slots {
            return None;
        }
        self.bump.alloc(self.slot_size, SLOT_ALIGN)?;
        let slot = self.count;
        self.gens.set(slot, self.generation);
        self.count += 1;
        Some(SlotHandle::new(slot, self.generation))
    }

    /// Whether `handle` refers to a live slot of the current generation.
    pub fn is_valid(&self, handle: SlotHandle) -> bool {
        handle.slot >= 0
            && handle.slot < self.count
            && handle.generation == self.generation
            && self.gens.get(handle.slot) == handle.generation
    }

    /// Byte offset of the slot behind `handle`, or `None` if stale.
    ///
    /// The product cannot overflow: `slot < max_slots` and
    /// `max_slots * slot_size` was bounded by the region capacity at
    /// construction.
    pub fn slot_offset(&self, handle: SlotHandle) -> Option<i32> {
        if self.is_valid(handle) {
            Some(handle.slot * self.slot_size)
        } else {
            None
        }
    }

    /// End the lifetime of every outstanding handle.
    ///
    /// Rewinds the bump region, increments the generation, and zeroes
    /// the live-slot count. The generation store is left untouched;
    /// stale entries are unreachable because their generation no longer
    /// matches. O(1).
    ///
    /// # Panics
    ///
    /// Panics if the generation counter has reached `i32::MAX`: wrapping
    /// would reuse generation values and break stale-handle detection.
    pub fn reset(&mut self) {
        self.bump.reset();
        assert!(
            self.generation != i32::MAX,
            "arena generation counter exhausted (i32::MAX resets reached)"
        );
        self.generation += 1;
        self.count = 0;
    }

    /// Write a little-endian `i32` at `field_off` within the slot.
    ///
    /// Returns `false` for a stale handle or a field offset whose 4-byte
    /// footprint leaves the slot.
    pub fn write_i32(&mut self, handle: SlotHandle, field_off: i32, value: i32) -> bool {
        match self.field_base(handle, field_off, 4) {
            Some(offset) => self.bump.write_i32(offset, value),
            None => false,
        }
    }

    /// Read a little-endian `i32` at `field_off` within the slot.
    pub fn read_i32(&self, handle: SlotHandle, field_off: i32) -> Option<i32> {
        self.bump.read_i32(self.field_base(handle, field_off, 4)?)
    }

    /// Write a little-endian `f64` at `field_off` within the slot.
    ///
    /// Returns `false` for a stale handle or a field offset whose 8-byte
    /// footprint leaves the slot.
    pub fn write_f64(&mut self, handle: SlotHandle, field_off: i32, value: f64) -> bool {
        match self.field_base(handle, field_off, 8) {
            Some(offset) => self.bump.write_f64(offset, value),
            None => false,
        }
    }

    /// Read a little-endian `f64` at `field_off` within the slot.
    pub fn read_f64(&self, handle: SlotHandle, field_off: i32) -> Option<f64> {
        self.bump.read_f64(self.field_base(handle, field_off, 8)?)
    }

    /// Write one byte at `field_off` within the slot.
    pub fn write_u8(&mut self, handle: SlotHandle, field_off: i32, value: u8) -> bool {
        match self.field_base(handle, field_off, 1) {
            Some(offset) => self.bump.write_u8(offset, value),
            None => false,
        }
    }

    /// Read one byte at `field_off` within the slot.
    pub fn read_u8(&self, handle: SlotHandle, field_off: i32) -> Option<u8> {
        self.bump.read_u8(self.field_base(handle, field_off, 1)?)
    }

    /// Resolve a bounded field access to a region offset.
    ///
    /// `None` when the handle is stale or the `width`-byte footprint at
    /// `field_off` leaves the slot. The bounds check never computes
    /// `field_off + width`.
    fn field_base(&self, handle: SlotHandle, field_off: i32, width: i32) -> Option<i32> {
        if field_off < 0 || field_off > self.slot_size - width {
            return None;
        }
        Some(self.slot_offset(handle)? + field_off)
    }

    /// Current arena generation.
    pub fn generation(&self) -> i32 {
        self.generation
    }

    /// Slots allocated since the last reset.
    pub fn len(&self) -> i32 {
        self.count
    }

    /// Whether no slots are allocated in the current generation.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Maximum slots per generation.
    pub fn max_slots(&self) -> i32 {
        self.max_slots
    }

    /// Fixed slot size in bytes.
    pub fn slot_size(&self) -> i32 {
        self.slot_size
    }

    /// Capacity of the underlying region in bytes.
    pub fn capacity(&self) -> i32 {
        self.bump.capacity()
    }

    /// Bytes consumed in the underlying region this generation.
    pub fn used(&self) -> i32 {
        self.bump.used()
    }

    /// Total memory usage of both backing stores in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.bump.memory_bytes() + self.gens.memory_bytes()
    }
}

impl<B: BumpRegion, G: GenStore> fmt::Debug for SlotArena<B, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotArena")
            .field("generation", &self.generation)
            .field("count", &self.count)
            .field("slot_size", &self.slot_size)
            .field("max_slots", &self.max_slots)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena(slot_count: i32, slot_size: i32) -> SlotArena<VecRegion, VecGenStore> {
        SlotArena::new(slot_count, slot_size)
    }

    #[test]
    fn new_arena_is_empty_at_generation_one() {
        let a = arena(4, 16);
        assert_eq!(a.generation(), 1);
        assert_eq!(a.len(), 0);
        assert_eq!(a.used(), 0);
        assert_eq!(a.capacity(), 64);
        assert_eq!(a.max_slots(), 4);
    }

    #[test]
    fn alloc_assigns_monotonic_slot_indices() {
        let mut a = arena(3, 8);
        let h0 = a.alloc().unwrap();
        let h1 = a.alloc().unwrap();
        let h2 = a.alloc().unwrap();
        assert_eq!((h0.slot(), h1.slot(), h2.slot()), (0, 1, 2));
        assert!(a.is_valid(h0) && a.is_valid(h1) && a.is_valid(h2));
    }

    #[test]
    fn alloc_fails_at_max_slots() {
        let mut a = arena(2, 8);
        a.alloc().unwrap();
        a.alloc().unwrap();
        assert!(a.alloc().is_none());
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn reset_invalidates_all_handles() {
        let mut a = arena(2, 8);
        let h = a.alloc().unwrap();
        assert!(a.is_valid(h));
        a.reset();
        assert!(!a.is_valid(h));
        assert!(!a.write_i32(h, 0, 1));
        assert_eq!(a.read_i32(h, 0), None);
        assert_eq!(a.slot_offset(h), None);
    }

    #[test]
    fn reset_restores_empty_state_and_bumps_generation() {
        let mut a = arena(2, 8);
        a.alloc().unwrap();
        let before = a.generation();
        a.reset();
        a.reset();
        assert_eq!(a.generation(), before + 2);
        assert_eq!(a.len(), 0);
        assert_eq!(a.used(), 0);
    }

    #[test]
    fn post_reset_handles_outrank_old_ones() {
        let mut a = arena(2, 8);
        let old = a.alloc().unwrap();
        a.reset();
        let new = a.alloc().unwrap();
        assert!(new.generation() > old.generation());
        assert_eq!(new.slot(), old.slot());
        assert!(a.is_valid(new));
        assert!(!a.is_valid(old));
    }

    #[test]
    fn field_round_trips() {
        let mut a = arena(2, 16);
        let h = a.alloc().unwrap();
        assert!(a.write_i32(h, 0, -123));
        assert!(a.write_f64(h, 8, 0.5));
        assert!(a.write_u8(h, 4, 200));
        assert_eq!(a.read_i32(h, 0), Some(-123));
        assert_eq!(a.read_f64(h, 8), Some(0.5));
        assert_eq!(a.read_u8(h, 4), Some(200));
    }

    #[test]
    fn writes_to_one_slot_leave_others_untouched() {
        let mut a = arena(2, 8);
        let h0 = a.alloc().unwrap();
        let h1 = a.alloc().unwrap();
        assert!(a.write_f64(h0, 0, 1.0));
        assert!(a.write_f64(h1, 0, 2.0));
        assert!(a.write_f64(h0, 0, 9.0));
        assert_eq!(a.read_f64(h1, 0), Some(2.0));
    }

    #[test]
    fn field_offsets_are_bounds_checked() {
        let mut a = arena(1, 8);
        let h = a.alloc().unwrap();
        assert!(!a.write_i32(h, 5, 99));
        assert!(!a.write_i32(h, -1, 0));
        assert!(!a.write_f64(h, 1, 0.0));
        assert!(!a.write_u8(h, 8, 0));
        assert_eq!(a.read_i32(h, -1), None);
        assert_eq!(a.read_f64(h, 1), None);
        assert_eq!(a.read_u8(h, 8), None);
        // Exact-fit footprints are fine.
        assert!(a.write_i32(h, 4, 1));
        assert!(a.write_f64(h, 0, 1.0));
    }

    #[test]
    fn negative_slot_index_is_rejected() {
        let mut a = arena(2, 8);
        a.alloc().unwrap();
        let forged = SlotHandle::new(-1, a.generation());
        assert!(!a.is_valid(forged));
        assert_eq!(a.read_i32(forged, 0), None);
    }

    #[test]
    fn handle_from_another_arena_is_rejected() {
        let mut donor = arena(2, 8);
        let h = donor.alloc().unwrap();
        let fresh = arena(2, 8);
        assert!(!fresh.is_valid(h));
    }

    #[test]
    fn zero_capacity_on_nonpositive_inputs() {
        for (count, size) in [(0, 8), (-1, 8), (4, 0), (4, -2)] {
            let mut a = arena(count, size);
            assert_eq!(a.max_slots(), 0, "slot_count={count} slot_size={size}");
            assert!(a.alloc().is_none());
        }
    }

    #[test]
    fn zero_capacity_on_size_overflow() {
        let mut a = arena(i32::MAX, 2);
        assert_eq!(a.max_slots(), 0);
        assert!(a.alloc().is_none());
    }

    #[test]
    fn with_parts_clamps_max_slots() {
        // Region fits 4 slots, store tracks 8, caller asks for 100.
        let a = SlotArena::with_parts(VecRegion::new(64), VecGenStore::new(8), 100, 16);
        assert_eq!(a.max_slots(), 4);

        // Store is the binding constraint.
        let a = SlotArena::with_parts(VecRegion::new(64), VecGenStore::new(2), 100, 16);
        assert_eq!(a.max_slots(), 2);

        // Negative request clamps to zero.
        let a = SlotArena::with_parts(VecRegion::new(64), VecGenStore::new(8), -1, 16);
        assert_eq!(a.max_slots(), 0);
    }

    #[test]
    #[should_panic(expected = "bump region must be empty")]
    fn with_parts_rejects_dirty_region() {
        let mut region = VecRegion::new(64);
        region.alloc(8, 8).unwrap();
        let _ = SlotArena::with_parts(region, VecGenStore::new(4), 4, 16);
    }

    #[test]
    #[should_panic(expected = "generation counter exhausted")]
    fn reset_panics_at_generation_limit() {
        let mut a = arena(1, 8);
        a.generation = i32::MAX;
        a.reset();
    }

    #[test]
    fn slot_offset_spacing_matches_slot_size() {
        let mut a = arena(3, 16);
        let h0 = a.alloc().unwrap();
        let h1 = a.alloc().unwrap();
        assert_eq!(a.slot_offset(h0), Some(0));
        assert_eq!(a.slot_offset(h1), Some(16));
    }

    #[test]
    fn memory_bytes_sums_both_stores() {
        let a = arena(4, 16);
        // 64 region bytes + 4 * 4 generation bytes.
        assert_eq!(a.memory_bytes(), 64 + 16);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn allocated_handles_stay_valid_until_reset(
                slot_count in 1i32..32,
                allocs in 1usize..64,
            ) {
                let mut a = arena(slot_count, 8);
                let mut handles = Vec::new();
                for _ in 0..allocs {
                    if let Some(h) = a.alloc() {
                        handles.push(h);
                    }
                }
                prop_assert!(a.len() <= a.max_slots());
                prop_assert!(a.used() <= a.capacity());
                for h in &handles {
                    prop_assert!(a.is_valid(*h));
                }
                let before = a.generation();
                a.reset();
                prop_assert_eq!(a.generation(), before + 1);
                prop_assert_eq!(a.len(), 0);
                prop_assert_eq!(a.used(), 0);
                for h in &handles {
                    prop_assert!(!a.is_valid(*h));
                }
            }

            #[test]
            fn i32_fields_round_trip(
                value in any::<i32>(),
                field in 0i32..5,
            ) {
                let mut a = arena(4, 8);
                let h = a.alloc().unwrap();
                prop_assert!(a.write_i32(h, field, value));
                prop_assert_eq!(a.read_i32(h, field), Some(value));
            }

            #[test]
            fn writes_never_leak_across_slots(
                values in proptest::collection::vec(any::<i32>(), 2..8),
            ) {
                let mut a = arena(values.len() as i32, 8);
                let handles: Vec<_> = values.iter().map(|_| a.alloc().unwrap()).collect();
                for (h, v) in handles.iter().zip(&values) {
                    prop_assert!(a.write_i32(*h, 0, *v));
                }
                for (h, v) in handles.iter().zip(&values) {
                    prop_assert_eq!(a.read_i32(*h, 0), Some(*v));
                }
            }
        }
    }
}
