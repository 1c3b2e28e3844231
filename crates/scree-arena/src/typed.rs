//! Typed single-value arenas over the generic slot arena.
//!
//! Each arena fixes its slot size to the element's serialized size and
//! exposes whole-value `alloc`/`get`/`set`. The built-in arenas write
//! through the bump region's typed accessors directly, with no
//! intermediate byte buffer. [`StorableArena`] is the extension vehicle for
//! user-defined records: it pays one scratch copy per operation in
//! exchange for working with any [`Storable`] type.
//!
//! Allocation writes the initial value into the fresh slot. The bump
//! region guarantees that writes inside a freshly allocated slot succeed,
//! so a failure there is a backend contract violation and panics rather
//! than returning an error the caller could do nothing sensible with.

use std::marker::PhantomData;

use scree_core::{AudioFrame, BumpRegion, GenStore, Storable};

use crate::arena::SlotArena;
use crate::gens::VecGenStore;
use crate::handle::TypedHandle;
use crate::region::VecRegion;

/// Panic message for a write that the post-alloc guarantee forbids to fail.
const BROKEN_REGION: &str = "bump region rejected a write inside a freshly allocated slot";

/// An arena of `f64` values.
pub struct F64Arena<B = VecRegion, G = VecGenStore> {
    inner: SlotArena<B, G>,
}

impl F64Arena {
    /// Create an arena holding up to `slot_count` values over the
    /// managed backends.
    pub fn new(slot_count: i32) -> Self {
        Self {
            inner: SlotArena::new(slot_count, 8),
        }
    }
}

impl<B: BumpRegion, G: GenStore> F64Arena<B, G> {
    /// Create an arena from already-built capabilities.
    ///
    /// # Panics
    ///
    /// Panics if `bump` is not empty (see [`SlotArena::with_parts`]).
    pub fn with_parts(bump: B, gens: G, slot_count: i32) -> Self {
        Self {
            inner: SlotArena::with_parts(bump, gens, slot_count, 8),
        }
    }

    /// Allocate a slot holding `value`.
    ///
    /// Returns `None` at capacity.
    pub fn alloc(&mut self, value: f64) -> Option<TypedHandle<f64>> {
        let h = self.inner.alloc()?;
        assert!(self.inner.write_f64(h, 0, value), "{BROKEN_REGION}");
        Some(TypedHandle::new(h))
    }

    /// Read the value behind `handle`. `None` if stale.
    pub fn get(&self, handle: TypedHandle<f64>) -> Option<f64> {
        self.inner.read_f64(handle.raw(), 0)
    }

    /// Overwrite the value behind `handle`. `false` if stale.
    pub fn set(&mut self, handle: TypedHandle<f64>, value: f64) -> bool {
        self.inner.write_f64(handle.raw(), 0, value)
    }

    /// Whether `handle` is live in the current generation.
    pub fn is_valid(&self, handle: TypedHandle<f64>) -> bool {
        self.inner.is_valid(handle.raw())
    }

    /// Invalidate every outstanding handle. O(1).
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Values allocated since the last reset.
    pub fn len(&self) -> i32 {
        self.inner.len()
    }

    /// Whether no values are allocated in the current generation.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Maximum values per generation.
    pub fn max_slots(&self) -> i32 {
        self.inner.max_slots()
    }
}

/// An arena of `i32` values.
pub struct I32Arena<B = VecRegion, G = VecGenStore> {
    inner: SlotArena<B, G>,
}

impl I32Arena {
    /// Create an arena holding up to `slot_count` values over the
    /// managed backends.
    pub fn new(slot_count: i32) -> Self {
        Self {
            inner: SlotArena::new(slot_count, 4),
        }
    }
}

impl<B: BumpRegion, G: GenStore> I32Arena<B, G> {
    /// Create an arena from already-built capabilities.
    ///
    /// # Panics
    ///
    /// Panics if `bump` is not empty (see [`SlotArena::with_parts`]).
    pub fn with_parts(bump: B, gens: G, slot_count: i32) -> Self {
        Self {
            inner: SlotArena::with_parts(bump, gens, slot_count, 4),
        }
    }

    /// Allocate a slot holding `value`. `None` at capacity.
    pub fn alloc(&mut self, value: i32) -> Option<TypedHandle<i32>> {
        let h = self.inner.alloc()?;
        assert!(self.inner.write_i32(h, 0, value), "{BROKEN_REGION}");
        Some(TypedHandle::new(h))
    }

    /// Read the value behind `handle`. `None` if stale.
    pub fn get(&self, handle: TypedHandle<i32>) -> Option<i32> {
        self.inner.read_i32(handle.raw(), 0)
    }

    /// Overwrite the value behind `handle`. `false` if stale.
    pub fn set(&mut self, handle: TypedHandle<i32>, value: i32) -> bool {
        self.inner.write_i32(handle.raw(), 0, value)
    }

    /// Whether `handle` is live in the current generation.
    pub fn is_valid(&self, handle: TypedHandle<i32>) -> bool {
        self.inner.is_valid(handle.raw())
    }

    /// Invalidate every outstanding handle. O(1).
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Values allocated since the last reset.
    pub fn len(&self) -> i32 {
        self.inner.len()
    }

    /// Whether no values are allocated in the current generation.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Maximum values per generation.
    pub fn max_slots(&self) -> i32 {
        self.inner.max_slots()
    }
}

/// An arena of stereo [`AudioFrame`] records.
///
/// Each 16-byte slot holds `left` at offset 0 and `right` at offset 8;
/// both samples are written and read as two direct `f64` accesses.
pub struct AudioArena<B = VecRegion, G = VecGenStore> {
    inner: SlotArena<B, G>,
}

impl AudioArena {
    /// Create an arena holding up to `slot_count` frames over the
    /// managed backends.
    pub fn new(slot_count: i32) -> Self {
        Self {
            inner: SlotArena::new(slot_count, AudioFrame::BYTE_SIZE as i32),
        }
    }
}

impl<B: BumpRegion, G: GenStore> AudioArena<B, G> {
    /// Create an arena from already-built capabilities.
    ///
    /// # Panics
    ///
    /// Panics if `bump` is not empty (see [`SlotArena::with_parts`]).
    pub fn with_parts(bump: B, gens: G, slot_count: i32) -> Self {
        Self {
            inner: SlotArena::with_parts(bump, gens, slot_count, AudioFrame::BYTE_SIZE as i32),
        }
    }

    /// Allocate a slot holding `frame`. `None` at capacity.
    pub fn alloc(&mut self, frame: AudioFrame) -> Option<TypedHandle<AudioFrame>> {
        let h = self.inner.alloc()?;
        assert!(self.inner.write_f64(h, 0, frame.left), "{BROKEN_REGION}");
        assert!(self.inner.write_f64(h, 8, frame.right), "{BROKEN_REGION}");
        Some(TypedHandle::new(h))
    }

    /// Read the frame behind `handle`. `None` if stale.
    pub fn get(&self, handle: TypedHandle<AudioFrame>) -> Option<AudioFrame> {
        let left = self.inner.read_f64(handle.raw(), 0)?;
        let right = self.inner.read_f64(handle.raw(), 8)?;
        Some(AudioFrame { left, right })
    }

    /// Overwrite the frame behind `handle`. `false` if stale.
    pub fn set(&mut self, handle: TypedHandle<AudioFrame>, frame: AudioFrame) -> bool {
        self.inner.write_f64(handle.raw(), 0, frame.left)
            && self.inner.write_f64(handle.raw(), 8, frame.right)
    }

    /// Whether `handle` is live in the current generation.
    pub fn is_valid(&self, handle: TypedHandle<AudioFrame>) -> bool {
        self.inner.is_valid(handle.raw())
    }

    /// Invalidate every outstanding handle. O(1).
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Frames allocated since the last reset.
    pub fn len(&self) -> i32 {
        self.inner.len()
    }

    /// Whether no frames are allocated in the current generation.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Maximum frames per generation.
    pub fn max_slots(&self) -> i32 {
        self.inner.max_slots()
    }
}

/// An arena of user-defined [`Storable`] records.
///
/// Values round-trip through a scratch byte buffer and the arena's
/// bounded byte accessors, one copy per operation. Built-in element
/// types have dedicated arenas above that skip this path.
pub struct StorableArena<T: Storable, B = VecRegion, G = VecGenStore> {
    inner: SlotArena<B, G>,
    _ty: PhantomData<fn() -> T>,
}

impl<T: Storable> StorableArena<T> {
    /// Create an arena holding up to `slot_count` records over the
    /// managed backends.
    pub fn new(slot_count: i32) -> Self {
        Self {
            inner: SlotArena::new(slot_count, Self::slot_size()),
            _ty: PhantomData,
        }
    }
}

impl<T: Storable, B: BumpRegion, G: GenStore> StorableArena<T, B, G> {
    /// Create an arena from already-built capabilities.
    ///
    /// # Panics
    ///
    /// Panics if `bump` is not empty (see [`SlotArena::with_parts`]).
    pub fn with_parts(bump: B, gens: G, slot_count: i32) -> Self {
        Self {
            inner: SlotArena::with_parts(bump, gens, slot_count, Self::slot_size()),
            _ty: PhantomData,
        }
    }

    fn slot_size() -> i32 {
        i32::try_from(T::BYTE_SIZE).unwrap_or(0)
    }

    /// Allocate a slot holding `value`. `None` at capacity.
    pub fn alloc(&mut self, value: T) -> Option<TypedHandle<T>> {
        let h = self.inner.alloc()?;
        let mut scratch = vec![0u8; T::BYTE_SIZE];
        value.write_bytes(&mut scratch, 0);
        for (i, byte) in scratch.iter().enumerate() {
            assert!(self.inner.write_u8(h, i as i32, *byte), "{BROKEN_REGION}");
        }
        Some(TypedHandle::new(h))
    }

    /// Read the record behind `handle`. `None` if stale.
    pub fn get(&self, handle: TypedHandle<T>) -> Option<T> {
        let mut scratch = vec![0u8; T::BYTE_SIZE];
        for (i, byte) in scratch.iter_mut().enumerate() {
            *byte = self.inner.read_u8(handle.raw(), i as i32)?;
        }
        Some(T::read_bytes(&scratch, 0))
    }

    /// Overwrite the record behind `handle`. `false` if stale.
    pub fn set(&mut self, handle: TypedHandle<T>, value: T) -> bool {
        if !self.inner.is_valid(handle.raw()) {
            return false;
        }
        let mut scratch = vec![0u8; T::BYTE_SIZE];
        value.write_bytes(&mut scratch, 0);
        scratch
            .iter()
            .enumerate()
            .all(|(i, byte)| self.inner.write_u8(handle.raw(), i as i32, *byte))
    }

    /// Whether `handle` is live in the current generation.
    pub fn is_valid(&self, handle: TypedHandle<T>) -> bool {
        self.inner.is_valid(handle.raw())
    }

    /// Invalidate every outstanding handle. O(1).
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Records allocated since the last reset.
    pub fn len(&self) -> i32 {
        self.inner.len()
    }

    /// Whether no records are allocated in the current generation.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Maximum records per generation.
    pub fn max_slots(&self) -> i32 {
        self.inner.max_slots()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f64_alloc_get_set_cycle() {
        let mut a = F64Arena::new(3);
        let h1 = a.alloc(3.14).unwrap();
        let h2 = a.alloc(2.718).unwrap();
        assert_eq!(a.get(h1), Some(3.14));
        assert_eq!(a.get(h2), Some(2.718));
        assert!(a.set(h1, -0.5));
        assert_eq!(a.get(h1), Some(-0.5));
        assert_eq!(a.get(h2), Some(2.718));
    }

    #[test]
    fn f64_arena_exhausts_at_capacity() {
        let mut a = F64Arena::new(1);
        a.alloc(1.0).unwrap();
        assert!(a.alloc(2.0).is_none());
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn f64_stale_handle_fails_closed() {
        let mut a = F64Arena::new(2);
        let h = a.alloc(1.0).unwrap();
        a.reset();
        assert!(!a.is_valid(h));
        assert_eq!(a.get(h), None);
        assert!(!a.set(h, 2.0));
    }

    #[test]
    fn i32_alloc_get_set_cycle() {
        let mut a = I32Arena::new(2);
        let h = a.alloc(-42).unwrap();
        assert_eq!(a.get(h), Some(-42));
        assert!(a.set(h, 7));
        assert_eq!(a.get(h), Some(7));
    }

    #[test]
    fn i32_slots_pay_alignment_padding() {
        // Slots are bump-allocated at 8-byte alignment, so 4-byte slots
        // leave 4 bytes of padding each and the region fills early: a
        // 3-slot i32 arena holds 2 values.
        let mut a = I32Arena::new(3);
        assert!(a.alloc(1).is_some());
        assert!(a.alloc(2).is_some());
        assert!(a.alloc(3).is_none());
    }

    #[test]
    fn audio_frames_stay_independent() {
        let mut a = AudioArena::new(2);
        let ha = a.alloc(AudioFrame::new(1.0, 2.0)).unwrap();
        let hb = a.alloc(AudioFrame::new(3.0, 4.0)).unwrap();
        assert_eq!(a.get(ha), Some(AudioFrame::new(1.0, 2.0)));
        assert_eq!(a.get(hb), Some(AudioFrame::new(3.0, 4.0)));
        assert!(a.set(ha, AudioFrame::new(-1.0, -2.0)));
        assert_eq!(a.get(hb), Some(AudioFrame::new(3.0, 4.0)));
    }

    #[test]
    fn audio_reset_invalidates() {
        let mut a = AudioArena::new(1);
        let h = a.alloc(AudioFrame::new(0.1, 0.2)).unwrap();
        a.reset();
        assert_eq!(a.get(h), None);
        assert!(!a.set(h, AudioFrame::default()));
    }

    #[test]
    fn storable_round_trips_builtin_impls() {
        let mut doubles: StorableArena<f64> = StorableArena::new(2);
        let h = doubles.alloc(6.5).unwrap();
        assert_eq!(doubles.get(h), Some(6.5));
        assert!(doubles.set(h, -6.5));
        assert_eq!(doubles.get(h), Some(-6.5));

        let mut frames: StorableArena<AudioFrame> = StorableArena::new(2);
        let h = frames.alloc(AudioFrame::new(1.5, -1.5)).unwrap();
        assert_eq!(frames.get(h), Some(AudioFrame::new(1.5, -1.5)));
    }

    #[test]
    fn storable_stale_handle_fails_closed() {
        let mut a: StorableArena<i32> = StorableArena::new(1);
        let h = a.alloc(9).unwrap();
        a.reset();
        assert_eq!(a.get(h), None);
        assert!(!a.set(h, 10));
    }

    // A region that honours alloc but rejects every write: used to pin
    // down the contract-violation panic in the typed alloc path.
    struct WriteRejectingRegion {
        cursor: i32,
        capacity: i32,
    }

    impl BumpRegion for WriteRejectingRegion {
        fn alloc(&mut self, size: i32, align: i32) -> Option<i32> {
            let (aligned, next) =
                scree_core::traits::fit_aligned(self.cursor, self.capacity, size, align)?;
            self.cursor = next;
            Some(aligned)
        }

        fn reset(&mut self) {
            self.cursor = 0;
        }

        fn capacity(&self) -> i32 {
            self.capacity
        }

        fn used(&self) -> i32 {
            self.cursor
        }

        fn write_i32(&mut self, _offset: i32, _value: i32) -> bool {
            false
        }

        fn read_i32(&self, _offset: i32) -> Option<i32> {
            None
        }

        fn write_f64(&mut self, _offset: i32, _value: f64) -> bool {
            false
        }

        fn read_f64(&self, _offset: i32) -> Option<f64> {
            None
        }

        fn write_u8(&mut self, _offset: i32, _value: u8) -> bool {
            false
        }

        fn read_u8(&self, _offset: i32) -> Option<u8> {
            None
        }

        fn memory_bytes(&self) -> usize {
            self.capacity as usize
        }
    }

    #[test]
    #[should_panic(expected = "rejected a write inside a freshly allocated slot")]
    fn alloc_panics_when_region_breaks_write_guarantee() {
        let region = WriteRejectingRegion {
            cursor: 0,
            capacity: 64,
        };
        let mut a = F64Arena::with_parts(region, VecGenStore::new(4), 4);
        let _ = a.alloc(1.0);
    }

    #[test]
    #[should_panic(expected = "rejected a write inside a freshly allocated slot")]
    fn storable_alloc_panics_when_region_breaks_write_guarantee() {
        let region = WriteRejectingRegion {
            cursor: 0,
            capacity: 64,
        };
        let mut a: StorableArena<i32, _, _> =
            StorableArena::with_parts(region, VecGenStore::new(4), 4);
        let _ = a.alloc(1);
    }
}
