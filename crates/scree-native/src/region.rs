//! Native bump region over a manually managed heap buffer.

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::ptr;

use scree_core::traits::{fit_aligned, span_fits};
use scree_core::BumpRegion;

/// A bump-allocated byte region backed by a raw heap buffer.
///
/// The buffer is allocated once at construction (8-byte aligned, zeroed)
/// and freed by the `Drop` finalizer. [`RawRegion::destroy`] releases it
/// early and deterministically; after destruction every operation fails
/// closed and the eventual `Drop` sees a null buffer and does nothing,
/// so the buffer is freed exactly once.
///
/// Accessors copy value bytes directly to and from the buffer. No
/// bounds-checked container and no reference-count traffic sits between
/// a DSP inner loop and the memory.
pub struct RawRegion {
    /// Heap buffer, or null once destroyed (or for capacity 0).
    base: *mut u8,
    /// Bump pointer: next free byte offset.
    cursor: i32,
    /// Allocation size in bytes. Retained after destroy for the layout.
    capacity: i32,
    /// Set by `destroy()`; makes every later operation fail closed.
    destroyed: bool,
}

// SAFETY: the buffer is exclusively owned by this value and never
// aliased, so moving the region to another thread is sound.
unsafe impl Send for RawRegion {}

impl RawRegion {
    /// Buffer alignment: sufficient for `f64`.
    const ALIGN: usize = 8;

    /// Allocate a region with the given capacity in bytes.
    ///
    /// Non-positive capacities produce an empty region whose `alloc`
    /// always fails.
    ///
    /// # Panics
    ///
    /// Calls the global allocation error handler (aborting) if the heap
    /// allocation fails.
    pub fn new(capacity: i32) -> Self {
        let capacity = capacity.max(0);
        let base = if capacity > 0 {
            let layout = Self::layout(capacity);
            // SAFETY: layout has non-zero size.
            let ptr = unsafe { alloc_zeroed(layout) };
            if ptr.is_null() {
                handle_alloc_error(layout);
            }
            ptr
        } else {
            ptr::null_mut()
        };
        Self {
            base,
            cursor: 0,
            capacity,
            destroyed: false,
        }
    }

    fn layout(capacity: i32) -> Layout {
        Layout::from_size_align(capacity as usize, Self::ALIGN)
            .expect("region capacity always fits a layout")
    }

    /// Release the buffer now instead of waiting for `Drop`.
    ///
    /// Idempotent: the first call frees the buffer and nulls the
    /// pointer; later calls and the finalizer see the null and do
    /// nothing. Every subsequent operation fails closed.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.release();
    }

    /// Whether `destroy()` has been called.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn release(&mut self) {
        if !self.base.is_null() {
            // SAFETY: base came from alloc_zeroed with this exact layout
            // and is nulled below, so it is freed at most once.
            unsafe { dealloc(self.base, Self::layout(self.capacity)) };
            self.base = ptr::null_mut();
        }
    }

    /// Capacity visible to accessors: 0 once destroyed.
    fn live_capacity(&self) -> i32 {
        if self.destroyed {
            0
        } else {
            self.capacity
        }
    }
}

impl Drop for RawRegion {
    fn drop(&mut self) {
        self.release();
    }
}

impl BumpRegion for RawRegion {
    fn alloc(&mut self, size: i32, align: i32) -> Option<i32> {
        let (aligned, new_cursor) = fit_aligned(self.cursor, self.live_capacity(), size, align)?;
        self.cursor = new_cursor;
        Some(aligned)
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn capacity(&self) -> i32 {
        self.live_capacity()
    }

    fn used(&self) -> i32 {
        if self.destroyed {
            0
        } else {
            self.cursor
        }
    }

    fn write_i32(&mut self, offset: i32, value: i32) -> bool {
        if !span_fits(offset, 4, self.live_capacity()) {
            return false;
        }
        let bytes = value.to_le_bytes();
        // SAFETY: the span check proves offset..offset+4 lies within the
        // live allocation; byte copies have no alignment requirement.
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), self.base.add(offset as usize), 4) };
        true
    }

    fn read_i32(&self, offset: i32) -> Option<i32> {
        if !span_fits(offset, 4, self.live_capacity()) {
            return None;
        }
        let mut bytes = [0u8; 4];
        // SAFETY: the span check proves offset..offset+4 lies within the
        // live allocation.
        unsafe { ptr::copy_nonoverlapping(self.base.add(offset as usize), bytes.as_mut_ptr(), 4) };
        Some(i32::from_le_bytes(bytes))
    }

    fn write_f64(&mut self, offset: i32, value: f64) -> bool {
        if !span_fits(offset, 8, self.live_capacity()) {
            return false;
        }
        let bytes = value.to_le_bytes();
        // SAFETY: the span check proves offset..offset+8 lies within the
        // live allocation; byte copies have no alignment requirement.
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), self.base.add(offset as usize), 8) };
        true
    }

    fn read_f64(&self, offset: i32) -> Option<f64> {
        if !span_fits(offset, 8, self.live_capacity()) {
            return None;
        }
        let mut bytes = [0u8; 8];
        // SAFETY: the span check proves offset..offset+8 lies within the
        // live allocation.
        unsafe { ptr::copy_nonoverlapping(self.base.add(offset as usize), bytes.as_mut_ptr(), 8) };
        Some(f64::from_le_bytes(bytes))
    }

    fn write_u8(&mut self, offset: i32, value: u8) -> bool {
        if !span_fits(offset, 1, self.live_capacity()) {
            return false;
        }
        // SAFETY: the span check proves offset lies within the live
        // allocation.
        unsafe { *self.base.add(offset as usize) = value };
        true
    }

    fn read_u8(&self, offset: i32) -> Option<u8> {
        if !span_fits(offset, 1, self.live_capacity()) {
            return None;
        }
        // SAFETY: the span check proves offset lies within the live
        // allocation.
        Some(unsafe { *self.base.add(offset as usize) })
    }

    fn memory_bytes(&self) -> usize {
        self.live_capacity() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_and_round_trip() {
        let mut region = RawRegion::new(64);
        assert_eq!(region.alloc(16, 8), Some(0));
        assert!(region.write_i32(0, -99));
        assert!(region.write_f64(8, 2.5));
        assert_eq!(region.read_i32(0), Some(-99));
        assert_eq!(region.read_f64(8), Some(2.5));
    }

    #[test]
    fn buffer_starts_zeroed() {
        let region = RawRegion::new(32);
        for offset in 0..32 {
            assert_eq!(region.read_u8(offset), Some(0));
        }
    }

    #[test]
    fn unaligned_f64_access_works() {
        let mut region = RawRegion::new(32);
        assert!(region.write_f64(3, 1.25));
        assert_eq!(region.read_f64(3), Some(1.25));
    }

    #[test]
    fn little_endian_layout() {
        let mut region = RawRegion::new(8);
        assert!(region.write_i32(0, 0x0102_0304));
        assert_eq!(region.read_u8(0), Some(0x04));
        assert_eq!(region.read_u8(3), Some(0x01));
    }

    #[test]
    fn zero_capacity_never_allocates() {
        let mut region = RawRegion::new(0);
        assert_eq!(region.capacity(), 0);
        assert_eq!(region.alloc(1, 1), None);
        assert!(!region.write_u8(0, 1));

        let mut region = RawRegion::new(-4);
        assert_eq!(region.capacity(), 0);
        assert_eq!(region.alloc(1, 1), None);
    }

    #[test]
    fn destroy_fails_everything_closed() {
        let mut region = RawRegion::new(64);
        region.alloc(8, 8).unwrap();
        assert!(region.write_i32(0, 7));

        region.destroy();
        assert!(region.is_destroyed());
        assert_eq!(region.capacity(), 0);
        assert_eq!(region.used(), 0);
        assert_eq!(region.alloc(1, 1), None);
        assert!(!region.write_i32(0, 7));
        assert_eq!(region.read_i32(0), None);
        assert!(!region.write_u8(0, 1));
        assert_eq!(region.read_u8(0), None);
    }

    #[test]
    fn destroy_is_idempotent() {
        let mut region = RawRegion::new(64);
        region.destroy();
        region.destroy();
        assert!(region.is_destroyed());
    }

    #[test]
    fn drop_after_destroy_is_safe() {
        let mut region = RawRegion::new(64);
        region.destroy();
        drop(region);
    }

    #[test]
    fn reset_rewinds_without_zeroing() {
        let mut region = RawRegion::new(16);
        region.alloc(4, 1).unwrap();
        assert!(region.write_i32(0, 42));
        region.reset();
        assert_eq!(region.used(), 0);
        assert_eq!(region.read_i32(0), Some(42));
        assert_eq!(region.alloc(4, 1), Some(0));
    }

    #[test]
    fn region_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<RawRegion>();
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn i32_round_trips_at_any_valid_offset(
                value in any::<i32>(),
                offset in 0i32..29,
            ) {
                let mut region = RawRegion::new(32);
                prop_assert!(region.write_i32(offset, value));
                prop_assert_eq!(region.read_i32(offset), Some(value));
            }

            #[test]
            fn f64_bits_round_trip_at_any_valid_offset(
                bits in any::<u64>(),
                offset in 0i32..25,
            ) {
                let mut region = RawRegion::new(32);
                let value = f64::from_bits(bits);
                prop_assert!(region.write_f64(offset, value));
                // Compare bit patterns so NaN payloads count as equal.
                prop_assert_eq!(
                    region.read_f64(offset).map(f64::to_bits),
                    Some(value.to_bits())
                );
            }
        }
    }
}
