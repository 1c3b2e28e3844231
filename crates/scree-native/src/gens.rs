//! Native generation store over a manually managed heap buffer.

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::ptr;

use scree_core::GenStore;

/// A fixed-length generation array backed by a raw `i32` heap buffer.
///
/// Mirrors [`RawRegion`](crate::RawRegion)'s lifecycle: allocated zeroed
/// at construction, freed exactly once by either [`RawGenStore::destroy`]
/// or the `Drop` finalizer, fail-closed after destruction (`get` reads 0,
/// `set` is ignored, `len` reports 0).
pub struct RawGenStore {
    /// Heap buffer, or null once destroyed (or for length 0).
    data: *mut i32,
    /// Entry count. Retained after destroy for the layout.
    length: i32,
    /// Set by `destroy()`; makes every later operation fail closed.
    destroyed: bool,
}

// SAFETY: the buffer is exclusively owned by this value and never
// aliased, so moving the store to another thread is sound.
unsafe impl Send for RawGenStore {}

impl RawGenStore {
    /// Allocate a store with `length` entries, all 0.
    ///
    /// Negative lengths clamp to 0.
    ///
    /// # Panics
    ///
    /// Calls the global allocation error handler (aborting) if the heap
    /// allocation fails.
    pub fn new(length: i32) -> Self {
        let length = length.max(0);
        let data = if length > 0 {
            let layout = Self::layout(length);
            // SAFETY: layout has non-zero size.
            let ptr = unsafe { alloc_zeroed(layout) };
            if ptr.is_null() {
                handle_alloc_error(layout);
            }
            ptr.cast::<i32>()
        } else {
            ptr::null_mut()
        };
        Self {
            data,
            length,
            destroyed: false,
        }
    }

    fn layout(length: i32) -> Layout {
        Layout::array::<i32>(length as usize).expect("store length always fits a layout")
    }

    /// Release the buffer now instead of waiting for `Drop`.
    ///
    /// Idempotent; see [`RawRegion::destroy`](crate::RawRegion::destroy).
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
        if !self.data.is_null() {
            // SAFETY: data came from alloc_zeroed with this exact layout
            // and is nulled below, so it is freed at most once.
            unsafe { dealloc(self.data.cast::<u8>(), Self::layout(self.length)) };
            self.data = ptr::null_mut();
        }
    }
}

impl Drop for RawGenStore {
    fn drop(&mut self) {
        self.release();
    }
}

impl GenStore for RawGenStore {
    fn get(&self, index: i32) -> i32 {
        if self.destroyed {
            return 0;
        }
        assert!(
            index >= 0 && index < self.length,
            "generation index {index} out of range 0..{}",
            self.length
        );
        // SAFETY: the assert proves index is within the live allocation.
        unsafe { *self.data.add(index as usize) }
    }

    fn set(&mut self, index: i32, generation: i32) {
        if self.destroyed {
            return;
        }
        assert!(
            index >= 0 && index < self.length,
            "generation index {index} out of range 0..{}",
            self.length
        );
        // SAFETY: the assert proves index is within the live allocation.
        unsafe { *self.data.add(index as usize) = generation };
    }

    fn len(&self) -> i32 {
        if self.destroyed {
            0
        } else {
            self.length
        }
    }

    fn memory_bytes(&self) -> usize {
        if self.destroyed {
            0
        } else {
            self.length as usize * std::mem::size_of::<i32>()
        }
    }
}
