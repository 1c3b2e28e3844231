//! Pool of multi-sample audio buffers for per-callback scratch use.
//!
//! Each slot holds one interleaved multi-channel buffer of `f64`
//! samples. The intended lifecycle is one `reset` at the top of every
//! audio callback, a handful of `alloc` calls for the scratch buffers
//! the callback needs, then per-sample reads and writes. Every step is
//! an O(1) bump-pointer or offset computation.

use scree_core::{BumpRegion, GenStore};

use crate::arena::SlotArena;
use crate::gens::VecGenStore;
use crate::handle::BufferHandle;
use crate::region::VecRegion;

/// A fixed pool of interleaved multi-channel sample buffers.
///
/// Buffer layout is interleaved: sample `(frame, channel)` lives at byte
/// offset `(frame * channels + channel) * 8` within its slot. Unlike the
/// single-value typed arenas, [`AudioBufferPool::alloc`] returns an
/// *uninitialised* buffer: DSP code overwrites every sample anyway, and
/// skipping the fill keeps allocation a pure bump-pointer advance.
pub struct AudioBufferPool<B = VecRegion, G = VecGenStore> {
    inner: SlotArena<B, G>,
    frames_per_buffer: i32,
    channels: i32,
}

/// Bytes per buffer, or `None` on non-positive or overflowing configs.
fn buffer_bytes(frames_per_buffer: i32, channels: i32) -> Option<i32> {
    if frames_per_buffer <= 0 || channels <= 0 {
        return None;
    }
    frames_per_buffer.checked_mul(channels)?.checked_mul(8)
}

impl AudioBufferPool {
    /// Create a pool of `buffer_count` buffers over the managed
    /// backends, each holding `frames_per_buffer * channels` samples.
    ///
    /// Non-positive dimensions or an overflowing buffer size produce a
    /// zero-capacity pool whose `alloc` always returns `None`.
    pub fn new(frames_per_buffer: i32, channels: i32, buffer_count: i32) -> Self {
        match buffer_bytes(frames_per_buffer, channels) {
            Some(slot_size) => Self {
                inner: SlotArena::new(buffer_count, slot_size),
                frames_per_buffer,
                channels,
            },
            None => Self {
                inner: SlotArena::new(0, 1),
                frames_per_buffer: frames_per_buffer.max(0),
                channels: channels.max(0),
            },
        }
    }
}

impl<B: BumpRegion, G: GenStore> AudioBufferPool<B, G> {
    /// Create a pool from already-built capabilities.
    ///
    /// # Panics
    ///
    /// Panics if `bump` is not empty (see [`SlotArena::with_parts`]).
    pub fn with_parts(
        bump: B,
        gens: G,
        frames_per_buffer: i32,
        channels: i32,
        buffer_count: i32,
    ) -> Self {
        match buffer_bytes(frames_per_buffer, channels) {
            Some(slot_size) => Self {
                inner: SlotArena::with_parts(bump, gens, buffer_count, slot_size),
                frames_per_buffer,
                channels,
            },
            None => Self {
                inner: SlotArena::with_parts(bump, gens, 0, 1),
                frames_per_buffer: frames_per_buffer.max(0),
                channels: channels.max(0),
            },
        }
    }

    /// Allocate the next buffer. Samples are uninitialised.
    ///
    /// Returns `None` at capacity. No write happens here, so this path
    /// can never trip the post-alloc write guarantee.
    pub fn alloc(&mut self) -> Option<BufferHandle> {
        self.inner.alloc().map(BufferHandle::new)
    }

    /// Write one sample. `false` for a stale handle or an out-of-range
    /// frame or channel index.
    pub fn write_sample(&mut self, handle: BufferHandle, frame: i32, channel: i32, value: f64) -> bool {
        match self.sample_offset(frame, channel) {
            Some(offset) => self.inner.write_f64(handle.raw(), offset, value),
            None => false,
        }
    }

    /// Read one sample. `None` for a stale handle or an out-of-range
    /// frame or channel index.
    pub fn read_sample(&self, handle: BufferHandle, frame: i32, channel: i32) -> Option<f64> {
        self.inner.read_f64(handle.raw(), self.sample_offset(frame, channel)?)
    }

    /// Interleaved byte offset of `(frame, channel)` within a buffer.
    fn sample_offset(&self, frame: i32, channel: i32) -> Option<i32> {
        if frame < 0 || frame >= self.frames_per_buffer || channel < 0 || channel >= self.channels
        {
            return None;
        }
        Some((frame * self.channels + channel) * 8)
    }

    /// Whether `handle` is live in the current generation.
    pub fn is_valid(&self, handle: BufferHandle) -> bool {
        self.inner.is_valid(handle.raw())
    }

    /// Invalidate every outstanding buffer. O(1).
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Frames per buffer.
    pub fn frames_per_buffer(&self) -> i32 {
        self.frames_per_buffer
    }

    /// Channels per frame.
    pub fn channels(&self) -> i32 {
        self.channels
    }

    /// Buffers allocated since the last reset.
    pub fn len(&self) -> i32 {
        self.inner.len()
    }

    /// Whether no buffers are allocated in the current generation.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Maximum buffers per generation.
    pub fn max_buffers(&self) -> i32 {
        self.inner.max_slots()
    }

    /// Total memory usage of both backing stores in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.inner.memory_bytes()
    }
}
