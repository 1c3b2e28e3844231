//! The [`Storable`] byte-codec extension trait.
//!
//! `Storable` is the published extension surface for user-defined slot
//! types: a fixed serialized size plus read/write over a byte scratch
//! buffer. The built-in single-value arenas bypass this path and use the
//! bump region's typed accessors directly; `Storable` exists so callers
//! can build further typed arenas for their own fixed-size records at the
//! cost of one scratch copy per operation.

use crate::frame::AudioFrame;

/// A value with a fixed little-endian byte encoding.
///
/// Implementations must write exactly [`Storable::BYTE_SIZE`] bytes at
/// the given offset and read back an equal value from the same bytes.
///
/// # Panics
///
/// `write_bytes` and `read_bytes` panic if `buf` is too short to hold
/// `BYTE_SIZE` bytes at `off`; callers size the scratch buffer from
/// `BYTE_SIZE` so this is unreachable in normal use.
pub trait Storable: Sized {
    /// Serialized size in bytes. Must be at least 1.
    const BYTE_SIZE: usize;

    /// Encode `self` into `buf` starting at `off`.
    fn write_bytes(&self, buf: &mut [u8], off: usize);

    /// Decode a value from `buf` starting at `off`.
    fn read_bytes(buf: &[u8], off: usize) -> Self;
}

impl Storable for f64 {
    const BYTE_SIZE: usize = 8;

    fn write_bytes(&self, buf: &mut [u8], off: usize) {
        buf[off..off + 8].copy_from_slice(&self.to_le_bytes());
    }

    fn read_bytes(buf: &[u8], off: usize) -> Self {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&buf[off..off + 8]);
        f64::from_le_bytes(bytes)
    }
}

impl Storable for i32 {
    const BYTE_SIZE: usize = 4;

    fn write_bytes(&self, buf: &mut [u8], off: usize) {
        buf[off..off + 4].copy_from_slice(&self.to_le_bytes());
    }

    fn read_bytes(buf: &[u8], off: usize) -> Self {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&buf[off..off + 4]);
        i32::from_le_bytes(bytes)
    }
}

impl Storable for AudioFrame {
    const BYTE_SIZE: usize = AudioFrame::BYTE_SIZE;

    fn write_bytes(&self, buf: &mut [u8], off: usize) {
        self.left.write_bytes(buf, off);
        self.right.write_bytes(buf, off + 8);
    }

    fn read_bytes(buf: &[u8], off: usize) -> Self {
        Self {
            left: f64::read_bytes(buf, off),
            right: f64::read_bytes(buf, off + 8),
        }
    }
}
