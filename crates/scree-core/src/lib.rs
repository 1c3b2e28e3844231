//! Core contracts and value types for the scree slot-arena allocator.
//!
//! This is the leaf crate with no internal scree dependencies. It defines
//! the two storage capabilities every arena is built from (a bump-allocated
//! byte region and a fixed-length generation store) plus the value types
//! that cross crate boundaries: the stereo [`AudioFrame`] record and the
//! [`Storable`] byte-codec extension trait.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod frame;
pub mod storable;
pub mod traits;

// Re-export core types at crate root for convenience.
pub use frame::AudioFrame;
pub use storable::Storable;
pub use traits::{BumpRegion, GenStore};
