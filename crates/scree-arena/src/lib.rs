//! Generational slot-arena allocation over pluggable storage backends.
//!
//! A [`SlotArena`] carves a bump-allocated byte region into fixed-size
//! slots, hands out generation-scoped [`SlotHandle`]s, and invalidates
//! every outstanding handle in O(1) by bumping its generation on
//! [`SlotArena::reset`]. Typed arenas and the [`AudioBufferPool`] wrap
//! the generic arena with whole-value and per-sample surfaces.
//!
//! Backends are selected by type parameter and monomorphized; this crate
//! provides the managed backends ([`VecRegion`], [`VecGenStore`]) and the
//! [`compliance`] suite every backend pairing must pass.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod arena;
pub mod compliance;
pub mod gens;
pub mod handle;
pub mod pool;
pub mod region;
pub mod typed;

pub use arena::SlotArena;
pub use gens::VecGenStore;
pub use handle::{BufferHandle, SlotHandle, TypedHandle};
pub use pool::AudioBufferPool;
pub use region::VecRegion;
pub use typed::{AudioArena, F64Arena, I32Arena, StorableArena};
