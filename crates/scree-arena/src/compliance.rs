//! Backend compliance test helpers.
//!
//! These functions verify that a `(BumpRegion, GenStore)` backend pairing
//! satisfies the capability contracts and that the arenas layered on top
//! behave identically over it. Reused by every backend's test suite:
//! the managed backends in this crate and the native backends in
//! `scree-native` run exactly the same checks.
//!
//! Each helper takes factory closures so it can build storage of the
//! sizes the check needs: `make_bump(capacity_bytes)` and
//! `make_gens(length)`.

use scree_core::{AudioFrame, BumpRegion, GenStore};

use crate::arena::SlotArena;
use crate::pool::AudioBufferPool;
use crate::typed::{AudioArena, F64Arena};

/// Assert the modulo-padding alignment rule and cursor accounting.
pub fn assert_bump_alignment_rule<B: BumpRegion>(make_bump: &mut impl FnMut(i32) -> B) {
    let mut bump = make_bump(64);
    assert_eq!(bump.used(), 0, "fresh region must start empty");
    assert_eq!(bump.alloc(1, 1), Some(0));
    let off = bump.alloc(8, 8).expect("aligned alloc must fit");
    assert_eq!(off % 8, 0, "offset {off} not 8-aligned");
    assert_eq!(off, 8, "1 byte used, next 8-aligned offset is 8");
    assert_eq!(bump.used(), 16);
    let off = bump.alloc(4, 4).expect("aligned alloc must fit");
    assert_eq!(off, 16);
}

/// Assert that non-positive sizes and alignments are rejected.
pub fn assert_bump_rejects_nonpositive<B: BumpRegion>(make_bump: &mut impl FnMut(i32) -> B) {
    let mut bump = make_bump(64);
    assert_eq!(bump.alloc(0, 8), None);
    assert_eq!(bump.alloc(-4, 8), None);
    assert_eq!(bump.alloc(8, 0), None);
    assert_eq!(bump.alloc(8, -1), None);
    assert_eq!(bump.used(), 0, "rejected allocs must not move the cursor");
}

/// Assert that allocation fails exactly at capacity, padding included.
pub fn assert_bump_capacity_exhaustion<B: BumpRegion>(make_bump: &mut impl FnMut(i32) -> B) {
    let mut bump = make_bump(16);
    assert_eq!(bump.alloc(16, 1), Some(0));
    assert_eq!(bump.alloc(1, 1), None, "region is full");

    // Padding alone can exhaust the remaining space.
    let mut bump = make_bump(10);
    assert_eq!(bump.alloc(1, 1), Some(0));
    assert_eq!(bump.alloc(8, 8), None, "8 bytes at offset 8 exceed capacity 10");

    // Oversized alignment must fail cleanly, not overflow.
    let mut bump = make_bump(16);
    assert_eq!(bump.alloc(1, 1), Some(0));
    assert_eq!(bump.alloc(1, i32::MAX), None);
}

/// Assert that typed accessors reject out-of-range offsets and accept
/// exact-fit footprints.
pub fn assert_bump_accessor_bounds<B: BumpRegion>(make_bump: &mut impl FnMut(i32) -> B) {
    let mut bump = make_bump(16);
    assert!(!bump.write_i32(-1, 0));
    assert!(!bump.write_i32(13, 0));
    assert!(!bump.write_f64(9, 0.0));
    assert!(!bump.write_u8(16, 0));
    assert_eq!(bump.read_i32(13), None);
    assert_eq!(bump.read_f64(-8), None);
    assert_eq!(bump.read_u8(16), None);
    assert!(bump.write_i32(12, 1));
    assert!(bump.write_f64(8, 1.0));
    assert!(bump.write_u8(15, 1));
}

/// Assert little-endian typed round trips through the region.
pub fn assert_bump_round_trips<B: BumpRegion>(make_bump: &mut impl FnMut(i32) -> B) {
    let mut bump = make_bump(32);
    assert!(bump.write_i32(0, 0x0102_0304));
    assert_eq!(bump.read_i32(0), Some(0x0102_0304));
    assert_eq!(bump.read_u8(0), Some(0x04), "i32 layout must be little-endian");
    assert_eq!(bump.read_u8(3), Some(0x01));

    assert!(bump.write_f64(5, -2.5), "unaligned f64 offsets are fine");
    assert_eq!(bump.read_f64(5), Some(-2.5));

    assert!(bump.write_u8(31, 255));
    assert_eq!(bump.read_u8(31), Some(255));
}

/// Assert that writes inside a fresh allocation always succeed.
pub fn assert_bump_post_alloc_writes<B: BumpRegion>(make_bump: &mut impl FnMut(i32) -> B) {
    let mut bump = make_bump(64);
    let off = bump.alloc(16, 8).expect("alloc must fit");
    for delta in 0..16 {
        assert!(
            bump.write_u8(off + delta, delta as u8),
            "byte write at offset {off}+{delta} inside a fresh slot failed"
        );
    }
    assert!(bump.write_i32(off, 1));
    assert!(bump.write_i32(off + 12, 1));
    assert!(bump.write_f64(off, 1.0));
    assert!(bump.write_f64(off + 8, 1.0));
}

/// Assert that reset rewinds the cursor without requiring a zeroed region.
pub fn assert_bump_reset<B: BumpRegion>(make_bump: &mut impl FnMut(i32) -> B) {
    let mut bump = make_bump(32);
    bump.alloc(16, 8).unwrap();
    assert_eq!(bump.used(), 16);
    bump.reset();
    assert_eq!(bump.used(), 0);
    assert_eq!(bump.capacity(), 32, "reset must not change capacity");
    assert_eq!(bump.alloc(8, 8), Some(0), "allocation restarts at offset 0");
}

/// Assert generation-store zero-init, round trips, and length clamping.
pub fn assert_gen_store_contract<G: GenStore>(make_gens: &mut impl FnMut(i32) -> G) {
    let mut gens = make_gens(8);
    assert_eq!(gens.len(), 8);
    for i in 0..8 {
        assert_eq!(gens.get(i), 0, "entry {i} must start at 0");
    }
    gens.set(3, 41);
    assert_eq!(gens.get(3), 41);
    assert_eq!(gens.get(2), 0);
    assert_eq!(gens.get(4), 0);

    let gens = make_gens(-5);
    assert_eq!(gens.len(), 0, "negative lengths clamp to 0");
}

/// Assert that fresh handles validate and capacity caps allocation.
pub fn assert_arena_alloc_contract<B: BumpRegion, G: GenStore>(
    make_bump: &mut impl FnMut(i32) -> B,
    make_gens: &mut impl FnMut(i32) -> G,
) {
    let mut arena = SlotArena::with_parts(make_bump(64), make_gens(4), 4, 16);
    let mut handles = Vec::new();
    for i in 0..4 {
        let h = arena.alloc().expect("slot within capacity must fit");
        assert_eq!(h.slot(), i);
        assert!(arena.is_valid(h), "fresh handle must validate");
        handles.push(h);
    }
    assert!(arena.alloc().is_none(), "arena is full");
    assert_eq!(arena.len(), 4);
    assert!(arena.used() <= arena.capacity());
    for h in handles {
        assert!(arena.is_valid(h), "handles stay valid until reset");
    }
}

/// Assert lazy invalidation: reset strictly bumps the generation and
/// every pre-reset handle goes stale.
pub fn assert_arena_reset_contract<B: BumpRegion, G: GenStore>(
    make_bump: &mut impl FnMut(i32) -> B,
    make_gens: &mut impl FnMut(i32) -> G,
) {
    let mut arena = SlotArena::with_parts(make_bump(64), make_gens(4), 4, 16);
    let old = arena.alloc().unwrap();
    assert!(arena.write_i32(old, 0, 7));
    let before = arena.generation();

    arena.reset();
    assert_eq!(arena.generation(), before + 1);
    assert_eq!(arena.len(), 0);
    assert_eq!(arena.used(), 0);
    assert!(!arena.is_valid(old));
    assert!(!arena.write_i32(old, 0, 1));
    assert_eq!(arena.read_i32(old, 0), None);

    let new = arena.alloc().unwrap();
    assert!(new.generation() > old.generation());

    // Two further resets bump the generation by exactly two.
    let before = arena.generation();
    arena.reset();
    arena.reset();
    assert_eq!(arena.generation(), before + 2);
    assert_eq!(arena.len(), 0);
    assert_eq!(arena.used(), 0);
}

/// Assert bounded field access: round trips, slot independence, and
/// offset rejection.
pub fn assert_arena_field_contract<B: BumpRegion, G: GenStore>(
    make_bump: &mut impl FnMut(i32) -> B,
    make_gens: &mut impl FnMut(i32) -> G,
) {
    let mut arena = SlotArena::with_parts(make_bump(64), make_gens(4), 4, 16);
    let h0 = arena.alloc().unwrap();
    let h1 = arena.alloc().unwrap();

    assert!(arena.write_i32(h0, 0, -5));
    assert!(arena.write_f64(h0, 8, 2.5));
    assert!(arena.write_u8(h0, 4, 9));
    assert!(arena.write_i32(h1, 0, 17));
    assert_eq!(arena.read_i32(h0, 0), Some(-5));
    assert_eq!(arena.read_f64(h0, 8), Some(2.5));
    assert_eq!(arena.read_u8(h0, 4), Some(9));
    assert_eq!(arena.read_i32(h1, 0), Some(17), "slots must be independent");

    assert!(!arena.write_i32(h0, 13, 0), "4-byte footprint leaves the slot");
    assert!(!arena.write_f64(h0, 9, 0.0));
    assert!(!arena.write_i32(h0, -1, 0));
    assert_eq!(arena.read_i32(h0, 13), None);
    assert_eq!(arena.read_u8(h0, 16), None);
}

/// Assert that `with_parts` clamps the requested slot count to what the
/// capabilities can hold.
pub fn assert_arena_clamps_slot_count<B: BumpRegion, G: GenStore>(
    make_bump: &mut impl FnMut(i32) -> B,
    make_gens: &mut impl FnMut(i32) -> G,
) {
    // Region fits 4 slots of 16 bytes; caller asks for 100.
    let arena = SlotArena::with_parts(make_bump(64), make_gens(100), 100, 16);
    assert_eq!(arena.max_slots(), 4);

    // Generation store is the binding constraint.
    let arena = SlotArena::with_parts(make_bump(64), make_gens(2), 100, 16);
    assert_eq!(arena.max_slots(), 2);
}

/// Assert that a handle minted by one arena does not validate in another.
pub fn assert_arena_rejects_foreign_handles<B: BumpRegion, G: GenStore>(
    make_bump: &mut impl FnMut(i32) -> B,
    make_gens: &mut impl FnMut(i32) -> G,
) {
    let mut donor = SlotArena::with_parts(make_bump(64), make_gens(4), 4, 16);
    let h = donor.alloc().unwrap();
    let fresh = SlotArena::with_parts(make_bump(64), make_gens(4), 4, 16);
    assert!(!fresh.is_valid(h));
    assert_eq!(fresh.read_i32(h, 0), None);
}

/// Assert the typed f64 arena behaves identically over this backend.
pub fn assert_f64_arena_contract<B: BumpRegion, G: GenStore>(
    make_bump: &mut impl FnMut(i32) -> B,
    make_gens: &mut impl FnMut(i32) -> G,
) {
    let mut arena = F64Arena::with_parts(make_bump(24), make_gens(3), 3);
    let h1 = arena.alloc(3.14).expect("slot 0 must fit");
    let h2 = arena.alloc(2.718).expect("slot 1 must fit");
    assert_eq!(arena.get(h1), Some(3.14));
    assert_eq!(arena.get(h2), Some(2.718));
    assert!(arena.set(h1, -0.5));
    assert_eq!(arena.get(h1), Some(-0.5));
    assert_eq!(arena.get(h2), Some(2.718));
    arena.reset();
    assert_eq!(arena.get(h1), None);
    assert!(!arena.set(h2, 0.0));
}

/// Assert the audio frame arena behaves identically over this backend.
pub fn assert_audio_arena_contract<B: BumpRegion, G: GenStore>(
    make_bump: &mut impl FnMut(i32) -> B,
    make_gens: &mut impl FnMut(i32) -> G,
) {
    let mut arena = AudioArena::with_parts(make_bump(32), make_gens(2), 2);
    let ha = arena.alloc(AudioFrame::new(1.0, 2.0)).unwrap();
    let hb = arena.alloc(AudioFrame::new(3.0, 4.0)).unwrap();
    assert_eq!(arena.get(ha), Some(AudioFrame::new(1.0, 2.0)));
    assert_eq!(arena.get(hb), Some(AudioFrame::new(3.0, 4.0)));
}

/// Assert the buffer pool's per-callback lifecycle over this backend.
pub fn assert_buffer_pool_contract<B: BumpRegion, G: GenStore>(
    make_bump: &mut impl FnMut(i32) -> B,
    make_gens: &mut impl FnMut(i32) -> G,
) {
    let mut pool = AudioBufferPool::with_parts(make_bump(64), make_gens(1), 4, 2, 1);

    // First callback: reset, allocate scratch, touch one sample.
    pool.reset();
    let b = pool.alloc().expect("one buffer must fit");
    assert!(pool.write_sample(b, 2, 1, 0.5));
    assert_eq!(pool.read_sample(b, 2, 1), Some(0.5));
    assert!(!pool.write_sample(b, 4, 0, 0.0), "frame out of range");
    assert!(!pool.write_sample(b, 0, 2, 0.0), "channel out of range");

    // Second callback: the old buffer must be stale.
    pool.reset();
    assert!(!pool.is_valid(b));
    assert_eq!(pool.read_sample(b, 2, 1), None);
    let b2 = pool.alloc().expect("pool refills after reset");
    assert!(pool.is_valid(b2));
}

/// Run every compliance check against a backend pairing.
pub fn run_full_compliance<B: BumpRegion, G: GenStore>(
    make_bump: &mut impl FnMut(i32) -> B,
    make_gens: &mut impl FnMut(i32) -> G,
) {
    assert_bump_alignment_rule(make_bump);
    assert_bump_rejects_nonpositive(make_bump);
    assert_bump_capacity_exhaustion(make_bump);
    assert_bump_accessor_bounds(make_bump);
    assert_bump_round_trips(make_bump);
    assert_bump_post_alloc_writes(make_bump);
    assert_bump_reset(make_bump);
    assert_gen_store_contract(make_gens);
    assert_arena_alloc_contract(make_bump, make_gens);
    assert_arena_reset_contract(make_bump, make_gens);
    assert_arena_field_contract(make_bump, make_gens);
    assert_arena_clamps_slot_count(make_bump, make_gens);
    assert_arena_rejects_foreign_handles(make_bump, make_gens);
    assert_f64_arena_contract(make_bump, make_gens);
    assert_audio_arena_contract(make_bump, make_gens);
    assert_buffer_pool_contract(make_bump, make_gens);
}
