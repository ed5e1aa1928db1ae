//! End-to-end scenarios over a full [`Allocator`], exercising the universal
//! invariants and concrete traces from the testable-properties contract
//! rather than any single component in isolation.

use crate::allocator::Allocator;
use crate::constants::{MIN_BLOCK_SIZE, PAGE_SIZE};
use crate::testing::VecPageProvider;

const MAGIC: u64 = 0;
const SIZEOF_INT: u32 = 4;

fn fresh_heap() -> Allocator<VecPageProvider> {
    Allocator::new(VecPageProvider::with_page_limit(64), MAGIC)
}

/// Scenario 1: a single small allocation out of a freshly bootstrapped page.
#[test]
fn scenario_one_page_single_small_alloc() {
    let mut a = fresh_heap();
    let p = a.allocate(SIZEOF_INT);
    assert!(!p.is_null());
    assert_eq!(a.free_block_count(), 1);
    assert_eq!(a.free_blocks_of_size(4016), 1);
    assert_eq!(a.quick_block_count(), 0);
    assert_eq!(a.errno(), None);
    assert_eq!(a.mem_size(), PAGE_SIZE);
}

/// Scenario 2: a request large enough to force the heap to grow past its
/// first page, consuming the whole resulting wilderness block as a splinter.
#[test]
fn scenario_large_alloc_grows_heap_to_exact_fit() {
    let mut a = fresh_heap();
    let p = a.allocate(16316);
    assert!(!p.is_null());
    assert_eq!(a.free_block_count(), 0);
    assert_eq!(a.quick_block_count(), 0);
    assert_eq!(a.errno(), None);
    assert_eq!(a.mem_size(), 4 * PAGE_SIZE);
}

/// Scenario 3: growth exhausts the page provider before the request fits;
/// the partial growth is left behind as one coalesced free block and the
/// allocation itself fails cleanly.
#[test]
fn scenario_growth_exhaustion_reports_oom_and_keeps_free_block() {
    let mut a = Allocator::new(VecPageProvider::with_page_limit(37), MAGIC);
    let p = a.allocate(151505);
    assert!(p.is_null());
    assert_eq!(a.errno(), Some(crate::error::BlockAllocError::OutOfMemory));
    assert_eq!(a.free_block_count(), 1);
    assert_eq!(a.free_blocks_of_size(151504), 1);
    assert_eq!(a.quick_block_count(), 0);
}

/// Scenario 4: freeing a quick-list-eligible block caches it instead of
/// coalescing it, leaving the freed-from-the-middle neighbor's remainder as
/// the sole free block.
#[test]
fn scenario_free_of_small_block_goes_to_quick_list() {
    let mut a = fresh_heap();
    let _first = a.allocate(8);
    let second = a.allocate(32);
    let _third = a.allocate(1);
    a.free(second);

    assert_eq!(a.quick_block_count(), 1);
    assert_eq!(a.quick_blocks_of_size(48), 1);
    assert_eq!(a.free_block_count(), 1);
    assert_eq!(a.free_blocks_of_size(3936), 1);
}

/// Scenario 5: a freed block too large for the quick list stays its own free
/// block when neither neighbor is free.
#[test]
fn scenario_free_of_large_block_stays_standalone() {
    let mut a = fresh_heap();
    let _first = a.allocate(8);
    let second = a.allocate(200);
    let _third = a.allocate(1);
    a.free(second);

    assert_eq!(a.quick_block_count(), 0);
    assert_eq!(a.free_block_count(), 2);
    assert_eq!(a.free_blocks_of_size(224), 1);
    assert_eq!(a.free_blocks_of_size(3760), 1);
}

/// Scenario 6: freeing two large blocks that become adjacent merges them via
/// the coalescer into a single larger free block.
#[test]
fn scenario_freeing_adjacent_large_blocks_coalesces() {
    let mut a = fresh_heap();
    let _first = a.allocate(8);
    let second = a.allocate(200);
    let third = a.allocate(300);
    let _fourth = a.allocate(4);
    a.free(third);
    a.free(second);

    assert_eq!(a.quick_block_count(), 0);
    assert_eq!(a.free_block_count(), 2);
    assert_eq!(a.free_blocks_of_size(544), 1);
    assert_eq!(a.free_blocks_of_size(3440), 1);
}

/// Scenario 7 (tie-break): freeing three non-adjacent same-class blocks keeps
/// them apart (no spurious coalescing across the still-allocated survivors),
/// and the most recently freed of them is the one a same-size search would
/// hand back first (LIFO, not insertion order of the original allocations).
#[test]
fn scenario_lifo_tie_break_among_same_size_class() {
    let mut a = fresh_heap();
    let u = a.allocate(200);
    let _v = a.allocate(200);
    let w = a.allocate(200);
    let _x = a.allocate(200);
    let y = a.allocate(200);
    let _z = a.allocate(200);

    let u_off = a.offset_of(u);
    let w_off = a.offset_of(w);
    let y_off = a.offset_of(y);

    a.free(u);
    a.free(w);
    a.free(y);

    assert_eq!(a.quick_block_count(), 0);
    assert_eq!(a.free_blocks_of_size(224), 3);
    // Three 224-byte frees plus the untouched wilderness remainder account
    // for every byte of the original 4048-byte bootstrap block.
    assert_eq!(a.free_block_count(), 4);
    assert_eq!(a.total_block_bytes(), 4096 - 16);

    assert_eq!(a.first_free_of_size(224), Some(y_off));
    assert_ne!(a.first_free_of_size(224), Some(w_off));
    assert_ne!(a.first_free_of_size(224), Some(u_off));
}

/// Scenario 8: growing a resize allocates fresh, copies the old payload, and
/// the vacated block (small enough) lands in the quick list rather than the
/// free-list index.
#[test]
fn scenario_resize_grow_moves_and_quick_lists_old_block() {
    let mut a = fresh_heap();
    let first = a.allocate(SIZEOF_INT);
    let _second = a.allocate(10);

    let resized = a.resize(first, 80);
    assert!(!resized.is_null());
    assert_ne!(resized, first);

    // The vacated block is small enough to be cached, not freed into the
    // segregated index.
    assert_eq!(a.quick_block_count(), 1);
    assert_eq!(a.quick_blocks_of_size(32), 1);
    assert_eq!(a.free_block_count(), 1);
    assert_eq!(a.free_blocks_of_size(3888), 1);
}

/// Scenario 9: shrinking into a too-small remainder takes the splinter
/// branch — same pointer, slack retained internally, no new free block.
#[test]
fn scenario_resize_shrink_splinter_keeps_pointer() {
    let mut a = fresh_heap();
    let p = a.allocate(80);
    let resized = a.resize(p, 64);

    assert_eq!(resized, p);
    assert_eq!(a.free_block_count(), 1);
    assert_eq!(a.free_blocks_of_size(3952), 1);
}

/// Scenario 10: shrinking with a large-enough remainder splits in place and
/// the remainder immediately coalesces with the trailing wilderness block.
#[test]
fn scenario_resize_shrink_split_merges_into_wilderness() {
    let mut a = fresh_heap();
    let p = a.allocate(64);
    let resized = a.resize(p, SIZEOF_INT);

    assert_eq!(resized, p);
    assert_eq!(a.free_block_count(), 1);
    assert_eq!(a.free_blocks_of_size(4016), 1);
}

/// P1/P2: every block's size is 16-aligned and at least MIN_BLOCK_SIZE, and
/// the sum of every block (prologue/epilogue excluded) equals the heap size
/// minus the fixed 16 bytes of pad+epilogue overhead, no matter how the heap
/// has been carved up.
#[test]
fn invariant_block_sizes_are_well_formed_and_conserve_heap_bytes() {
    let mut a = fresh_heap();
    let mut live = Vec::new();
    for n in [8u32, 200, 1, 300, 4, 500, 16316] {
        let p = a.allocate(n);
        assert!(!p.is_null());
        live.push(p);
    }
    for (i, p) in live.into_iter().enumerate() {
        if i % 2 == 0 {
            a.free(p);
        }
    }

    assert_eq!(a.total_block_bytes(), a.mem_size() as u32 - 16);
    assert_eq!(a.total_block_bytes() % 16, 0);
    assert!(a.total_block_bytes() >= MIN_BLOCK_SIZE);
}

/// P5: current payload never exceeds the peak, and the peak never exceeds
/// the total bytes committed to blocks.
#[test]
fn invariant_payload_accounting_stays_ordered() {
    let mut a = fresh_heap();
    let p1 = a.allocate(100);
    let p2 = a.allocate(4000);
    assert!(a.current_payload() <= a.peak_payload());
    assert!(a.peak_payload() <= a.total_block_bytes() as u64);

    a.free(p1);
    assert!(a.current_payload() <= a.peak_payload());
    a.free(p2);
    assert!(a.current_payload() <= a.peak_payload());
    assert_eq!(a.current_payload(), 0);
}

/// L1 (round-trip, quick-list path): allocating and immediately freeing a
/// small block leaves the free-list index exactly as it was; the freed
/// block is cached in the quick list, not merged back into the wilderness.
#[test]
fn law_round_trip_through_quick_list_is_transparent_to_free_list() {
    let mut a = fresh_heap();
    let p = a.allocate(8);
    let after_alloc = a.free_block_count();
    a.free(p);

    assert_eq!(a.quick_block_count(), 1);
    assert_eq!(a.free_block_count(), after_alloc);
}

/// L1 (round-trip, saturated quick list): once a stack is at capacity, one
/// more free flushes it — the freed blocks rejoin the free-list index as a
/// single coalesced run instead of staying cached.
#[test]
fn law_round_trip_flushes_quick_list_once_saturated() {
    use crate::constants::QUICK_LIST_MAX;

    let mut a = fresh_heap();
    let mut ptrs = Vec::new();
    for _ in 0..QUICK_LIST_MAX + 1 {
        ptrs.push(a.allocate(8));
    }
    for &p in &ptrs {
        a.free(p);
    }

    // The (QUICK_LIST_MAX + 1)-th free flushed the stack before caching
    // itself, so at most QUICK_LIST_MAX blocks are ever held at once.
    assert!(a.quick_blocks_of_size(32) <= QUICK_LIST_MAX);
    assert!(a.free_block_count() >= 1);
}

/// L2 (idempotent split boundary): requesting exactly the size an available
/// block already is produces no remainder; one word less does.
#[test]
fn law_split_boundary_is_exact() {
    let mut a = fresh_heap();
    // The lone bootstrap block is 4048 bytes; request exactly that much
    // payload's worth of block and it should splinter rather than split.
    let want_block_size = 4048u32;
    let payload_for_exact_block = want_block_size - 16;
    let p = a.allocate(payload_for_exact_block);
    assert!(!p.is_null());
    assert_eq!(a.free_block_count(), 0);
}

/// L3 (resize grow+free): resizing upward returns a fresh pointer and
/// retires the old block into whichever reclamation path its size is
/// eligible for.
#[test]
fn law_resize_grow_always_moves_and_retires_old_block() {
    let mut a = fresh_heap();
    let p = a.allocate(16);
    let resized = a.resize(p, 4000);

    assert!(!resized.is_null());
    assert_ne!(resized, p);
    // The vacated 32-byte block is small enough to land in the quick list
    // rather than the segregated free-list index.
    assert_eq!(a.quick_block_count(), 1);
    assert_eq!(a.quick_blocks_of_size(32), 1);
    assert_eq!(a.free_block_count(), 0);
}
