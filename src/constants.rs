//! Block allocator layout constants.
//!
//! This crate has no lower-level ABI crate to source these from (unlike a kernel
//! build, which typically re-exports them from a shared `abi` crate), so they are
//! defined directly here and re-exported from the crate root.

/// Page granularity of the host's [`PageProvider`](crate::provider::PageProvider).
pub const PAGE_SIZE: usize = 4096;

/// Every block, free or allocated, is at least this many bytes (header+footer
/// overhead plus two link-field-sized words of payload/slack).
pub const MIN_BLOCK_SIZE: u32 = 32;

/// All block sizes and pointers returned to callers are multiples of this.
pub const ALIGNMENT: usize = 16;

/// Number of size-class buckets in the segregated free-list index.
pub const NUM_FREE_LISTS: usize = 10;

/// Number of exact-size LIFO stacks in the quick-list cache.
pub const NUM_QUICK_LISTS: usize = 10;

/// Blocks per quick-list stack before a push triggers a flush.
pub const QUICK_LIST_MAX: usize = 5;

/// Largest block size eligible for the quick-list cache.
pub const MAX_QUICK_LIST_BLOCK_SIZE: u32 = MIN_BLOCK_SIZE + 16 * (NUM_QUICK_LISTS as u32 - 1);

/// Bytes reserved at `mem_start` before the first block (never addressed as one).
pub const ALIGNMENT_PAD: u32 = 8;

/// Size of the permanently-allocated prologue block.
pub const PROLOGUE_SIZE: u32 = MIN_BLOCK_SIZE;

/// Offset of the first regular block from `mem_start`: pad + prologue.
pub const FIRST_BLOCK_OFFSET: u32 = ALIGNMENT_PAD + PROLOGUE_SIZE;

/// Size of the header-only epilogue sentinel.
pub const EPILOGUE_SIZE: u32 = 8;

/// Size of a masked header or footer word.
pub const WORD_SIZE: u32 = 8;
