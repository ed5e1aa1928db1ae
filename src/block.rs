//! Block cursor (C2): raw header/footer/link access and left/right neighbor
//! navigation via boundary tags.
//!
//! Every block is addressed by a `u32` byte offset from `mem_start`, never by
//! a raw pointer (see the "arena+index" representation note in the design
//! notes) — only the functions in this module ever turn an offset into an
//! actual `*mut u8` to perform a read or write.

use crate::header::{self, BlockFlags};

/// A block's position, in bytes, relative to `mem_start`.
pub type Offset = u32;

/// Offsets into a free block's payload region where its doubly-linked
/// free-list links live (the first 16 payload bytes per the data model; this
/// representation only needs 8 of those 16, see the design notes).
const LINK_NEXT_OFFSET: u32 = 8;
const LINK_PREV_OFFSET: u32 = 12;

#[inline]
unsafe fn ptr_at(base: *mut u8, offset: Offset) -> *mut u8 {
    unsafe { base.add(offset as usize) }
}

/// Reads the raw (still-masked) 64-bit word at `offset`.
///
/// # Safety
/// `offset..offset+8` must be valid, initialized, 8-byte-aligned memory
/// within the heap region rooted at `base`.
pub unsafe fn read_word(base: *mut u8, offset: Offset) -> u64 {
    unsafe { (ptr_at(base, offset) as *const u64).read() }
}

/// Writes a raw (already-masked) 64-bit word at `offset`.
///
/// # Safety
/// Same requirements as [`read_word`], plus the memory must be writable.
pub unsafe fn write_word(base: *mut u8, offset: Offset, value: u64) {
    unsafe { (ptr_at(base, offset) as *mut u64).write(value) };
}

/// Computes the footer offset for a block of `size` bytes starting at `offset`.
#[inline]
pub fn footer_offset(offset: Offset, size: u32) -> Offset {
    offset + size - 8
}

/// Reads and decodes the header word at `offset`.
///
/// # Safety
/// Same requirements as [`read_word`].
pub unsafe fn read_meta(base: *mut u8, offset: Offset, magic: u64) -> (u32, u32, BlockFlags) {
    header::decode(unsafe { read_word(base, offset) }, magic)
}

/// Writes `(payload, size, flags)` to both the header and footer of a block.
///
/// This is the single point through which any block's metadata is mutated;
/// header and footer are always kept in lockstep.
///
/// # Safety
/// `offset..offset+size` must be valid, writable memory within the heap.
pub unsafe fn write_meta(
    base: *mut u8,
    offset: Offset,
    payload: u32,
    size: u32,
    flags: BlockFlags,
    magic: u64,
) {
    let word = header::encode(payload, size, flags, magic);
    unsafe {
        write_word(base, offset, word);
        write_word(base, footer_offset(offset, size), word);
    }
}

/// Size field of the block at `offset`, decoded from its header.
///
/// # Safety
/// Same requirements as [`read_word`].
pub unsafe fn size_of(base: *mut u8, offset: Offset, magic: u64) -> u32 {
    header::size_of_word(unsafe { read_word(base, offset) }, magic)
}

/// Whether the block at `offset` is currently allocated.
///
/// # Safety
/// Same requirements as [`read_word`].
pub unsafe fn is_allocated(base: *mut u8, offset: Offset, magic: u64) -> bool {
    header::is_allocated_word(unsafe { read_word(base, offset) }, magic)
}

/// Left neighbor of the block at `offset`, found via its boundary-tag footer.
///
/// Returns `None` if `offset` is the first regular block (its left neighbor
/// would be the prologue, which never participates in coalescing).
///
/// # Safety
/// `offset` must be a valid block offset and the footer word at `offset - 8`
/// must belong to a real, previously-written block.
pub unsafe fn prev_offset(
    base: *mut u8,
    offset: Offset,
    magic: u64,
    first_block_offset: Offset,
) -> Option<Offset> {
    if offset <= first_block_offset {
        return None;
    }
    let prev_size = header::size_of_word(unsafe { read_word(base, offset - 8) }, magic);
    Some(offset - prev_size)
}

/// Right neighbor of the block at `offset`.
///
/// Returns `None` if the neighbor would be at or past the epilogue.
///
/// # Safety
/// Same requirements as [`read_word`] applied to `offset`.
pub unsafe fn next_offset(
    base: *mut u8,
    offset: Offset,
    magic: u64,
    epilogue_offset: Offset,
) -> Option<Offset> {
    let size = unsafe { size_of(base, offset, magic) };
    let next = offset + size;
    if next >= epilogue_offset {
        None
    } else {
        Some(next)
    }
}

/// Reads the free-list "next" link stored in a free block's payload.
///
/// # Safety
/// `offset` must refer to a block currently on a free list (or a sentinel
/// slot formatted the same way).
pub unsafe fn read_link_next(base: *mut u8, offset: Offset) -> u32 {
    unsafe { (ptr_at(base, offset + LINK_NEXT_OFFSET) as *const u32).read() }
}

/// Writes the free-list "next" link.
///
/// # Safety
/// Same requirements as [`read_link_next`], plus the memory must be writable.
pub unsafe fn write_link_next(base: *mut u8, offset: Offset, value: u32) {
    unsafe { (ptr_at(base, offset + LINK_NEXT_OFFSET) as *mut u32).write(value) };
}

/// Reads the free-list "prev" link stored in a free block's payload.
///
/// # Safety
/// Same requirements as [`read_link_next`].
pub unsafe fn read_link_prev(base: *mut u8, offset: Offset) -> u32 {
    unsafe { (ptr_at(base, offset + LINK_PREV_OFFSET) as *const u32).read() }
}

/// Writes the free-list "prev" link.
///
/// # Safety
/// Same requirements as [`read_link_next`], plus the memory must be writable.
pub unsafe fn write_link_prev(base: *mut u8, offset: Offset, value: u32) {
    unsafe { (ptr_at(base, offset + LINK_PREV_OFFSET) as *mut u32).write(value) };
}
