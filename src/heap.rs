//! Heap bootstrap and growth (C7): lay down the pad/prologue/epilogue once,
//! then extend the free region page by page as larger requests demand it.

use log::trace;

use crate::block::{self, Offset};
use crate::coalesce::coalesce;
use crate::constants::{
    ALIGNMENT_PAD, EPILOGUE_SIZE, FIRST_BLOCK_OFFSET, PAGE_SIZE, PROLOGUE_SIZE,
};
use crate::error::{BlockAllocError, BlockAllocResult};
use crate::freelist::FreeLists;
use crate::header::BlockFlags;
use crate::provider::PageProvider;

/// Writes the fixed pad, prologue, and epilogue, and inserts the one free
/// block that spans the rest of the first page, into `free_lists`.
///
/// Idempotent: callers must only invoke this once per allocator instance,
/// on its first page (enforced by `Allocator` via a `bootstrapped` flag, not
/// by this function itself).
///
/// # Safety
/// `base` must point at a writable region of at least `PAGE_SIZE` bytes, and
/// no other block metadata may yet exist in it.
pub unsafe fn bootstrap(base: *mut u8, magic: u64, free_lists: &mut FreeLists) -> Offset {
    unsafe {
        block::write_meta(
            base,
            ALIGNMENT_PAD,
            0,
            PROLOGUE_SIZE,
            BlockFlags::THIS_ALLOCATED,
            magic,
        );
    }

    let epilogue_offset = PAGE_SIZE as u32 - EPILOGUE_SIZE;
    let first_free_size = epilogue_offset - FIRST_BLOCK_OFFSET;
    unsafe { free_lists.insert(base, magic, FIRST_BLOCK_OFFSET, first_free_size) };

    unsafe {
        block::write_word(
            base,
            epilogue_offset,
            crate::header::encode(0, 0, BlockFlags::THIS_ALLOCATED, magic),
        );
    }

    trace!(
        "heap bootstrapped: first free block at {FIRST_BLOCK_OFFSET}, {first_free_size} bytes"
    );
    epilogue_offset
}

/// Grows the heap, one page at a time, until at least `min_size` additional
/// free bytes are available at the tail of the region, coalescing each new
/// page's worth of memory with whatever free block used to back the old
/// epilogue. Returns the new epilogue offset.
///
/// # Safety
/// `base`/`magic`/`epilogue_offset`/`first_block_offset` must describe a
/// heap previously initialized by [`bootstrap`] (and possibly already grown).
pub unsafe fn grow(
    provider: &mut dyn PageProvider,
    base: *mut u8,
    magic: u64,
    mut epilogue_offset: Offset,
    first_block_offset: Offset,
    free_lists: &mut FreeLists,
    min_size: u32,
) -> BlockAllocResult<Offset> {
    // `total_added` tracks the size of the block that results from merging
    // each newly-added page with whatever was free at the tail already, not
    // the raw page count — a page landing next to a large existing free
    // block can satisfy `min_size` in fewer pages than `min_size / PAGE_SIZE`.
    let mut total_added = 0u32;
    while total_added < min_size {
        if !provider.mem_grow() {
            return Err(BlockAllocError::OutOfMemory);
        }

        let old_epilogue = epilogue_offset;
        let new_epilogue = old_epilogue + PAGE_SIZE as u32;
        let new_free_size = PAGE_SIZE as u32;

        unsafe {
            block::write_meta(base, old_epilogue, 0, new_free_size, BlockFlags::empty(), magic);
            block::write_word(
                base,
                new_epilogue,
                crate::header::encode(0, 0, BlockFlags::THIS_ALLOCATED, magic),
            );
        }

        let (merged_offset, merged_size) = unsafe {
            coalesce(
                base,
                magic,
                old_epilogue,
                new_free_size,
                free_lists,
                first_block_offset,
                new_epilogue,
            )
        };
        unsafe { free_lists.insert(base, magic, merged_offset, merged_size) };

        epilogue_offset = new_epilogue;
        total_added = merged_size;
    }

    trace!("heap grown to {epilogue_offset} bytes (epilogue)");
    Ok(epilogue_offset)
}
