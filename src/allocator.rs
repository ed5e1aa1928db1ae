//! Allocator façade (C8): orchestrates allocate/free/resize across every
//! other component and owns the payload-accounting counters.

use log::{debug, error, warn};

use crate::block::{self, Offset};
use crate::coalesce::coalesce;
use crate::constants::{
    ALIGNMENT_PAD, FIRST_BLOCK_OFFSET, MAX_QUICK_LIST_BLOCK_SIZE, MIN_BLOCK_SIZE, WORD_SIZE,
};
use crate::diagnostics;
use crate::error::BlockAllocError;
use crate::freelist::FreeLists;
use crate::header::BlockFlags;
use crate::heap;
use crate::provider::PageProvider;
use crate::quicklist::{quicklist_index, QuickLists};
use crate::split::{self, SplitOutcome};
use crate::validate;

#[inline]
fn round_up16(n: u32) -> u32 {
    (n + 15) & !15
}

#[inline]
fn block_size_for(requested: u32) -> u32 {
    round_up16(requested + WORD_SIZE * 2).max(MIN_BLOCK_SIZE)
}

/// The block allocator: a segregated free-list/quick-list heap over whatever
/// page-granular storage `P` supplies.
///
/// Bootstraps lazily on the first call that needs heap space; until then,
/// `mem_size()` is zero and the diagnostic ratios read as zero.
pub struct Allocator<P: PageProvider> {
    provider: P,
    magic: u64,
    bootstrapped: bool,
    epilogue_offset: Offset,
    free_lists: FreeLists,
    quick_lists: QuickLists,
    errno: Option<BlockAllocError>,
    current_payload: u64,
    peak_payload: u64,
}

impl<P: PageProvider> Allocator<P> {
    /// Builds a not-yet-bootstrapped allocator over `provider`, masking every
    /// header/footer word with `magic` (tests may pass 0 for readability).
    pub fn new(provider: P, magic: u64) -> Self {
        Self {
            provider,
            magic,
            bootstrapped: false,
            epilogue_offset: 0,
            free_lists: FreeLists::new(),
            quick_lists: QuickLists::new(),
            errno: None,
            current_payload: 0,
            peak_payload: 0,
        }
    }

    /// Last recorded failure, if any. Only ever set by a failed growth
    /// attempt inside `allocate`; never cleared automatically.
    pub fn errno(&self) -> Option<BlockAllocError> {
        self.errno
    }

    /// Total bytes of the heap region, zero before the first bootstrap.
    pub fn mem_size(&self) -> usize {
        if self.bootstrapped {
            self.provider.mem_size()
        } else {
            0
        }
    }

    fn base(&self) -> *mut u8 {
        self.provider.mem_start()
    }

    fn bootstrap_if_needed(&mut self) -> Result<(), BlockAllocError> {
        if self.bootstrapped {
            return Ok(());
        }
        if !self.provider.mem_grow() {
            return Err(BlockAllocError::OutOfMemory);
        }
        let base = self.base();
        self.epilogue_offset = unsafe { heap::bootstrap(base, self.magic, &mut self.free_lists) };
        self.bootstrapped = true;
        debug!("allocator bootstrapped");
        Ok(())
    }

    /// Allocates `size` bytes and returns a pointer to the payload, or NULL.
    ///
    /// `size == 0` returns NULL without touching `errno`; any other failure
    /// (the page provider refuses to grow the heap) sets `errno` to
    /// [`BlockAllocError::OutOfMemory`] and also returns NULL.
    pub fn allocate(&mut self, size: u32) -> *mut u8 {
        if let Err(e) = self.bootstrap_if_needed() {
            self.errno = Some(e);
            warn!("allocate({size}) failed: could not bootstrap heap");
            return core::ptr::null_mut();
        }
        if size == 0 {
            return core::ptr::null_mut();
        }

        let block_size = block_size_for(size);
        let base = self.base();

        if block_size <= MAX_QUICK_LIST_BLOCK_SIZE {
            let index = quicklist_index(block_size);
            if let Some(offset) = unsafe { self.quick_lists.pop(base, self.magic, index) } {
                unsafe {
                    block::write_meta(base, offset, size, block_size, BlockFlags::THIS_ALLOCATED, self.magic)
                };
                self.account_alloc(size as u64);
                return unsafe { base.add((offset + WORD_SIZE) as usize) };
            }
        }

        let offset = match unsafe { self.free_lists.search(base, self.magic, block_size) } {
            Some(offset) => offset,
            None => match self.grow_for(block_size) {
                Ok(()) => match unsafe { self.free_lists.search(base, self.magic, block_size) } {
                    Some(offset) => offset,
                    None => {
                        self.errno = Some(BlockAllocError::OutOfMemory);
                        error!("allocate({size}): grew heap but still found no fit");
                        return core::ptr::null_mut();
                    }
                },
                Err(e) => {
                    self.errno = Some(e);
                    warn!("allocate({size}) failed: heap growth refused");
                    return core::ptr::null_mut();
                }
            },
        };

        unsafe { self.free_lists.remove(base, offset) };
        let available = unsafe { block::size_of(base, offset, self.magic) };
        if let SplitOutcome::Split {
            remainder_offset,
            remainder_size,
        } = unsafe { split::split(base, self.magic, offset, available, block_size, size) }
        {
            unsafe { self.free_lists.insert(base, self.magic, remainder_offset, remainder_size) };
        }

        self.account_alloc(size as u64);
        unsafe { base.add((offset + WORD_SIZE) as usize) }
    }

    fn grow_for(&mut self, block_size: u32) -> Result<(), BlockAllocError> {
        let base = self.base();
        let new_epilogue = unsafe {
            heap::grow(
                &mut self.provider,
                base,
                self.magic,
                self.epilogue_offset,
                FIRST_BLOCK_OFFSET,
                &mut self.free_lists,
                block_size,
            )
        }?;
        self.epilogue_offset = new_epilogue;
        Ok(())
    }

    fn account_alloc(&mut self, payload: u64) {
        self.current_payload += payload;
        self.peak_payload = self.peak_payload.max(self.current_payload);
    }

    fn payload_offset(&self, ptr: *mut u8) -> Option<u32> {
        if ptr.is_null() {
            return None;
        }
        let base = self.base() as usize;
        let p = ptr as usize;
        if p < base {
            return None;
        }
        u32::try_from(p - base).ok()
    }

    /// Frees a previously allocated (non-quick-listed) pointer.
    ///
    /// Aborts the process on contract violation: `ptr` is NULL, does not
    /// refer to a currently-allocated block, or refers to a block already
    /// sitting in the quick-list cache.
    pub fn free(&mut self, ptr: *mut u8) {
        if !self.bootstrapped {
            error!("free(): contract violation, aborting");
            panic!("free() called with an invalid pointer");
        }
        let base = self.base();
        let mem_size = self.mem_size() as u32;
        let payload_offset = self.payload_offset(ptr);
        let offset = payload_offset.and_then(|po| unsafe {
            validate::validate_payload_offset(base, self.magic, po, mem_size)
        });
        let offset = match offset {
            Some(offset) => offset,
            None => {
                error!("free(): contract violation, aborting");
                panic!("free() called with an invalid pointer");
            }
        };

        let (payload, size, _) = unsafe { block::read_meta(base, offset, self.magic) };
        self.current_payload -= payload as u64;

        if size <= MAX_QUICK_LIST_BLOCK_SIZE {
            unsafe {
                self.quick_lists.push(
                    base,
                    self.magic,
                    offset,
                    size,
                    &mut self.free_lists,
                    FIRST_BLOCK_OFFSET,
                    self.epilogue_offset,
                )
            };
        } else {
            unsafe {
                block::write_meta(base, offset, 0, size, BlockFlags::empty(), self.magic);
                let (merged_offset, merged_size) = coalesce(
                    base,
                    self.magic,
                    offset,
                    size,
                    &mut self.free_lists,
                    FIRST_BLOCK_OFFSET,
                    self.epilogue_offset,
                );
                self.free_lists.insert(base, self.magic, merged_offset, merged_size);
            }
        }
    }

    /// Resizes the block backing `ptr` to `new_size` bytes, possibly moving
    /// it. Returns NULL (leaving the old block intact) on an invalid pointer
    /// or a failed grow; `new_size == 0` is equivalent to `free(ptr)`.
    pub fn resize(&mut self, ptr: *mut u8, new_size: u32) -> *mut u8 {
        if new_size == 0 {
            self.free(ptr);
            return core::ptr::null_mut();
        }
        if !self.bootstrapped {
            return core::ptr::null_mut();
        }

        let base = self.base();
        let mem_size = self.mem_size() as u32;
        let payload_offset = match self.payload_offset(ptr) {
            Some(po) => po,
            None => return core::ptr::null_mut(),
        };
        let offset = match unsafe {
            validate::validate_payload_offset(base, self.magic, payload_offset, mem_size)
        } {
            Some(offset) => offset,
            None => return core::ptr::null_mut(),
        };

        let (old_payload, bs, _) = unsafe { block::read_meta(base, offset, self.magic) };
        let new_bs = block_size_for(new_size);

        if new_bs > bs {
            let new_ptr = self.allocate(new_size);
            if new_ptr.is_null() {
                return core::ptr::null_mut();
            }
            let copy_len = (bs - WORD_SIZE * 2) as usize;
            unsafe { core::ptr::copy_nonoverlapping(ptr, new_ptr, copy_len) };
            self.free(ptr);
            return new_ptr;
        }

        if bs - new_bs >= MIN_BLOCK_SIZE {
            unsafe {
                block::write_meta(base, offset, new_size, new_bs, BlockFlags::THIS_ALLOCATED, self.magic)
            };
            let remainder_offset = offset + new_bs;
            let remainder_size = bs - new_bs;
            unsafe {
                block::write_meta(base, remainder_offset, 0, remainder_size, BlockFlags::empty(), self.magic);
                let (merged_offset, merged_size) = coalesce(
                    base,
                    self.magic,
                    remainder_offset,
                    remainder_size,
                    &mut self.free_lists,
                    FIRST_BLOCK_OFFSET,
                    self.epilogue_offset,
                );
                self.free_lists.insert(base, self.magic, merged_offset, merged_size);
            }
            self.current_payload = self.current_payload - old_payload as u64 + new_size as u64;
            self.peak_payload = self.peak_payload.max(self.current_payload);
            return ptr;
        }

        unsafe { block::write_meta(base, offset, new_size, bs, BlockFlags::THIS_ALLOCATED, self.magic) };
        self.current_payload = self.current_payload - old_payload as u64 + new_size as u64;
        self.peak_payload = self.peak_payload.max(self.current_payload);
        ptr
    }

    /// Fraction of allocated-block bytes spent on actual user payload.
    pub fn fragmentation(&self) -> f64 {
        if !self.bootstrapped {
            return 0.0;
        }
        unsafe { diagnostics::fragmentation(self.base(), self.magic, self.mem_size() as u32) }
    }

    /// Fraction of heap bytes occupied by the highest payload total ever
    /// live at once.
    pub fn utilization(&self) -> f64 {
        diagnostics::utilization(self.peak_payload, self.mem_size() as u32)
    }

    /// Number of free blocks of exactly `size` bytes (scenario tests only).
    #[cfg(test)]
    pub(crate) fn free_blocks_of_size(&self, size: u32) -> usize {
        self.free_lists.count_size(self.base(), self.magic, size)
    }

    /// Total number of free blocks across every class (scenario tests only).
    #[cfg(test)]
    pub(crate) fn free_block_count(&self) -> usize {
        self.free_lists.count(self.base())
    }

    /// Offset of the block most recently inserted into the class holding
    /// `size`-byte blocks (scenario tests only, for LIFO tie-break checks).
    #[cfg(test)]
    pub(crate) fn first_free_of_size(&self, size: u32) -> Option<Offset> {
        self.free_lists.first_of_size(self.base(), self.magic, size)
    }

    /// Number of blocks currently cached in the quick-list stack for `size`
    /// bytes (scenario tests only).
    #[cfg(test)]
    pub(crate) fn quick_blocks_of_size(&self, size: u32) -> usize {
        self.quick_lists.len_for_size(size)
    }

    /// Total number of quick-listed blocks across every stack (scenario tests only).
    #[cfg(test)]
    pub(crate) fn quick_block_count(&self) -> usize {
        self.quick_lists.total_len()
    }

    /// Byte offset of `ptr`'s block, for scenario tests that need to pass a
    /// specific live pointer's offset back into a test-only accessor.
    #[cfg(test)]
    pub(crate) fn offset_of(&self, ptr: *mut u8) -> u32 {
        self.payload_offset(ptr).expect("ptr must be within the heap") - WORD_SIZE
    }

    /// Sum of every block's `block_size` including the prologue (epilogue
    /// excluded, its header encodes size 0 anyway), by a pure linear walk
    /// from the prologue to the epilogue. Matches P2's `mem_end - mem_start -
    /// 16` exactly: the 16 subtracted is the alignment pad and the epilogue's
    /// header-only 8 bytes, nothing else.
    #[cfg(test)]
    pub(crate) fn total_block_bytes(&self) -> u32 {
        let base = self.base();
        let mut offset = ALIGNMENT_PAD;
        let mut sum = 0u32;
        while offset < self.epilogue_offset {
            let size = unsafe { block::size_of(base, offset, self.magic) };
            sum += size;
            offset += size;
        }
        sum
    }

    /// Bytes currently accounted as live user payload (P5 scenario tests only).
    #[cfg(test)]
    pub(crate) fn current_payload(&self) -> u64 {
        self.current_payload
    }

    /// Highest payload total ever live at once (P5 scenario tests only).
    #[cfg(test)]
    pub(crate) fn peak_payload(&self) -> u64 {
        self.peak_payload
    }
}
