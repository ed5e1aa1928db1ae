//! The page-grain memory provider: the host collaborator this crate never owns.
//!
//! Mirrors the boundary between `kernel_heap.rs` and `page_alloc.rs` in a typical
//! slab/buddy kernel heap: the heap-management layer never knows how pages are
//! actually backed, it only asks its collaborator for "one more page" and reads
//! back the current bounds.

/// Supplies page-granular storage for the block allocator's heap.
///
/// Implementations own the actual backing storage — a static array, an
/// anonymous `mmap`, a kernel physical-page allocator plus a mapping layer,
/// whatever the host has available. The block allocator only ever asks for
/// whole pages, appended contiguously to the end of the current region; it
/// never asks for a page back.
///
/// # Base-address stability
/// [`PageProvider::mem_start`] must return the same address for the whole
/// lifetime of the provider once any page has been granted; growth may only
/// extend the region at [`PageProvider::mem_end`], exactly like `sbrk`/`brk`
/// or a reserved-and-incrementally-committed `mmap` region. The allocator
/// caches `mem_start()` across a single façade call (including across a
/// nested `mem_grow()` triggered by that call) and relies on it never moving;
/// an implementation backed by a reallocating growable buffer must pre-reserve
/// its full capacity up front rather than growing that buffer on demand.
pub trait PageProvider {
    /// Request one more page (of `PAGE_SIZE` bytes, see [`crate::constants::PAGE_SIZE`])
    /// appended to the heap. Returns `true` if the page was appended and
    /// [`PageProvider::mem_end`] has advanced accordingly; `false` if no more
    /// pages are available, in which case the region is left unchanged.
    fn mem_grow(&mut self) -> bool;

    /// Lower bound of the current heap region, inclusive.
    fn mem_start(&self) -> *mut u8;

    /// Upper bound of the current heap region, exclusive.
    fn mem_end(&self) -> *mut u8;

    /// Current size of the heap region in bytes.
    fn mem_size(&self) -> usize {
        (self.mem_end() as usize).saturating_sub(self.mem_start() as usize)
    }
}
