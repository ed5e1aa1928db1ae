//! A disposable, heap-backed [`PageProvider`] for driving this crate's own
//! unit and scenario tests; not part of the public API.

use crate::constants::PAGE_SIZE;
use crate::provider::PageProvider;

/// Grows a `Vec<u8>` one page at a time, up to `max_pages`, standing in for
/// whatever page-granular region a real host would supply.
///
/// The full `max_pages * PAGE_SIZE` capacity is reserved at construction time
/// and never exceeded, so `storage.resize` below never reallocates: this
/// satisfies [`PageProvider`]'s base-address-stability requirement the same
/// way a real `mmap`-backed provider would by reserving address space up
/// front and only committing pages into it.
pub struct VecPageProvider {
    storage: Vec<u8>,
    max_pages: usize,
}

impl VecPageProvider {
    /// A provider that will refuse to grow past `max_pages` pages.
    pub fn with_page_limit(max_pages: usize) -> Self {
        Self {
            storage: Vec::with_capacity(max_pages * PAGE_SIZE),
            max_pages,
        }
    }

    /// How many pages have been granted so far.
    pub fn pages_granted(&self) -> usize {
        self.storage.len() / PAGE_SIZE
    }
}

impl PageProvider for VecPageProvider {
    fn mem_grow(&mut self) -> bool {
        if self.pages_granted() >= self.max_pages {
            return false;
        }
        let new_len = self.storage.len() + PAGE_SIZE;
        debug_assert!(new_len <= self.storage.capacity(), "would reallocate and move the base address");
        self.storage.resize(new_len, 0);
        true
    }

    fn mem_start(&self) -> *mut u8 {
        self.storage.as_ptr() as *mut u8
    }

    fn mem_end(&self) -> *mut u8 {
        unsafe { self.storage.as_ptr().add(self.storage.len()) as *mut u8 }
    }
}
