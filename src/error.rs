//! Error type for the block allocator.
//!
//! The public façade mostly reports failure the way the original contract does
//! (a null pointer plus an out-of-band errno slot, see [`crate::allocator::Allocator`]),
//! but internal helpers that request more heap from the [`PageProvider`](crate::provider::PageProvider)
//! need a real `Result` to propagate "the host refused to grow" up through a few
//! call frames before it gets turned into the errno-and-null contract at the façade.

use core::fmt;

/// Recoverable failure of the block allocator core.
///
/// Contract violations (double free, freeing a quick-listed block, freeing a
/// corrupted or foreign pointer) are not represented here: per the error-handling
/// design, they abort the process rather than returning a `Result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockAllocError {
    /// The host's page provider could not supply another page.
    OutOfMemory,
}

impl fmt::Display for BlockAllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "page provider could not grow the heap"),
        }
    }
}

/// Convenience result type for fallible internal allocator operations.
pub type BlockAllocResult<T = ()> = Result<T, BlockAllocError>;
