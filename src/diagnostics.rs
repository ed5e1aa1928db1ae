//! Diagnostics (C9): fragmentation and utilization ratios over the current
//! heap, computed by a pure linear walk — neither index is consulted.

use crate::block::{self, Offset};
use crate::constants::{EPILOGUE_SIZE, FIRST_BLOCK_OFFSET};
use crate::header::BlockFlags;

/// Fraction of allocated-block bytes that are actual user payload, summed
/// across every non-quick allocated block reachable by a linear walk of the
/// heap. Zero if nothing is allocated yet (including before bootstrap, when
/// `mem_size` is zero).
///
/// # Safety
/// `base` must be a bootstrapped heap of `mem_size` bytes whose blocks are
/// all validly chained header-to-header from `FIRST_BLOCK_OFFSET`.
pub unsafe fn fragmentation(base: *mut u8, magic: u64, mem_size: u32) -> f64 {
    if mem_size == 0 {
        return 0.0;
    }
    let epilogue_offset = mem_size - EPILOGUE_SIZE;
    let mut offset: Offset = FIRST_BLOCK_OFFSET;
    let mut payload_sum: u64 = 0;
    let mut block_sum: u64 = 0;

    while offset < epilogue_offset {
        let (payload, size, flags) = unsafe { block::read_meta(base, offset, magic) };
        if flags.contains(BlockFlags::THIS_ALLOCATED) && !flags.contains(BlockFlags::IN_QUICK_LIST) {
            payload_sum += payload as u64;
            block_sum += size as u64;
        }
        offset += size;
    }

    if payload_sum == 0 {
        0.0
    } else {
        payload_sum as f64 / block_sum as f64
    }
}

/// Ratio of the highest payload total ever live at once to the total heap
/// size. Zero before bootstrap (`mem_size == 0`).
pub fn utilization(peak_payload: u64, mem_size: u32) -> f64 {
    if mem_size == 0 {
        0.0
    } else {
        peak_payload as f64 / mem_size as f64
    }
}
