//! Pointer validation (C10): reject frees/resizes of pointers that cannot
//! refer to a valid allocated block.

use crate::block::{self, Offset};
use crate::constants::{ALIGNMENT, EPILOGUE_SIZE, FIRST_BLOCK_OFFSET, MIN_BLOCK_SIZE, WORD_SIZE};
use crate::header;

/// Checks every condition of the pointer-validation predicate against the
/// block whose header would sit `WORD_SIZE` bytes before `payload_offset`,
/// and returns its offset if the pointer is legitimate.
///
/// Does not check `THIS_ALLOCATED`/`IN_QUICK_LIST` against the caller's
/// intent (free vs. resize may want slightly different flag checks on top of
/// this); those are left to the caller. Checks performed here: alignment,
/// in-bounds, size well-formedness, header/footer agreement.
///
/// # Safety
/// `payload_offset` must be small enough that `payload_offset - WORD_SIZE`
/// and the block it names (if any) stay within `0..mem_size`; callers must
/// have already checked `payload_offset >= FIRST_BLOCK_OFFSET + WORD_SIZE`
/// before calling, which this function also re-checks.
pub unsafe fn validate_payload_offset(
    base: *mut u8,
    magic: u64,
    payload_offset: u32,
    mem_size: u32,
) -> Option<Offset> {
    if payload_offset % ALIGNMENT as u32 != 0 {
        return None;
    }
    if payload_offset < WORD_SIZE {
        return None;
    }
    let block_offset = payload_offset - WORD_SIZE;
    if block_offset < FIRST_BLOCK_OFFSET {
        return None;
    }

    let epilogue_offset = mem_size - EPILOGUE_SIZE;
    let header_word = unsafe { block::read_word(base, block_offset) };
    let size = header::size_of_word(header_word, magic);
    if size % 16 != 0 || size < MIN_BLOCK_SIZE {
        return None;
    }
    if block_offset + size > epilogue_offset {
        return None;
    }

    let (_, _, flags) = header::decode(header_word, magic);
    if !flags.contains(crate::header::BlockFlags::THIS_ALLOCATED)
        || flags.contains(crate::header::BlockFlags::IN_QUICK_LIST)
    {
        return None;
    }

    let footer_word = unsafe { block::read_word(base, block::footer_offset(block_offset, size)) };
    if footer_word != header_word {
        return None;
    }

    Some(block_offset)
}
