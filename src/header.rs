//! Header/footer codec (C1): pack and unpack the masked 64-bit metadata word.
//!
//! A header (or footer) word is logically three fields — `payload_bytes` in
//! bits [63:32], `block_size` in bits [31:4], `flags` in bits [3:0] — XORed
//! with a process-wide magic before it ever touches memory. `block_size` is
//! always a multiple of 16, so bits [3:0] are free for flags without
//! disturbing the size field.

use bitflags::bitflags;

bitflags! {
    /// Flag bits packed into the low nibble of a header/footer word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BlockFlags: u64 {
        /// The block currently holds live payload (set for both ordinary
        /// allocations and quick-listed blocks).
        const THIS_ALLOCATED = 0b0001;
        /// The block is sitting in a quick-list stack, not the free-list index.
        const IN_QUICK_LIST   = 0b0100;
    }
}

const SIZE_MASK: u64 = 0x0000_0000_FFFF_FFF0;
const PAYLOAD_SHIFT: u32 = 32;

/// Packs `(payload, size, flags)` into a header/footer word and masks it with `magic`.
///
/// `size` must already be a multiple of 16; its low 4 bits are ORed together
/// with `flags` rather than added, matching the bit layout in the data model.
pub fn encode(payload: u32, size: u32, flags: BlockFlags, magic: u64) -> u64 {
    debug_assert_eq!(size & 0xF, 0, "block size must be 16-aligned");
    let word = ((payload as u64) << PAYLOAD_SHIFT) | (size as u64) | flags.bits();
    word ^ magic
}

/// Unmasks a stored word and splits it back into `(payload, size, flags)`.
///
/// `size` is recovered by clearing the low 4 bits, which belong to `flags`.
pub fn decode(stored: u64, magic: u64) -> (u32, u32, BlockFlags) {
    let word = stored ^ magic;
    let payload = (word >> PAYLOAD_SHIFT) as u32;
    let size = (word & SIZE_MASK) as u32;
    let flags = BlockFlags::from_bits_truncate(word & 0xF);
    (payload, size, flags)
}

/// `size` field of a decoded word, without paying for the payload/flags split.
pub fn size_of_word(stored: u64, magic: u64) -> u32 {
    ((stored ^ magic) & SIZE_MASK) as u32
}

/// `payload` field of a decoded word.
pub fn payload_of_word(stored: u64, magic: u64) -> u32 {
    ((stored ^ magic) >> PAYLOAD_SHIFT) as u32
}

/// Whether the decoded word has `THIS_ALLOCATED` set.
pub fn is_allocated_word(stored: u64, magic: u64) -> bool {
    BlockFlags::from_bits_truncate((stored ^ magic) & 0xF).contains(BlockFlags::THIS_ALLOCATED)
}

/// Whether the decoded word has `IN_QUICK_LIST` set.
pub fn is_in_quick_list_word(stored: u64, magic: u64) -> bool {
    BlockFlags::from_bits_truncate((stored ^ magic) & 0xF).contains(BlockFlags::IN_QUICK_LIST)
}

/// A header/footer corrupt for pointer-validation purposes: an unmasked size
/// that isn't a 16-multiple no smaller than `min_block_size`.
pub fn looks_corrupt(stored: u64, magic: u64, min_block_size: u32) -> bool {
    let size = size_of_word(stored, magic);
    size % 16 != 0 || size < min_block_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_zero_magic() {
        let word = encode(128, 48, BlockFlags::THIS_ALLOCATED, 0);
        assert_eq!(decode(word, 0), (128, 48, BlockFlags::THIS_ALLOCATED));
    }

    #[test]
    fn round_trips_with_nonzero_magic() {
        let magic = 0xDEAD_BEEF_CAFE_F00D;
        let word = encode(
            4096,
            64,
            BlockFlags::THIS_ALLOCATED | BlockFlags::IN_QUICK_LIST,
            magic,
        );
        assert_ne!(word, encode(4096, 64, BlockFlags::THIS_ALLOCATED | BlockFlags::IN_QUICK_LIST, 0));
        let (payload, size, flags) = decode(word, magic);
        assert_eq!(payload, 4096);
        assert_eq!(size, 64);
        assert!(flags.contains(BlockFlags::THIS_ALLOCATED));
        assert!(flags.contains(BlockFlags::IN_QUICK_LIST));
    }

    #[test]
    fn free_block_has_no_flags() {
        let word = encode(0, 32, BlockFlags::empty(), 0);
        assert!(!is_allocated_word(word, 0));
        assert!(!is_in_quick_list_word(word, 0));
    }

    #[test]
    fn corrupt_size_detected() {
        // A word whose size field is not 16-aligned.
        let word = 0x0000_0000_0000_0005u64;
        assert!(looks_corrupt(word, 0, 32));
        let word = encode(0, 16, BlockFlags::empty(), 0);
        assert!(looks_corrupt(word, 0, 32)); // below MIN_BLOCK_SIZE
        let word = encode(0, 48, BlockFlags::empty(), 0);
        assert!(!looks_corrupt(word, 0, 32));
    }
}
