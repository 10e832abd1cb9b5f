//! Bit manipulation over validity bitmaps.
//!
//! Bitmaps encode one bit per logical element: bit set = valid, bit unset =
//! null. Indexing functions perform no bounds checking beyond the slice's
//! own; staying within the bitmap's bit length is the caller's
//! responsibility.

use tessera_error::{TesseraExpect, TesseraResult};

use crate::Buffer;

/// Bytes required to hold `bits` bits.
pub fn bytes_for_bits(bits: usize) -> usize {
    bits.div_ceil(8)
}

/// Whether bit `i` is set.
#[inline]
pub fn get_bit(bits: &[u8], i: usize) -> bool {
    bits[i / 8] & (1 << (i % 8)) != 0
}

/// Whether bit `i` is unset.
#[inline]
pub fn bit_not_set(bits: &[u8], i: usize) -> bool {
    !get_bit(bits, i)
}

/// Set bit `i`.
#[inline]
pub fn set_bit(bits: &mut [u8], i: usize) {
    bits[i / 8] |= 1 << (i % 8);
}

/// Clear bit `i`.
#[inline]
pub fn clear_bit(bits: &mut [u8], i: usize) {
    bits[i / 8] &= !(1 << (i % 8));
}

/// Count the unset bits in `[offset, offset + length)`.
pub fn count_unset_bits(bits: &[u8], offset: usize, length: usize) -> usize {
    (offset..offset + length)
        .filter(|i| bit_not_set(bits, *i))
        .count()
}

/// Copy `bit_length` bits starting at `bit_offset` from `src` into the low
/// bits of `dst`, shifting as needed for unaligned starting offsets.
///
/// `dst` must hold at least [`bytes_for_bits`]`(bit_length)` zeroed bytes.
pub fn copy_bits(src: &[u8], bit_offset: usize, bit_length: usize, dst: &mut [u8]) {
    if bit_offset % 8 == 0 {
        // Byte-aligned fast path: copy whole bytes, then mask the bits past
        // the requested length in the final byte.
        let nbytes = bytes_for_bits(bit_length);
        dst[..nbytes].copy_from_slice(&src[bit_offset / 8..bit_offset / 8 + nbytes]);
        let trailing = bit_length % 8;
        if trailing != 0 {
            dst[nbytes - 1] &= (1 << trailing) - 1;
        }
        return;
    }
    for i in 0..bit_length {
        if get_bit(src, bit_offset + i) {
            set_bit(dst, i);
        }
    }
}

/// Copy a bit range out of a bitmap buffer into a freshly allocated one,
/// sized to hold `bit_length` bits and rebased to bit zero.
pub fn copy_bitmap(src: &Buffer, bit_offset: usize, bit_length: usize) -> TesseraResult<Buffer> {
    let mut out = Buffer::allocate(bytes_for_bits(bit_length))?;
    copy_bits(
        src.as_slice(),
        bit_offset,
        bit_length,
        out.as_mut_slice()
            .tessera_expect("freshly allocated buffer is unique and mutable"),
    );
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sizing() {
        assert_eq!(bytes_for_bits(0), 0);
        assert_eq!(bytes_for_bits(1), 1);
        assert_eq!(bytes_for_bits(8), 1);
        assert_eq!(bytes_for_bits(9), 2);
    }

    #[test]
    fn set_get_clear() {
        let mut bits = [0u8; 2];
        set_bit(&mut bits, 0);
        set_bit(&mut bits, 9);
        assert!(get_bit(&bits, 0));
        assert!(bit_not_set(&bits, 1));
        assert!(get_bit(&bits, 9));
        assert_eq!(bits, [0b0000_0001, 0b0000_0010]);
        clear_bit(&mut bits, 9);
        assert!(bit_not_set(&bits, 9));
    }

    #[test]
    fn unset_counting() {
        let bits = [0b1010_1010u8];
        assert_eq!(count_unset_bits(&bits, 0, 8), 4);
        assert_eq!(count_unset_bits(&bits, 1, 4), 2);
        assert_eq!(count_unset_bits(&bits, 0, 0), 0);
    }

    #[test]
    fn copy_aligned() {
        let src = Buffer::copy_from(&[0b1011_0100, 0b0000_0001]).unwrap();
        let out = copy_bitmap(&src, 0, 10).unwrap();
        assert_eq!(out.as_slice(), &[0b1011_0100, 0b0000_0001]);
        // Trailing bits past the length are masked off.
        let short = copy_bitmap(&src, 0, 5).unwrap();
        assert_eq!(short.as_slice(), &[0b0001_0100]);
    }

    #[test]
    fn copy_unaligned_shifts() {
        let src = Buffer::copy_from(&[0b1011_0100]).unwrap();
        let out = copy_bitmap(&src, 3, 5).unwrap();
        // Source bits 3..8 are 0,1,1,0,1 (LSB first); rebased to bit zero.
        assert_eq!(out.as_slice(), &[0b0001_0110]);
    }
}
