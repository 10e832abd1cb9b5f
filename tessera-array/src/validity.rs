//! Validity bitmap allocation.
//!
//! Validity bitmaps use one bit per element: set = valid, unset = null.

use tessera_buffer::bit::bytes_for_bits;
use tessera_buffer::Buffer;
use tessera_error::{TesseraExpect, TesseraResult};

/// Allocate a validity bitmap covering `bits` elements, all marked valid.
pub fn allocate_validity_bitmap(bits: usize) -> TesseraResult<Buffer> {
    let mut bitmap = Buffer::allocate(bytes_for_bits(bits))?;
    bitmap
        .as_mut_slice()
        .tessera_expect("freshly allocated bitmap is unique and mutable")
        .fill(0xFF);
    Ok(bitmap)
}
