//! Variable-length integers for the ctl stream's jump fields.
//!
//! Row jumps and column jumps are almost always tiny but are bounded only
//! by the matrix dimensions, so the ctl stream stores them base-128: seven
//! value bits per byte, low bits first, high bit flagging a continuation.
//! A jump below 128 costs a single byte. Decoding is panic-free and bounded
//! by the ten bytes a `u64` can occupy.

use std::io::Cursor;

use crate::error::CsxError;

/// Appends one jump value to the ctl buffer in base-128.
pub fn encode_one(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push(value as u8 | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Reads one jump value from the ctl cursor.
///
/// A `u64` spans at most ten base-128 bytes, and the tenth may carry only
/// its lowest bit; anything longer or wider is a corrupt stream.
pub fn decode_one(cursor: &mut Cursor<&[u8]>) -> Result<u64, CsxError> {
    let buf = *cursor.get_ref();
    let mut pos = cursor.position() as usize;
    let mut value = 0u64;

    for shift in (0..64).step_by(7) {
        let byte = *buf.get(pos).ok_or_else(|| {
            CsxError::Leb128Decode("jump field runs past the end of the buffer".to_string())
        })?;
        pos += 1;

        let payload = (byte & 0x7F) as u64;
        if shift == 63 && payload > 1 {
            return Err(CsxError::Leb128Decode(
                "jump field overflows 64 bits".to_string(),
            ));
        }
        value |= payload << shift;

        if byte & 0x80 == 0 {
            cursor.set_position(pos as u64);
            return Ok(value);
        }
    }

    Err(CsxError::Leb128Decode(
        "jump field overflows 64 bits".to_string(),
    ))
}
