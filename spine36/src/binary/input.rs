//! Forward-only reader for the primitive encodings used by `.skel` files.
//!
//! Every read is bounds-checked and advances the cursor by exactly the number of bytes it
//! consumed. Reading past the end yields [`Error::TruncatedInput`]; the reader never panics on
//! malformed input.

use crate::Error;
use crate::color::{rgb888_to_color, rgba8888_to_color};
use byteorder::{BigEndian, ByteOrder};

/// Cursor over an in-memory `.skel` buffer.
#[derive(Clone, Debug)]
pub struct BinaryInput<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> BinaryInput<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, cursor: 0 }
    }

    /// Byte offset of the next read.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.cursor)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        let remaining = self.remaining();
        if remaining < n {
            return Err(Error::TruncatedInput {
                offset: self.cursor,
                needed: n,
                remaining,
            });
        }
        let out = &self.bytes[self.cursor..self.cursor + n];
        self.cursor += n;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    /// Signed byte, used for type tags, curve kinds and IK bend directions.
    pub fn read_byte(&mut self) -> Result<i8, Error> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_bool(&mut self) -> Result<bool, Error> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_short(&mut self) -> Result<i16, Error> {
        Ok(BigEndian::read_i16(self.take(2)?))
    }

    pub fn read_i32(&mut self) -> Result<i32, Error> {
        Ok(BigEndian::read_i32(self.take(4)?))
    }

    pub fn read_f32(&mut self) -> Result<f32, Error> {
        Ok(BigEndian::read_f32(self.take(4)?))
    }

    /// Reads a 7-bits-per-byte variable-length integer (at most 5 bytes).
    ///
    /// With `optimize_positive == false` the raw value is zig-zag decoded, so even raw values map
    /// to non-negative integers and odd raw values to negative ones.
    pub fn read_varint(&mut self, optimize_positive: bool) -> Result<i32, Error> {
        let mut raw: u32 = 0;
        for shift in [0u32, 7, 14, 21, 28] {
            let b = self.read_u8()?;
            raw |= ((b & 0x7F) as u32) << shift;
            if (b & 0x80) == 0 {
                break;
            }
        }
        if optimize_positive {
            Ok(raw as i32)
        } else {
            Ok(((raw >> 1) as i32) ^ -((raw & 1) as i32))
        }
    }

    /// Count prefix for arrays and sections. Counts are written with `optimize_positive`.
    pub(crate) fn read_count(&mut self) -> Result<usize, Error> {
        Ok(self.read_varint(true)? as u32 as usize)
    }

    /// Reads a length-prefixed string.
    ///
    /// A length of `0` is `None`, `1` is the empty string, otherwise `length - 1` bytes follow.
    /// The bytes are decoded one code unit at a time: a lead byte with high nibble `0xC`/`0xD`
    /// starts a 2-byte unit, `0xE` a 3-byte unit, and anything else (including stray bytes
    /// `>= 0x80`) is taken as-is. Multi-byte units may not run past the declared length.
    pub fn read_string(&mut self) -> Result<Option<String>, Error> {
        let length = self.read_count()?;
        match length {
            0 => return Ok(None),
            1 => return Ok(Some(String::new())),
            _ => {}
        }
        let base = self.cursor;
        let bytes = self.take(length - 1)?;

        let unit_byte = |i: usize| -> Result<u32, Error> {
            bytes
                .get(i)
                .map(|b| (*b & 0x3F) as u32)
                .ok_or_else(|| Error::TruncatedInput {
                    offset: base + bytes.len(),
                    needed: i + 1 - bytes.len(),
                    remaining: 0,
                })
        };

        let mut out = String::with_capacity(bytes.len());
        let mut i = 0usize;
        while i < bytes.len() {
            let b = bytes[i];
            let unit = match b >> 4 {
                0x0C | 0x0D => {
                    let unit = ((b & 0x1F) as u32) << 6 | unit_byte(i + 1)?;
                    i += 2;
                    unit
                }
                0x0E => {
                    let unit =
                        ((b & 0x0F) as u32) << 12 | unit_byte(i + 1)? << 6 | unit_byte(i + 2)?;
                    i += 3;
                    unit
                }
                _ => {
                    i += 1;
                    b as u32
                }
            };
            out.push(char::from_u32(unit).unwrap_or(char::REPLACEMENT_CHARACTER));
        }
        Ok(Some(out))
    }

    /// Packed `0xRRGGBBAA` color.
    pub fn read_color_rgba(&mut self) -> Result<[f32; 4], Error> {
        Ok(rgba8888_to_color(self.read_i32()?))
    }

    /// Packed `0x00RRGGBB` color.
    pub fn read_color_rgb(&mut self) -> Result<[f32; 3], Error> {
        Ok(rgb888_to_color(self.read_i32()?))
    }
}
