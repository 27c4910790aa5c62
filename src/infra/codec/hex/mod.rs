//! Cursor-based readers and writers for fixed-width ASCII hexadecimal fields.
//! Every digit of a field is validated before any value is derived from it,
//! so a malformed field never yields a partial value.
use crate::error::{HexReaderError, HexWriterError};

/// Maximum digits a `u32` field can carry.
const MAX_U32_DIGITS: u8 = 8;

/// Value of a single ASCII hex digit (either case).
#[inline]
pub fn nibble_from_ascii(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

/// Uppercase ASCII digit for the low nibble of `n`.
#[inline]
pub fn ascii_from_nibble(n: u8) -> u8 {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    DIGITS[(n & 0x0F) as usize]
}

//==================================================================================HEX_READER
/// Reader over an ASCII line, consuming fixed-width hex fields in order.
pub struct HexReader<'a> {
    /// Source line (typically a host command).
    buffer: &'a [u8],
    /// Index of the next character to consume.
    cursor: usize,
}

impl<'a> HexReader<'a> {
    /// Create a reader positioned at the start of the provided line.
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    /// Create a reader that starts after `offset` characters (e.g. the command byte).
    pub fn at(buffer: &'a [u8], offset: usize) -> Self {
        Self {
            buffer,
            cursor: offset.min(buffer.len()),
        }
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Characters left after the cursor.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    /// Take the next `count` characters, or fail without moving the cursor.
    fn take(&self, count: usize) -> Result<&'a [u8], HexReaderError> {
        if count > self.remaining() {
            return Err(HexReaderError::OutOfBounds {
                asked: count,
                available: self.remaining(),
            });
        }
        let buffer = self.buffer;
        Ok(&buffer[self.cursor..self.cursor + count])
    }

    /// Read a `digits`-wide big-endian hex field into a `u32`.
    /// `digits` must stay in the [1, 8] range.
    pub fn read_u32(&mut self, digits: u8) -> Result<u32, HexReaderError> {
        if !(1..=MAX_U32_DIGITS).contains(&digits) {
            return Err(HexReaderError::TooLongForType {
                max: MAX_U32_DIGITS,
                asked: digits,
            });
        }
        let field = self.take(digits as usize)?;

        // Validate the whole field first.
        if let Some(bad) = field.iter().position(|&c| nibble_from_ascii(c).is_none()) {
            return Err(HexReaderError::InvalidDigit {
                cursor: self.cursor + bad,
            });
        }

        let value = field.iter().fold(0u32, |acc, &c| {
            (acc << 4) | u32::from(nibble_from_ascii(c).unwrap_or(0))
        });
        self.cursor += digits as usize;
        Ok(value)
    }

    /// Read a single hex digit.
    pub fn read_nibble(&mut self) -> Result<u8, HexReaderError> {
        self.read_u32(1).map(|value| value as u8)
    }

    /// Fill `out` with bytes encoded as two hex digits each.
    pub fn read_bytes(&mut self, out: &mut [u8]) -> Result<(), HexReaderError> {
        let field = self.take(out.len() * 2)?;
        hex::decode_to_slice(field, out).map_err(|err| match err {
            hex::FromHexError::InvalidHexCharacter { index, .. } => HexReaderError::InvalidDigit {
                cursor: self.cursor + index,
            },
            _ => HexReaderError::OutOfBounds {
                asked: out.len() * 2,
                available: field.len(),
            },
        })?;
        self.cursor += field.len();
        Ok(())
    }

    /// Succeed only when the whole line has been consumed.
    pub fn expect_end(&self) -> Result<(), HexReaderError> {
        match self.remaining() {
            0 => Ok(()),
            remaining => Err(HexReaderError::TrailingData { remaining }),
        }
    }
}

//==================================================================================HEX_WRITER
/// Writer emitting uppercase fixed-width hex fields into a byte buffer.
pub struct HexWriter<'a> {
    /// Destination buffer.
    buffer: &'a mut [u8],
    /// Number of bytes written so far.
    cursor: usize,
}

impl<'a> HexWriter<'a> {
    /// Create a writer positioned at the start of the destination buffer.
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    /// Bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    fn reserve(&self, count: usize) -> Result<(), HexWriterError> {
        let available = self.buffer.len() - self.cursor;
        if count > available {
            return Err(HexWriterError::OutOfBounds {
                asked: count,
                available,
            });
        }
        Ok(())
    }

    /// Append a raw ASCII byte (command character, terminator).
    pub fn write_raw(&mut self, byte: u8) -> Result<(), HexWriterError> {
        self.reserve(1)?;
        self.buffer[self.cursor] = byte;
        self.cursor += 1;
        Ok(())
    }

    /// Append `value` as exactly `digits` uppercase hex digits, zero padded.
    /// Higher-order bits that do not fit are discarded.
    pub fn write_u32(&mut self, value: u32, digits: u8) -> Result<(), HexWriterError> {
        if !(1..=MAX_U32_DIGITS).contains(&digits) {
            return Err(HexWriterError::TooLongForType {
                max: MAX_U32_DIGITS,
                asked: digits,
            });
        }
        self.reserve(digits as usize)?;
        let mut remaining = value;
        for slot in self.buffer[self.cursor..self.cursor + digits as usize]
            .iter_mut()
            .rev()
        {
            *slot = ascii_from_nibble(remaining as u8);
            remaining >>= 4;
        }
        self.cursor += digits as usize;
        Ok(())
    }

    /// Append each byte as two uppercase hex digits.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), HexWriterError> {
        self.reserve(bytes.len() * 2)?;
        for &byte in bytes {
            self.buffer[self.cursor] = ascii_from_nibble(byte >> 4);
            self.buffer[self.cursor + 1] = ascii_from_nibble(byte);
            self.cursor += 2;
        }
        Ok(())
    }
}
