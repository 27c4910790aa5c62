//! Value types shared by every layer: the fixed-capacity ASCII line used for
//! commands, replies and encoded frames, the protocol control bytes, and the
//! reply an engine hands back to the host link.

use core::fmt;

/// Line terminator closing every command and every reply (CR).
pub const CR: u8 = b'\r';
/// Second terminator variant some senders emit after CR. Carries no meaning.
pub const LF: u8 = b'\n';
/// Error sentinel (BELL).
pub const BELL: u8 = 0x07;

/// Capacity of a reply line, terminator included.
///
/// The longest reply is a polled extended data frame with a timestamp:
/// `T` + 8 id digits + dlc + 16 data digits + 4 timestamp digits + CR = 31.
pub const REPLY_CAPACITY: usize = 32;

/// Reply line as written to the host.
pub type ReplyLine = AsciiLine<REPLY_CAPACITY>;

/// Fixed-capacity byte line. Storage is inline; nothing is allocated.
/// Equality looks at the stored bytes only, never at the spare capacity.
#[derive(Clone, Copy)]
pub struct AsciiLine<const N: usize> {
    len: usize,
    data: [u8; N],
}

impl<const N: usize> Default for AsciiLine<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> AsciiLine<N> {
    /// Create an empty line.
    pub const fn new() -> Self {
        Self { len: 0, data: [0; N] }
    }

    /// Build a line from a slice, truncating anything beyond `N` bytes.
    pub fn from_slice(slice: &[u8]) -> Self {
        let mut line = Self::new();
        line.copy_from_slice(slice);
        line
    }

    /// Maximum number of bytes the line can hold.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of valid bytes stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Reset the line; the backing bytes are simply overwritten later.
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// First byte of the line, i.e. the command character.
    #[inline]
    pub fn first(&self) -> Option<u8> {
        self.as_slice().first().copied()
    }

    /// Append a byte. Returns `false` and leaves the line untouched when full.
    #[inline]
    pub fn push(&mut self, byte: u8) -> bool {
        if self.len == N {
            return false;
        }
        self.data[self.len] = byte;
        self.len += 1;
        true
    }

    /// Replace the content with `slice`, clamped to the capacity.
    #[inline]
    pub fn copy_from_slice(&mut self, slice: &[u8]) {
        let clamped = slice.len().min(N);
        self.data[..clamped].copy_from_slice(&slice[..clamped]);
        self.len = clamped;
    }

    /// Append as much of `slice` as fits. Returns the number of bytes copied.
    pub fn extend_from_slice(&mut self, slice: &[u8]) -> usize {
        let room = N - self.len;
        let count = slice.len().min(room);
        self.data[self.len..self.len + count].copy_from_slice(&slice[..count]);
        self.len += count;
        count
    }

    /// Immutable view over the populated bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Writable tail of the backing storage past the populated bytes.
    /// Pair with [`AsciiLine::commit`] once the bytes are written.
    #[inline]
    pub(crate) fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.len..]
    }

    /// Mark `count` bytes of the spare area as populated.
    #[inline]
    pub(crate) fn commit(&mut self, count: usize) {
        self.len = (self.len + count).min(N);
    }
}

impl<const N: usize> PartialEq for AsciiLine<N> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<const N: usize> Eq for AsciiLine<N> {}

impl<const N: usize> fmt::Debug for AsciiLine<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"")?;
        for &byte in self.as_slice() {
            for c in core::ascii::escape_default(byte) {
                f.write_fmt(format_args!("{}", c as char))?;
            }
        }
        f.write_str("\"")
    }
}

/// Outcome of a host command, before it is framed for the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reply {
    /// Empty acknowledgment: the terminator alone.
    Ack,
    /// Error sentinel.
    Error,
    /// Reply text (transmit confirmation, status, version, polled frame...).
    Text(ReplyLine),
}

impl Reply {
    /// Single-character reply such as the transmit confirmations.
    pub fn token(byte: u8) -> Self {
        let mut line = ReplyLine::new();
        line.push(byte);
        Reply::Text(line)
    }

    /// Reply bytes followed by the CR terminator, ready for a single write.
    pub fn to_wire(&self) -> ReplyLine {
        let mut line = match self {
            Reply::Ack => ReplyLine::new(),
            Reply::Error => ReplyLine::from_slice(&[BELL]),
            Reply::Text(text) => {
                // Keep one byte for the terminator.
                let body = &text.as_slice()[..text.len().min(REPLY_CAPACITY - 1)];
                ReplyLine::from_slice(body)
            }
        };
        line.push(CR);
        line
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error)
    }
}
