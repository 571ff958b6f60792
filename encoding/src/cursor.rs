//! A bounds-checked view over a byte window.
//!
//! [`ByteCursor`] is the only way the decoders in this workspace touch raw
//! bytes. Every read checks that the requested bytes are within the window
//! and advances the cursor only on success, so a failed read can be retried
//! once more bytes are available.
use crate::text::{DecodeTextError, TextCodec};
use byteordered::byteorder::{BigEndian, ByteOrder, LittleEndian};
use byteordered::Endianness;
use dcmstream_core::Tag;
use snafu::{ResultExt, Snafu};

/// An error from reading through a [`ByteCursor`].
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// Not enough bytes remain in the window for the requested read.
    #[snafu(display(
        "Cannot read {} bytes at offset {}: out of bounds",
        requested,
        position
    ))]
    OutOfBounds {
        /// absolute offset of the failed read
        position: u64,
        /// number of bytes requested
        requested: usize,
    },
    /// The requested bytes could not be decoded as text.
    #[snafu(display("Could not decode text at offset {}", position))]
    DecodeText {
        /// absolute offset of the text value
        position: u64,
        #[snafu(backtrace)]
        source: DecodeTextError,
    },
}

impl Error {
    /// The absolute offset at which the failed read started.
    pub fn position(&self) -> u64 {
        match self {
            Error::OutOfBounds { position, .. } | Error::DecodeText { position, .. } => *position,
        }
    }
}

/// Result type for cursor reads.
pub type Result<T, E = Error> = std::result::Result<T, E>;

macro_rules! cursor_read {
    ($read: ident, $peek: ident, $t: ty, $size: expr, $method: ident) => {
        #[doc = concat!("Peek a `", stringify!($t), "` in the cursor's byte order without advancing.")]
        pub fn $peek(&self) -> Result<$t> {
            let bytes = self.peek_bytes($size)?;
            Ok(match self.endianness {
                Endianness::Little => LittleEndian::$method(bytes),
                Endianness::Big => BigEndian::$method(bytes),
            })
        }

        #[doc = concat!("Read a `", stringify!($t), "` in the cursor's byte order.")]
        pub fn $read(&mut self) -> Result<$t> {
            let v = self.$peek()?;
            self.pos += $size;
            Ok(v)
        }
    };
}

/// A reader over a borrowed byte window
/// with an explicit position and byte order.
///
/// The cursor may carry a base offset,
/// which is the position of the window's first byte
/// in the whole stream.
/// All offsets reported in errors are absolute,
/// so they remain meaningful after the streaming driver
/// discards the consumed prefix of its buffer.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    endianness: Endianness,
    base: u64,
}

impl<'a> ByteCursor<'a> {
    /// Create a cursor at the start of `buf`.
    pub fn new(buf: &'a [u8], endianness: Endianness) -> Self {
        ByteCursor {
            buf,
            pos: 0,
            endianness,
            base: 0,
        }
    }

    /// Declare the absolute stream offset of the window's first byte.
    pub fn with_base(mut self, base: u64) -> Self {
        self.base = base;
        self
    }

    /// The position relative to the start of the window.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// The position as an offset into the whole stream.
    #[inline]
    pub fn absolute_position(&self) -> u64 {
        self.base + self.pos as u64
    }

    /// The stream offset of the window's first byte.
    #[inline]
    pub fn base(&self) -> u64 {
        self.base
    }

    /// The number of bytes left in the window.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Whether all bytes of the window were consumed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The byte order used for numeric reads.
    #[inline]
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Change the byte order used for subsequent numeric reads.
    pub fn set_endianness(&mut self, endianness: Endianness) {
        self.endianness = endianness;
    }

    /// Move to the given position relative to the window start.
    ///
    /// The end of the window is a valid position.
    pub fn set_position(&mut self, pos: usize) -> Result<()> {
        if pos > self.buf.len() {
            return OutOfBoundsSnafu {
                position: self.base + self.buf.len() as u64,
                requested: pos - self.buf.len(),
            }
            .fail();
        }
        self.pos = pos;
        Ok(())
    }

    /// Return to a position previously obtained from [`position`](Self::position).
    pub(crate) fn rewind(&mut self, pos: usize) {
        debug_assert!(pos <= self.pos);
        self.pos = pos;
    }

    /// Advance the cursor by `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }

    /// Look at the next `n` bytes without advancing.
    pub fn peek_bytes(&self, n: usize) -> Result<&'a [u8]> {
        match self.pos.checked_add(n) {
            Some(end) if end <= self.buf.len() => Ok(&self.buf[self.pos..end]),
            _ => OutOfBoundsSnafu {
                position: self.absolute_position(),
                requested: n,
            }
            .fail(),
        }
    }

    /// Read the next `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let bytes = self.peek_bytes(n)?;
        self.pos += n;
        Ok(bytes)
    }

    /// All bytes from the current position to the end of the window.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Split off a cursor over the next `n` bytes, advancing past them.
    ///
    /// The new cursor has the same byte order,
    /// and its base is the current absolute position.
    pub fn read_window(&mut self, n: usize) -> Result<ByteCursor<'a>> {
        let base = self.absolute_position();
        let buf = self.read_bytes(n)?;
        Ok(ByteCursor {
            buf,
            pos: 0,
            endianness: self.endianness,
            base,
        })
    }

    /// Read the next `n` bytes as text in the given character set.
    ///
    /// The cursor does not advance if the text cannot be decoded.
    pub fn read_string<T>(&mut self, n: usize, charset: &T) -> Result<String>
    where
        T: ?Sized + TextCodec,
    {
        let position = self.absolute_position();
        let bytes = self.peek_bytes(n)?;
        let text = charset.decode(bytes).context(DecodeTextSnafu { position })?;
        self.pos += n;
        Ok(text)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_bytes(1).map(|b| b[0])
    }

    cursor_read!(read_u16, peek_u16, u16, 2, read_u16);
    cursor_read!(read_u32, peek_u32, u32, 4, read_u32);
    cursor_read!(read_u64, peek_u64, u64, 8, read_u64);
    cursor_read!(read_i16, peek_i16, i16, 2, read_i16);
    cursor_read!(read_i32, peek_i32, i32, 4, read_i32);
    cursor_read!(read_i64, peek_i64, i64, 8, read_i64);
    cursor_read!(read_f32, peek_f32, f32, 4, read_f32);
    cursor_read!(read_f64, peek_f64, f64, 8, read_f64);

    /// Peek a data element tag without advancing.
    pub fn peek_tag(&self) -> Result<Tag> {
        let bytes = self.peek_bytes(4)?;
        Ok(match self.endianness {
            Endianness::Little => Tag(
                LittleEndian::read_u16(&bytes[0..2]),
                LittleEndian::read_u16(&bytes[2..4]),
            ),
            Endianness::Big => Tag(
                BigEndian::read_u16(&bytes[0..2]),
                BigEndian::read_u16(&bytes[2..4]),
            ),
        })
    }

    /// Read a data element tag: the group then the element number.
    pub fn read_tag(&mut self) -> Result<Tag> {
        let tag = self.peek_tag()?;
        self.pos += 4;
        Ok(tag)
    }
}
