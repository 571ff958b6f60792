//! Data element header encoding.
//!
//! The encoders here are the counterpart of the decoders in
//! [`decode`](crate::decode): they write element, item and delimiter headers
//! in explicit VR (either byte order) or implicit VR.
use byteordered::byteorder::{BigEndian, ByteOrder, LittleEndian};
use byteordered::Endianness;
use dcmstream_core::header::{DataElementHeader, HasLength, Header, Length};
use dcmstream_core::{Tag, VR};
use snafu::{ensure, Backtrace, ResultExt, Snafu};
use std::io::{self, Write};

/// Module-level error type:
/// for errors which may occur while encoding element headers.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// Failed to write the header to the destination.
    #[snafu(display("Failed to write header of {}", tag))]
    WriteHeader {
        tag: Tag,
        source: io::Error,
        backtrace: Backtrace,
    },
    /// The value length does not fit in the 16-bit length field.
    #[snafu(display("Length {} of {} does not fit the header of VR {}", len, tag, vr))]
    LengthTooLong {
        tag: Tag,
        vr: VR,
        len: Length,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Type trait for encoding data element headers.
pub trait Encode {
    /// Encode a tag: the group and then the element number.
    fn encode_tag<W>(&self, to: W, tag: Tag) -> Result<()>
    where
        W: Write;

    /// Encode an element header,
    /// returning the number of bytes written.
    fn encode_element_header<W>(&self, to: W, de: DataElementHeader) -> Result<usize>
    where
        W: Write;

    /// Encode an item header with the given length,
    /// which may be undefined.
    fn encode_item_header<W>(&self, to: W, len: u32) -> Result<()>
    where
        W: Write;

    /// Encode an item delimiter.
    fn encode_item_delimiter<W>(&self, mut to: W) -> Result<()>
    where
        W: Write,
    {
        self.encode_tag(&mut to, Tag(0xFFFE, 0xE00D))?;
        self.encode_length(to, Tag(0xFFFE, 0xE00D), 0)
    }

    /// Encode a sequence delimiter.
    fn encode_sequence_delimiter<W>(&self, mut to: W) -> Result<()>
    where
        W: Write,
    {
        self.encode_tag(&mut to, Tag(0xFFFE, 0xE0DD))?;
        self.encode_length(to, Tag(0xFFFE, 0xE0DD), 0)
    }

    /// Encode a 32-bit length field.
    fn encode_length<W>(&self, to: W, tag: Tag, len: u32) -> Result<()>
    where
        W: Write;
}

/// A header encoder for any of the uncompressed transfer syntax layouts.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HeaderEncoder {
    explicit_vr: bool,
    endianness: Endianness,
}

impl Default for HeaderEncoder {
    fn default() -> Self {
        HeaderEncoder::explicit_vr_le()
    }
}

impl HeaderEncoder {
    /// Create an encoder for the given VR mode and byte order.
    pub fn new(explicit_vr: bool, endianness: Endianness) -> Self {
        HeaderEncoder {
            explicit_vr,
            endianness,
        }
    }

    /// An encoder for explicit VR little endian,
    /// which is also the encoding of the file meta group.
    pub fn explicit_vr_le() -> Self {
        HeaderEncoder::new(true, Endianness::Little)
    }

    /// An encoder for implicit VR little endian.
    pub fn implicit_vr_le() -> Self {
        HeaderEncoder::new(false, Endianness::Little)
    }

    fn write_u16(&self, buf: &mut [u8], v: u16) {
        match self.endianness {
            Endianness::Little => LittleEndian::write_u16(buf, v),
            Endianness::Big => BigEndian::write_u16(buf, v),
        }
    }

    fn write_u32(&self, buf: &mut [u8], v: u32) {
        match self.endianness {
            Endianness::Little => LittleEndian::write_u32(buf, v),
            Endianness::Big => BigEndian::write_u32(buf, v),
        }
    }
}

impl Encode for HeaderEncoder {
    fn encode_tag<W>(&self, mut to: W, tag: Tag) -> Result<()>
    where
        W: Write,
    {
        let mut buf = [0u8; 4];
        self.write_u16(&mut buf[0..], tag.group());
        self.write_u16(&mut buf[2..], tag.element());
        to.write_all(&buf).context(WriteHeaderSnafu { tag })
    }

    fn encode_element_header<W>(&self, mut to: W, de: DataElementHeader) -> Result<usize>
    where
        W: Write,
    {
        let tag = de.tag();
        let mut buf = [0u8; 12];
        self.write_u16(&mut buf[0..], tag.group());
        self.write_u16(&mut buf[2..], tag.element());

        let n = if !self.explicit_vr || de.is_delimiting() {
            self.write_u32(&mut buf[4..], de.length().0);
            8
        } else {
            let vr_bytes = de.vr().to_bytes();
            buf[4] = vr_bytes[0];
            buf[5] = vr_bytes[1];
            if de.vr().has_long_length() {
                // reserved bytes stay zeroed
                self.write_u32(&mut buf[8..], de.length().0);
                12
            } else {
                let len = de.length();
                ensure!(
                    len.0 <= u32::from(u16::MAX) && len.is_defined(),
                    LengthTooLongSnafu {
                        tag,
                        vr: de.vr(),
                        len
                    }
                );
                self.write_u16(&mut buf[6..], len.0 as u16);
                8
            }
        };
        to.write_all(&buf[..n]).context(WriteHeaderSnafu { tag })?;
        Ok(n)
    }

    fn encode_item_header<W>(&self, mut to: W, len: u32) -> Result<()>
    where
        W: Write,
    {
        self.encode_tag(&mut to, Tag(0xFFFE, 0xE000))?;
        self.encode_length(to, Tag(0xFFFE, 0xE000), len)
    }

    fn encode_length<W>(&self, mut to: W, tag: Tag, len: u32) -> Result<()>
    where
        W: Write,
    {
        let mut buf = [0u8; 4];
        self.write_u32(&mut buf, len);
        to.write_all(&buf).context(WriteHeaderSnafu { tag })
    }
}
