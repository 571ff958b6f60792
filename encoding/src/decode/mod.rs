//! Data element header decoding.
//!
//! A header decoder reads the tag, value representation and value length
//! of the element at the cursor's position.
//! Two decoders exist, one per VR encoding mode,
//! and both take the byte order from the cursor.
//! [`HeaderDecoder`] dispatches between them at run-time,
//! since the mode is only known once the file meta group was read.
//!
//! Decoding is all-or-nothing:
//! when a header decoder fails, the cursor is back at the element start.
//! An [`Error::Incomplete`] means that the window ends within the header,
//! which the streaming driver recovers from once more bytes arrive.

use crate::cursor::ByteCursor;
use dcmstream_core::dictionary::DataDictionary;
use dcmstream_core::header::{
    DataElementHeader, HasLength, Header, Length, SequenceItemHeader, SequenceItemHeaderError,
};
use dcmstream_core::{Tag, VR};
use dcmstream_dictionary_std::StandardDataDictionary;
use snafu::{Backtrace, OptionExt, ResultExt, Snafu};
use std::fmt;

mod explicit;
mod implicit;

pub use self::explicit::ExplicitVRDecoder;
pub use self::implicit::ImplicitVRDecoder;

/// The header field being decoded when the window ran out of bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HeaderField {
    /// the group and element numbers
    Tag,
    /// the two-letter VR code
    Vr,
    /// the reserved bytes of long-form explicit VR headers
    Reserved,
    /// the value length
    Length,
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HeaderField::Tag => "tag",
            HeaderField::Vr => "value representation",
            HeaderField::Reserved => "reserved bytes",
            HeaderField::Length => "value length",
        })
    }
}

/// Module-level error type:
/// for errors which may occur while decoding element headers.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// Not enough bytes to read the header field.
    #[snafu(display("Incomplete header: no bytes for the {} at offset {}", field, position))]
    Incomplete {
        /// the field being decoded
        field: HeaderField,
        /// absolute offset of the field
        position: u64,
    },
    /// The explicit VR code is not one of the standard codes.
    #[snafu(display(
        "Invalid value representation {:02X?} for tag {} at offset {}",
        code,
        tag,
        position
    ))]
    InvalidVr {
        tag: Tag,
        code: [u8; 2],
        position: u64,
        backtrace: Backtrace,
    },
    /// Undefined length is not admitted for this element.
    #[snafu(display("Undefined length for tag {} with VR {} at offset {}", tag, vr, position))]
    UndefinedLength {
        tag: Tag,
        vr: VR,
        position: u64,
        backtrace: Backtrace,
    },
    /// An item or delimiter was expected.
    #[snafu(display("Bad sequence item header at offset {}", position))]
    BadSequenceHeader {
        position: u64,
        #[snafu(backtrace)]
        source: SequenceItemHeaderError,
    },
}

impl Error {
    /// Whether this error only means that more bytes are needed.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Error::Incomplete { .. })
    }

    /// The absolute offset associated with the error.
    pub fn position(&self) -> u64 {
        match self {
            Error::Incomplete { position, .. }
            | Error::InvalidVr { position, .. }
            | Error::UndefinedLength { position, .. }
            | Error::BadSequenceHeader { position, .. } => *position,
        }
    }

    /// The tag of the element, if it was decoded before the failure.
    pub fn tag(&self) -> Option<Tag> {
        match self {
            Error::InvalidVr { tag, .. } | Error::UndefinedLength { tag, .. } => Some(*tag),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The size in bytes of item and delimiter headers:
/// a tag followed by a 32-bit length.
pub const ITEM_HEADER_LEN: usize = 8;

/// Type trait for decoding data element headers from a cursor.
pub trait Decode {
    /// Decode the header of the element at the cursor's position.
    ///
    /// Item and delimiter headers are also accepted,
    /// in which case the VR is reported as UN.
    /// On success the cursor is positioned at the start of the value.
    fn decode_header(&self, cursor: &mut ByteCursor) -> Result<DataElementHeader>;

    /// Decode an item or delimiter header.
    fn decode_item_header(&self, cursor: &mut ByteCursor) -> Result<SequenceItemHeader> {
        let position = cursor.absolute_position();
        let start = cursor.position();
        let out = read_item_header(cursor).and_then(|(tag, len)| {
            SequenceItemHeader::new(tag, len).context(BadSequenceHeaderSnafu { position })
        });
        if out.is_err() {
            cursor.rewind(start);
        }
        out
    }

    /// Decode a single tag.
    fn decode_tag(&self, cursor: &mut ByteCursor) -> Result<Tag> {
        read_field(cursor, HeaderField::Tag, ByteCursor::read_tag)
    }

    /// The number of bytes of the header of an element with the given VR.
    fn header_len(&self, vr: VR) -> usize;
}

impl<T: ?Sized> Decode for &T
where
    T: Decode,
{
    fn decode_header(&self, cursor: &mut ByteCursor) -> Result<DataElementHeader> {
        (**self).decode_header(cursor)
    }

    fn decode_item_header(&self, cursor: &mut ByteCursor) -> Result<SequenceItemHeader> {
        (**self).decode_item_header(cursor)
    }

    fn decode_tag(&self, cursor: &mut ByteCursor) -> Result<Tag> {
        (**self).decode_tag(cursor)
    }

    fn header_len(&self, vr: VR) -> usize {
        (**self).header_len(vr)
    }
}

/// A header decoder for either VR encoding mode.
#[derive(Debug, Clone)]
pub enum HeaderDecoder<D = StandardDataDictionary> {
    /// Explicit VR headers.
    Explicit(ExplicitVRDecoder),
    /// Implicit VR headers, with the VR taken from a data dictionary.
    Implicit(ImplicitVRDecoder<D>),
}

impl HeaderDecoder {
    /// Create a decoder for the given VR encoding mode
    /// backed by the standard data dictionary.
    pub fn new(explicit_vr: bool) -> Self {
        if explicit_vr {
            HeaderDecoder::Explicit(ExplicitVRDecoder)
        } else {
            HeaderDecoder::Implicit(ImplicitVRDecoder::default())
        }
    }
}

impl<D> HeaderDecoder<D> {
    /// Whether this decoder expects explicit VR headers.
    pub fn is_explicit_vr(&self) -> bool {
        matches!(self, HeaderDecoder::Explicit(_))
    }
}

impl<D> Decode for HeaderDecoder<D>
where
    D: DataDictionary,
{
    fn decode_header(&self, cursor: &mut ByteCursor) -> Result<DataElementHeader> {
        match self {
            HeaderDecoder::Explicit(d) => d.decode_header(cursor),
            HeaderDecoder::Implicit(d) => d.decode_header(cursor),
        }
    }

    fn header_len(&self, vr: VR) -> usize {
        match self {
            HeaderDecoder::Explicit(d) => d.header_len(vr),
            HeaderDecoder::Implicit(d) => d.header_len(vr),
        }
    }
}

/// Read a header field, mapping a short window to [`Error::Incomplete`].
fn read_field<'a, T>(
    cursor: &mut ByteCursor<'a>,
    field: HeaderField,
    read: impl FnOnce(&mut ByteCursor<'a>) -> crate::cursor::Result<T>,
) -> Result<T> {
    let position = cursor.absolute_position();
    read(cursor).ok().context(IncompleteSnafu { field, position })
}

/// Read the tag and 32-bit length of an item or delimiter.
fn read_item_header(cursor: &mut ByteCursor) -> Result<(Tag, Length)> {
    let tag = read_field(cursor, HeaderField::Tag, ByteCursor::read_tag)?;
    let len = read_field(cursor, HeaderField::Length, ByteCursor::read_u32)?;
    Ok((tag, Length(len)))
}

/// Run a header decoding step, restoring the cursor if it fails.
fn transactional<'a, T>(
    cursor: &mut ByteCursor<'a>,
    step: impl FnOnce(&mut ByteCursor<'a>) -> Result<T>,
) -> Result<T> {
    let start = cursor.position();
    let out = step(cursor);
    if out.is_err() {
        cursor.rewind(start);
    }
    out
}

/// Check whether an element may have an undefined value length.
///
/// This is the case for sequences, for UN elements
/// (which are then read as implicit VR sequences),
/// for items, and for encapsulated pixel data.
pub fn admits_undefined_length(header: &DataElementHeader) -> bool {
    matches!(header.vr(), VR::SQ | VR::UN)
        || header.is_item()
        || (header.tag() == Tag(0x7FE0, 0x0010) && matches!(header.vr(), VR::OB | VR::OW))
}

fn check_length(header: DataElementHeader, position: u64) -> Result<DataElementHeader> {
    if header.length().is_undefined() && !admits_undefined_length(&header) {
        return UndefinedLengthSnafu {
            tag: header.tag(),
            vr: header.vr(),
            position,
        }
        .fail();
    }
    Ok(header)
}
