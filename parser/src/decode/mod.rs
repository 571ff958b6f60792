//! Decoding of whole data elements from a contiguous byte window.
//!
//! Both parsing drivers decode elements through [`read_element`],
//! which reads the header, then the value:
//! primitive values go through the [`value`] decoder,
//! sequences and encapsulated pixel data through the [`sequence`] decoder.
//! The streaming driver only calls it once all bytes of an element
//! are in its buffer, which keeps both drivers' output identical.

use crate::dataset::{DataSet, InMemElement};
use crate::error::{Error, Result, TruncatedElementSnafu, UnexpectedDelimiterSnafu};
use crate::scan::{ScanOutcome, StructureScanner};
use byteordered::Endianness;
use dcmstream_core::header::{DataElement, DataElementHeader, HasLength, Header, Length};
use dcmstream_core::value::{PrimitiveValue, Value, C};
use dcmstream_core::{Tag, VR};
use dcmstream_dictionary_std::tags;
use dcmstream_encoding::cursor::ByteCursor;
use dcmstream_encoding::decode::{Decode, HeaderDecoder};
use dcmstream_encoding::text::SpecificCharacterSet;
use dcmstream_encoding::transfer_syntax::TransferSyntax;
use snafu::{OptionExt, Report};
use std::convert::TryFrom;

pub mod sequence;
pub mod value;

/// How much of each element is decoded.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ParseDepth {
    /// Decode every value.
    #[default]
    Full,
    /// Decode every value except pixel data,
    /// which is recorded by offset and length.
    Light,
    /// Record only the header and value offset of every element.
    Shallow,
}

impl ParseDepth {
    /// Whether the value of the element with this header is left undecoded.
    pub fn defers(self, header: &DataElementHeader) -> bool {
        match self {
            ParseDepth::Full => false,
            ParseDepth::Light => header.tag() == tags::PIXEL_DATA,
            ParseDepth::Shallow => true,
        }
    }
}

/// The decoding configuration of a data set:
/// VR mode, byte order and active character set.
///
/// Sequence items start with a copy of their parent's state,
/// so that a character set declared in an item
/// does not leak into the parent data set.
#[derive(Debug, Clone)]
pub struct DecodeState {
    decoder: HeaderDecoder,
    endianness: Endianness,
    charset: SpecificCharacterSet,
}

impl DecodeState {
    /// Create a state for the given VR mode and byte order,
    /// with the default character set.
    pub fn new(explicit_vr: bool, endianness: Endianness) -> Self {
        DecodeState {
            decoder: HeaderDecoder::new(explicit_vr),
            endianness,
            charset: SpecificCharacterSet::Default,
        }
    }

    /// The state for the file meta group: Explicit VR Little Endian.
    pub fn file_meta() -> Self {
        DecodeState::new(true, Endianness::Little)
    }

    /// The state for the main data set of the given transfer syntax.
    pub fn for_transfer_syntax(ts: &TransferSyntax) -> Self {
        DecodeState {
            decoder: ts.header_decoder(),
            endianness: ts.endianness(),
            charset: SpecificCharacterSet::Default,
        }
    }

    /// The state for items of a UN sequence of undefined length,
    /// which are always Implicit VR Little Endian.
    pub(crate) fn implicit_sequence(&self) -> Self {
        DecodeState {
            decoder: HeaderDecoder::new(false),
            endianness: Endianness::Little,
            charset: self.charset,
        }
    }

    /// Whether headers are decoded with explicit VR.
    pub fn explicit_vr(&self) -> bool {
        self.decoder.is_explicit_vr()
    }

    /// The byte order.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// The active character set.
    pub fn charset(&self) -> SpecificCharacterSet {
        self.charset
    }

    /// The header decoder for this state.
    pub fn decoder(&self) -> &HeaderDecoder {
        &self.decoder
    }

    /// Create a cursor over `buf` in this state's byte order,
    /// where `base` is the stream offset of the first byte.
    pub fn cursor<'a>(&self, buf: &'a [u8], base: u64) -> ByteCursor<'a> {
        ByteCursor::new(buf, self.endianness).with_base(base)
    }

    /// Create an empty data set for the items decoded in this state.
    pub(crate) fn new_item(&self) -> DataSet {
        DataSet::with_encoding("", self.explicit_vr(), self.endianness, self.charset)
    }

    fn update_charset(&mut self, value: &PrimitiveValue) {
        let code = value.to_str();
        match SpecificCharacterSet::from_code(&code) {
            Some(charset) => self.charset = charset,
            None => tracing::warn!(
                "Unsupported character set `{}`, keeping {:?}",
                code,
                self.charset
            ),
        }
    }
}

/// Decode the element at the cursor's position, header and value.
///
/// The value must be entirely within the cursor's window,
/// otherwise the element is reported as truncated.
/// A decoded Specific Character Set (0008,0005)
/// changes the character set of `state`.
pub fn read_element(
    cursor: &mut ByteCursor,
    state: &mut DecodeState,
    depth: ParseDepth,
) -> Result<InMemElement> {
    let offset = cursor.absolute_position();
    let header = state.decoder.decode_header(cursor)?;
    if header.is_delimiting() {
        return UnexpectedDelimiterSnafu {
            tag: header.tag(),
            offset,
        }
        .fail();
    }
    read_element_value(cursor, state, header, offset, depth)
}

/// Decode the value of an element whose header was already read.
///
/// `offset` is the stream offset of the header.
pub(crate) fn read_element_value(
    cursor: &mut ByteCursor,
    state: &mut DecodeState,
    header: DataElementHeader,
    offset: u64,
    depth: ParseDepth,
) -> Result<InMemElement> {
    let tag = header.tag();
    let value_offset = cursor.absolute_position();

    if depth.defers(&header) {
        skip_value(cursor, state, &header, offset)?;
        return Ok(deferred_element(&header, value_offset));
    }

    let len = match header.length().get() {
        Some(len) => len as usize,
        None if is_pixel_sequence(&header) => {
            let fragments = sequence::read_pixel_sequence(cursor, state, tag)?;
            return Ok(DataElement::new_with_len(
                tag,
                header.vr(),
                Length::UNDEFINED,
                fragments,
            ));
        }
        None => {
            let items = sequence::read_sequence(cursor, state, &header, depth)?;
            return Ok(sequence_element(tag, header.length(), items));
        }
    };

    if header.vr() == VR::SQ {
        let mut window = cursor
            .read_window(len)
            .ok()
            .context(TruncatedElementSnafu { tag, offset })?;
        let items = sequence::read_defined_sequence(&mut window, state, tag, depth)?;
        return Ok(sequence_element(tag, header.length(), items));
    }

    let bytes = cursor
        .read_bytes(len)
        .ok()
        .context(TruncatedElementSnafu { tag, offset })?;
    match value::decode_value(bytes, header.vr(), state.endianness, state.charset) {
        Ok(value) => {
            if tag == tags::SPECIFIC_CHARACTER_SET {
                state.update_charset(&value);
            }
            Ok(DataElement::new_with_len(tag, header.vr(), header.length(), value))
        }
        Err(e) => {
            let message = Report::from_error(e).to_string();
            tracing::warn!(
                "Keeping raw bytes of {} at offset {}: {}",
                tag,
                offset,
                message
            );
            Ok(DataElement::new_with_len(
                tag,
                header.vr(),
                header.length(),
                PrimitiveValue::U8(C::from_slice(bytes)),
            )
            .with_warning(message))
        }
    }
}

/// Whether the header starts an encapsulated pixel data sequence.
pub(crate) fn is_pixel_sequence(header: &DataElementHeader) -> bool {
    header.tag() == tags::PIXEL_DATA
        && header.length().is_undefined()
        && matches!(header.vr(), VR::OB | VR::OW)
}

/// Create the element recording a value which was not decoded.
pub(crate) fn deferred_element(header: &DataElementHeader, value_offset: u64) -> InMemElement {
    DataElement::new_with_len(
        header.tag(),
        header.vr(),
        header.length(),
        Value::Deferred {
            offset: value_offset,
        },
    )
}

fn sequence_element(tag: Tag, len: Length, items: C<DataSet>) -> InMemElement {
    DataElement::new_with_len(tag, VR::SQ, len, Value::new_sequence(items, len))
}

/// Move past a value without decoding it.
fn skip_value(
    cursor: &mut ByteCursor,
    state: &DecodeState,
    header: &DataElementHeader,
    offset: u64,
) -> Result<()> {
    let tag = header.tag();
    let len = match header.length().get() {
        Some(len) => u64::from(len),
        None => {
            let start = cursor.absolute_position();
            let mut scanner = StructureScanner::new(state, header, start);
            match scanner.scan(cursor.rest(), start)? {
                ScanOutcome::Complete(end) => end - start,
                ScanOutcome::NeedMore => return TruncatedElementSnafu { tag, offset }.fail(),
            }
        }
    };
    let len = usize::try_from(len)
        .ok()
        .context(TruncatedElementSnafu { tag, offset })?;
    cursor
        .skip(len)
        .ok()
        .context(TruncatedElementSnafu { tag, offset })
}

/// Decode elements until the end of the cursor's window.
pub(crate) fn read_to_end(
    cursor: &mut ByteCursor,
    state: &mut DecodeState,
    depth: ParseDepth,
    into: &mut DataSet,
) -> Result<(), Error> {
    while !cursor.is_empty() {
        into.put(read_element(cursor, state, depth)?);
    }
    into.set_charset(state.charset);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Category;

    // (0008,0005) CS "ISO_IR 192"
    // (0010,0010) PN "Simões^João" in UTF-8
    // (0010,0030) DA "2023XX01": not a date
    #[rustfmt::skip]
    const RAW: &[u8] = &[
        0x08, 0x00, 0x05, 0x00, b'C', b'S', 0x0A, 0x00,
            b'I', b'S', b'O', b'_', b'I', b'R', b' ', b'1', b'9', b'2',
        0x10, 0x00, 0x10, 0x00, b'P', b'N', 0x0E, 0x00,
            b'S', b'i', b'm', 0xC3, 0xB5, b'e', b's', b'^', b'J', b'o', 0xC3, 0xA3, b'o', b' ',
        0x10, 0x00, 0x30, 0x00, b'D', b'A', 0x08, 0x00,
            b'2', b'0', b'2', b'3', b'X', b'X', b'0', b'1',
    ];

    #[test]
    fn charset_applies_to_following_elements() {
        let mut state = DecodeState::new(true, Endianness::Little);
        let mut cursor = state.cursor(RAW, 0);

        let charset = read_element(&mut cursor, &mut state, ParseDepth::Full).unwrap();
        assert_eq!(charset.to_str().unwrap(), "ISO_IR 192");
        assert_eq!(state.charset(), SpecificCharacterSet::IsoIr192);

        let name = read_element(&mut cursor, &mut state, ParseDepth::Full).unwrap();
        assert_eq!(name.to_person_name().unwrap().family(), Some("Simões"));
        assert_eq!(name.decode_warning(), None);
    }

    #[test]
    fn bad_values_keep_raw_bytes() {
        let mut state = DecodeState::new(true, Endianness::Little);
        let mut cursor = state.cursor(&RAW[40..], 40);
        let elem = read_element(&mut cursor, &mut state, ParseDepth::Full).unwrap();
        assert_eq!(elem.tag(), tags::PATIENT_BIRTH_DATE);
        assert_eq!(elem.vr(), VR::DA);
        assert!(elem.decode_warning().is_some());
        assert_eq!(elem.to_bytes().unwrap().as_ref(), b"2023XX01");
        assert!(cursor.is_empty());
    }

    #[test]
    fn shallow_records_offsets() {
        let mut state = DecodeState::new(true, Endianness::Little);
        let mut cursor = state.cursor(RAW, 1000);
        let mut ds = DataSet::new();
        read_to_end(&mut cursor, &mut state, ParseDepth::Shallow, &mut ds).unwrap();
        assert_eq!(ds.len(), 3);
        let name = ds.element(tags::PATIENT_NAME).unwrap();
        assert_eq!(name.deferred_offset(), Some(1000 + 18 + 8));
        assert_eq!(name.length(), Length(14));
        // the character set was not decoded
        assert_eq!(state.charset(), SpecificCharacterSet::Default);
    }

    #[test]
    fn truncated_value() {
        let mut state = DecodeState::new(true, Endianness::Little);
        let mut cursor = state.cursor(&RAW[..30], 0);
        read_element(&mut cursor, &mut state, ParseDepth::Full).unwrap();
        let err = read_element(&mut cursor, &mut state, ParseDepth::Full).unwrap_err();
        assert!(matches!(
            err,
            Error::TruncatedElement {
                offset: 18,
                ..
            }
        ));
        assert_eq!(err.category(), Category::HeaderDecode);
    }

    #[test]
    fn delimiter_outside_sequence() {
        let raw = [0xFE, 0xFF, 0x0D, 0xE0, 0, 0, 0, 0];
        let mut state = DecodeState::new(true, Endianness::Little);
        let mut cursor = state.cursor(&raw, 0);
        assert!(matches!(
            read_element(&mut cursor, &mut state, ParseDepth::Full),
            Err(Error::UnexpectedDelimiter { .. })
        ));
    }
}
