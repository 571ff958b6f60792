//! Implicit VR header decoding.

use super::{check_length, read_field, read_item_header, transactional, Decode, HeaderField, Result};
use crate::cursor::ByteCursor;
use dcmstream_core::dictionary::DataDictionary;
use dcmstream_core::header::{DataElementHeader, Length};
use dcmstream_core::{Tag, VR};
use dcmstream_dictionary_std::StandardDataDictionary;

/// An implicit VR header decoder using the standard data dictionary.
pub type StandardImplicitVRDecoder = ImplicitVRDecoder<StandardDataDictionary>;

/// A data element header decoder for implicit VR transfer syntaxes.
///
/// The value representation of each element is resolved
/// through the data dictionary `D`.
/// The byte order is the one of the cursor.
#[derive(Debug, Default, Clone)]
pub struct ImplicitVRDecoder<D> {
    dict: D,
}

impl<D> ImplicitVRDecoder<D> {
    /// Create a decoder which resolves value representations
    /// with the given dictionary.
    pub fn with_dict(dict: D) -> Self {
        ImplicitVRDecoder { dict }
    }
}

impl<D> ImplicitVRDecoder<D>
where
    D: DataDictionary,
{
    fn resolve_vr(&self, tag: Tag, len: Length) -> VR {
        // In implicit VR, Pixel Data (7FE0,0010) and
        // Overlay Data (60xx,3000) are always OW.
        if tag == Tag(0x7FE0, 0x0010) || (tag.0 >> 8 == 0x60 && tag.1 == 0x3000) {
            return VR::OW;
        }
        match self.dict.vr_of(tag) {
            // undefined length without a sequence VR
            // can only be an implicit VR sequence
            vr if len.is_undefined() && vr != VR::SQ => VR::UN,
            vr => vr,
        }
    }
}

impl<D> Decode for ImplicitVRDecoder<D>
where
    D: DataDictionary,
{
    fn decode_header(&self, cursor: &mut ByteCursor) -> Result<DataElementHeader> {
        transactional(cursor, |cursor| {
            let position = cursor.absolute_position();
            if let Ok(Tag(0xFFFE, _)) = cursor.peek_tag() {
                let (tag, len) = read_item_header(cursor)?;
                return Ok(DataElementHeader::new(tag, VR::UN, len));
            }
            let tag = read_field(cursor, HeaderField::Tag, ByteCursor::read_tag)?;
            let len = Length(read_field(cursor, HeaderField::Length, ByteCursor::read_u32)?);
            let vr = self.resolve_vr(tag, len);
            check_length(DataElementHeader::new(tag, vr, len), position)
        })
    }

    fn header_len(&self, _vr: VR) -> usize {
        8
    }
}
