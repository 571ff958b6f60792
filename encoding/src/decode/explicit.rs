//! Explicit VR header decoding, in either byte order.

use super::{
    check_length, read_field, read_item_header, transactional, Decode, HeaderField,
    InvalidVrSnafu, Result,
};
use crate::cursor::ByteCursor;
use dcmstream_core::header::{DataElementHeader, Length};
use dcmstream_core::{Tag, VR};

/// A data element header decoder for explicit VR transfer syntaxes.
///
/// The byte order is the one of the cursor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExplicitVRDecoder;

impl Decode for ExplicitVRDecoder {
    fn decode_header(&self, cursor: &mut ByteCursor) -> Result<DataElementHeader> {
        transactional(cursor, |cursor| {
            let position = cursor.absolute_position();
            let tag = cursor.peek_tag();
            if let Ok(Tag(0xFFFE, _)) = tag {
                // item delimiters do not have VR or reserved field
                let (tag, len) = read_item_header(cursor)?;
                return Ok(DataElementHeader::new(tag, VR::UN, len));
            }
            let tag = read_field(cursor, HeaderField::Tag, ByteCursor::read_tag)?;

            let code = read_field(cursor, HeaderField::Vr, |c| c.read_bytes(2))?;
            let code = [code[0], code[1]];
            let vr = match VR::from_binary(code) {
                Some(vr) => vr,
                None => {
                    return InvalidVrSnafu {
                        tag,
                        code,
                        position,
                    }
                    .fail()
                }
            };

            // PS3.5 7.1.2: long form VRs have 2 reserved bytes
            // followed by a 32-bit length,
            // all others a 16-bit length
            let len = if vr.has_long_length() {
                read_field(cursor, HeaderField::Reserved, |c| c.skip(2))?;
                read_field(cursor, HeaderField::Length, ByteCursor::read_u32)?
            } else {
                u32::from(read_field(cursor, HeaderField::Length, ByteCursor::read_u16)?)
            };

            check_length(DataElementHeader::new(tag, vr, Length(len)), position)
        })
    }

    fn header_len(&self, vr: VR) -> usize {
        if vr.has_long_length() {
            12
        } else {
            8
        }
    }
}
