//! Sequence and encapsulated pixel data decoding.
//!
//! Items are decoded recursively through [`read_element`],
//! each with its own copy of the parent's decoding state.

use super::{read_element, read_to_end, DecodeState, ParseDepth};
use crate::dataset::DataSet;
use crate::error::{MalformedSequenceSnafu, Result, TruncatedElementSnafu};
use dcmstream_core::header::{DataElementHeader, Header, Length, SequenceItemHeader};
use dcmstream_core::value::{PixelFragmentSequence, C};
use dcmstream_core::{Tag, VR};
use dcmstream_encoding::cursor::ByteCursor;
use dcmstream_encoding::decode::Decode;
use snafu::{ensure, OptionExt};

const ITEM_DELIMITER: Tag = Tag(0xFFFE, 0xE00D);

/// Decode the items of a sequence of undefined length,
/// up to and including the sequence delimiter.
///
/// UN elements of undefined length hold Implicit VR Little Endian items.
pub(crate) fn read_sequence(
    cursor: &mut ByteCursor,
    state: &DecodeState,
    header: &DataElementHeader,
    depth: ParseDepth,
) -> Result<C<DataSet>> {
    let tag = header.tag();
    if header.vr() != VR::UN {
        return read_items(cursor, state, tag, depth);
    }
    let item_state = state.implicit_sequence();
    let outer = cursor.endianness();
    cursor.set_endianness(item_state.endianness());
    let out = read_items(cursor, &item_state, tag, depth);
    cursor.set_endianness(outer);
    out
}

fn read_items(
    cursor: &mut ByteCursor,
    state: &DecodeState,
    tag: Tag,
    depth: ParseDepth,
) -> Result<C<DataSet>> {
    let mut items = C::new();
    loop {
        let offset = cursor.absolute_position();
        match state.decoder().decode_item_header(cursor)? {
            SequenceItemHeader::Item { len } => {
                items.push(read_item(cursor, state, tag, len, depth)?);
            }
            SequenceItemHeader::SequenceDelimiter => return Ok(items),
            SequenceItemHeader::ItemDelimiter => {
                return MalformedSequenceSnafu {
                    tag,
                    offset,
                    reason: "item delimiter outside of an item",
                }
                .fail()
            }
        }
    }
}

/// Decode the items of a sequence of defined length,
/// where `window` spans exactly the sequence value.
pub(crate) fn read_defined_sequence(
    window: &mut ByteCursor,
    state: &DecodeState,
    tag: Tag,
    depth: ParseDepth,
) -> Result<C<DataSet>> {
    let mut items = C::new();
    while !window.is_empty() {
        let offset = window.absolute_position();
        match state.decoder().decode_item_header(window)? {
            SequenceItemHeader::Item { len } => {
                items.push(read_item(window, state, tag, len, depth)?);
            }
            // tolerated as the very last header
            SequenceItemHeader::SequenceDelimiter if window.is_empty() => {}
            _ => {
                return MalformedSequenceSnafu {
                    tag,
                    offset,
                    reason: "delimiter within a sequence of defined length",
                }
                .fail()
            }
        }
    }
    Ok(items)
}

fn read_item(
    cursor: &mut ByteCursor,
    parent: &DecodeState,
    tag: Tag,
    len: Length,
    depth: ParseDepth,
) -> Result<DataSet> {
    let mut state = parent.clone();
    let mut item = state.new_item();
    let offset = cursor.absolute_position();
    match len.get() {
        Some(len) => {
            let mut window = cursor
                .read_window(len as usize)
                .ok()
                .context(TruncatedElementSnafu { tag, offset })?;
            read_to_end(&mut window, &mut state, depth, &mut item)?;
        }
        None => {
            loop {
                let offset = cursor.absolute_position();
                match cursor.peek_tag() {
                    Ok(ITEM_DELIMITER) => {
                        state.decoder().decode_item_header(cursor)?;
                        break;
                    }
                    Ok(_) => {
                        item.put(read_element(cursor, &mut state, depth)?);
                    }
                    Err(_) => return TruncatedElementSnafu { tag, offset }.fail(),
                }
            }
            item.set_charset(state.charset());
        }
    }
    Ok(item)
}

/// Decode an encapsulated pixel data value:
/// the basic offset table item followed by fragment items,
/// up to and including the sequence delimiter.
pub(crate) fn read_pixel_sequence(
    cursor: &mut ByteCursor,
    state: &DecodeState,
    tag: Tag,
) -> Result<PixelFragmentSequence<Vec<u8>>> {
    let mut offset_table: Option<C<u32>> = None;
    let mut fragments = C::new();
    loop {
        let offset = cursor.absolute_position();
        match state.decoder().decode_item_header(cursor)? {
            SequenceItemHeader::Item { len } => {
                let len = len.get().context(MalformedSequenceSnafu {
                    tag,
                    offset,
                    reason: "pixel data item of undefined length",
                })? as usize;
                let mut item = cursor
                    .read_window(len)
                    .ok()
                    .context(TruncatedElementSnafu { tag, offset })?;
                if offset_table.is_some() {
                    fragments.push(item.rest().to_vec());
                    continue;
                }
                ensure!(
                    len % 4 == 0,
                    MalformedSequenceSnafu {
                        tag,
                        offset,
                        reason: "basic offset table length is not a multiple of 4",
                    }
                );
                let mut table = C::new();
                while let Ok(entry) = item.read_u32() {
                    table.push(entry);
                }
                offset_table = Some(table);
            }
            SequenceItemHeader::SequenceDelimiter => break,
            SequenceItemHeader::ItemDelimiter => {
                return MalformedSequenceSnafu {
                    tag,
                    offset,
                    reason: "item delimiter in pixel data",
                }
                .fail()
            }
        }
    }
    Ok(PixelFragmentSequence::new(
        offset_table.unwrap_or_default(),
        fragments,
    ))
}

#[cfg(test)]
mod tests {
    use super::super::read_element;
    use super::*;
    use crate::error::Error;
    use byteordered::Endianness;
    use dcmstream_core::header::HasLength;
    use dcmstream_core::value::Value;
    use dcmstream_dictionary_std::tags;

    // (0008,1140) SQ, undefined length
    //   item, undefined length
    //     (0008,1150) UI "1.2.3\0"
    //   item delimiter
    //   item, length 14
    //     (0008,1155) UI "1.2.34"
    // sequence delimiter
    // (0010,0020) LO "ID"
    #[rustfmt::skip]
    const SEQ: &[u8] = &[
        0x08, 0x00, 0x40, 0x11, b'S', b'Q', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
        0xFE, 0xFF, 0x00, 0xE0, 0xFF, 0xFF, 0xFF, 0xFF,
        0x08, 0x00, 0x50, 0x11, b'U', b'I', 0x06, 0x00, b'1', b'.', b'2', b'.', b'3', 0x00,
        0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00,
        0xFE, 0xFF, 0x00, 0xE0, 0x0E, 0x00, 0x00, 0x00,
        0x08, 0x00, 0x55, 0x11, b'U', b'I', 0x06, 0x00, b'1', b'.', b'2', b'.', b'3', b'4',
        0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
        0x10, 0x00, 0x20, 0x00, b'L', b'O', 0x02, 0x00, b'I', b'D',
    ];

    #[test]
    fn undefined_length_sequence_with_two_items() {
        let mut state = DecodeState::new(true, Endianness::Little);
        let mut cursor = state.cursor(SEQ, 0);
        let elem = read_element(&mut cursor, &mut state, ParseDepth::Full).unwrap();
        assert_eq!(elem.tag(), tags::REFERENCED_IMAGE_SEQUENCE);
        assert_eq!(elem.vr(), VR::SQ);
        let items = elem.items().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0]
                .element(tags::REFERENCED_SOP_CLASS_UID)
                .unwrap()
                .to_str()
                .unwrap(),
            "1.2.3"
        );
        assert_eq!(
            items[1]
                .element(tags::REFERENCED_SOP_INSTANCE_UID)
                .unwrap()
                .to_str()
                .unwrap(),
            "1.2.34"
        );
        let next = read_element(&mut cursor, &mut state, ParseDepth::Full).unwrap();
        assert_eq!(next.tag(), tags::PATIENT_ID);
        assert!(cursor.is_empty());
    }

    #[test]
    fn missing_sequence_delimiter() {
        let mut state = DecodeState::new(true, Endianness::Little);
        let mut cursor = state.cursor(&SEQ[..66], 0);
        let err = read_element(&mut cursor, &mut state, ParseDepth::Full).unwrap_err();
        assert!(matches!(err, Error::HeaderDecode { .. }), "{:?}", err);
    }

    #[test]
    fn un_sequence_is_read_as_implicit_vr() {
        #[rustfmt::skip]
        let raw: &[u8] = &[
            0x09, 0x00, 0x10, 0x10, b'U', b'N', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
            0xFE, 0xFF, 0x00, 0xE0, 0xFF, 0xFF, 0xFF, 0xFF,
            // (0028,0010) Rows, implicit VR: US from the dictionary
            0x28, 0x00, 0x10, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x02,
            0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00,
            0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
        ];
        let mut state = DecodeState::new(true, Endianness::Little);
        let mut cursor = state.cursor(raw, 0);
        let elem = read_element(&mut cursor, &mut state, ParseDepth::Full).unwrap();
        assert_eq!(elem.vr(), VR::SQ);
        let items = elem.items().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].element(tags::ROWS).unwrap().to_int::<u16>().unwrap(), 512);
        assert!(cursor.is_empty());
    }

    #[test]
    fn encapsulated_pixel_data() {
        #[rustfmt::skip]
        let raw: &[u8] = &[
            0xE0, 0x7F, 0x10, 0x00, b'O', b'B', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
            // offset table with one entry
            0xFE, 0xFF, 0x00, 0xE0, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            // one fragment
            0xFE, 0xFF, 0x00, 0xE0, 0x04, 0x00, 0x00, 0x00, 0x01, 0x02, 0x03, 0x04,
            0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
        ];
        let mut state = DecodeState::new(true, Endianness::Little);
        let mut cursor = state.cursor(raw, 0);
        let elem = read_element(&mut cursor, &mut state, ParseDepth::Full).unwrap();
        match elem.value() {
            Value::PixelSequence(seq) => {
                assert_eq!(seq.offset_table(), &[0]);
                assert_eq!(seq.fragments(), &[vec![1, 2, 3, 4]]);
            }
            other => panic!("unexpected value {:?}", other),
        }

        // deferred in light mode, skipping the whole sequence
        let mut cursor = state.cursor(raw, 100);
        let elem = read_element(&mut cursor, &mut state, ParseDepth::Light).unwrap();
        assert_eq!(elem.deferred_offset(), Some(112));
        assert!(elem.length().is_undefined());
        assert!(cursor.is_empty());
    }
}
