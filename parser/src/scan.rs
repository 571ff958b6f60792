//! Locating the end of values of undefined length.
//!
//! A [`StructureScanner`] walks the item and delimiter structure
//! of a sequence or encapsulated pixel data value
//! without decoding any element value.
//! It is resumable: when the window ends within the structure,
//! the scan stops with [`ScanOutcome::NeedMore`]
//! and continues from the same position on the next call.
use crate::decode::{is_pixel_sequence, DecodeState};
use crate::error::{MalformedSequenceSnafu, Result};
use byteordered::Endianness;
use dcmstream_core::header::{DataElementHeader, HasLength, Header, SequenceItemHeader};
use dcmstream_core::{Tag, VR};
use dcmstream_encoding::cursor::ByteCursor;
use dcmstream_encoding::decode::{Decode, HeaderDecoder};
use smallvec::{smallvec, SmallVec};

/// The result of a scan step.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The value ends right before this absolute offset.
    Complete(u64),
    /// The window ends within the value.
    NeedMore,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Frame {
    /// within a sequence, expecting items
    Sequence { implicit: bool },
    /// within an item of undefined length, expecting elements
    Item { implicit: bool },
    /// within encapsulated pixel data, expecting fragments
    PixelSequence,
}

/// Resumable scanner over the nested structure of a value
/// of undefined length.
#[derive(Debug, Clone)]
pub struct StructureScanner {
    tag: Tag,
    explicit_vr: bool,
    endianness: Endianness,
    stack: SmallVec<[Frame; 4]>,
    pos: u64,
}

impl StructureScanner {
    /// Create a scanner for the value of the element with the given header,
    /// starting at the absolute offset `value_start`.
    pub fn new(state: &DecodeState, header: &DataElementHeader, value_start: u64) -> Self {
        let frame = if is_pixel_sequence(header) {
            Frame::PixelSequence
        } else {
            Frame::Sequence {
                implicit: header.vr() == VR::UN,
            }
        };
        StructureScanner {
            tag: header.tag(),
            explicit_vr: state.explicit_vr(),
            endianness: state.endianness(),
            stack: smallvec![frame],
            pos: value_start,
        }
    }

    /// The absolute offset up to which the value was scanned.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// The current nesting depth; zero once the value end was found.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Continue scanning over `window`,
    /// whose first byte is at the absolute offset `base`.
    ///
    /// The window must start at or before [`position`](Self::position).
    pub fn scan(&mut self, window: &[u8], base: u64) -> Result<ScanOutcome> {
        debug_assert!(base <= self.pos);
        let end = base + window.len() as u64;
        while let Some(&frame) = self.stack.last() {
            if self.pos >= end {
                return Ok(ScanOutcome::NeedMore);
            }
            let (explicit_vr, endianness) = match frame {
                Frame::Sequence { implicit: true } | Frame::Item { implicit: true } => {
                    (false, Endianness::Little)
                }
                _ => (self.explicit_vr, self.endianness),
            };
            let decoder = HeaderDecoder::new(explicit_vr);
            let at = (self.pos - base) as usize;
            let mut cursor = ByteCursor::new(&window[at..], endianness).with_base(self.pos);

            match frame {
                Frame::Sequence { .. } | Frame::PixelSequence => {
                    let item = match decoder.decode_item_header(&mut cursor) {
                        Err(e) if e.is_incomplete() => return Ok(ScanOutcome::NeedMore),
                        item => item?,
                    };
                    let offset = self.pos;
                    self.pos = cursor.absolute_position();
                    match (item, frame) {
                        (SequenceItemHeader::Item { len }, frame) => match (len.get(), frame) {
                            (Some(len), _) => self.pos += u64::from(len),
                            (None, Frame::Sequence { implicit }) => {
                                self.stack.push(Frame::Item { implicit })
                            }
                            (None, _) => {
                                return MalformedSequenceSnafu {
                                    tag: self.tag,
                                    offset,
                                    reason: "pixel data item of undefined length",
                                }
                                .fail()
                            }
                        },
                        (SequenceItemHeader::SequenceDelimiter, _) => {
                            self.stack.pop();
                        }
                        (SequenceItemHeader::ItemDelimiter, _) => {
                            return MalformedSequenceSnafu {
                                tag: self.tag,
                                offset,
                                reason: "item delimiter outside of an item",
                            }
                            .fail()
                        }
                    }
                }
                Frame::Item { implicit } => {
                    let header = match decoder.decode_header(&mut cursor) {
                        Err(e) if e.is_incomplete() => return Ok(ScanOutcome::NeedMore),
                        header => header?,
                    };
                    let offset = self.pos;
                    self.pos = cursor.absolute_position();
                    if header.is_item_delimiter() {
                        self.stack.pop();
                    } else if header.is_delimiting() {
                        return MalformedSequenceSnafu {
                            tag: self.tag,
                            offset,
                            reason: "item or sequence delimiter within an item",
                        }
                        .fail();
                    } else {
                        match header.length().get() {
                            Some(len) => self.pos += u64::from(len),
                            None if is_pixel_sequence(&header) => {
                                self.stack.push(Frame::PixelSequence)
                            }
                            None => self.stack.push(Frame::Sequence {
                                implicit: implicit || header.vr() == VR::UN,
                            }),
                        }
                    }
                }
            }
        }
        Ok(ScanOutcome::Complete(self.pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmstream_core::header::Length;
    use dcmstream_dictionary_std::tags;

    // value of an undefined-length SQ:
    //   item, undefined length
    //     (0008,1140) SQ, undefined length
    //       item, length 8
    //         (0008,0000) UL 0 (skipped, length only)
    //     sequence delimiter
    //   item delimiter
    // sequence delimiter
    #[rustfmt::skip]
    const NESTED: &[u8] = &[
        0xFE, 0xFF, 0x00, 0xE0, 0xFF, 0xFF, 0xFF, 0xFF,
        0x08, 0x00, 0x40, 0x11, b'S', b'Q', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
        0xFE, 0xFF, 0x00, 0xE0, 0x08, 0x00, 0x00, 0x00,
        0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08,
        0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
        0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00,
        0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
    ];

    fn scanner(start: u64) -> StructureScanner {
        let header = DataElementHeader::new(tags::REFERENCED_IMAGE_SEQUENCE, VR::SQ, Length::UNDEFINED);
        StructureScanner::new(&DecodeState::new(true, Endianness::Little), &header, start)
    }

    #[test]
    fn finds_end_of_nested_sequences() {
        let mut scanner = scanner(50);
        assert_eq!(
            scanner.scan(NESTED, 50).unwrap(),
            ScanOutcome::Complete(50 + NESTED.len() as u64)
        );
        assert_eq!(scanner.depth(), 0);
    }

    #[test]
    fn resumes_at_any_split() {
        for split in 0..NESTED.len() {
            let mut scanner = scanner(0);
            assert_eq!(
                scanner.scan(&NESTED[..split], 0).unwrap(),
                ScanOutcome::NeedMore,
                "split at {}",
                split
            );
            assert!(scanner.position() <= NESTED.len() as u64);
            // resume over the whole buffer
            assert_eq!(
                scanner.scan(NESTED, 0).unwrap(),
                ScanOutcome::Complete(NESTED.len() as u64),
                "split at {}",
                split
            );
        }
    }

    #[test]
    fn resumes_from_a_later_window() {
        let mut scanner = scanner(0);
        assert_eq!(scanner.scan(&NESTED[..30], 0).unwrap(), ScanOutcome::NeedMore);
        let pos = scanner.position();
        let rest = &NESTED[pos as usize..];
        assert_eq!(
            scanner.scan(rest, pos).unwrap(),
            ScanOutcome::Complete(NESTED.len() as u64)
        );
    }

    #[test]
    fn rejects_undefined_length_fragments() {
        let header = DataElementHeader::new(tags::PIXEL_DATA, VR::OB, Length::UNDEFINED);
        let mut scanner =
            StructureScanner::new(&DecodeState::new(true, Endianness::Little), &header, 0);
        let raw = [0xFE, 0xFF, 0x00, 0xE0, 0xFF, 0xFF, 0xFF, 0xFF];
        assert!(scanner.scan(&raw, 0).is_err());
    }
}
