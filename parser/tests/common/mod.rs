//! Hand-built DICOM byte fixtures shared by the integration tests.
#![allow(dead_code)]

use dcmstream_parser::{Error, InMemElement, StreamHandler};

/// An Explicit VR Little Endian element with a defined length.
pub fn explicit(group: u16, element: u16, vr: &[u8; 2], value: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&group.to_le_bytes());
    out.extend_from_slice(&element.to_le_bytes());
    out.extend_from_slice(vr);
    if is_long(vr) {
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&(value.len() as u32).to_le_bytes());
    } else {
        out.extend_from_slice(&(value.len() as u16).to_le_bytes());
    }
    out.extend_from_slice(value);
    out
}

/// An Explicit VR Little Endian header with undefined length.
pub fn explicit_undefined(group: u16, element: u16, vr: &[u8; 2]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&group.to_le_bytes());
    out.extend_from_slice(&element.to_le_bytes());
    out.extend_from_slice(vr);
    out.extend_from_slice(&[0, 0, 0xFF, 0xFF, 0xFF, 0xFF]);
    out
}

/// An Implicit VR Little Endian element.
pub fn implicit(group: u16, element: u16, value: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&group.to_le_bytes());
    out.extend_from_slice(&element.to_le_bytes());
    out.extend_from_slice(&(value.len() as u32).to_le_bytes());
    out.extend_from_slice(value);
    out
}

/// An item or delimiter header.
pub fn item_header(element: u16, len: u32) -> Vec<u8> {
    let mut out = vec![0xFE, 0xFF];
    out.extend_from_slice(&element.to_le_bytes());
    out.extend_from_slice(&len.to_le_bytes());
    out
}

pub fn item(content: &[u8]) -> Vec<u8> {
    let mut out = item_header(0xE000, content.len() as u32);
    out.extend_from_slice(content);
    out
}

pub fn undefined_item(content: &[u8]) -> Vec<u8> {
    let mut out = item_header(0xE000, 0xFFFF_FFFF);
    out.extend_from_slice(content);
    out.extend(item_header(0xE00D, 0));
    out
}

pub fn sequence_delimiter() -> Vec<u8> {
    item_header(0xE0DD, 0)
}

fn is_long(vr: &[u8; 2]) -> bool {
    matches!(
        vr,
        b"OB" | b"OD" | b"OF" | b"OL" | b"OV" | b"OW" | b"SQ" | b"SV" | b"UC" | b"UN" | b"UR"
            | b"UT" | b"UV"
    )
}

/// A preamble, magic code and file meta group
/// declaring the given transfer syntax.
pub fn file_head(transfer_syntax: &str) -> Vec<u8> {
    let mut ts = transfer_syntax.as_bytes().to_vec();
    if ts.len() % 2 == 1 {
        ts.push(0);
    }
    let mut group = Vec::new();
    group.extend(explicit(0x0002, 0x0001, b"OB", &[0, 1]));
    group.extend(explicit(0x0002, 0x0002, b"UI", b"1.2.840.10008.5.1.4.1.1.7\0"));
    group.extend(explicit(0x0002, 0x0003, b"UI", b"1.2.3.4\0"));
    group.extend(explicit(0x0002, 0x0010, b"UI", &ts));
    group.extend(explicit(0x0002, 0x0012, b"UI", b"1.2.3.4.5.6\0"));

    let mut out = vec![0; 128];
    out.extend_from_slice(b"DICM");
    out.extend(explicit(
        0x0002,
        0x0000,
        b"UL",
        &(group.len() as u32).to_le_bytes(),
    ));
    out.extend(group);
    out
}

/// A complete Explicit VR Little Endian file
/// with nested sequence items, a specific character set
/// and encapsulated pixel data.
pub fn sample_file() -> Vec<u8> {
    let mut out = file_head("1.2.840.10008.1.2.1");
    out.extend(explicit(0x0008, 0x0005, b"CS", b"ISO_IR 100"));
    out.extend(explicit(0x0008, 0x0060, b"CS", b"MR"));

    out.extend(explicit_undefined(0x0008, 0x1140, b"SQ"));
    let mut first = explicit(0x0008, 0x1150, b"UI", b"1.2.3\0");
    first.extend(explicit(0x0008, 0x1155, b"UI", b"1.2.3.4.5\0"));
    out.extend(undefined_item(&first));
    out.extend(item(&explicit(0x0008, 0x1150, b"UI", b"1.2.3\0")));
    out.extend(sequence_delimiter());

    out.extend(explicit(0x0010, 0x0010, b"PN", b"M\xFCller^Hans "));
    out.extend(explicit(0x0010, 0x0020, b"LO", b"ID01"));
    out.extend(explicit(0x0028, 0x0010, b"US", &4_u16.to_le_bytes()));

    out.extend(explicit_undefined(0x7FE0, 0x0010, b"OB"));
    out.extend(item(&[]));
    out.extend(item(&[1, 2, 3, 4]));
    out.extend(item(&[5, 6]));
    out.extend(sequence_delimiter());
    out
}

/// An Implicit VR Little Endian file with
/// a private undefined length element holding items,
/// and a defined length sequence of undefined length items.
pub fn implicit_file() -> Vec<u8> {
    let mut out = file_head("1.2.840.10008.1.2");
    out.extend(implicit(0x0008, 0x0060, b"MR"));

    let mut content = undefined_item(&implicit(0x0008, 0x1150, b"1.2.3\0"));
    content.extend(item(&implicit(0x0008, 0x1155, b"1.2\0")));
    let mut items = undefined_item(&implicit(0x0008, 0x1150, b"1.2.3\0"));
    items.extend(undefined_item(&implicit(0x0008, 0x1155, b"1.2.3.4\0")));
    out.extend(implicit(0x0008, 0x1140, &items));

    out.extend(implicit(0x0009, 0x0010, b"ACME 1.0"));
    out.extend(implicit_undefined(0x0009, 0x1001));
    out.extend(content);
    out.extend(sequence_delimiter());

    out.extend(implicit(0x0010, 0x0010, b"Doe^John"));
    out.extend(implicit(0x0028, 0x0010, &4_u16.to_le_bytes()));
    out.extend(implicit(0x7FE0, 0x0010, &[0x12, 0x34, 0x56, 0x78]));
    out
}

/// An Implicit VR Little Endian header with undefined length.
pub fn implicit_undefined(group: u16, element: u16) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&group.to_le_bytes());
    out.extend_from_slice(&element.to_le_bytes());
    out.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF]);
    out
}

/// An Explicit VR Big Endian element with a defined length.
pub fn explicit_be(group: u16, element: u16, vr: &[u8; 2], value: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&group.to_be_bytes());
    out.extend_from_slice(&element.to_be_bytes());
    out.extend_from_slice(vr);
    if is_long(vr) {
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&(value.len() as u32).to_be_bytes());
    } else {
        out.extend_from_slice(&(value.len() as u16).to_be_bytes());
    }
    out.extend_from_slice(value);
    out
}

/// An Explicit VR Big Endian header with undefined length.
pub fn explicit_undefined_be(group: u16, element: u16, vr: &[u8; 2]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&group.to_be_bytes());
    out.extend_from_slice(&element.to_be_bytes());
    out.extend_from_slice(vr);
    out.extend_from_slice(&[0, 0, 0xFF, 0xFF, 0xFF, 0xFF]);
    out
}

/// An item or delimiter header in big endian.
pub fn item_header_be(element: u16, len: u32) -> Vec<u8> {
    let mut out = vec![0xFF, 0xFE];
    out.extend_from_slice(&element.to_be_bytes());
    out.extend_from_slice(&len.to_be_bytes());
    out
}

/// An Explicit VR Big Endian file with a sequence
/// of one undefined length and one defined length item.
pub fn big_endian_file() -> Vec<u8> {
    let mut out = file_head("1.2.840.10008.1.2.2");
    out.extend(explicit_be(0x0008, 0x0060, b"CS", b"MR"));

    out.extend(explicit_undefined_be(0x0008, 0x1140, b"SQ"));
    out.extend(item_header_be(0xE000, 0xFFFF_FFFF));
    out.extend(explicit_be(0x0008, 0x1150, b"UI", b"1.2.3\0"));
    out.extend(explicit_be(0x0008, 0x1155, b"UI", b"1.2.3.4\0"));
    out.extend(item_header_be(0xE00D, 0));
    let second = explicit_be(0x0008, 0x1150, b"UI", b"1.2.3\0");
    out.extend(item_header_be(0xE000, second.len() as u32));
    out.extend(second);
    out.extend(item_header_be(0xE0DD, 0));

    out.extend(explicit_be(0x0010, 0x0010, b"PN", b"Doe^John"));
    out.extend(explicit_be(0x0028, 0x0010, b"US", &4_u16.to_be_bytes()));
    out.extend(explicit_be(0x7FE0, 0x0010, b"OW", &[0x12, 0x34, 0x56, 0x78]));
    out
}

/// A stream handler which keeps everything it receives.
#[derive(Debug, Default)]
pub struct Collect {
    pub elements: Vec<InMemElement>,
    pub errors: Vec<Error>,
}

impl StreamHandler for Collect {
    fn on_element(&mut self, element: InMemElement) {
        self.elements.push(element);
    }

    fn on_error(&mut self, error: Error) {
        self.errors.push(error);
    }
}
