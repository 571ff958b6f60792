//! One-shot decoding of whole files, and writing them back.

mod common;

use common::{explicit, file_head, implicit, sample_file};
use dcmstream_core::header::{HasLength, Header};
use dcmstream_core::value::Value;
use dcmstream_dictionary_std::tags;
use dcmstream_encoding::text::SpecificCharacterSet;
use dcmstream_parser::{
    from_bytes, open_file, write_file, Error, FileMetaTable, OpenOptions, ParseDepth,
    ReadPreamble,
};
use std::io::Write;

#[test]
fn sample_file_is_fully_decoded() {
    let ds = from_bytes(&sample_file()).unwrap();
    assert_eq!(ds.transfer_syntax(), "1.2.840.10008.1.2.1");
    assert!(ds.explicit_vr());
    assert_eq!(ds.charset(), SpecificCharacterSet::IsoIr100);

    let meta = FileMetaTable::from_dataset(&ds).unwrap();
    assert_eq!(meta.media_storage_sop_instance_uid, "1.2.3.4");
    assert_eq!(meta.implementation_class_uid, "1.2.3.4.5.6");
    assert_eq!(meta.information_group_length, meta.calculate_group_length());

    assert_eq!(ds.element(tags::MODALITY).unwrap().to_str().unwrap(), "MR");
    assert_eq!(ds.element(tags::ROWS).unwrap().to_int::<u16>().unwrap(), 4);
    let name = ds.element_by_name("PatientName").unwrap();
    assert_eq!(name.to_str().unwrap(), "Müller^Hans");
    let items = ds.element(tags::REFERENCED_IMAGE_SEQUENCE).unwrap().items().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].len(), 2);
}

#[test]
fn deferred_values_point_into_the_file() {
    let file = sample_file();

    let light = OpenOptions::new()
        .depth(ParseDepth::Light)
        .from_bytes(&file)
        .unwrap();
    let pixels = light.element(tags::PIXEL_DATA).unwrap();
    let offset = pixels.deferred_offset().unwrap() as usize;
    // the first item of the encapsulated pixel data
    assert_eq!(&file[offset..offset + 4], &[0xFE, 0xFF, 0x00, 0xE0]);
    assert!(pixels.length().is_undefined());
    assert!(light.element(tags::PATIENT_ID).unwrap().deferred_offset().is_none());

    let shallow = OpenOptions::new()
        .depth(ParseDepth::Shallow)
        .from_bytes(&file)
        .unwrap();
    let id = shallow.element(tags::PATIENT_ID).unwrap();
    let offset = id.deferred_offset().unwrap() as usize;
    assert_eq!(&file[offset..offset + 4], b"ID01");
    assert!(matches!(id.value(), Value::Deferred { .. }));
    // the file meta group is always decoded
    assert!(shallow
        .element(tags::TRANSFER_SYNTAX_UID)
        .unwrap()
        .deferred_offset()
        .is_none());
}

#[test]
fn preamble_is_optional() {
    let file = sample_file();
    let expected = from_bytes(&file).unwrap();

    // magic code only
    assert_eq!(from_bytes(&file[128..]).unwrap(), expected);
    let never = OpenOptions::new()
        .read_preamble(ReadPreamble::Never)
        .from_bytes(&file[128..])
        .unwrap();
    assert_eq!(never, expected);

    let e = OpenOptions::new()
        .read_preamble(ReadPreamble::Always)
        .from_bytes(&file[128..])
        .unwrap_err();
    assert!(matches!(e, Error::NotDicom { .. } | Error::TooShort { .. }));
}

#[test]
fn bare_data_set_is_implicit_vr_little_endian() {
    let mut raw = implicit(0x0008, 0x0060, b"MR");
    raw.extend(implicit(0x0010, 0x0020, b"ID01"));
    let ds = from_bytes(&raw).unwrap();
    assert!(!ds.explicit_vr());
    assert_eq!(ds.transfer_syntax(), "1.2.840.10008.1.2");
    assert_eq!(ds.len(), 2);
    assert_eq!(ds.element(tags::PATIENT_ID).unwrap().to_str().unwrap(), "ID01");
}

#[test]
fn big_endian_body() {
    let mut file = file_head("1.2.840.10008.1.2.2");
    // (0028,0010) US 4, then (0028,0011) US 3
    file.extend_from_slice(&[0x00, 0x28, 0x00, 0x10, b'U', b'S', 0x00, 0x02, 0x00, 0x04]);
    file.extend_from_slice(&[0x00, 0x28, 0x00, 0x11, b'U', b'S', 0x00, 0x02, 0x00, 0x03]);
    let ds = from_bytes(&file).unwrap();
    assert_eq!(ds.element(tags::ROWS).unwrap().to_int::<u16>().unwrap(), 4);
    assert_eq!(ds.element(tags::COLUMNS).unwrap().to_int::<u16>().unwrap(), 3);
}

#[test]
fn big_endian_words_are_written_little_endian() {
    let mut file = file_head("1.2.840.10008.1.2.2");
    file.extend_from_slice(&[0x00, 0x28, 0x00, 0x10, b'U', b'S', 0x00, 0x02, 0x00, 0x04]);
    // (7FE0,0010) OW, two words
    file.extend_from_slice(&[0x7F, 0xE0, 0x00, 0x10, b'O', b'W', 0x00, 0x00]);
    file.extend_from_slice(&[0x00, 0x00, 0x00, 0x04, 0x12, 0x34, 0x56, 0x78]);
    let original = from_bytes(&file).unwrap();
    let pixels = original.element(tags::PIXEL_DATA).unwrap();
    assert_eq!(pixels.to_bytes().unwrap().as_ref(), &[0x12, 0x34, 0x56, 0x78]);

    let mut bytes = Vec::new();
    write_file(&mut bytes, &original).unwrap();
    let read = from_bytes(&bytes).unwrap();
    assert_eq!(read.transfer_syntax(), "1.2.840.10008.1.2.1");
    assert_eq!(read.element(tags::ROWS).unwrap().to_int::<u16>().unwrap(), 4);
    let pixels = read.element(tags::PIXEL_DATA).unwrap();
    assert_eq!(pixels.to_bytes().unwrap().as_ref(), &[0x34, 0x12, 0x78, 0x56]);
}

#[test]
fn written_files_read_back() {
    let original = from_bytes(&sample_file()).unwrap();
    let mut bytes = Vec::new();
    write_file(&mut bytes, &original).unwrap();
    assert_eq!(&bytes[128..132], b"DICM");

    let read = from_bytes(&bytes).unwrap();
    assert_eq!(read.transfer_syntax(), "1.2.840.10008.1.2.1");
    let body = |ds: &dcmstream_parser::DataSet| {
        ds.iter()
            .filter(|e| e.tag().group() != 0x0002)
            .cloned()
            .collect::<Vec<_>>()
    };
    assert_eq!(body(&read), body(&original));

    let meta = FileMetaTable::from_dataset(&read).unwrap();
    assert_eq!(meta.information_group_length, meta.calculate_group_length());
    assert_eq!(meta.media_storage_sop_class_uid, "1.2.840.10008.5.1.4.1.1.7");
}

#[test]
fn written_implicit_data_set_becomes_explicit() {
    let mut raw = implicit(0x0008, 0x0016, b"1.2.840.10008.5.1.4.1.1.7\0");
    raw.extend(implicit(0x0008, 0x0018, b"1.2.3.4\0"));
    raw.extend(implicit(0x0010, 0x0020, b"ID01"));
    let original = from_bytes(&raw).unwrap();

    let mut bytes = Vec::new();
    write_file(&mut bytes, &original).unwrap();
    let read = from_bytes(&bytes).unwrap();
    assert!(read.explicit_vr());
    let meta = FileMetaTable::from_dataset(&read).unwrap();
    assert_eq!(meta.media_storage_sop_instance_uid, "1.2.3.4");
    assert_eq!(meta.transfer_syntax, "1.2.840.10008.1.2.1");
    assert_eq!(
        meta.implementation_class_uid,
        dcmstream_parser::IMPLEMENTATION_CLASS_UID
    );
    assert_eq!(read.element(tags::PATIENT_ID).unwrap().to_str().unwrap(), "ID01");
}

#[test]
fn open_file_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&sample_file()).unwrap();
    file.flush().unwrap();

    let ds = open_file(file.path()).unwrap();
    assert_eq!(ds, from_bytes(&sample_file()).unwrap());

    let missing = file.path().with_extension("missing");
    let e = open_file(&missing).unwrap_err();
    assert!(matches!(e, Error::ReadFile { .. }));
}

#[test]
fn truncated_file_fails() {
    let mut file = file_head("1.2.840.10008.1.2.1");
    file.extend(explicit(0x0010, 0x0020, b"LO", b"ID01"));
    let e = from_bytes(&file[..file.len() - 2]).unwrap_err();
    assert!(matches!(
        e,
        Error::TruncatedElement { tag, .. } if tag == tags::PATIENT_ID
    ));
}
