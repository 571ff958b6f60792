//! Encoding of data sets into Explicit VR Little Endian.
//!
//! Values are padded to an even length,
//! sequences and items are written with undefined length and delimiters,
//! and encapsulated pixel data keeps its offset table and fragments.
use crate::dataset::{DataSet, InMemElement};
use crate::meta::{FileMetaTable, FileMetaTableBuilder, DICM_MAGIC_CODE, PREAMBLE_LEN};
use crate::{IMPLEMENTATION_CLASS_UID, IMPLEMENTATION_VERSION_NAME};
use byteordered::byteorder::{ByteOrder, LittleEndian};
use byteordered::Endianness;
use dcmstream_core::header::{DataElementHeader, Header, Length};
use dcmstream_core::value::{PixelFragmentSequence, PrimitiveValue, Value};
use dcmstream_core::{Tag, VR};
use dcmstream_dictionary_std::tags;
use dcmstream_encoding::encode::{self, Encode, HeaderEncoder};
use dcmstream_encoding::text::{EncodeTextError, SpecificCharacterSet, TextCodec};
use dcmstream_transfer_syntax_registry::entries::EXPLICIT_VR_LITTLE_ENDIAN;
use snafu::{Backtrace, ResultExt, Snafu};
use std::io::{self, Write};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Could not write header of {}", tag))]
    WriteHeader { tag: Tag, source: encode::Error },

    #[snafu(display("Could not write value of {}", tag))]
    WriteValue {
        tag: Tag,
        source: io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Could not write file preamble"))]
    WritePreamble {
        source: io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Could not encode text of {}", tag))]
    EncodeText { tag: Tag, source: EncodeTextError },

    #[snafu(display("Value of {} does not fit in 32 bits: {} bytes", tag, len))]
    ValueTooLong {
        tag: Tag,
        len: usize,
        backtrace: Backtrace,
    },

    /// The element value was not decoded, so there is nothing to write.
    #[snafu(display("Value of {} was not decoded", tag))]
    DeferredValue { tag: Tag, backtrace: Backtrace },

    #[snafu(display("Could not build the file meta group"))]
    BuildMeta { source: crate::meta::Error },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Write a data set in Explicit VR Little Endian, without file meta group.
pub fn write_dataset<W>(to: W, dataset: &DataSet) -> Result<()>
where
    W: Write,
{
    DataSetWriter::new(to)
        .source_endianness(dataset.endianness())
        .write_elements(dataset.iter(), SpecificCharacterSet::Default)
}

/// Write a data set as a DICOM file:
/// the preamble, the magic code, a file meta group
/// declaring Explicit VR Little Endian,
/// and the data set elements outside of the meta group.
///
/// The file meta group is derived from the one in the data set if present,
/// or from its SOP class and instance UIDs otherwise.
pub fn write_file<W>(mut to: W, dataset: &DataSet) -> Result<()>
where
    W: Write,
{
    let meta = file_meta_for(dataset)?;
    to.write_all(&[0; PREAMBLE_LEN]).context(WritePreambleSnafu)?;
    to.write_all(&DICM_MAGIC_CODE).context(WritePreambleSnafu)?;

    let mut writer = DataSetWriter::new(to).source_endianness(dataset.endianness());
    writer.write_elements(meta.to_elements().iter(), SpecificCharacterSet::Default)?;
    writer.write_elements(
        dataset.iter().filter(|e| e.tag().group() != 0x0002),
        SpecificCharacterSet::Default,
    )
}

fn file_meta_for(dataset: &DataSet) -> Result<FileMetaTable> {
    let mut meta = match FileMetaTable::from_dataset(dataset) {
        Ok(meta) => meta,
        Err(_) => {
            let uid = |tag| dataset.element(tag).and_then(|e| e.to_str().ok());
            let mut builder = FileMetaTableBuilder::new()
                .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN.uid())
                .implementation_class_uid(IMPLEMENTATION_CLASS_UID)
                .implementation_version_name(IMPLEMENTATION_VERSION_NAME);
            if let Some(class_uid) = uid(tags::SOP_CLASS_UID) {
                builder = builder.media_storage_sop_class_uid(class_uid);
            }
            if let Some(instance_uid) = uid(tags::SOP_INSTANCE_UID) {
                builder = builder.media_storage_sop_instance_uid(instance_uid);
            }
            builder.build().context(BuildMetaSnafu)?
        }
    };
    meta.transfer_syntax = EXPLICIT_VR_LITTLE_ENDIAN.uid().to_string();
    meta.update_information_group_length();
    Ok(meta)
}

/// A writer of data set elements in Explicit VR Little Endian.
#[derive(Debug)]
pub struct DataSetWriter<W> {
    to: W,
    encoder: HeaderEncoder,
    /// byte order of the raw binary values held by the elements
    source: Endianness,
}

impl<W> DataSetWriter<W>
where
    W: Write,
{
    pub fn new(to: W) -> Self {
        DataSetWriter {
            to,
            encoder: HeaderEncoder::explicit_vr_le(),
            source: Endianness::Little,
        }
    }

    /// Declare the byte order in which the data set was decoded.
    ///
    /// Raw binary values outside of the file meta group,
    /// such as `OW` words or numbers which could not be decoded,
    /// are kept in this byte order and get swapped to little endian.
    pub fn source_endianness(mut self, endianness: Endianness) -> Self {
        self.source = endianness;
        self
    }

    /// Retrieve the underlying destination.
    pub fn into_inner(self) -> W {
        self.to
    }

    /// Write the given elements in order.
    ///
    /// `charset` is the character set in effect before the first element.
    pub fn write_elements<'a, I>(&mut self, elements: I, mut charset: SpecificCharacterSet) -> Result<()>
    where
        I: IntoIterator<Item = &'a InMemElement>,
    {
        for element in elements {
            self.write_element(element, &mut charset)?;
        }
        Ok(())
    }

    fn write_element(
        &mut self,
        element: &InMemElement,
        charset: &mut SpecificCharacterSet,
    ) -> Result<()> {
        let tag = element.tag();
        match element.value() {
            Value::Primitive(value) => {
                let mut bytes = encode_primitive(tag, element.vr(), value, *charset)?;
                if self.source == Endianness::Big && tag.group() != 0x0002 {
                    if let PrimitiveValue::U8(_) = value {
                        swap_words(element.vr(), &mut bytes);
                    }
                }
                if bytes.len() > u32::MAX as usize - 1 {
                    return ValueTooLongSnafu {
                        tag,
                        len: bytes.len(),
                    }
                    .fail();
                }
                self.write_header(tag, element.vr(), Length(bytes.len() as u32))?;
                self.to.write_all(&bytes).context(WriteValueSnafu { tag })?;
                if tag == tags::SPECIFIC_CHARACTER_SET {
                    if let Some(cs) = SpecificCharacterSet::from_code(&value.to_str()) {
                        *charset = cs;
                    }
                }
            }
            Value::Sequence(seq) => {
                self.write_header(tag, VR::SQ, Length::UNDEFINED)?;
                for item in seq.items() {
                    self.encoder
                        .encode_item_header(&mut self.to, Length::UNDEFINED.0)
                        .context(WriteHeaderSnafu { tag })?;
                    self.write_elements(item.iter(), *charset)?;
                    self.encoder
                        .encode_item_delimiter(&mut self.to)
                        .context(WriteHeaderSnafu { tag })?;
                }
                self.encoder
                    .encode_sequence_delimiter(&mut self.to)
                    .context(WriteHeaderSnafu { tag })?;
            }
            Value::PixelSequence(seq) => {
                self.write_header(tag, element.vr(), Length::UNDEFINED)?;
                self.write_pixel_sequence(tag, seq)?;
            }
            Value::Deferred { .. } => return DeferredValueSnafu { tag }.fail(),
        }
        Ok(())
    }

    fn write_header(&mut self, tag: Tag, vr: VR, len: Length) -> Result<()> {
        self.encoder
            .encode_element_header(&mut self.to, DataElementHeader::new(tag, vr, len))
            .context(WriteHeaderSnafu { tag })?;
        Ok(())
    }

    fn write_pixel_sequence(&mut self, tag: Tag, seq: &PixelFragmentSequence<Vec<u8>>) -> Result<()> {
        let mut table = vec![0; seq.offset_table().len() * 4];
        LittleEndian::write_u32_into(seq.offset_table(), &mut table);
        self.encoder
            .encode_item_header(&mut self.to, table.len() as u32)
            .context(WriteHeaderSnafu { tag })?;
        self.to.write_all(&table).context(WriteValueSnafu { tag })?;

        for fragment in seq.fragments() {
            let padded = fragment.len() + (fragment.len() & 1);
            self.encoder
                .encode_item_header(&mut self.to, padded as u32)
                .context(WriteHeaderSnafu { tag })?;
            self.to.write_all(fragment).context(WriteValueSnafu { tag })?;
            if padded > fragment.len() {
                self.to.write_all(&[0]).context(WriteValueSnafu { tag })?;
            }
        }
        self.encoder
            .encode_sequence_delimiter(&mut self.to)
            .context(WriteHeaderSnafu { tag })
    }
}

/// Reverse each word of a raw big endian value in place,
/// the word width given by the VR.
fn swap_words(vr: VR, bytes: &mut [u8]) {
    let width = match vr {
        VR::OW | VR::US | VR::SS | VR::AT => 2,
        VR::OF | VR::OL | VR::UL | VR::SL | VR::FL => 4,
        VR::OD | VR::OV | VR::FD | VR::SV | VR::UV => 8,
        _ => return,
    };
    for word in bytes.chunks_exact_mut(width) {
        word.reverse();
    }
}

/// Encode a primitive value, padded to an even length.
fn encode_primitive(
    tag: Tag,
    vr: VR,
    value: &PrimitiveValue,
    charset: SpecificCharacterSet,
) -> Result<Vec<u8>> {
    macro_rules! binary {
        ($values: expr, $size: expr, $write: ident) => {{
            let mut out = vec![0; $values.len() * $size];
            LittleEndian::$write($values, &mut out);
            out
        }};
    }

    let mut out = match value {
        PrimitiveValue::Empty => Vec::new(),
        // raw bytes are kept as is, whatever the VR
        PrimitiveValue::U8(bytes) => bytes.to_vec(),
        PrimitiveValue::Tags(values) => {
            let mut out = vec![0; values.len() * 4];
            for (t, chunk) in values.iter().zip(out.chunks_exact_mut(4)) {
                LittleEndian::write_u16(&mut chunk[..2], t.group());
                LittleEndian::write_u16(&mut chunk[2..], t.element());
            }
            out
        }
        _ if vr.is_textual() => {
            let charset = if vr.uses_specific_charset() {
                charset
            } else {
                SpecificCharacterSet::Default
            };
            charset
                .encode(&value.to_str())
                .context(EncodeTextSnafu { tag })?
        }
        PrimitiveValue::I16(values) => binary!(values, 2, write_i16_into),
        PrimitiveValue::U16(values) => binary!(values, 2, write_u16_into),
        PrimitiveValue::I32(values) => binary!(values, 4, write_i32_into),
        PrimitiveValue::U32(values) => binary!(values, 4, write_u32_into),
        PrimitiveValue::I64(values) => binary!(values, 8, write_i64_into),
        PrimitiveValue::U64(values) => binary!(values, 8, write_u64_into),
        PrimitiveValue::F32(values) => binary!(values, 4, write_f32_into),
        PrimitiveValue::F64(values) => binary!(values, 8, write_f64_into),
        other => other.to_str().into_owned().into_bytes(),
    };
    if out.len() % 2 == 1 {
        out.push(match vr {
            VR::UI => b'\0',
            vr if vr.is_textual() => b' ',
            _ => 0,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmstream_core::header::DataElement;
    use dcmstream_core::value::C;

    #[test]
    fn values_are_padded() {
        let uid = encode_primitive(
            tags::SOP_CLASS_UID,
            VR::UI,
            &PrimitiveValue::from("1.2.3"),
            SpecificCharacterSet::Default,
        )
        .unwrap();
        assert_eq!(uid, b"1.2.3\0");

        let name = encode_primitive(
            tags::PATIENT_NAME,
            VR::PN,
            &PrimitiveValue::from("Doe^John"),
            SpecificCharacterSet::Default,
        )
        .unwrap();
        assert_eq!(name, b"Doe^John");

        let codes = encode_primitive(
            tags::IMAGE_TYPE,
            VR::CS,
            &PrimitiveValue::strs(["DERIVED", "PRIMARY"]),
            SpecificCharacterSet::Default,
        )
        .unwrap();
        assert_eq!(codes, b"DERIVED\\PRIMARY ");

        let rows = encode_primitive(
            tags::ROWS,
            VR::US,
            &PrimitiveValue::from(512_u16),
            SpecificCharacterSet::Default,
        )
        .unwrap();
        assert_eq!(rows, [0x00, 0x02]);
    }

    #[test]
    fn sequences_use_undefined_length() {
        let item: DataSet = vec![DataElement::new(
            tags::REFERENCED_SOP_INSTANCE_UID,
            VR::UI,
            PrimitiveValue::from("1.2"),
        )]
        .into_iter()
        .collect();
        let ds: DataSet = vec![DataElement::new(
            tags::REFERENCED_IMAGE_SEQUENCE,
            VR::SQ,
            Value::new_sequence(C::from_vec(vec![item]), Length::UNDEFINED),
        )]
        .into_iter()
        .collect();

        let mut out = Vec::new();
        write_dataset(&mut out, &ds).unwrap();
        #[rustfmt::skip]
        let expected: &[u8] = &[
            0x08, 0x00, 0x40, 0x11, b'S', b'Q', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
            0xFE, 0xFF, 0x00, 0xE0, 0xFF, 0xFF, 0xFF, 0xFF,
            0x08, 0x00, 0x55, 0x11, b'U', b'I', 0x04, 0x00, b'1', b'.', b'2', 0x00,
            0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00,
            0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
        ];
        assert_eq!(out, expected);
    }

    #[test]
    fn big_endian_raw_values_are_swapped() {
        let ds: DataSet = vec![
            DataElement::new(
                tags::SPECIFIC_CHARACTER_SET,
                VR::CS,
                PrimitiveValue::from("ISO_IR 100"),
            ),
            // a US value kept raw after failing to decode
            DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(vec![0x01_u8, 0x02, 0x03])),
            DataElement::new(tags::PIXEL_DATA, VR::OB, PrimitiveValue::from(vec![0x12_u8, 0x34])),
        ]
        .into_iter()
        .collect();

        let mut writer = DataSetWriter::new(Vec::new()).source_endianness(Endianness::Big);
        writer
            .write_elements(ds.iter(), SpecificCharacterSet::Default)
            .unwrap();
        let out = writer.into_inner();
        // charset element: 8 byte header and 10 bytes of text
        let rows = &out[18..30];
        assert_eq!(rows, &[0x28, 0x00, 0x10, 0x00, b'U', b'S', 0x04, 0x00, 0x02, 0x01, 0x03, 0x00]);
        // OB bytes are not words
        assert_eq!(&out[out.len() - 2..], &[0x12, 0x34]);
    }

    #[test]
    fn deferred_values_cannot_be_written() {
        let ds: DataSet = vec![DataElement::new_with_len(
            tags::PIXEL_DATA,
            VR::OW,
            Length(4),
            Value::Deferred { offset: 300 },
        )]
        .into_iter()
        .collect();
        let res = write_dataset(Vec::new(), &ds);
        assert!(matches!(res, Err(Error::DeferredValue { .. })));
    }
}
