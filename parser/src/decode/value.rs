//! Primitive value decoding.
//!
//! [`decode_value`] turns the raw bytes of a primitive element
//! into a [`PrimitiveValue`] according to its value representation.
//! Failures are returned as an [`Error`],
//! which the element decoder turns into a decode warning
//! while keeping the raw bytes.

use byteordered::byteorder::{BigEndian, ByteOrder, LittleEndian};
use byteordered::Endianness;
use chrono::{Offset, Utc};
use dcmstream_core::value::{deserialize, person_name, PersonName, PrimitiveValue, C};
use dcmstream_core::{Tag, VR};
use dcmstream_encoding::cursor::{self, ByteCursor};
use dcmstream_encoding::text::SpecificCharacterSet;
use snafu::{ensure, Backtrace, ResultExt, Snafu};

/// An error from decoding a primitive value.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Could not decode text"))]
    DecodeText { source: cursor::Error },
    #[snafu(display("Could not parse {} value {:?}", vr, value))]
    ParseTemporal {
        vr: VR,
        value: String,
        #[snafu(backtrace)]
        source: deserialize::Error,
    },
    #[snafu(display("Could not parse person name {:?}", value))]
    ParsePersonName {
        value: String,
        source: person_name::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Length {} of {} value is not a multiple of {}", len, vr, width))]
    ValueWidth {
        vr: VR,
        len: usize,
        width: usize,
        backtrace: Backtrace,
    },
    #[snafu(display("{} is not a primitive value representation", vr))]
    NotPrimitive { vr: VR, backtrace: Backtrace },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Decode the raw bytes of a primitive value.
///
/// `charset` applies to the value representations
/// which admit a specific character set,
/// the others are decoded in the default repertoire.
pub fn decode_value(
    bytes: &[u8],
    vr: VR,
    endianness: Endianness,
    charset: SpecificCharacterSet,
) -> Result<PrimitiveValue> {
    if bytes.is_empty() {
        return Ok(PrimitiveValue::Empty);
    }
    match vr {
        VR::SQ => NotPrimitiveSnafu { vr }.fail(),
        VR::OB | VR::OW | VR::OF | VR::OD | VR::OL | VR::OV | VR::UN => {
            Ok(PrimitiveValue::U8(C::from_slice(bytes)))
        }
        VR::AT => read_tags(bytes, endianness),
        VR::US => read_numbers(bytes, vr, endianness, 2, |o, b| match o {
            Endianness::Little => LittleEndian::read_u16(b),
            Endianness::Big => BigEndian::read_u16(b),
        })
        .map(PrimitiveValue::U16),
        VR::SS => read_numbers(bytes, vr, endianness, 2, |o, b| match o {
            Endianness::Little => LittleEndian::read_i16(b),
            Endianness::Big => BigEndian::read_i16(b),
        })
        .map(PrimitiveValue::I16),
        VR::UL => read_numbers(bytes, vr, endianness, 4, |o, b| match o {
            Endianness::Little => LittleEndian::read_u32(b),
            Endianness::Big => BigEndian::read_u32(b),
        })
        .map(PrimitiveValue::U32),
        VR::SL => read_numbers(bytes, vr, endianness, 4, |o, b| match o {
            Endianness::Little => LittleEndian::read_i32(b),
            Endianness::Big => BigEndian::read_i32(b),
        })
        .map(PrimitiveValue::I32),
        VR::UV => read_numbers(bytes, vr, endianness, 8, |o, b| match o {
            Endianness::Little => LittleEndian::read_u64(b),
            Endianness::Big => BigEndian::read_u64(b),
        })
        .map(PrimitiveValue::U64),
        VR::SV => read_numbers(bytes, vr, endianness, 8, |o, b| match o {
            Endianness::Little => LittleEndian::read_i64(b),
            Endianness::Big => BigEndian::read_i64(b),
        })
        .map(PrimitiveValue::I64),
        VR::FL => read_numbers(bytes, vr, endianness, 4, |o, b| match o {
            Endianness::Little => LittleEndian::read_f32(b),
            Endianness::Big => BigEndian::read_f32(b),
        })
        .map(PrimitiveValue::F32),
        VR::FD => read_numbers(bytes, vr, endianness, 8, |o, b| match o {
            Endianness::Little => LittleEndian::read_f64(b),
            Endianness::Big => BigEndian::read_f64(b),
        })
        .map(PrimitiveValue::F64),
        _ => read_text(bytes, vr, charset),
    }
}

fn read_numbers<T>(
    bytes: &[u8],
    vr: VR,
    endianness: Endianness,
    width: usize,
    read: impl Fn(Endianness, &[u8]) -> T,
) -> Result<C<T>> {
    ensure!(
        bytes.len() % width == 0,
        ValueWidthSnafu {
            vr,
            len: bytes.len(),
            width,
        }
    );
    Ok(bytes
        .chunks_exact(width)
        .map(|b| read(endianness, b))
        .collect())
}

fn read_tags(bytes: &[u8], endianness: Endianness) -> Result<PrimitiveValue> {
    let words = read_numbers(bytes, VR::AT, endianness, 2, |o, b| match o {
        Endianness::Little => LittleEndian::read_u16(b),
        Endianness::Big => BigEndian::read_u16(b),
    })?;
    ensure!(
        words.len() % 2 == 0,
        ValueWidthSnafu {
            vr: VR::AT,
            len: bytes.len(),
            width: 4_usize,
        }
    );
    Ok(PrimitiveValue::Tags(
        words.chunks_exact(2).map(|w| Tag(w[0], w[1])).collect(),
    ))
}

/// Remove the padding of a single textual value.
fn trim_padding(vr: VR, value: &str) -> &str {
    match vr {
        VR::AE | VR::AS | VR::CS | VR::DS | VR::IS => value.trim_matches(' '),
        VR::UI => value.trim_end_matches('\0'),
        _ => value.trim_end_matches(|c: char| c == ' ' || c == '\0'),
    }
}

fn read_text(bytes: &[u8], vr: VR, charset: SpecificCharacterSet) -> Result<PrimitiveValue> {
    let charset = if vr.uses_specific_charset() {
        charset
    } else {
        SpecificCharacterSet::Default
    };
    let text = ByteCursor::new(bytes, Endianness::Little)
        .read_string(bytes.len(), &charset)
        .context(DecodeTextSnafu)?;

    if !vr.is_multi_valued_text() {
        let value = trim_padding(vr, &text);
        if value.is_empty() {
            return Ok(PrimitiveValue::Empty);
        }
        return Ok(PrimitiveValue::Str(value.to_string()));
    }

    let values: Vec<&str> = text.split('\\').map(|v| trim_padding(vr, v)).collect();
    if values.len() == 1 && values[0].is_empty() {
        return Ok(PrimitiveValue::Empty);
    }

    match vr {
        VR::DA => values
            .iter()
            .map(|v| {
                deserialize::parse_date(v.as_bytes()).context(ParseTemporalSnafu { vr, value: *v })
            })
            .collect::<Result<C<_>>>()
            .map(PrimitiveValue::Date),
        VR::TM => values
            .iter()
            .map(|v| {
                deserialize::parse_time(v.as_bytes()).context(ParseTemporalSnafu { vr, value: *v })
            })
            .collect::<Result<C<_>>>()
            .map(PrimitiveValue::Time),
        VR::DT => {
            let utc = Utc.fix();
            values
                .iter()
                .map(|v| {
                    deserialize::parse_datetime(v.as_bytes(), utc)
                        .context(ParseTemporalSnafu { vr, value: *v })
                })
                .collect::<Result<C<_>>>()
                .map(PrimitiveValue::DateTime)
        }
        VR::PN => values
            .iter()
            .map(|v| PersonName::from_text(v).context(ParsePersonNameSnafu { value: *v }))
            .collect::<Result<C<_>>>()
            .map(PrimitiveValue::PersonName),
        _ => Ok(PrimitiveValue::Strs(
            values.into_iter().map(str::to_string).collect(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn decode(bytes: &[u8], vr: VR) -> PrimitiveValue {
        decode_value(bytes, vr, Endianness::Little, SpecificCharacterSet::Default).unwrap()
    }

    #[test]
    fn strings_are_trimmed_and_split() {
        assert_eq!(
            decode(b" ORIGINAL\\PRIMARY ", VR::CS),
            PrimitiveValue::Strs(["ORIGINAL", "PRIMARY"].iter().map(|s| s.to_string()).collect())
        );
        assert_eq!(
            decode(b"1.2.840.10008.1.2\0", VR::UI).to_str(),
            "1.2.840.10008.1.2"
        );
        // leading spaces are significant in LO
        assert_eq!(decode(b" ACME \0", VR::LO).to_str(), " ACME");
        // no multiplicity in long text
        assert_eq!(
            decode(b"one\\two  ", VR::LT),
            PrimitiveValue::Str("one\\two".to_string())
        );
        assert_eq!(decode(b"  ", VR::SH), PrimitiveValue::Empty);
        assert_eq!(decode(b"", VR::US), PrimitiveValue::Empty);
        assert_eq!(
            decode(b"1.5\\-2 ", VR::DS).to_multi_str().to_vec(),
            vec!["1.5".to_string(), "-2".to_string()]
        );
    }

    #[test]
    fn temporal_values() {
        assert_eq!(
            decode(b"20240229", VR::DA),
            PrimitiveValue::from(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        assert_eq!(
            decode(b"1015 ", VR::TM),
            PrimitiveValue::from(NaiveTime::from_hms_opt(10, 15, 0).unwrap())
        );
        let dt = decode(b"20200101120000.5-0300", VR::DT);
        match dt {
            PrimitiveValue::DateTime(values) => {
                assert_eq!(values.len(), 1);
                assert_eq!(values[0].offset().local_minus_utc(), -3 * 3600);
            }
            other => panic!("unexpected value {:?}", other),
        }
        assert!(decode_value(
            b"20241301",
            VR::DA,
            Endianness::Little,
            SpecificCharacterSet::Default
        )
        .is_err());
    }

    #[test]
    fn person_names() {
        let value = decode(b"Test^Patient", VR::PN);
        match value {
            PrimitiveValue::PersonName(names) => {
                assert_eq!(names[0].family(), Some("Test"));
                assert_eq!(names[0].given(), Some("Patient"));
            }
            other => panic!("unexpected value {:?}", other),
        }
        let value = decode_value(
            b"Sim\xF5es^Jo\xE3o ",
            VR::PN,
            Endianness::Little,
            SpecificCharacterSet::IsoIr100,
        )
        .unwrap();
        assert_eq!(value.to_str(), "Simões^João");
    }

    #[test]
    fn numbers_in_both_byte_orders() {
        assert_eq!(
            decode(&[0x01, 0x00, 0x00, 0x01], VR::US),
            PrimitiveValue::U16([1, 256].iter().copied().collect())
        );
        assert_eq!(
            decode_value(
                &[0x01, 0x00, 0x00, 0x01],
                VR::US,
                Endianness::Big,
                SpecificCharacterSet::Default
            )
            .unwrap(),
            PrimitiveValue::U16([256, 1].iter().copied().collect())
        );
        assert_eq!(
            decode(&(-1.5f64).to_le_bytes(), VR::FD),
            PrimitiveValue::from(-1.5f64)
        );
        assert_eq!(
            decode(&[0x10, 0x00, 0x20, 0x00], VR::AT),
            PrimitiveValue::from(Tag(0x0010, 0x0020))
        );
        let err = decode_value(
            &[1, 2, 3],
            VR::UL,
            Endianness::Little,
            SpecificCharacterSet::Default,
        )
        .unwrap_err();
        assert!(matches!(err, Error::ValueWidth { len: 3, width: 4, .. }));
    }

    #[test]
    fn binary_values_are_kept() {
        // OW words stay byte-exact regardless of byte order
        let raw = [0x12, 0x34, 0x56, 0x78];
        assert_eq!(
            decode_value(&raw, VR::OW, Endianness::Big, SpecificCharacterSet::Default).unwrap(),
            PrimitiveValue::U8(C::from_slice(&raw))
        );
        assert_eq!(
            decode(&[1, 2, 3], VR::UN),
            PrimitiveValue::U8(C::from_slice(&[1, 2, 3]))
        );
    }

    #[test]
    fn bad_text_fails() {
        let e = decode_value(
            b"Smith\xFF",
            VR::LO,
            Endianness::Little,
            SpecificCharacterSet::IsoIr192,
        )
        .unwrap_err();
        assert!(matches!(
            e,
            Error::DecodeText {
                source: cursor::Error::DecodeText { position: 0, .. }
            }
        ));
    }
}
