//! Declaration and implementation of a DICOM primitive value.
//!
//! See [`PrimitiveValue`](./enum.PrimitiveValue.html).

use super::{CastValueError, ConvertValueError, PersonName, C};
use crate::header::{HasLength, Length, Tag};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use itertools::Itertools;
use num_traits::NumCast;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// An enum representing a primitive value from a DICOM element.
/// The result of decoding an element's data value
/// may be one of the enumerated types
/// depending on its content and value representation.
///
/// Multiple elements are contained in a [`smallvec`] vector,
/// conveniently aliased to the type [`C`].
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    /// No data. Usually employed for zero-length values.
    Empty,

    /// A sequence of strings.
    /// Used for AE, AS, CS, DS, IS, LO, SH, UC and UI,
    /// which may be multi-valued.
    Strs(C<String>),

    /// A single string.
    /// Used for ST, LT, UT and UR, which are never multi-valued.
    Str(String),

    /// A sequence of attribute tags.
    /// Used specifically for AT.
    Tags(C<Tag>),

    /// The value is a sequence of unsigned 8-bit integers.
    /// Used for OB, UN, and any value kept in its raw form.
    U8(C<u8>),

    /// The value is a sequence of signed 16-bit integers.
    /// Used for SS.
    I16(C<i16>),

    /// A sequence of unsigned 16-bit integers.
    /// Used for US.
    U16(C<u16>),

    /// A sequence of signed 32-bit integers.
    /// Used for SL.
    I32(C<i32>),

    /// A sequence of unsigned 32-bit integers.
    /// Used for UL.
    U32(C<u32>),

    /// A sequence of signed 64-bit integers.
    /// Used for SV.
    I64(C<i64>),

    /// A sequence of unsigned 64-bit integers.
    /// Used for UV.
    U64(C<u64>),

    /// The value is a sequence of 32-bit floating point numbers.
    /// Used for FL.
    F32(C<f32>),

    /// The value is a sequence of 64-bit floating point numbers.
    /// Used for FD.
    F64(C<f64>),

    /// A sequence of dates.
    /// Used for the DA representation.
    Date(C<NaiveDate>),

    /// A sequence of date-time values.
    /// Used for the DT representation.
    DateTime(C<DateTime<FixedOffset>>),

    /// A sequence of time values.
    /// Used for the TM representation.
    Time(C<NaiveTime>),

    /// A sequence of structured person names.
    /// Used for the PN representation.
    PersonName(C<PersonName>),
}

macro_rules! impl_from_for_primitive {
    ($typ: ty, $variant: ident) => {
        impl From<$typ> for PrimitiveValue {
            fn from(value: $typ) -> Self {
                PrimitiveValue::$variant(C::from_elem(value, 1))
            }
        }
    };
}

impl_from_for_primitive!(u8, U8);
impl_from_for_primitive!(u16, U16);
impl_from_for_primitive!(i16, I16);
impl_from_for_primitive!(u32, U32);
impl_from_for_primitive!(i32, I32);
impl_from_for_primitive!(u64, U64);
impl_from_for_primitive!(i64, I64);
impl_from_for_primitive!(f32, F32);
impl_from_for_primitive!(f64, F64);

impl_from_for_primitive!(Tag, Tags);
impl_from_for_primitive!(NaiveDate, Date);
impl_from_for_primitive!(NaiveTime, Time);
impl_from_for_primitive!(DateTime<FixedOffset>, DateTime);
impl_from_for_primitive!(PersonName, PersonName);

impl From<String> for PrimitiveValue {
    fn from(value: String) -> Self {
        PrimitiveValue::Str(value)
    }
}

impl From<&str> for PrimitiveValue {
    fn from(value: &str) -> Self {
        PrimitiveValue::Str(value.to_owned())
    }
}

impl From<Vec<u8>> for PrimitiveValue {
    fn from(value: Vec<u8>) -> Self {
        PrimitiveValue::U8(C::from(value))
    }
}

impl From<&[u8]> for PrimitiveValue {
    fn from(value: &[u8]) -> Self {
        PrimitiveValue::U8(C::from(value))
    }
}

impl PrimitiveValue {
    /// Create a single unsigned 16-bit value.
    pub fn new_u16(value: u16) -> Self {
        PrimitiveValue::U16(C::from_elem(value, 1))
    }

    /// Create a single unsigned 32-bit value.
    pub fn new_u32(value: u32) -> Self {
        PrimitiveValue::U32(C::from_elem(value, 1))
    }

    /// Create a multi-string value out of any sequence of strings.
    pub fn strs<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PrimitiveValue::Strs(values.into_iter().map(Into::into).collect())
    }

    /// Obtain the number of individual elements. This number may not
    /// match the DICOM value multiplicity in some value representations.
    pub fn multiplicity(&self) -> u32 {
        use self::PrimitiveValue::*;
        match self {
            Empty => 0,
            Str(_) => 1,
            Strs(c) => c.len() as u32,
            Tags(c) => c.len() as u32,
            U8(c) => c.len() as u32,
            I16(c) => c.len() as u32,
            U16(c) => c.len() as u32,
            I32(c) => c.len() as u32,
            U32(c) => c.len() as u32,
            I64(c) => c.len() as u32,
            U64(c) => c.len() as u32,
            F32(c) => c.len() as u32,
            F64(c) => c.len() as u32,
            Date(c) => c.len() as u32,
            DateTime(c) => c.len() as u32,
            Time(c) => c.len() as u32,
            PersonName(c) => c.len() as u32,
        }
    }

    /// Determine the length of the DICOM value in its encoded form.
    ///
    /// In other words,
    /// this is the number of bytes that the value
    /// would need to occupy in a DICOM file,
    /// without compression and without the element header.
    /// The output is always an even number,
    /// so as to consider the mandatory trailing padding.
    ///
    /// Textual values are measured in their textual form,
    /// which matches the encoded length for the default character repertoire.
    pub fn calculate_byte_len(&self) -> usize {
        use self::PrimitiveValue::*;
        let len = match self {
            Empty => 0,
            U8(c) => c.len(),
            I16(c) => c.len() * 2,
            U16(c) => c.len() * 2,
            U32(c) => c.len() * 4,
            I32(c) => c.len() * 4,
            U64(c) => c.len() * 8,
            I64(c) => c.len() * 8,
            F32(c) => c.len() * 4,
            F64(c) => c.len() * 8,
            Tags(c) => c.len() * 4,
            _ => self.to_str().len(),
        };
        (len + 1) & !1
    }

    /// Retrieve the kind of primitive value held.
    pub fn value_type(&self) -> ValueType {
        use self::PrimitiveValue::*;
        match self {
            Empty => ValueType::Empty,
            Strs(_) => ValueType::Strs,
            Str(_) => ValueType::Str,
            Tags(_) => ValueType::Tags,
            U8(_) => ValueType::U8,
            I16(_) => ValueType::I16,
            U16(_) => ValueType::U16,
            I32(_) => ValueType::I32,
            U32(_) => ValueType::U32,
            I64(_) => ValueType::I64,
            U64(_) => ValueType::U64,
            F32(_) => ValueType::F32,
            F64(_) => ValueType::F64,
            Date(_) => ValueType::Date,
            DateTime(_) => ValueType::DateTime,
            Time(_) => ValueType::Time,
            PersonName(_) => ValueType::PersonName,
        }
    }

    /// Convert the primitive value into a string representation.
    ///
    /// String values already encoded with the `Str` and `Strs` variants
    /// are provided as is.
    /// Multiple values are joined with a backslash,
    /// and other kinds of values are converted to their
    /// DICOM textual form.
    pub fn to_str(&self) -> Cow<str> {
        use self::PrimitiveValue::*;
        match self {
            Empty => Cow::from(""),
            Str(value) => Cow::from(value.as_str()),
            Strs(values) if values.len() == 1 => Cow::from(values[0].as_str()),
            Strs(values) => Cow::from(values.iter().join("\\")),
            Date(values) => Cow::from(values.iter().map(|d| d.format("%Y%m%d")).join("\\")),
            Time(values) => Cow::from(values.iter().map(|t| format_time(*t)).join("\\")),
            DateTime(values) => Cow::from(
                values
                    .iter()
                    .map(|dt| {
                        format!(
                            "{}{}{}",
                            dt.format("%Y%m%d"),
                            format_time(dt.time()),
                            dt.format("%z")
                        )
                    })
                    .join("\\"),
            ),
            PersonName(values) => Cow::from(values.iter().join("\\")),
            Tags(values) => Cow::from(
                values
                    .iter()
                    .map(|t| format!("{:04X}{:04X}", t.group(), t.element()))
                    .join("\\"),
            ),
            U8(values) => Cow::from(values.iter().join("\\")),
            I16(values) => Cow::from(values.iter().join("\\")),
            U16(values) => Cow::from(values.iter().join("\\")),
            I32(values) => Cow::from(values.iter().join("\\")),
            U32(values) => Cow::from(values.iter().join("\\")),
            I64(values) => Cow::from(values.iter().join("\\")),
            U64(values) => Cow::from(values.iter().join("\\")),
            F32(values) => Cow::from(values.iter().join("\\")),
            F64(values) => Cow::from(values.iter().join("\\")),
        }
    }

    /// Convert the primitive value into a multi-string representation.
    ///
    /// String values already encoded with the `Str` and `Strs` variants
    /// are provided as is.
    /// All other type variants are converted to a string each.
    pub fn to_multi_str(&self) -> Cow<[String]> {
        use self::PrimitiveValue::*;
        fn each<T: fmt::Display>(values: &[T]) -> Cow<'static, [String]> {
            Cow::Owned(values.iter().map(|v| v.to_string()).collect())
        }
        match self {
            Empty => Cow::from(&[][..]),
            Str(value) => Cow::Owned(vec![value.clone()]),
            Strs(values) => Cow::from(&values[..]),
            PersonName(values) => each(values),
            U8(values) => each(values),
            I16(values) => each(values),
            U16(values) => each(values),
            I32(values) => each(values),
            U32(values) => each(values),
            I64(values) => each(values),
            U64(values) => each(values),
            F32(values) => each(values),
            F64(values) => each(values),
            Tags(values) => each(values),
            Date(values) => Cow::Owned(
                values
                    .iter()
                    .map(|d| d.format("%Y%m%d").to_string())
                    .collect(),
            ),
            Time(values) => Cow::Owned(values.iter().map(|t| format_time(*t)).collect()),
            DateTime(..) => Cow::Owned(self.to_str().split('\\').map(str::to_owned).collect()),
        }
    }

    /// Retrieve this DICOM value as raw bytes.
    ///
    /// Only byte values can be retrieved as is.
    /// Textual values are provided in their UTF-8 form.
    pub fn to_bytes(&self) -> Result<Cow<[u8]>, CastValueError> {
        match self {
            PrimitiveValue::Empty => Ok(Cow::from(&[][..])),
            PrimitiveValue::U8(values) => Ok(Cow::from(&values[..])),
            PrimitiveValue::Str(s) => Ok(Cow::from(s.as_bytes())),
            PrimitiveValue::Strs(_) | PrimitiveValue::PersonName(_) => {
                Ok(Cow::Owned(self.to_str().into_owned().into_bytes()))
            }
            other => Err(CastValueError {
                requested: "bytes",
                got: other.value_type(),
            }),
        }
    }

    /// Retrieve the first value as an integer,
    /// converting it from its binary or textual form.
    pub fn to_int<T>(&self) -> Result<T, ConvertValueError>
    where
        T: NumCast,
        T: FromStr<Err = std::num::ParseIntError>,
    {
        use self::PrimitiveValue::*;
        let fail = |cause: Option<String>| ConvertValueError {
            requested: "integer",
            original: self.value_type(),
            cause,
        };
        let out = match self {
            Str(s) => return s.trim().parse().map_err(|e| fail(Some(format!("{}", e)))),
            Strs(c) if !c.is_empty() => {
                return c[0].trim().parse().map_err(|e| fail(Some(format!("{}", e))))
            }
            U8(c) if !c.is_empty() => <T as NumCast>::from(c[0]),
            I16(c) if !c.is_empty() => <T as NumCast>::from(c[0]),
            U16(c) if !c.is_empty() => <T as NumCast>::from(c[0]),
            I32(c) if !c.is_empty() => <T as NumCast>::from(c[0]),
            U32(c) if !c.is_empty() => <T as NumCast>::from(c[0]),
            I64(c) if !c.is_empty() => <T as NumCast>::from(c[0]),
            U64(c) if !c.is_empty() => <T as NumCast>::from(c[0]),
            _ => return Err(fail(None)),
        };
        out.ok_or_else(|| fail(Some("out of range".to_string())))
    }

    /// Shorten this value by removing trailing elements
    /// to fit the given limit.
    pub fn truncate(&mut self, limit: usize) {
        use self::PrimitiveValue::*;
        match self {
            Empty | Str(_) => {}
            Strs(c) => c.truncate(limit),
            Tags(c) => c.truncate(limit),
            U8(c) => c.truncate(limit),
            I16(c) => c.truncate(limit),
            U16(c) => c.truncate(limit),
            I32(c) => c.truncate(limit),
            U32(c) => c.truncate(limit),
            I64(c) => c.truncate(limit),
            U64(c) => c.truncate(limit),
            F32(c) => c.truncate(limit),
            F64(c) => c.truncate(limit),
            Date(c) => c.truncate(limit),
            DateTime(c) => c.truncate(limit),
            Time(c) => c.truncate(limit),
            PersonName(c) => c.truncate(limit),
        }
    }
}

impl Default for PrimitiveValue {
    fn default() -> Self {
        PrimitiveValue::Empty
    }
}

impl HasLength for PrimitiveValue {
    fn length(&self) -> Length {
        Length::defined(self.calculate_byte_len() as u32)
    }
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_str())
    }
}

fn format_time(time: NaiveTime) -> String {
    use chrono::Timelike;
    let base = time.format("%H%M%S").to_string();
    match time.nanosecond() {
        0 => base,
        nano => format!("{}.{:06}", base, nano / 1_000),
    }
}

/// An enum representing an abstraction of a DICOM element's data value type.
/// This should be the equivalent of `PrimitiveValue` without the content,
/// plus the `Item`, `PixelSequence` and `Deferred` entries.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ValueType {
    /// No data. Used for any value of length 0.
    Empty,
    /// An item. Used for elements in a SQ, regardless of content.
    Item,
    /// Used for the values of encapsulated pixel data.
    PixelSequence,
    /// A value that was not decoded.
    Deferred,
    /// A sequence of strings.
    Strs,
    /// A single string.
    Str,
    /// A sequence of attribute tags.
    Tags,
    /// A sequence of unsigned 8-bit integers.
    U8,
    /// A sequence of signed 16-bit integers.
    I16,
    /// A sequence of unsigned 16-bit integers.
    U16,
    /// A sequence of signed 32-bit integers.
    I32,
    /// A sequence of unsigned 32-bit integers.
    U32,
    /// A sequence of signed 64-bit integers.
    I64,
    /// A sequence of unsigned 64-bit integers.
    U64,
    /// A sequence of 32-bit floating point numbers.
    F32,
    /// A sequence of 64-bit floating point numbers.
    F64,
    /// A sequence of dates.
    Date,
    /// A sequence of date-time values.
    DateTime,
    /// A sequence of time values.
    Time,
    /// A sequence of person names.
    PersonName,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use smallvec::smallvec;

    #[test]
    fn primitive_value_multiplicity() {
        assert_eq!(PrimitiveValue::Empty.multiplicity(), 0);
        assert_eq!(PrimitiveValue::from("Smith").multiplicity(), 1);
        assert_eq!(PrimitiveValue::strs(["A", "B", "C"]).multiplicity(), 3);
        assert_eq!(PrimitiveValue::U16(smallvec![1, 2]).multiplicity(), 2);
    }

    #[test]
    fn calculate_byte_len_is_even() {
        assert_eq!(PrimitiveValue::from("ABC").calculate_byte_len(), 4);
        assert_eq!(PrimitiveValue::strs(["AB", "CD"]).calculate_byte_len(), 6);
        assert_eq!(PrimitiveValue::U32(smallvec![1, 2]).calculate_byte_len(), 8);
        assert_eq!(PrimitiveValue::Empty.calculate_byte_len(), 0);
        assert_eq!(
            PrimitiveValue::from(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
                .calculate_byte_len(),
            8
        );
    }

    #[test]
    fn temporal_values_to_str() {
        let date = PrimitiveValue::Date(smallvec![
            NaiveDate::from_ymd_opt(2014, 10, 12).unwrap(),
            NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(),
        ]);
        assert_eq!(date.to_str(), "20141012\\20010101");

        let time = PrimitiveValue::from(NaiveTime::from_hms_micro_opt(10, 2, 3, 250).unwrap());
        assert_eq!(time.to_str(), "100203.000250");

        let dt = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2020, 5, 6, 7, 8, 9)
            .unwrap();
        assert_eq!(PrimitiveValue::from(dt).to_str(), "20200506070809+0100");
    }

    #[test]
    fn tags_to_str() {
        let v = PrimitiveValue::Tags(smallvec![Tag(0x0010, 0x0010), Tag(0x7FE0, 0x0010)]);
        assert_eq!(v.to_str(), "00100010\\7FE00010");
    }

    #[test]
    fn bytes_only_from_raw_or_text() {
        assert_eq!(
            PrimitiveValue::from(vec![1_u8, 2, 3]).to_bytes().unwrap().as_ref(),
            &[1, 2, 3]
        );
        assert_eq!(
            PrimitiveValue::from("1.2.3").to_bytes().unwrap().as_ref(),
            b"1.2.3"
        );
        assert!(PrimitiveValue::F64(smallvec![1.5]).to_bytes().is_err());
    }

    #[test]
    fn to_int_out_of_range() {
        let v = PrimitiveValue::U32(smallvec![70_000]);
        assert_eq!(v.to_int::<u32>().unwrap(), 70_000);
        let err = v.to_int::<u16>().unwrap_err();
        assert_eq!(err.cause.as_deref(), Some("out of range"));
    }
}
