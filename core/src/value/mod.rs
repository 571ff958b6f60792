//! This module includes a high level abstraction over a DICOM data element's value.

use crate::header::{HasLength, Length, Tag};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use num_traits::NumCast;
use smallvec::SmallVec;
use snafu::Snafu;
use std::borrow::Cow;
use std::str::FromStr;

pub mod deserialize;
pub mod person_name;
mod primitive;

pub use self::person_name::PersonName;
pub use self::primitive::{PrimitiveValue, ValueType};

/// An aggregation of one or more elements in a value.
pub type C<T> = SmallVec<[T; 2]>;

/// Type alias for the in-memory pixel data fragment data.
pub type InMemFragment = Vec<u8>;

/// An error type for an attempt of accessing a value
/// in one internal representation as another.
///
/// This error is raised whenever it is not possible to retrieve the requested
/// value, either because the inner representation is not compatible with the
/// requested value type, or a conversion would be required.
#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(display("bad value cast: requested {} but value is {:?}", requested, got))]
pub struct CastValueError {
    /// The value format requested
    pub requested: &'static str,
    /// The value's actual representation
    pub got: ValueType,
}

/// An error type for a failed attempt at converting a value
/// into another representation.
#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(display("could not convert {:?} to {}", original, requested))]
pub struct ConvertValueError {
    /// The value format requested
    pub requested: &'static str,
    /// The value's original representation
    pub original: ValueType,
    /// The reason why the conversion was unsuccessful,
    /// or none if a conversion from the given original representation
    /// is not possible
    pub cause: Option<String>,
}

impl From<CastValueError> for ConvertValueError {
    fn from(e: CastValueError) -> Self {
        ConvertValueError {
            requested: e.requested,
            original: e.got,
            cause: None,
        }
    }
}

/// Representation of a full DICOM value, which may be either primitive or
/// another DICOM object.
///
/// `I` is the complex type for nested data set items.
/// `P` is the encapsulated pixel data fragment type,
/// which should usually implement `AsRef<[u8]>`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<I, P = InMemFragment> {
    /// Primitive value.
    Primitive(PrimitiveValue),
    /// A complex sequence of items.
    Sequence(DataSetSequence<I>),
    /// A sequence of encapsulated pixel data fragments.
    PixelSequence(PixelFragmentSequence<P>),
    /// A value which was not decoded.
    /// The element header's length tells how many bytes it spans,
    /// starting at `offset` from the beginning of the source.
    Deferred {
        /// the absolute byte offset of the first value byte
        offset: u64,
    },
}

impl<I, P> Value<I, P> {
    /// Construct a DICOM data set sequence value
    /// from a list of items and the declared length.
    pub fn new_sequence<T>(items: T, length: Length) -> Self
    where
        T: Into<C<I>>,
    {
        Value::Sequence(DataSetSequence::new(items, length))
    }

    /// Construct a DICOM pixel sequence value
    /// from a basic offset table and a list of fragments.
    pub fn new_pixel_sequence<T>(offset_table: C<u32>, fragments: T) -> Self
    where
        T: Into<C<P>>,
    {
        Value::PixelSequence(PixelFragmentSequence::new(offset_table, fragments))
    }

    /// Obtain the number of individual values.
    /// In a primitive, this is the number of individual elements in the value.
    /// In a sequence item, this is the number of items.
    /// In a pixel sequence, this is currently set to 1
    /// regardless of the number of compressed fragments or frames.
    pub fn multiplicity(&self) -> u32 {
        match self {
            Value::Primitive(v) => v.multiplicity(),
            Value::Sequence(v) => v.items.len() as u32,
            Value::PixelSequence(..) => 1,
            Value::Deferred { .. } => 0,
        }
    }

    /// Gets a reference to the primitive value.
    pub fn primitive(&self) -> Option<&PrimitiveValue> {
        match self {
            Value::Primitive(v) => Some(v),
            _ => None,
        }
    }

    /// Gets a reference to the items of a sequence.
    ///
    /// Returns `None` if the value is not a data set sequence.
    pub fn items(&self) -> Option<&[I]> {
        match self {
            Value::Sequence(v) => Some(&v.items),
            _ => None,
        }
    }

    /// Gets a reference to the encapsulated pixel data's offset table.
    pub fn offset_table(&self) -> Option<&[u32]> {
        match self {
            Value::PixelSequence(v) => Some(&v.offset_table),
            _ => None,
        }
    }

    /// Gets a reference to the encapsulated pixel data's fragments.
    pub fn fragments(&self) -> Option<&[P]> {
        match self {
            Value::PixelSequence(v) => Some(&v.fragments),
            _ => None,
        }
    }

    /// Retrieve the kind of value held.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Primitive(v) => v.value_type(),
            Value::Sequence(..) => ValueType::Item,
            Value::PixelSequence(..) => ValueType::PixelSequence,
            Value::Deferred { .. } => ValueType::Deferred,
        }
    }

    fn try_primitive(&self, requested: &'static str) -> Result<&PrimitiveValue, CastValueError> {
        self.primitive().ok_or_else(|| CastValueError {
            requested,
            got: self.value_type(),
        })
    }

    /// Retrieves the primitive value as a single string.
    ///
    /// If the value contains multiple strings,
    /// they are joined with a backslash.
    pub fn to_str(&self) -> Result<Cow<str>, CastValueError> {
        Ok(self.try_primitive("string")?.to_str())
    }

    /// Retrieves the primitive value as a sequence of strings.
    pub fn to_multi_str(&self) -> Result<Cow<[String]>, CastValueError> {
        Ok(self.try_primitive("strings")?.to_multi_str())
    }

    /// Retrieves the primitive value as raw bytes.
    pub fn to_bytes(&self) -> Result<Cow<[u8]>, CastValueError> {
        self.try_primitive("bytes")?.to_bytes()
    }

    /// Retrieves the first value as an integer.
    pub fn to_int<T>(&self) -> Result<T, ConvertValueError>
    where
        T: NumCast,
        T: FromStr<Err = std::num::ParseIntError>,
    {
        self.try_primitive("integer")?.to_int()
    }

    /// Retrieves the first value as a date.
    pub fn to_date(&self) -> Result<NaiveDate, ConvertValueError> {
        match self.try_primitive("Date")? {
            PrimitiveValue::Date(v) if !v.is_empty() => Ok(v[0]),
            other => Err(ConvertValueError {
                requested: "Date",
                original: other.value_type(),
                cause: None,
            }),
        }
    }

    /// Retrieves the first value as a time.
    pub fn to_time(&self) -> Result<NaiveTime, ConvertValueError> {
        match self.try_primitive("Time")? {
            PrimitiveValue::Time(v) if !v.is_empty() => Ok(v[0]),
            other => Err(ConvertValueError {
                requested: "Time",
                original: other.value_type(),
                cause: None,
            }),
        }
    }

    /// Retrieves the first value as a date-time.
    pub fn to_datetime(&self) -> Result<DateTime<FixedOffset>, ConvertValueError> {
        match self.try_primitive("DateTime")? {
            PrimitiveValue::DateTime(v) if !v.is_empty() => Ok(v[0]),
            other => Err(ConvertValueError {
                requested: "DateTime",
                original: other.value_type(),
                cause: None,
            }),
        }
    }

    /// Retrieves the first value as a structured person name.
    pub fn person_name(&self) -> Result<&PersonName, CastValueError> {
        match self.try_primitive("PersonName")? {
            PrimitiveValue::PersonName(v) if !v.is_empty() => Ok(&v[0]),
            other => Err(CastValueError {
                requested: "PersonName",
                got: other.value_type(),
            }),
        }
    }

    /// Retrieves the primitive value as a sequence of attribute tags.
    pub fn to_tags(&self) -> Result<&[Tag], CastValueError> {
        match self.try_primitive("tags")? {
            PrimitiveValue::Tags(v) => Ok(v),
            other => Err(CastValueError {
                requested: "tags",
                got: other.value_type(),
            }),
        }
    }
}

impl<I, P> HasLength for Value<I, P> {
    fn length(&self) -> Length {
        match self {
            Value::Primitive(v) => Length(v.calculate_byte_len() as u32),
            Value::Sequence(v) => v.length,
            Value::PixelSequence(..) | Value::Deferred { .. } => Length::UNDEFINED,
        }
    }
}

impl<I, P> From<PrimitiveValue> for Value<I, P> {
    fn from(v: PrimitiveValue) -> Self {
        Value::Primitive(v)
    }
}

impl<I, P> From<DataSetSequence<I>> for Value<I, P> {
    fn from(v: DataSetSequence<I>) -> Self {
        Value::Sequence(v)
    }
}

impl<I, P> From<PixelFragmentSequence<P>> for Value<I, P> {
    fn from(v: PixelFragmentSequence<P>) -> Self {
        Value::PixelSequence(v)
    }
}

/// A sequence of complex data set items of type `I`.
#[derive(Debug, Clone)]
pub struct DataSetSequence<I> {
    /// The item sequence.
    items: C<I>,
    /// The sequence length in bytes, as declared in the encoded source.
    ///
    /// The value may be [`UNDEFINED`](Length::UNDEFINED)
    /// if the length is implicitly defined
    /// or the sequence is not encoded.
    length: Length,
}

impl<I> DataSetSequence<I> {
    /// Construct a DICOM data sequence
    /// using a sequence of items and a length.
    #[inline]
    pub fn new(items: impl Into<C<I>>, length: Length) -> Self {
        DataSetSequence {
            items: items.into(),
            length,
        }
    }

    /// Construct an empty DICOM data sequence,
    /// with the length explicitly defined to zero.
    #[inline]
    pub fn empty() -> Self {
        DataSetSequence {
            items: Default::default(),
            length: Length(0),
        }
    }

    /// Gets a reference to the items of a sequence.
    #[inline]
    pub fn items(&self) -> &[I] {
        &self.items
    }

    /// Obtain the declared length of the sequence.
    #[inline]
    pub fn length(&self) -> Length {
        self.length
    }

    /// Obtain the items of the sequence, discarding the rest.
    #[inline]
    pub fn into_items(self) -> C<I> {
        self.items
    }
}

// the declared length depends on the encoding, only the items matter
impl<I: PartialEq> PartialEq for DataSetSequence<I> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

/// A sequence of encapsulated pixel data fragments,
/// preceded by a basic offset table.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelFragmentSequence<P> {
    /// The value contents of the basic offset table.
    offset_table: C<u32>,
    /// The sequence of pixel data fragments.
    fragments: C<P>,
}

impl<P> PixelFragmentSequence<P> {
    /// Construct a DICOM pixel sequence
    /// from a basic offset table and a list of fragments.
    pub fn new(offset_table: impl Into<C<u32>>, fragments: impl Into<C<P>>) -> Self {
        PixelFragmentSequence {
            offset_table: offset_table.into(),
            fragments: fragments.into(),
        }
    }

    /// Gets a reference to the basic offset table.
    pub fn offset_table(&self) -> &[u32] {
        &self.offset_table
    }

    /// Gets a reference to the pixel data fragments.
    pub fn fragments(&self) -> &[P] {
        &self.fragments
    }

    /// Retrieve the offset table and the fragments.
    pub fn into_parts(self) -> (C<u32>, C<P>) {
        (self.offset_table, self.fragments)
    }
}
