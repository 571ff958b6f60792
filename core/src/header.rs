//! This module contains an assortment of types required for interpreting
//! DICOM data elements: the attribute tag, the value representation,
//! the value length, element headers and the element composite type.

use crate::value::{CastValueError, ConvertValueError, PersonName, PrimitiveValue, Value};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use num_traits::NumCast;
use snafu::{Backtrace, Snafu};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::str::{from_utf8, FromStr};

/// Error type for issues constructing a sequence item header.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum SequenceItemHeaderError {
    /// Unexpected header tag.
    /// Only Item (0xFFFE, 0xE000),
    /// Item Delimiter (0xFFFE, 0xE00D),
    /// or Sequence Delimiter (0xFFFE, 0xE0DD)
    /// are admitted.
    #[snafu(display("Unexpected tag {}", tag))]
    UnexpectedTag { tag: Tag, backtrace: Backtrace },
    /// Unexpected delimiter value length.
    /// Must be zero for item delimiters.
    #[snafu(display("Unexpected delimiter length {}", len))]
    UnexpectedDelimiterLength { len: Length, backtrace: Backtrace },
}

type Result<T, E = SequenceItemHeaderError> = std::result::Result<T, E>;

/// Trait for any DICOM entity (element or item) which may have a length.
pub trait HasLength {
    /// Retrieve the value data's length as specified by the data element or
    /// item, in bytes.
    ///
    /// According to the standard, the concrete value size may be undefined,
    /// which can be the case for sequence elements or
    /// encapsulated pixel data.
    fn length(&self) -> Length;

    /// Check whether the value is empty (0 length).
    fn is_empty(&self) -> bool {
        self.length() == Length(0)
    }
}

/// A trait for a data type containing a DICOM header.
pub trait Header: HasLength {
    /// Retrieve the element's tag as a `(group, element)` tuple.
    fn tag(&self) -> Tag;

    /// Check whether this is the header of an item.
    fn is_item(&self) -> bool {
        self.tag() == Tag(0xFFFE, 0xE000)
    }

    /// Check whether this is the header of an item delimiter.
    fn is_item_delimiter(&self) -> bool {
        self.tag() == Tag(0xFFFE, 0xE00D)
    }

    /// Check whether this is the header of a sequence delimiter.
    fn is_sequence_delimiter(&self) -> bool {
        self.tag() == Tag(0xFFFE, 0xE0DD)
    }

    /// Check whether this is the header of an encapsulated pixel data.
    fn is_encapsulated_pixeldata(&self) -> bool {
        self.tag() == Tag(0x7FE0, 0x0010) && self.length().is_undefined()
    }
}

/// A data type that represents and owns a DICOM data element.
///
/// This type is capable of representing any data element fully in memory,
/// whether it be a primitive value,
/// a nested data set (where each item contains an object of type `I`),
/// an encapsulated pixel data sequence (each fragment of type `P`),
/// or a value which was deliberately left undecoded.
///
/// An element whose value could not be interpreted
/// according to its value representation
/// keeps its raw bytes and a decode warning.
#[derive(Debug, PartialEq, Clone)]
pub struct DataElement<I, P = Vec<u8>> {
    header: DataElementHeader,
    value: Value<I, P>,
    warning: Option<String>,
}

impl<I, P> HasLength for DataElement<I, P> {
    #[inline]
    fn length(&self) -> Length {
        self.header.length()
    }
}

impl<I, P> Header for DataElement<I, P> {
    #[inline]
    fn tag(&self) -> Tag {
        self.header.tag()
    }
}

impl<I, P> HasLength for &DataElement<I, P> {
    #[inline]
    fn length(&self) -> Length {
        (**self).length()
    }
}

impl<'a, I, P> Header for &'a DataElement<I, P> {
    #[inline]
    fn tag(&self) -> Tag {
        (**self).tag()
    }
}

impl<I, P> DataElement<I, P> {
    /// Create a data element from the given parts,
    /// where the length is inferred from the value's byte length.
    ///
    /// The value's byte length is only known for primitive values,
    /// so sequences and pixel sequences are given an undefined length.
    pub fn new<T>(tag: Tag, vr: VR, value: T) -> Self
    where
        T: Into<Value<I, P>>,
    {
        let value = value.into();
        let len = match &value {
            Value::Primitive(v) => Length(v.calculate_byte_len() as u32),
            _ => Length::UNDEFINED,
        };
        DataElement {
            header: DataElementHeader::new(tag, vr, len),
            value,
            warning: None,
        }
    }

    /// Create a data element from the given parts
    /// and the length as declared in the encoded header.
    pub fn new_with_len<T>(tag: Tag, vr: VR, length: Length, value: T) -> Self
    where
        T: Into<Value<I, P>>,
    {
        DataElement {
            header: DataElementHeader::new(tag, vr, length),
            value: value.into(),
            warning: None,
        }
    }

    /// Create an empty data element.
    pub fn empty(tag: Tag, vr: VR) -> Self {
        DataElement {
            header: DataElementHeader::new(tag, vr, Length(0)),
            value: PrimitiveValue::Empty.into(),
            warning: None,
        }
    }

    /// Attach a decode warning to this element.
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }

    /// Retrieve the element header.
    pub fn header(&self) -> &DataElementHeader {
        &self.header
    }

    /// Retrieve the value representation, which may be unknown or not
    /// applicable.
    pub fn vr(&self) -> VR {
        self.header.vr()
    }

    /// Retrieve the data value.
    pub fn value(&self) -> &Value<I, P> {
        &self.value
    }

    /// Move the data value out of the element, discarding the rest.
    pub fn into_value(self) -> Value<I, P> {
        self.value
    }

    /// Retrieve the warning produced while decoding the value, if any.
    ///
    /// When this is `Some`, the value holds the raw bytes of the element.
    pub fn decode_warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    /// Retrieve the items of a sequence element.
    pub fn items(&self) -> Option<&[I]> {
        self.value.items()
    }

    /// Retrieve the stream offset of a value which was not decoded.
    pub fn deferred_offset(&self) -> Option<u64> {
        match self.value {
            Value::Deferred { offset } => Some(offset),
            _ => None,
        }
    }

    /// Retrieve the element's value as a single clean string,
    /// with no trailing whitespace.
    ///
    /// Returns an error if the value is not primitive.
    pub fn to_str(&self) -> std::result::Result<Cow<str>, CastValueError> {
        self.value.to_str()
    }

    /// Retrieve all of the element's string values.
    pub fn to_multi_str(&self) -> std::result::Result<Cow<[String]>, CastValueError> {
        self.value.to_multi_str()
    }

    /// Retrieve the raw bytes of a primitive value.
    pub fn to_bytes(&self) -> std::result::Result<Cow<[u8]>, CastValueError> {
        self.value.to_bytes()
    }

    /// Convert the first value into an integer of the requested type.
    pub fn to_int<T>(&self) -> std::result::Result<T, ConvertValueError>
    where
        T: NumCast,
        T: FromStr<Err = std::num::ParseIntError>,
    {
        self.value.to_int()
    }

    /// Retrieve the first date value.
    pub fn to_date(&self) -> std::result::Result<NaiveDate, ConvertValueError> {
        self.value.to_date()
    }

    /// Retrieve the first time value.
    pub fn to_time(&self) -> std::result::Result<NaiveTime, ConvertValueError> {
        self.value.to_time()
    }

    /// Retrieve the first date-time value.
    pub fn to_datetime(&self) -> std::result::Result<DateTime<FixedOffset>, ConvertValueError> {
        self.value.to_datetime()
    }

    /// Retrieve the first person name value.
    pub fn to_person_name(&self) -> std::result::Result<&PersonName, CastValueError> {
        self.value.person_name()
    }
}

/// A data structure for a data element header, containing
/// a tag, value representation and specified length.
///
/// Unlike [`Length`], two headers with undefined lengths
/// compare equal when their tag and VR match.
#[derive(Debug, Clone, Copy)]
pub struct DataElementHeader {
    /// DICOM tag
    pub tag: Tag,
    /// Value Representation
    pub vr: VR,
    /// Element length
    pub len: Length,
}

impl PartialEq for DataElementHeader {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag && self.vr == other.vr && self.len.inner_eq(other.len)
    }
}

impl HasLength for DataElementHeader {
    #[inline]
    fn length(&self) -> Length {
        self.len
    }
}

impl Header for DataElementHeader {
    #[inline]
    fn tag(&self) -> Tag {
        self.tag
    }
}

impl DataElementHeader {
    /// Create a new data element header with the given properties.
    /// This is just a trivial constructor.
    #[inline]
    pub fn new<T: Into<Tag>>(tag: T, vr: VR, len: Length) -> DataElementHeader {
        DataElementHeader {
            tag: tag.into(),
            vr,
            len,
        }
    }

    /// Retrieve the element's value representation, which can be unknown.
    #[inline]
    pub fn vr(&self) -> VR {
        self.vr
    }

    /// Check whether the header suggests the value to be a sequence value:
    /// if the value representation is SQ or the length is undefined.
    #[inline]
    pub fn is_non_primitive(&self) -> bool {
        self.vr == VR::SQ || self.length().is_undefined()
    }

    /// Check whether the header belongs to
    /// an item, an item delimiter or a sequence delimiter.
    #[inline]
    pub fn is_delimiting(&self) -> bool {
        self.tag.group() == 0xFFFE
    }
}

impl From<SequenceItemHeader> for DataElementHeader {
    fn from(value: SequenceItemHeader) -> DataElementHeader {
        DataElementHeader {
            tag: value.tag(),
            vr: VR::UN,
            len: value.length(),
        }
    }
}

/// Data type for describing a sequence item data element.
/// If the element represents an item, it will also contain
/// the specified length.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum SequenceItemHeader {
    /// The cursor contains an item.
    Item {
        /// the length of the item in bytes (can be 0xFFFFFFFF if undefined)
        len: Length,
    },
    /// The cursor read an item delimiter.
    /// The element ends here and should not be read any further.
    ItemDelimiter,
    /// The cursor read a sequence delimiter.
    /// The element ends here and should not be read any further.
    SequenceDelimiter,
}

impl SequenceItemHeader {
    /// Create a sequence item header using the element's raw properties.
    /// An error can be raised if the given properties do not relate to a
    /// sequence item, a sequence item delimiter or a sequence delimiter.
    pub fn new<T: Into<Tag>>(tag: T, len: Length) -> Result<SequenceItemHeader> {
        match tag.into() {
            Tag(0xFFFE, 0xE000) => Ok(SequenceItemHeader::Item { len }),
            Tag(0xFFFE, 0xE00D) => {
                // delimiters should not have a positive length
                if len != Length(0) {
                    UnexpectedDelimiterLengthSnafu { len }.fail()
                } else {
                    Ok(SequenceItemHeader::ItemDelimiter)
                }
            }
            Tag(0xFFFE, 0xE0DD) => Ok(SequenceItemHeader::SequenceDelimiter),
            tag => UnexpectedTagSnafu { tag }.fail(),
        }
    }
}

impl HasLength for SequenceItemHeader {
    #[inline]
    fn length(&self) -> Length {
        match *self {
            SequenceItemHeader::Item { len } => len,
            SequenceItemHeader::ItemDelimiter | SequenceItemHeader::SequenceDelimiter => Length(0),
        }
    }
}

impl Header for SequenceItemHeader {
    #[inline]
    fn tag(&self) -> Tag {
        match *self {
            SequenceItemHeader::Item { .. } => Tag(0xFFFE, 0xE000),
            SequenceItemHeader::ItemDelimiter => Tag(0xFFFE, 0xE00D),
            SequenceItemHeader::SequenceDelimiter => Tag(0xFFFE, 0xE0DD),
        }
    }
}

/// An enum type for a DICOM value representation.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, Ord, PartialOrd)]
pub enum VR {
    /// Application Entity
    AE,
    /// Age String
    AS,
    /// Attribute Tag
    AT,
    /// Code String
    CS,
    /// Date
    DA,
    /// Decimal String
    DS,
    /// Date Time
    DT,
    /// Floating Point Single
    FL,
    /// Floating Point Double
    FD,
    /// Integer String
    IS,
    /// Long String
    LO,
    /// Long Text
    LT,
    /// Other Byte
    OB,
    /// Other Double
    OD,
    /// Other Float
    OF,
    /// Other Long
    OL,
    /// Other Very Long
    OV,
    /// Other Word
    OW,
    /// Person Name
    PN,
    /// Short String
    SH,
    /// Signed Long
    SL,
    /// Sequence of Items
    SQ,
    /// Signed Short
    SS,
    /// Short Text
    ST,
    /// Signed Very Long
    SV,
    /// Time
    TM,
    /// Unlimited Characters
    UC,
    /// Unique Identifier (UID)
    UI,
    /// Unsigned Long
    UL,
    /// Unknown
    UN,
    /// Universal Resource Identifier or Universal Resource Locator (URI/URL)
    UR,
    /// Unsigned Short
    US,
    /// Unlimited Text
    UT,
    /// Unsigned Very Long
    UV,
}

impl VR {
    /// Obtain the value representation corresponding to the given two bytes.
    /// Each byte should represent an alphabetic character in upper case.
    pub fn from_binary(chars: [u8; 2]) -> Option<Self> {
        from_utf8(chars.as_ref())
            .ok()
            .and_then(|s| VR::from_str(s).ok())
    }

    /// Retrieve a string representation of this VR.
    pub fn to_string(self) -> &'static str {
        use VR::*;
        match self {
            AE => "AE",
            AS => "AS",
            AT => "AT",
            CS => "CS",
            DA => "DA",
            DS => "DS",
            DT => "DT",
            FL => "FL",
            FD => "FD",
            IS => "IS",
            LO => "LO",
            LT => "LT",
            OB => "OB",
            OD => "OD",
            OF => "OF",
            OL => "OL",
            OV => "OV",
            OW => "OW",
            PN => "PN",
            SH => "SH",
            SL => "SL",
            SQ => "SQ",
            SS => "SS",
            ST => "ST",
            SV => "SV",
            TM => "TM",
            UC => "UC",
            UI => "UI",
            UL => "UL",
            UN => "UN",
            UR => "UR",
            US => "US",
            UT => "UT",
            UV => "UV",
        }
    }

    /// Retrieve a copy of this VR's byte representation.
    /// The function returns two alphabetic characters in upper case.
    pub fn to_bytes(self) -> [u8; 2] {
        let bytes = self.to_string().as_bytes();
        [bytes[0], bytes[1]]
    }

    /// Check whether this VR uses the long header form in Explicit VR:
    /// two reserved bytes followed by a 32-bit length,
    /// instead of a 16-bit length.
    pub fn has_long_length(self) -> bool {
        use VR::*;
        !matches!(
            self,
            AE | AS | AT | CS | DA | DS | DT | FL | FD | IS | LO | LT | PN | SH | SL | SS | ST
                | TM | UI | UL | US
        )
    }

    /// Check whether values of this VR are textual.
    pub fn is_textual(self) -> bool {
        use VR::*;
        matches!(
            self,
            AE | AS | CS | DA | DS | DT | IS | LO | LT | PN | SH | ST | TM | UC | UI | UR | UT
        )
    }

    /// Check whether values of this VR may hold multiple
    /// backslash-separated values.
    pub fn is_multi_valued_text(self) -> bool {
        self.is_textual() && !matches!(self, VR::LT | VR::ST | VR::UT | VR::UR)
    }

    /// Check whether values of this VR are decoded with
    /// the specific character set in effect,
    /// rather than the default character repertoire.
    pub fn uses_specific_charset(self) -> bool {
        use VR::*;
        matches!(self, LO | LT | PN | SH | ST | UC | UT)
    }
}

impl FromStr for VR {
    type Err = &'static str;

    fn from_str(string: &str) -> std::result::Result<Self, Self::Err> {
        use VR::*;
        match string {
            "AE" => Ok(AE),
            "AS" => Ok(AS),
            "AT" => Ok(AT),
            "CS" => Ok(CS),
            "DA" => Ok(DA),
            "DS" => Ok(DS),
            "DT" => Ok(DT),
            "FL" => Ok(FL),
            "FD" => Ok(FD),
            "IS" => Ok(IS),
            "LO" => Ok(LO),
            "LT" => Ok(LT),
            "OB" => Ok(OB),
            "OD" => Ok(OD),
            "OF" => Ok(OF),
            "OL" => Ok(OL),
            "OV" => Ok(OV),
            "OW" => Ok(OW),
            "PN" => Ok(PN),
            "SH" => Ok(SH),
            "SL" => Ok(SL),
            "SQ" => Ok(SQ),
            "SS" => Ok(SS),
            "ST" => Ok(ST),
            "SV" => Ok(SV),
            "TM" => Ok(TM),
            "UC" => Ok(UC),
            "UI" => Ok(UI),
            "UL" => Ok(UL),
            "UN" => Ok(UN),
            "UR" => Ok(UR),
            "US" => Ok(US),
            "UT" => Ok(UT),
            "UV" => Ok(UV),
            _ => Err("no such value representation"),
        }
    }
}

impl fmt::Display for VR {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(VR::to_string(*self))
    }
}

/// Idiomatic alias for a tag's group number.
pub type GroupNumber = u16;
/// Idiomatic alias for a tag's element number.
pub type ElementNumber = u16;

/// The data type for DICOM data element tags.
///
/// Tags are ordered first by group and then by element number.
/// Odd group numbers denote private attributes.
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Copy)]
pub struct Tag(pub GroupNumber, pub ElementNumber);

impl Tag {
    /// Getter for the tag's group value.
    #[inline]
    pub fn group(self) -> GroupNumber {
        self.0
    }

    /// Getter for the tag's element value.
    #[inline]
    pub fn element(self) -> ElementNumber {
        self.1
    }

    /// Check whether this tag belongs to a private attribute.
    #[inline]
    pub fn is_private(self) -> bool {
        self.0 & 1 == 1
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Tag({:#06X?}, {:#06X?})", self.0, self.1)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({:04X},{:04X})", self.0, self.1)
    }
}

impl PartialEq<(u16, u16)> for Tag {
    fn eq(&self, other: &(u16, u16)) -> bool {
        self.0 == other.0 && self.1 == other.1
    }
}

impl From<(u16, u16)> for Tag {
    #[inline]
    fn from(value: (u16, u16)) -> Tag {
        Tag(value.0, value.1)
    }
}

impl From<[u16; 2]> for Tag {
    #[inline]
    fn from(value: [u16; 2]) -> Tag {
        Tag(value[0], value[1])
    }
}

/// A type for representing data set content length, in bytes.
/// An internal value of `0xFFFF_FFFF` represents an undefined
/// (unspecified) length, which would have to be determined
/// with a traversal based on the content's encoding.
///
/// Two undefined lengths are never equal to each other,
/// nor comparable with any other length.
/// Use [`inner_eq`](Length::inner_eq) to compare the raw values.
#[derive(Clone, Copy)]
pub struct Length(pub u32);

const UNDEFINED_LEN: u32 = 0xFFFF_FFFF;

impl Length {
    /// A length that is undefined.
    pub const UNDEFINED: Self = Length(UNDEFINED_LEN);

    /// Create a new length value from its internal representation.
    /// This is equivalent to `Length(len)`.
    #[inline]
    pub fn new(len: u32) -> Self {
        Length(len)
    }

    /// Create a new length value from a defined byte count.
    ///
    /// The value must not be the undefined length sentinel.
    #[inline]
    pub fn defined(len: u32) -> Self {
        debug_assert!(len != UNDEFINED_LEN);
        Length(len)
    }

    /// Check whether this length is undefined (unknown).
    #[inline]
    pub fn is_undefined(self) -> bool {
        self.0 == UNDEFINED_LEN
    }

    /// Check whether this length is well defined (not undefined).
    #[inline]
    pub fn is_defined(self) -> bool {
        !self.is_undefined()
    }

    /// Fetch the concrete length value, if available.
    /// Returns `None` if it represents an undefined length.
    #[inline]
    pub fn get(self) -> Option<u32> {
        match self.0 {
            UNDEFINED_LEN => None,
            v => Some(v),
        }
    }

    /// Check whether the length is equally specified as another length.
    /// Unlike the implemented `PartialEq`, two undefined lengths are
    /// considered equivalent by this method.
    #[inline]
    pub fn inner_eq(self, other: Length) -> bool {
        self.0 == other.0
    }
}

impl From<u32> for Length {
    #[inline]
    fn from(o: u32) -> Self {
        Length(o)
    }
}

impl PartialEq<Length> for Length {
    fn eq(&self, rhs: &Length) -> bool {
        match (self.0, rhs.0) {
            (UNDEFINED_LEN, _) | (_, UNDEFINED_LEN) => false,
            (l1, l2) => l1 == l2,
        }
    }
}

impl PartialOrd<Length> for Length {
    fn partial_cmp(&self, rhs: &Length) -> Option<Ordering> {
        match (self.0, rhs.0) {
            (UNDEFINED_LEN, _) | (_, UNDEFINED_LEN) => None,
            (l1, l2) => Some(l1.cmp(&l2)),
        }
    }
}

impl fmt::Debug for Length {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            UNDEFINED_LEN => f.write_str("Length(Undefined)"),
            l => f.debug_tuple("Length").field(&l).finish(),
        }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            UNDEFINED_LEN => f.write_str("U/L"),
            l => write!(f, "{}", l),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_from_u16_pair() {
        let t = Tag::from((0x0010u16, 0x0020u16));
        assert_eq!(0x0010u16, t.group());
        assert_eq!(0x0020u16, t.element());
        assert_eq!(t, (0x0010, 0x0020));
        assert!(!t.is_private());
        assert!(Tag(0x0009, 0x0010).is_private());
    }

    #[test]
    fn tag_display_and_debug() {
        assert_eq!(Tag(0x7FE0, 0x0010).to_string(), "(7FE0,0010)");
        assert_eq!(format!("{:?}", Tag(0x0010, 0x0010)), "Tag(0x0010, 0x0010)");
    }

    #[test]
    fn tags_are_ordered_by_group_then_element() {
        assert!(Tag(0x0008, 0xFFFF) < Tag(0x0010, 0x0000));
        assert!(Tag(0x0010, 0x0010) < Tag(0x0010, 0x0020));
    }

    #[test]
    fn get_data_element_header_properties() {
        let header = DataElementHeader::new(Tag(0x0010, 0x0010), VR::PN, Length(12));
        assert_eq!(header.tag(), Tag(0x0010, 0x0010));
        assert_eq!(header.vr(), VR::PN);
        assert_eq!(header.length(), Length(12));
        assert!(!header.is_non_primitive());
        assert!(!header.is_delimiting());

        let header = DataElementHeader::new(Tag(0x0008, 0x1140), VR::SQ, Length::UNDEFINED);
        assert!(header.is_non_primitive());
        let same = header;
        assert_eq!(header, same);
        assert_ne!(
            header,
            DataElementHeader::new(Tag(0x0008, 0x1140), VR::SQ, Length(0))
        );
    }

    #[test]
    fn sequence_item_header_from_tags() {
        assert_eq!(
            SequenceItemHeader::new(Tag(0xFFFE, 0xE000), Length(10)).unwrap(),
            SequenceItemHeader::Item { len: Length(10) }
        );
        assert_eq!(
            SequenceItemHeader::new(Tag(0xFFFE, 0xE00D), Length(0)).unwrap(),
            SequenceItemHeader::ItemDelimiter
        );
        assert_eq!(
            SequenceItemHeader::new(Tag(0xFFFE, 0xE0DD), Length(0)).unwrap(),
            SequenceItemHeader::SequenceDelimiter
        );
        assert!(matches!(
            SequenceItemHeader::new(Tag(0xFFFE, 0xE00D), Length(4)),
            Err(SequenceItemHeaderError::UnexpectedDelimiterLength { .. })
        ));
        assert!(matches!(
            SequenceItemHeader::new(Tag(0x0008, 0x0016), Length(4)),
            Err(SequenceItemHeaderError::UnexpectedTag { .. })
        ));
    }

    #[test]
    fn vr_codes() {
        assert_eq!(VR::from_binary(*b"PN"), Some(VR::PN));
        assert_eq!(VR::from_binary(*b"XX"), None);
        assert_eq!(VR::from_binary([0xFF, 0x00]), None);
        assert_eq!(VR::UV.to_bytes(), *b"UV");
        assert_eq!("SQ".parse::<VR>(), Ok(VR::SQ));
    }

    #[test]
    fn long_length_vrs() {
        for vr in [
            VR::OB,
            VR::OD,
            VR::OF,
            VR::OL,
            VR::OW,
            VR::SQ,
            VR::UC,
            VR::UN,
            VR::UR,
            VR::UT,
        ] {
            assert!(vr.has_long_length(), "{} should have a long length", vr);
        }
        for vr in [VR::AE, VR::PN, VR::US, VR::UL, VR::FD, VR::UI, VR::DA] {
            assert!(!vr.has_long_length(), "{} should have a short length", vr);
        }
    }

    #[test]
    fn undefined_length_semantics() {
        assert!(Length::UNDEFINED.is_undefined());
        assert_eq!(Length::UNDEFINED.get(), None);
        assert_eq!(Length(8).get(), Some(8));
        assert_ne!(Length::UNDEFINED, Length::UNDEFINED);
        assert!(Length::UNDEFINED.inner_eq(Length::UNDEFINED));
        assert_eq!(Length::UNDEFINED.partial_cmp(&Length(0)), None);
        assert_eq!(Length::UNDEFINED.to_string(), "U/L");
    }

    #[test]
    fn element_with_warning_keeps_raw_bytes() {
        let e: DataElement<()> = DataElement::new(
            Tag(0x0008, 0x0020),
            VR::DA,
            PrimitiveValue::from(&b"2023XX01"[..]),
        )
        .with_warning("invalid date");
        assert_eq!(e.decode_warning(), Some("invalid date"));
        assert_eq!(e.to_bytes().unwrap().as_ref(), b"2023XX01");
        assert_eq!(e.length(), Length(8));
    }
}
