//! This module contains the concept of a DICOM data dictionary.
//!
//! A data dictionary translates attribute tags and keywords
//! to an entry with the attribute's typical value representation,
//! which is what implicit VR decoding relies on.

use crate::header::{Tag, VR};
use std::fmt::Debug;

/// Specification of a range of tags pertaining to an attribute.
/// Very often, the dictionary of attributes indicates a unique
/// `(group,elem)` for a specific attribute, but occasionally
/// a range of groups or elements is indicated instead.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub enum TagRange {
    /// Only a specific tag
    Single(Tag),
    /// The two rightmost digits of the _group_ portion are open:
    /// `(GGxx,EEEE)`
    Group100(Tag),
    /// The two rightmost digits of the _element_ portion are open:
    /// `(GGGG,EExx)`
    Element100(Tag),
    /// Generic group length attribute: `(gggg,0000)`
    GroupLength,
    /// Private creator element: odd group, element in `0010..=00FF`
    PrivateCreator,
}

impl TagRange {
    /// Retrieve the inner tag representation of this range.
    ///
    /// Open components are zeroed.
    /// For the generic ranges, `(0000,0000)` is returned.
    pub fn inner(self) -> Tag {
        match self {
            TagRange::Single(tag) | TagRange::Group100(tag) | TagRange::Element100(tag) => tag,
            TagRange::GroupLength | TagRange::PrivateCreator => Tag(0x0000, 0x0000),
        }
    }

    /// Check whether the given tag is covered by this range.
    pub fn contains(self, tag: Tag) -> bool {
        match self {
            TagRange::Single(t) => t == tag,
            TagRange::Group100(t) => t.group() == tag.group() & 0xFF00 && t.element() == tag.element(),
            TagRange::Element100(t) => {
                t.group() == tag.group() && t.element() == tag.element() & 0xFF00
            }
            TagRange::GroupLength => tag.element() == 0x0000,
            TagRange::PrivateCreator => {
                tag.is_private() && (0x0010..=0x00FF).contains(&tag.element())
            }
        }
    }
}

/// Type trait for a dictionary of DICOM attributes.
///
/// The methods herein have no generic parameters,
/// so as to enable being used as a trait object.
pub trait DataDictionary: Debug {
    /// The type of the dictionary entry.
    type Entry: DataDictionaryEntry;

    /// Fetch an entry by its usual alias (e.g. "PatientName" or "SOPInstanceUID").
    /// Aliases are case sensitive and not separated by spaces.
    fn by_name(&self, name: &str) -> Option<&Self::Entry>;

    /// Fetch an entry by its tag.
    fn by_tag(&self, tag: Tag) -> Option<&Self::Entry>;

    /// Resolve the typical value representation of the attribute
    /// with the given tag, or `UN` if the attribute is unknown.
    fn vr_of(&self, tag: Tag) -> VR {
        self.by_tag(tag).map(|e| e.vr()).unwrap_or(VR::UN)
    }
}

impl<T: ?Sized> DataDictionary for &T
where
    T: DataDictionary,
{
    type Entry = T::Entry;

    fn by_name(&self, name: &str) -> Option<&Self::Entry> {
        (**self).by_name(name)
    }

    fn by_tag(&self, tag: Tag) -> Option<&Self::Entry> {
        (**self).by_tag(tag)
    }
}

/// The dictionary entry data type, representing a DICOM attribute.
pub trait DataDictionaryEntry {
    /// The full possible tag range of the attribute.
    fn tag_range(&self) -> TagRange;
    /// The alias of the attribute, with no spaces, usually in UpperCamelCase.
    fn alias(&self) -> &str;
    /// The _typical_ value representation of the attribute.
    fn vr(&self) -> VR;
}

/// A data type for a dictionary entry with a string slice for its alias.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct DataDictionaryEntryRef<'a> {
    /// The attribute tag or tag range
    pub tag: TagRange,
    /// The alias of the attribute, with no spaces, usually InCapitalizedCamelCase
    pub alias: &'a str,
    /// The _typical_ value representation of the attribute
    pub vr: VR,
}

impl<'a> DataDictionaryEntry for DataDictionaryEntryRef<'a> {
    fn tag_range(&self) -> TagRange {
        self.tag
    }
    fn alias(&self) -> &str {
        self.alias
    }
    fn vr(&self) -> VR {
        self.vr
    }
}

#[cfg(test)]
mod tests {
    use super::TagRange::*;
    use super::*;

    #[test]
    fn tag_range_contains() {
        assert!(Single(Tag(0x0010, 0x0010)).contains(Tag(0x0010, 0x0010)));
        assert!(!Single(Tag(0x0010, 0x0010)).contains(Tag(0x0010, 0x0020)));
        assert!(Group100(Tag(0x6000, 0x3000)).contains(Tag(0x6022, 0x3000)));
        assert!(!Group100(Tag(0x6000, 0x3000)).contains(Tag(0x6022, 0x3001)));
        assert!(Element100(Tag(0x0020, 0x3100)).contains(Tag(0x0020, 0x31FF)));
        assert!(GroupLength.contains(Tag(0x0009, 0x0000)));
        assert!(PrivateCreator.contains(Tag(0x0009, 0x0010)));
        assert!(!PrivateCreator.contains(Tag(0x0008, 0x0010)));
        assert!(!PrivateCreator.contains(Tag(0x0009, 0x1010)));
    }
}
