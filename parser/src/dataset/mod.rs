//! In-memory DICOM data sets.
//!
//! A [`DataSet`] maps tags to fully decoded elements, kept in tag order.
//! It also records how it was encoded:
//! the transfer syntax, VR mode, byte order
//! and the character set active at the end of decoding.
//! Sequence items are data sets as well.
use byteordered::Endianness;
use dcmstream_core::dictionary::{DataDictionary, DataDictionaryEntry};
use dcmstream_core::header::{DataElement, Header, Tag};
use dcmstream_dictionary_std::StandardDataDictionary;
use dcmstream_encoding::text::SpecificCharacterSet;
use std::collections::btree_map::{self, BTreeMap};
use std::iter::FromIterator;

pub mod write;

pub use self::write::{write_dataset, write_file};

/// A data element held in memory, with data sets as sequence items.
pub type InMemElement = DataElement<DataSet>;

/// A collection of data elements ordered by tag.
///
/// A tag maps to at most one element:
/// inserting an element replaces any previous element with the same tag.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    entries: BTreeMap<Tag, InMemElement>,
    transfer_syntax: String,
    explicit_vr: bool,
    endianness: Endianness,
    charset: SpecificCharacterSet,
}

impl Default for DataSet {
    fn default() -> Self {
        DataSet {
            entries: BTreeMap::new(),
            transfer_syntax: String::new(),
            explicit_vr: true,
            endianness: Endianness::Little,
            charset: SpecificCharacterSet::Default,
        }
    }
}

impl DataSet {
    /// Create an empty data set, declared as Explicit VR Little Endian.
    pub fn new() -> Self {
        DataSet::default()
    }

    /// Create an empty data set with the given encoding properties.
    pub fn with_encoding(
        transfer_syntax: impl Into<String>,
        explicit_vr: bool,
        endianness: Endianness,
        charset: SpecificCharacterSet,
    ) -> Self {
        DataSet {
            entries: BTreeMap::new(),
            transfer_syntax: transfer_syntax.into(),
            explicit_vr,
            endianness,
            charset,
        }
    }

    /// The UID of the transfer syntax the data set was decoded with.
    ///
    /// Empty for sequence items and for data sets built in memory.
    pub fn transfer_syntax(&self) -> &str {
        &self.transfer_syntax
    }

    /// Whether the data set was encoded with explicit VR.
    pub fn explicit_vr(&self) -> bool {
        self.explicit_vr
    }

    /// The byte order the data set was encoded with.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// The character set active at the end of the data set.
    pub fn charset(&self) -> SpecificCharacterSet {
        self.charset
    }

    pub(crate) fn set_charset(&mut self, charset: SpecificCharacterSet) {
        self.charset = charset;
    }

    /// Retrieve the element with the given tag.
    pub fn element(&self, tag: Tag) -> Option<&InMemElement> {
        self.entries.get(&tag)
    }

    /// Retrieve an element by its keyword in the standard dictionary,
    /// such as `"PatientName"`.
    pub fn element_by_name(&self, name: &str) -> Option<&InMemElement> {
        let tag = StandardDataDictionary.by_name(name)?.tag_range().inner();
        self.element(tag)
    }

    /// Whether an element with the given tag exists.
    pub fn contains(&self, tag: Tag) -> bool {
        self.entries.contains_key(&tag)
    }

    /// Insert an element, returning the element it replaced.
    pub fn put(&mut self, element: InMemElement) -> Option<InMemElement> {
        self.entries.insert(element.tag(), element)
    }

    /// Obtain a new data set with the given element added or replaced.
    pub fn with(&self, element: InMemElement) -> Self {
        let mut out = self.clone();
        out.put(element);
        out
    }

    /// Obtain a new data set without the element of the given tag.
    pub fn without(&self, tag: Tag) -> Self {
        let mut out = self.clone();
        out.entries.remove(&tag);
        out
    }

    /// Iterate over the elements in tag order.
    pub fn iter(&self) -> btree_map::Values<'_, Tag, InMemElement> {
        self.entries.values()
    }

    /// Iterate over the tags in order.
    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.entries.keys().copied()
    }

    /// The number of elements.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the data set has no elements.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a DataSet {
    type Item = &'a InMemElement;
    type IntoIter = btree_map::Values<'a, Tag, InMemElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for DataSet {
    type Item = InMemElement;
    type IntoIter = btree_map::IntoValues<Tag, InMemElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

impl FromIterator<InMemElement> for DataSet {
    fn from_iter<T: IntoIterator<Item = InMemElement>>(iter: T) -> Self {
        let mut out = DataSet::new();
        out.extend(iter);
        out
    }
}

impl Extend<InMemElement> for DataSet {
    fn extend<T: IntoIterator<Item = InMemElement>>(&mut self, iter: T) {
        for element in iter {
            self.put(element);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmstream_core::{PrimitiveValue, VR};
    use dcmstream_dictionary_std::tags;

    fn patient_id(id: &str) -> InMemElement {
        DataElement::new(tags::PATIENT_ID, VR::LO, PrimitiveValue::from(id))
    }

    #[test]
    fn last_insert_wins() {
        let mut ds = DataSet::new();
        assert!(ds.put(patient_id("A")).is_none());
        let old = ds.put(patient_id("B")).unwrap();
        assert_eq!(old.to_str().unwrap(), "A");
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.element(tags::PATIENT_ID).unwrap().to_str().unwrap(), "B");
        assert_eq!(
            ds.element_by_name("PatientID").unwrap().to_str().unwrap(),
            "B"
        );
        assert!(ds.element_by_name("NoSuchAttribute").is_none());
    }

    #[test]
    fn modification_builds_new_sets() {
        let ds: DataSet = vec![
            DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(2_u16)),
            patient_id("P1"),
        ]
        .into_iter()
        .collect();
        assert_eq!(ds.tags().collect::<Vec<_>>(), vec![tags::PATIENT_ID, tags::ROWS]);

        let smaller = ds.without(tags::ROWS);
        assert_eq!(smaller.len(), 1);
        assert_eq!(ds.len(), 2);

        let bigger = smaller.with(DataElement::new(
            tags::COLUMNS,
            VR::US,
            PrimitiveValue::from(3_u16),
        ));
        assert!(bigger.contains(tags::COLUMNS));
        assert!(!smaller.contains(tags::COLUMNS));
    }
}
