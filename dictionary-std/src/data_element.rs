//! The run-time attribute dictionary.
//!
//! Lookups by tag try, in order:
//! the attributes with a single tag,
//! the repeating attributes such as `(60xx,3000)`,
//! then the generic group length and private creator rules.

use crate::tags::ENTRIES;
use dcmstream_core::dictionary::{DataDictionary, DataDictionaryEntryRef, TagRange};
use dcmstream_core::header::Tag;
use dcmstream_core::VR;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

type Entry = DataDictionaryEntryRef<'static>;

static INDEX: Lazy<StandardDataDictionaryRegistry> = Lazy::new(StandardDataDictionaryRegistry::build);

static GENERIC_ENTRIES: [Entry; 2] = [
    DataDictionaryEntryRef {
        tag: TagRange::GroupLength,
        alias: "GenericGroupLength",
        vr: VR::UL,
    },
    DataDictionaryEntryRef {
        tag: TagRange::PrivateCreator,
        alias: "PrivateCreator",
        vr: VR::LO,
    },
];

/// Retrieve the index behind [`StandardDataDictionary`],
/// built on first use.
#[inline]
pub fn registry() -> &'static StandardDataDictionaryRegistry {
    &INDEX
}

/// The indexed attribute table of the standard dictionary.
#[derive(Debug)]
pub struct StandardDataDictionaryRegistry {
    by_alias: HashMap<&'static str, &'static Entry>,
    by_tag: HashMap<Tag, &'static Entry>,
    /// entries whose tag has an open group or element part
    repeating: Vec<&'static Entry>,
}

impl StandardDataDictionaryRegistry {
    fn build() -> Self {
        let mut by_alias = HashMap::with_capacity(ENTRIES.len() + GENERIC_ENTRIES.len());
        let mut by_tag = HashMap::with_capacity(ENTRIES.len());
        let mut repeating = Vec::new();
        for entry in ENTRIES {
            by_alias.insert(entry.alias, entry);
            match entry.tag {
                TagRange::Single(tag) => {
                    by_tag.insert(tag, entry);
                }
                _ => repeating.push(entry),
            }
        }
        for entry in &GENERIC_ENTRIES {
            by_alias.insert(entry.alias, entry);
        }
        StandardDataDictionaryRegistry {
            by_alias,
            by_tag,
            repeating,
        }
    }

    fn lookup(&self, tag: Tag) -> Option<&'static Entry> {
        if let Some(entry) = self.by_tag.get(&tag) {
            return Some(*entry);
        }
        self.repeating
            .iter()
            .copied()
            .find(|e| e.tag.contains(tag))
            .or_else(|| GENERIC_ENTRIES.iter().find(|e| e.tag.contains(tag)))
    }

    /// The number of attributes, generic rules included.
    pub fn len(&self) -> usize {
        self.by_alias.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_alias.is_empty()
    }
}

/// The standard data dictionary.
///
/// Implicit VR headers are resolved through this type.
/// Unknown public attributes and private data elements resolve to `UN`,
/// private creators to `LO` and group lengths to `UL`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StandardDataDictionary;

impl DataDictionary for StandardDataDictionary {
    type Entry = Entry;

    fn by_name(&self, name: &str) -> Option<&Self::Entry> {
        registry().by_alias.get(name).copied()
    }

    fn by_tag(&self, tag: Tag) -> Option<&Self::Entry> {
        registry().lookup(tag)
    }
}

impl fmt::Display for StandardDataDictionary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Standard DICOM Data Dictionary")
    }
}
