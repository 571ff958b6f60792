//! This crate contains the DICOM transfer syntax registry.
//!
//! The transfer syntax registry maps the UID of a transfer syntax
//! to the respective transfer syntax specifier.
//! Registries are plain values:
//! [`TransferSyntaxRegistry::with_standard_entries`] builds one
//! with all transfer syntaxes known to this crate,
//! and [`TransferSyntaxRegistry::default_registry`]
//! provides a shared instance of it.
//!
//! The [`codec`] module holds the registry of pixel data decoders
//! for encapsulated transfer syntaxes.

pub mod codec;
pub mod entries;

use dcmstream_encoding::transfer_syntax::{TransferSyntax, TransferSyntaxIndex};
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;

pub use codec::{PixelDecoder, PixelDecoderRegistry, PixelInfo};

/// A registry of DICOM transfer syntaxes, indexed by UID.
#[derive(Clone, Default)]
pub struct TransferSyntaxRegistry {
    m: HashMap<&'static str, TransferSyntax>,
}

impl fmt::Debug for TransferSyntaxRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let entries: HashMap<&str, &str> =
            self.m.iter().map(|(uid, ts)| (*uid, ts.name())).collect();
        f.debug_struct("TransferSyntaxRegistry")
            .field("m", &entries)
            .finish()
    }
}

lazy_static! {
    static ref REGISTRY: TransferSyntaxRegistry = TransferSyntaxRegistry::with_standard_entries();
}

static FALLBACK: TransferSyntax = entries::EXPLICIT_VR_LITTLE_ENDIAN;

/// Remove the padding which may follow a UID in a data set.
pub fn trim_uid(uid: &str) -> &str {
    uid.trim_end_matches(|c: char| c == '\0' || c == ' ')
}

impl TransferSyntaxRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        TransferSyntaxRegistry::default()
    }

    /// Create a registry with all transfer syntaxes known to this crate.
    pub fn with_standard_entries() -> Self {
        let mut registry = TransferSyntaxRegistry::new();
        for ts in entries::STANDARD_ENTRIES {
            registry.register(ts.clone());
        }
        registry
    }

    /// Retrieve the process-wide registry with the standard entries.
    pub fn default_registry() -> &'static TransferSyntaxRegistry {
        &REGISTRY
    }

    /// Obtain a transfer syntax by UID.
    ///
    /// Trailing null characters and spaces in `uid` are ignored.
    pub fn get<U: AsRef<str>>(&self, uid: U) -> Option<&TransferSyntax> {
        self.m.get(trim_uid(uid.as_ref()))
    }

    /// Obtain a transfer syntax by UID,
    /// falling back to Explicit VR Little Endian if it is not registered.
    pub fn get_or_fallback<U: AsRef<str>>(&self, uid: U) -> &TransferSyntax {
        let uid = uid.as_ref();
        match self.get(uid) {
            Some(ts) => ts,
            None => {
                tracing::warn!(
                    "Unknown transfer syntax `{}`, assuming {}",
                    trim_uid(uid),
                    FALLBACK.name()
                );
                &FALLBACK
            }
        }
    }

    /// Register the given transfer syntax,
    /// returning the one previously registered with the same UID.
    pub fn register(&mut self, ts: TransferSyntax) -> Option<TransferSyntax> {
        self.m.insert(ts.uid(), ts)
    }

    /// Iterate over all registered transfer syntaxes, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &TransferSyntax> {
        self.m.values()
    }

    /// The number of registered transfer syntaxes.
    pub fn len(&self) -> usize {
        self.m.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.m.is_empty()
    }
}

impl TransferSyntaxIndex for TransferSyntaxRegistry {
    fn get(&self, uid: &str) -> Option<&TransferSyntax> {
        TransferSyntaxRegistry::get(self, uid)
    }
}

/// Retrieve the default transfer syntax,
/// used for data sets without a file meta group.
pub fn default() -> TransferSyntax {
    entries::IMPLICIT_VR_LITTLE_ENDIAN
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmstream_encoding::transfer_syntax::{Codec, Endianness};

    #[test]
    fn isolated_registries() {
        let mut registry = TransferSyntaxRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get("1.2.840.10008.1.2.1").is_none());

        let custom = TransferSyntax::new(
            "1.2.3.4.5",
            "Custom Little Endian",
            Endianness::Little,
            true,
            Codec::None,
        );
        assert!(registry.register(custom.clone()).is_none());
        assert_eq!(registry.get("1.2.3.4.5\0"), Some(&custom));
        assert!(registry.register(custom).is_some());
        assert_eq!(registry.len(), 1);

        // the shared registry is not affected
        assert!(TransferSyntaxRegistry::default_registry()
            .get("1.2.3.4.5")
            .is_none());
    }

    #[test]
    fn unknown_uid_falls_back() {
        let registry = TransferSyntaxRegistry::with_standard_entries();
        let ts = registry.get_or_fallback("1.2.3.999 ");
        assert_eq!(ts.uid(), "1.2.840.10008.1.2.1");
        let ts = registry.get_or_fallback("1.2.840.10008.1.2.2\0");
        assert_eq!(ts.endianness(), Endianness::Big);
    }
}
