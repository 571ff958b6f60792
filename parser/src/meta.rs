//! The DICOM file meta information table.
//!
//! The file meta group (0002,xxxx) is always encoded in
//! Explicit VR Little Endian and declares the transfer syntax
//! of the rest of the file.
use crate::dataset::{DataSet, InMemElement};
use dcmstream_core::header::DataElement;
use dcmstream_core::value::PrimitiveValue;
use dcmstream_core::{Tag, VR};
use dcmstream_dictionary_std::tags;
use snafu::{Backtrace, OptionExt, Snafu};

/// The magic code following the file preamble.
pub const DICM_MAGIC_CODE: [u8; 4] = [b'D', b'I', b'C', b'M'];

/// The size of the file preamble, which precedes the magic code.
pub const PREAMBLE_LEN: usize = 128;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// A required file meta data element is missing.
    #[snafu(display("Missing data element `{}`", alias))]
    MissingElement {
        alias: &'static str,
        backtrace: Backtrace,
    },

    /// A file meta data element does not hold the expected kind of value.
    #[snafu(display("Unexpected value in data element `{}`", alias))]
    UnexpectedValue {
        alias: &'static str,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// DICOM File Meta Information Table.
///
/// Holds the parts of the file meta group
/// which are relevant to reading and writing files.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetaTable {
    /// File Meta Information Group Length
    pub information_group_length: u32,
    /// File Meta Information Version
    pub information_version: [u8; 2],
    /// Media Storage SOP Class UID
    pub media_storage_sop_class_uid: String,
    /// Media Storage SOP Instance UID
    pub media_storage_sop_instance_uid: String,
    /// Transfer Syntax UID
    pub transfer_syntax: String,
    /// Implementation Class UID
    pub implementation_class_uid: String,

    /// Implementation Version Name
    pub implementation_version_name: Option<String>,
    /// Source Application Entity Title
    pub source_application_entity_title: Option<String>,
}

fn text(ds: &DataSet, tag: Tag, alias: &'static str) -> Result<Option<String>> {
    match ds.element(tag) {
        None => Ok(None),
        Some(e) => {
            let s = e.to_str().ok().context(UnexpectedValueSnafu { alias })?;
            Ok(Some(s.trim_end_matches(|c| c == '\0' || c == ' ').to_string()))
        }
    }
}

fn required_text(ds: &DataSet, tag: Tag, alias: &'static str) -> Result<String> {
    text(ds, tag, alias)?.context(MissingElementSnafu { alias })
}

impl FileMetaTable {
    /// Collect the file meta table from the group 0002 elements
    /// of a decoded data set.
    ///
    /// A missing group length is recalculated,
    /// and a missing information version is assumed to be `[0, 1]`.
    pub fn from_dataset(ds: &DataSet) -> Result<Self> {
        let mut builder = FileMetaTableBuilder::new()
            .media_storage_sop_class_uid(required_text(
                ds,
                tags::MEDIA_STORAGE_SOP_CLASS_UID,
                "MediaStorageSOPClassUID",
            )?)
            .media_storage_sop_instance_uid(required_text(
                ds,
                tags::MEDIA_STORAGE_SOP_INSTANCE_UID,
                "MediaStorageSOPInstanceUID",
            )?)
            .transfer_syntax(required_text(
                ds,
                tags::TRANSFER_SYNTAX_UID,
                "TransferSyntax",
            )?)
            .implementation_class_uid(required_text(
                ds,
                tags::IMPLEMENTATION_CLASS_UID,
                "ImplementationClassUID",
            )?);

        if let Some(e) = ds.element(tags::FILE_META_INFORMATION_GROUP_LENGTH) {
            let len = e.to_int::<u32>().ok().context(UnexpectedValueSnafu {
                alias: "FileMetaInformationGroupLength",
            })?;
            builder = builder.group_length(len);
        }
        if let Some(e) = ds.element(tags::FILE_META_INFORMATION_VERSION) {
            let bytes = e.to_bytes().ok().context(UnexpectedValueSnafu {
                alias: "FileMetaInformationVersion",
            })?;
            if let [a, b] = *bytes {
                builder = builder.information_version([a, b]);
            } else {
                return UnexpectedValueSnafu {
                    alias: "FileMetaInformationVersion",
                }
                .fail();
            }
        }
        if let Some(v) = text(
            ds,
            tags::IMPLEMENTATION_VERSION_NAME,
            "ImplementationVersionName",
        )? {
            builder = builder.implementation_version_name(v);
        }
        if let Some(v) = text(
            ds,
            tags::SOURCE_APPLICATION_ENTITY_TITLE,
            "SourceApplicationEntityTitle",
        )? {
            builder = builder.source_application_entity_title(v);
        }
        builder.build()
    }

    /// Recalculate the group length from the other fields.
    pub fn update_information_group_length(&mut self) {
        self.information_group_length = self.calculate_group_length();
    }

    /// The byte length of all file meta elements
    /// after the group length element itself.
    pub fn calculate_group_length(&self) -> u32 {
        fn dicom_len(x: &str) -> u32 {
            let o = x.len() as u32;
            o + (o & 1)
        }

        // the version is OB, with a 12-byte header
        14 + 8
            + dicom_len(&self.media_storage_sop_class_uid)
            + 8
            + dicom_len(&self.media_storage_sop_instance_uid)
            + 8
            + dicom_len(&self.transfer_syntax)
            + 8
            + dicom_len(&self.implementation_class_uid)
            + self
                .implementation_version_name
                .as_deref()
                .map(|s| 8 + dicom_len(s))
                .unwrap_or(0)
            + self
                .source_application_entity_title
                .as_deref()
                .map(|s| 8 + dicom_len(s))
                .unwrap_or(0)
    }

    /// Convert the table into data elements, in tag order.
    pub fn to_elements(&self) -> Vec<InMemElement> {
        let mut elems = vec![
            DataElement::new(
                tags::FILE_META_INFORMATION_GROUP_LENGTH,
                VR::UL,
                PrimitiveValue::from(self.information_group_length),
            ),
            DataElement::new(
                tags::FILE_META_INFORMATION_VERSION,
                VR::OB,
                PrimitiveValue::U8(self.information_version.iter().copied().collect()),
            ),
            DataElement::new(
                tags::MEDIA_STORAGE_SOP_CLASS_UID,
                VR::UI,
                PrimitiveValue::from(self.media_storage_sop_class_uid.as_str()),
            ),
            DataElement::new(
                tags::MEDIA_STORAGE_SOP_INSTANCE_UID,
                VR::UI,
                PrimitiveValue::from(self.media_storage_sop_instance_uid.as_str()),
            ),
            DataElement::new(
                tags::TRANSFER_SYNTAX_UID,
                VR::UI,
                PrimitiveValue::from(self.transfer_syntax.as_str()),
            ),
            DataElement::new(
                tags::IMPLEMENTATION_CLASS_UID,
                VR::UI,
                PrimitiveValue::from(self.implementation_class_uid.as_str()),
            ),
        ];
        if let Some(v) = &self.implementation_version_name {
            elems.push(DataElement::new(
                tags::IMPLEMENTATION_VERSION_NAME,
                VR::SH,
                PrimitiveValue::from(v.as_str()),
            ));
        }
        if let Some(v) = &self.source_application_entity_title {
            elems.push(DataElement::new(
                tags::SOURCE_APPLICATION_ENTITY_TITLE,
                VR::AE,
                PrimitiveValue::from(v.as_str()),
            ));
        }
        elems
    }
}

/// A builder for DICOM meta information tables.
#[derive(Debug, Default, Clone)]
pub struct FileMetaTableBuilder {
    information_group_length: Option<u32>,
    information_version: Option<[u8; 2]>,
    media_storage_sop_class_uid: Option<String>,
    media_storage_sop_instance_uid: Option<String>,
    transfer_syntax: Option<String>,
    implementation_class_uid: Option<String>,
    implementation_version_name: Option<String>,
    source_application_entity_title: Option<String>,
}

impl FileMetaTableBuilder {
    /// Create a new, empty builder.
    pub fn new() -> FileMetaTableBuilder {
        FileMetaTableBuilder::default()
    }

    /// Define the meta header's group length.
    pub fn group_length(mut self, value: u32) -> FileMetaTableBuilder {
        self.information_group_length = Some(value);
        self
    }

    /// Define the meta header's file meta information version.
    pub fn information_version(mut self, value: [u8; 2]) -> FileMetaTableBuilder {
        self.information_version = Some(value);
        self
    }

    /// Define the meta header's media storage SOP class UID.
    pub fn media_storage_sop_class_uid<T: Into<String>>(mut self, value: T) -> FileMetaTableBuilder {
        self.media_storage_sop_class_uid = Some(value.into());
        self
    }

    /// Define the meta header's media storage SOP instance UID.
    pub fn media_storage_sop_instance_uid<T: Into<String>>(
        mut self,
        value: T,
    ) -> FileMetaTableBuilder {
        self.media_storage_sop_instance_uid = Some(value.into());
        self
    }

    /// Define the meta header's transfer syntax UID.
    pub fn transfer_syntax<T: Into<String>>(mut self, value: T) -> FileMetaTableBuilder {
        self.transfer_syntax = Some(value.into());
        self
    }

    /// Define the meta header's implementation class UID.
    pub fn implementation_class_uid<T: Into<String>>(mut self, value: T) -> FileMetaTableBuilder {
        self.implementation_class_uid = Some(value.into());
        self
    }

    /// Define the meta header's implementation version name.
    pub fn implementation_version_name<T: Into<String>>(mut self, value: T) -> FileMetaTableBuilder {
        self.implementation_version_name = Some(value.into());
        self
    }

    /// Define the meta header's source application entity title.
    pub fn source_application_entity_title<T: Into<String>>(
        mut self,
        value: T,
    ) -> FileMetaTableBuilder {
        self.source_application_entity_title = Some(value.into());
        self
    }

    /// Build the table.
    pub fn build(self) -> Result<FileMetaTable> {
        let mut table = FileMetaTable {
            information_group_length: 0,
            // assumed when missing
            information_version: self.information_version.unwrap_or([0, 1]),
            media_storage_sop_class_uid: self.media_storage_sop_class_uid.context(
                MissingElementSnafu {
                    alias: "MediaStorageSOPClassUID",
                },
            )?,
            media_storage_sop_instance_uid: self.media_storage_sop_instance_uid.context(
                MissingElementSnafu {
                    alias: "MediaStorageSOPInstanceUID",
                },
            )?,
            transfer_syntax: self.transfer_syntax.context(MissingElementSnafu {
                alias: "TransferSyntax",
            })?,
            implementation_class_uid: self.implementation_class_uid.context(
                MissingElementSnafu {
                    alias: "ImplementationClassUID",
                },
            )?,
            implementation_version_name: self.implementation_version_name,
            source_application_entity_title: self.source_application_entity_title,
        };
        table.information_group_length = match self.information_group_length {
            Some(len) => len,
            None => table.calculate_group_length(),
        };
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> FileMetaTable {
        FileMetaTableBuilder::new()
            .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.7")
            .media_storage_sop_instance_uid("2.25.137038125948464847900039011591283709926")
            .transfer_syntax("1.2.840.10008.1.2.1")
            .implementation_class_uid("2.25.1")
            .implementation_version_name("DCMSTREAM")
            .build()
            .unwrap()
    }

    #[test]
    fn builder_computes_group_length() {
        let table = table();
        assert_eq!(table.information_version, [0, 1]);
        // 14 + (8 + 26) + (8 + 44) + (8 + 20) + (8 + 6) + (8 + 10)
        assert_eq!(table.information_group_length, 160);
    }

    #[test]
    fn builder_requires_transfer_syntax() {
        let res = FileMetaTableBuilder::new()
            .media_storage_sop_class_uid("1.2.3")
            .media_storage_sop_instance_uid("1.2.3.4")
            .implementation_class_uid("2.25.1")
            .build();
        assert!(matches!(
            res,
            Err(Error::MissingElement {
                alias: "TransferSyntax",
                ..
            })
        ));
    }

    #[test]
    fn back_and_forth_through_elements() {
        let table = table();
        let ds: DataSet = table.to_elements().into_iter().collect();
        assert_eq!(ds.len(), 7);
        let again = FileMetaTable::from_dataset(&ds).unwrap();
        assert_eq!(again, table);
    }
}
