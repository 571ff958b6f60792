//! This crate implements the standard DICOM data dictionary
//! used by the dcmstream decoding engine.
//!
//! - [`data_element`] contains the run-time dictionary of attributes,
//!   queried by tag or by alias.
//!   Implicit VR decoding relies on it to resolve value representations.
//! - [`tags`] maps attribute aliases to DICOM tags at compile time.
//!
//! The dictionary covers the file meta group,
//! the attributes most frequently found in patient, study, series and image modules,
//! repeating overlay and curve groups,
//! plus generic rules for group length and private creator elements.
pub mod data_element;
pub mod tags;

pub use data_element::{StandardDataDictionary, StandardDataDictionaryRegistry};
