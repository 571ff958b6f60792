#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    unused_qualifications,
    unused_import_braces
)]

//! This is the core library of the dcmstream decoding engine,
//! containing the data structures and traits shared by
//! the header decoders, the value decoders and both parsing drivers.
//!
//! The current structure of this crate is as follows:
//!
//! - [`header`] comprises various data types for DICOM element headers,
//!   including common definitions for DICOM tags,
//!   value representations and lengths.
//! - [`dictionary`] describes common behavior of DICOM data dictionaries,
//!   which translate attribute names and/or tags to a dictionary entry
//!   containing relevant information about the attribute.
//! - [`value`] holds definitions for values in standard DICOM elements,
//!   with the awareness of multiplicity, representation,
//!   and the possible presence of sequences.

pub mod dictionary;
pub mod header;
pub mod value;

pub use dictionary::DataDictionary;
pub use header::{DataElement, DataElementHeader, HasLength, Header, Length, Tag, VR};
pub use value::{PersonName, PrimitiveValue, Value as DicomValue};

// re-export crates that are part of the public API
pub use chrono;
pub use smallvec;
