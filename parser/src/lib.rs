#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    unused_qualifications,
    unused_import_braces
)]
//! The parsing drivers of the dcmstream decoding engine.
//!
//! Two drivers share one element decoding routine
//! ([`decode::read_element`]):
//!
//! - [`open`]: the one-shot driver,
//!   decoding a complete file in memory into a [`DataSet`];
//! - [`stream`]: the streaming driver,
//!   a resumable state machine fed with chunks of bytes,
//!   which emits every element to a [`StreamHandler`]
//!   as soon as it is complete.
//!
//! For any input, the streaming driver emits the same elements
//! as the one-shot driver produces, however the input was split.
//!
//! The remaining modules support them:
//! [`meta`] holds the file meta information table,
//! [`scan`] finds the end of values of undefined length,
//! [`dataset::write`] encodes data sets back into bytes,
//! and [`error`] defines the error taxonomy of the drivers.
//!
//! # Example
//!
//! ```no_run
//! use dcmstream_parser::open_file;
//! use dcmstream_dictionary_std::tags;
//!
//! let dataset = open_file("path/to/file.dcm")?;
//! let name = dataset.element(tags::PATIENT_NAME).map(|e| e.to_str());
//! # Result::<(), Box<dyn std::error::Error>>::Ok(())
//! ```

pub mod dataset;
pub mod decode;
pub mod error;
pub mod meta;
pub mod open;
pub mod scan;
pub mod stream;

pub use crate::dataset::{write_dataset, write_file, DataSet, InMemElement};
pub use crate::decode::ParseDepth;
pub use crate::error::{Category, Error, Result};
pub use crate::meta::FileMetaTable;
pub use crate::open::{from_bytes, open_file, OpenOptions, ReadPreamble};
pub use crate::stream::{FnHandler, StreamHandler, StreamOptions, StreamParser};

/// The implementation class UID written to the file meta group
/// of files created by this crate.
pub const IMPLEMENTATION_CLASS_UID: &str = "2.25.214912581730178627209186049612384915823";

/// The implementation version name written to the file meta group
/// of files created by this crate.
pub const IMPLEMENTATION_VERSION_NAME: &str = "DCMSTREAM_010";
