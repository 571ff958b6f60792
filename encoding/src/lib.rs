#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    unused_qualifications,
    unused_import_braces
)]
//! DICOM encoding and decoding primitives.
//!
//! This crate provides the lowest layer of the dcmstream decoding engine:
//!
//! - [`cursor`]: a bounds-checked reader over an in-memory byte window
//!   with run-time byte order control;
//! - [`decode`]: data element header decoders
//!   for explicit and implicit value representation;
//! - [`encode`]: the symmetric header encoders;
//! - [`text`]: text codecs for the supported character repertoires;
//! - [`transfer_syntax`]: the transfer syntax specifier,
//!   which tells the drivers how to configure the decoders above.
//!
//! All APIs in this crate work on byte slices already in memory.
//! The resumable part of the engine lives in `dcmstream-parser`.

pub mod cursor;
pub mod decode;
pub mod encode;
pub mod text;
pub mod transfer_syntax;

pub use byteordered::Endianness;
pub use cursor::ByteCursor;
pub use decode::{Decode, HeaderDecoder};
pub use encode::{Encode, HeaderEncoder};
pub use transfer_syntax::{Codec, TransferSyntax, TransferSyntaxIndex};
