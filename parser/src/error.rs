//! Crate-level error types.
//!
//! Every error belongs to one [`Category`],
//! which decides how the drivers react to it:
//! the one-shot driver stops at the first header or structural error,
//! while the streaming driver reports header and value errors
//! through its handler and carries on.

use dcmstream_core::Tag;
use dcmstream_encoding::decode;
use snafu::{Backtrace, Snafu};
use std::path::PathBuf;

/// The broad kind of a parsing error.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    /// The input is not a DICOM file which this crate can read.
    Structural,
    /// An element header or the structure of a sequence is malformed.
    HeaderDecode,
    /// A value could not be interpreted according to its VR.
    ValueDecode,
    /// A streaming parser exceeded one of its configured bounds.
    ResourceLimit,
    /// A streaming parser method was called in the wrong state.
    Lifecycle,
}

/// The main error type of the parsing drivers.
#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Not a DICOM file: missing magic code at offset {}", offset))]
    NotDicom { offset: u64, backtrace: Backtrace },

    #[snafu(display("Data too short to be a DICOM file: {} bytes", len))]
    TooShort { len: usize, backtrace: Backtrace },

    #[snafu(display("File meta group has no transfer syntax"))]
    MissingTransferSyntax { backtrace: Backtrace },

    #[snafu(display("Unsupported transfer syntax {} ({})", uid, name))]
    UnsupportedTransferSyntax {
        uid: String,
        name: &'static str,
        backtrace: Backtrace,
    },

    #[snafu(display("Could not read file {}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Could not decode element header at offset {}", offset))]
    HeaderDecode {
        tag: Option<Tag>,
        offset: u64,
        #[snafu(backtrace)]
        source: decode::Error,
    },

    #[snafu(display("Unexpected {} outside of a sequence at offset {}", tag, offset))]
    UnexpectedDelimiter {
        tag: Tag,
        offset: u64,
        backtrace: Backtrace,
    },

    #[snafu(display("Malformed sequence {} at offset {}: {}", tag, offset, reason))]
    MalformedSequence {
        tag: Tag,
        offset: u64,
        reason: &'static str,
        backtrace: Backtrace,
    },

    #[snafu(display("Element {} at offset {} ends past the end of data", tag, offset))]
    TruncatedElement {
        tag: Tag,
        offset: u64,
        backtrace: Backtrace,
    },

    #[snafu(display("Incomplete element header at offset {}", offset))]
    TruncatedHeader { offset: u64, backtrace: Backtrace },

    #[snafu(display("Could not decode value of {} at offset {}: {}", tag, offset, message))]
    ValueDecode {
        tag: Tag,
        offset: u64,
        message: String,
    },

    #[snafu(display("Buffered {} bytes, over the limit of {} bytes", size, max))]
    BufferLimit {
        size: usize,
        max: usize,
        backtrace: Backtrace,
    },

    #[snafu(display("Reached {} decoding steps without any progress", max))]
    IterationLimit { max: usize, backtrace: Backtrace },

    #[snafu(display("Parser was already initialized"))]
    AlreadyInitialized { backtrace: Backtrace },

    #[snafu(display("Parser was not initialized"))]
    NotInitialized { backtrace: Backtrace },

    #[snafu(display("Parser was already finalized"))]
    Finalized { backtrace: Backtrace },
}

impl Error {
    /// The category of this error.
    pub fn category(&self) -> Category {
        match self {
            Error::NotDicom { .. }
            | Error::TooShort { .. }
            | Error::MissingTransferSyntax { .. }
            | Error::UnsupportedTransferSyntax { .. }
            | Error::ReadFile { .. } => Category::Structural,
            Error::HeaderDecode { .. }
            | Error::UnexpectedDelimiter { .. }
            | Error::MalformedSequence { .. }
            | Error::TruncatedElement { .. }
            | Error::TruncatedHeader { .. } => Category::HeaderDecode,
            Error::ValueDecode { .. } => Category::ValueDecode,
            Error::BufferLimit { .. } | Error::IterationLimit { .. } => Category::ResourceLimit,
            Error::AlreadyInitialized { .. }
            | Error::NotInitialized { .. }
            | Error::Finalized { .. } => Category::Lifecycle,
        }
    }

    /// Whether the streaming parser returns this error
    /// instead of passing it to the handler.
    ///
    /// Missing transfer syntax is reported to the handler
    /// as the parser falls back to Explicit VR Little Endian.
    pub fn is_fatal(&self) -> bool {
        match self.category() {
            Category::HeaderDecode | Category::ValueDecode => false,
            Category::Structural => !matches!(self, Error::MissingTransferSyntax { .. }),
            Category::ResourceLimit | Category::Lifecycle => true,
        }
    }

    /// The stream offset associated with the error, if any.
    pub fn offset(&self) -> Option<u64> {
        match self {
            Error::NotDicom { offset, .. }
            | Error::HeaderDecode { offset, .. }
            | Error::UnexpectedDelimiter { offset, .. }
            | Error::MalformedSequence { offset, .. }
            | Error::TruncatedElement { offset, .. }
            | Error::TruncatedHeader { offset, .. }
            | Error::ValueDecode { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// The tag of the element involved, if known.
    pub fn tag(&self) -> Option<Tag> {
        match self {
            Error::HeaderDecode { tag, .. } => *tag,
            Error::UnexpectedDelimiter { tag, .. }
            | Error::MalformedSequence { tag, .. }
            | Error::TruncatedElement { tag, .. }
            | Error::ValueDecode { tag, .. } => Some(*tag),
            _ => None,
        }
    }
}

impl From<decode::Error> for Error {
    fn from(source: decode::Error) -> Self {
        Error::HeaderDecode {
            tag: source.tag(),
            offset: source.position(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        let e = BufferLimitSnafu { size: 20_usize, max: 10_usize }.build();
        assert_eq!(e.category(), Category::ResourceLimit);
        assert!(e.is_fatal());

        let e = ValueDecodeSnafu {
            tag: Tag(0x0010, 0x0030),
            offset: 64u64,
            message: "bad date",
        }
        .build();
        assert_eq!(e.category(), Category::ValueDecode);
        assert!(!e.is_fatal());
        assert_eq!(e.offset(), Some(64));
        assert_eq!(e.tag(), Some(Tag(0x0010, 0x0030)));

        let e = MissingTransferSyntaxSnafu.build();
        assert_eq!(e.category(), Category::Structural);
        assert!(!e.is_fatal());
        assert!(NotInitializedSnafu.build().is_fatal());
    }
}
