use crate::scan::StructureScanner;
use dcmstream_core::header::DataElementHeader;
use dcmstream_core::Tag;
use dcmstream_encoding::decode::HeaderField;

/// An element which could not be completed with the bytes received so far.
///
/// `start` is the stream offset of the element header.
#[derive(Debug, Clone)]
pub(crate) struct PendingElement {
    pub start: u64,
    pub stage: Stage,
}

/// What an element is waiting for.
#[derive(Debug, Clone)]
pub(crate) enum Stage {
    /// The rest of the header, which ran out at `field`.
    Header { field: HeaderField },
    /// `total` bytes of header and value,
    /// to be decoded at once.
    Value {
        header: DataElementHeader,
        total: usize,
    },
    /// The value of an element already emitted as deferred,
    /// dropped as it arrives.
    Skip { tag: Tag, remaining: u64 },
    /// The end of a value of undefined length.
    /// The bytes are kept for decoding if `decode` is set,
    /// and dropped as they are scanned otherwise.
    Structure {
        header: DataElementHeader,
        header_len: usize,
        scanner: StructureScanner,
        decode: bool,
    },
}
