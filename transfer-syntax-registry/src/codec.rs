//! Pixel data decoders for encapsulated transfer syntaxes.
//!
//! Decoding compressed pixel data is not done by the parsing drivers.
//! Instead, a [`PixelDecoder`] turns the fragments of an
//! already parsed pixel data element into native pixel data.
//! Decoders are kept in a [`PixelDecoderRegistry`],
//! which picks the highest priority decoder supporting a transfer syntax.

use crate::entries::ENCAPSULATED_UNCOMPRESSED_EXPLICIT_VR_LITTLE_ENDIAN;
use crate::trim_uid;
use snafu::{ensure, Snafu};
use std::fmt;

/// An error from decoding pixel data.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum DecodeError {
    /// A custom error when decoding fails
    #[snafu(display("Error decoding pixel data: {}", message))]
    Custom { message: String },

    /// The number of fragments does not match the number of frames
    #[snafu(display("Expected {} frame fragments, found {}", expected, got))]
    FrameCount { expected: u32, got: usize },

    /// A frame does not have the expected size
    #[snafu(display("Frame #{} has {} bytes, expected {}", frame, got, expected))]
    FrameSize {
        frame: usize,
        expected: usize,
        got: usize,
    },
}

pub type DecodeResult<T, E = DecodeError> = Result<T, E>;

/// The image properties needed to decode pixel data.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PixelInfo {
    /// Rows (0028,0010)
    pub rows: u16,
    /// Columns (0028,0011)
    pub columns: u16,
    /// Samples per Pixel (0028,0002)
    pub samples_per_pixel: u16,
    /// Bits Allocated (0028,0100)
    pub bits_allocated: u16,
    /// Number of Frames (0028,0008), 1 when absent
    pub number_of_frames: u32,
}

impl PixelInfo {
    /// The size in bytes of one native frame.
    pub fn frame_size(&self) -> usize {
        let bits = usize::from(self.rows)
            * usize::from(self.columns)
            * usize::from(self.samples_per_pixel)
            * usize::from(self.bits_allocated);
        (bits + 7) / 8
    }
}

/// A decoder of encapsulated pixel data.
pub trait PixelDecoder: fmt::Debug + Send + Sync {
    /// A short name identifying the decoder.
    fn name(&self) -> &str;

    /// Whether this decoder handles pixel data
    /// in the transfer syntax of the given UID.
    fn supports(&self, ts_uid: &str) -> bool;

    /// Decode all frames into native pixel data.
    ///
    /// `fragments` are the fragment items of the pixel data element,
    /// without the basic offset table.
    fn decode(&self, fragments: &[&[u8]], info: &PixelInfo) -> DecodeResult<Vec<u8>>;
}

/// A collection of pixel data decoders ordered by priority.
///
/// Decoders with higher priority come first.
/// Among decoders of equal priority,
/// the one registered first is preferred.
#[derive(Debug, Default)]
pub struct PixelDecoderRegistry {
    decoders: Vec<(i32, Box<dyn PixelDecoder>)>,
}

impl PixelDecoderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        PixelDecoderRegistry::default()
    }

    /// Create a registry with the decoders built into this crate.
    pub fn with_defaults() -> Self {
        let mut registry = PixelDecoderRegistry::new();
        registry.register(EncapsulatedUncompressedDecoder, 0);
        registry
    }

    /// Add a decoder with the given priority.
    pub fn register<D>(&mut self, decoder: D, priority: i32) -> &mut Self
    where
        D: PixelDecoder + 'static,
    {
        let index = self
            .decoders
            .iter()
            .position(|(p, _)| *p < priority)
            .unwrap_or(self.decoders.len());
        self.decoders.insert(index, (priority, Box::new(decoder)));
        self
    }

    /// Obtain the preferred decoder for the given transfer syntax.
    pub fn get_decoder(&self, ts_uid: &str) -> Option<&dyn PixelDecoder> {
        let uid = trim_uid(ts_uid);
        self.decoders
            .iter()
            .map(|(_, d)| d.as_ref())
            .find(|d| d.supports(uid))
    }

    /// Iterate over the decoder names, in order of preference.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.decoders.iter().map(|(_, d)| d.name())
    }

    /// The number of registered decoders.
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Whether no decoders are registered.
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

/// Decoder for _Encapsulated Uncompressed Explicit VR Little Endian_,
/// in which each fragment holds one native frame.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct EncapsulatedUncompressedDecoder;

impl PixelDecoder for EncapsulatedUncompressedDecoder {
    fn name(&self) -> &str {
        "encapsulated-uncompressed"
    }

    fn supports(&self, ts_uid: &str) -> bool {
        ts_uid == ENCAPSULATED_UNCOMPRESSED_EXPLICIT_VR_LITTLE_ENDIAN.uid()
    }

    fn decode(&self, fragments: &[&[u8]], info: &PixelInfo) -> DecodeResult<Vec<u8>> {
        ensure!(
            fragments.len() == info.number_of_frames as usize,
            FrameCountSnafu {
                expected: info.number_of_frames,
                got: fragments.len(),
            }
        );
        let frame_size = info.frame_size();
        let mut out = Vec::with_capacity(frame_size * fragments.len());
        for (frame, fragment) in fragments.iter().enumerate() {
            // fragments are padded to even length
            ensure!(
                fragment.len() == frame_size || fragment.len() == frame_size + 1,
                FrameSizeSnafu {
                    frame,
                    expected: frame_size,
                    got: fragment.len(),
                }
            );
            out.extend_from_slice(&fragment[..frame_size]);
        }
        Ok(out)
    }
}
