//! The DICOM transfer syntax specifier.
//!
//! A [`TransferSyntax`] tells the parsing drivers how the main data set
//! is encoded: its byte order, whether value representations are explicit,
//! and whether a codec is involved.
//! This crate does not host specific transfer syntaxes.
//! They are declared in `dcmstream-transfer-syntax-registry`,
//! which implements [`TransferSyntaxIndex`].

use crate::decode::HeaderDecoder;
use crate::encode::HeaderEncoder;

pub use byteordered::Endianness;

/// A DICOM transfer syntax specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSyntax {
    /// The unique identifier of the transfer syntax.
    uid: &'static str,
    /// The name of the transfer syntax.
    name: &'static str,
    /// The byte order of data.
    byte_order: Endianness,
    /// Whether the transfer syntax mandates an explicit value representation,
    /// or the VR is implicit.
    explicit_vr: bool,
    /// The transfer syntax' requirements.
    codec: Codec,
}

/// Trait for containers of transfer syntax specifiers.
pub trait TransferSyntaxIndex {
    /// Obtain a DICOM transfer syntax by its respective UID.
    ///
    /// Implementations of this method should be robust to the possible
    /// presence of trailing null characters (`\0`) or spaces in `uid`.
    fn get(&self, uid: &str) -> Option<&TransferSyntax>;
}

impl<T: ?Sized> TransferSyntaxIndex for &T
where
    T: TransferSyntaxIndex,
{
    fn get(&self, uid: &str) -> Option<&TransferSyntax> {
        (**self).get(uid)
    }
}

/// The encoding requirements of a transfer syntax
/// beyond byte order and VR mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Codec {
    /// No codec is required.
    None,
    /// The whole data set after the file meta group is deflated.
    /// Reading such data sets is not supported.
    Deflated,
    /// Pixel data is encapsulated in fragments.
    /// The data set can be fully parsed,
    /// while decoding the fragments is left to a pixel data decoder.
    EncapsulatedPixelData,
}

impl TransferSyntax {
    /// Create a new transfer syntax descriptor.
    pub const fn new(
        uid: &'static str,
        name: &'static str,
        byte_order: Endianness,
        explicit_vr: bool,
        codec: Codec,
    ) -> Self {
        TransferSyntax {
            uid,
            name,
            byte_order,
            explicit_vr,
            codec,
        }
    }

    /// Obtain this transfer syntax' unique identifier.
    pub const fn uid(&self) -> &'static str {
        self.uid
    }

    /// Obtain the name of this transfer syntax.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Obtain this transfer syntax' expected endianness.
    pub const fn endianness(&self) -> Endianness {
        self.byte_order
    }

    /// Whether value representations are encoded in element headers.
    pub const fn explicit_vr(&self) -> bool {
        self.explicit_vr
    }

    /// Obtain a reference to the underlying codec requirements.
    pub const fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Check whether data sets in this transfer syntax can be parsed.
    ///
    /// Only deflated data sets are out of reach,
    /// encapsulated pixel data is kept in fragments.
    pub fn can_parse(&self) -> bool {
        !self.is_deflated()
    }

    /// Check whether this transfer syntax needs no codec at all.
    pub fn is_codec_free(&self) -> bool {
        matches!(self.codec, Codec::None)
    }

    /// Check whether the data set is deflated.
    pub fn is_deflated(&self) -> bool {
        matches!(self.codec, Codec::Deflated)
    }

    /// Check whether pixel data is encapsulated.
    pub fn is_encapsulated_pixel_data(&self) -> bool {
        matches!(self.codec, Codec::EncapsulatedPixelData)
    }

    /// Obtain a header decoder for data sets in this transfer syntax.
    pub fn header_decoder(&self) -> HeaderDecoder {
        HeaderDecoder::new(self.explicit_vr)
    }

    /// Obtain a header encoder for data sets in this transfer syntax.
    pub fn header_encoder(&self) -> HeaderEncoder {
        HeaderEncoder::new(self.explicit_vr, self.byte_order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPLICIT_VR_BE: TransferSyntax = TransferSyntax::new(
        "1.2.840.10008.1.2.2",
        "Explicit VR Big Endian",
        Endianness::Big,
        true,
        Codec::None,
    );

    #[test]
    fn descriptor_properties() {
        let ts = EXPLICIT_VR_BE;
        assert_eq!(ts.uid(), "1.2.840.10008.1.2.2");
        assert_eq!(ts.endianness(), Endianness::Big);
        assert!(ts.explicit_vr());
        assert!(ts.is_codec_free());
        assert!(ts.can_parse());
        assert!(ts.header_decoder().is_explicit_vr());
        assert_eq!(
            ts.header_encoder(),
            HeaderEncoder::new(true, Endianness::Big)
        );

        let deflated = TransferSyntax::new(
            "1.2.840.10008.1.2.1.99",
            "Deflated Explicit VR Little Endian",
            Endianness::Little,
            true,
            Codec::Deflated,
        );
        assert!(!deflated.can_parse());
    }
}
