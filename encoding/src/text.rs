//! Text codecs for the character repertoires of DICOM string values.
//!
//! The active repertoire of a data set is declared by its
//! Specific Character Set (0008,0005) element.
//! Only single-byte ISO 8859 repertoires, UTF-8 and GB18030
//! are currently supported; see [`SpecificCharacterSet`].
//!
//! Decoding is strict: bytes which are not valid in the repertoire
//! make decoding fail, so that the value decoder can keep the raw
//! bytes of the element and report a warning instead.

use encoding::all::{GB18030, ISO_8859_1, ISO_8859_2, ISO_8859_3, ISO_8859_4, ISO_8859_5, UTF_8};
use encoding::{DecoderTrap, EncoderTrap, Encoding};
use snafu::{Backtrace, Snafu};
use std::borrow::Cow;

/// An error type for text encoding issues.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum EncodeTextError {
    /// The text has characters outside of the repertoire.
    #[snafu(display("Could not encode text in {}: {}", charset, message))]
    EncodeCustom {
        /// The defined term of the character set.
        charset: &'static str,
        /// The error message in plain text.
        message: Cow<'static, str>,
        /// The generated backtrace, if available.
        backtrace: Backtrace,
    },
}

/// An error type for text decoding issues.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum DecodeTextError {
    /// The bytes are not valid text in the repertoire.
    #[snafu(display("Could not decode text as {}: {}", charset, message))]
    DecodeCustom {
        /// The defined term of the character set.
        charset: &'static str,
        /// The error message in plain text.
        message: Cow<'static, str>,
        /// The generated backtrace, if available.
        backtrace: Backtrace,
    },
}

type EncodeResult<T> = Result<T, EncodeTextError>;
type DecodeResult<T> = Result<T, DecodeTextError>;

/// Encoding and decoding of text in DICOM content,
/// which depends on the specific character set.
pub trait TextCodec {
    /// The defined term of the text encoding,
    /// as it would appear in a Specific Character Set (0008,0005) element.
    fn name(&self) -> &'static str;

    /// Decode the given bytes as a single string.
    /// The result may contain backslash characters,
    /// which the caller splits into multiple values if required.
    fn decode(&self, text: &[u8]) -> DecodeResult<String>;

    /// Encode a text value into a byte vector.
    fn encode(&self, text: &str) -> EncodeResult<Vec<u8>>;
}

impl<'a, T: ?Sized> TextCodec for &'a T
where
    T: TextCodec,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn decode(&self, text: &[u8]) -> DecodeResult<String> {
        (**self).decode(text)
    }

    fn encode(&self, text: &str) -> EncodeResult<Vec<u8>> {
        (**self).encode(text)
    }
}

/// All currently supported character sets.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[non_exhaustive]
pub enum SpecificCharacterSet {
    /// **ISO-IR 6**: the default character repertoire.
    #[default]
    Default,
    /// **ISO-IR 100** (ISO-8859-1): Latin alphabet no. 1.
    IsoIr100,
    /// **ISO-IR 101** (ISO-8859-2): Latin alphabet no. 2.
    IsoIr101,
    /// **ISO-IR 109** (ISO-8859-3): Latin alphabet no. 3.
    IsoIr109,
    /// **ISO-IR 110** (ISO-8859-4): Latin alphabet no. 4.
    IsoIr110,
    /// **ISO-IR 144** (ISO-8859-5): Latin/Cyrillic.
    IsoIr144,
    /// **ISO-IR 192**: Unicode in UTF-8.
    IsoIr192,
    /// **GB18030**: Simplified Chinese.
    Gb18030,
}

impl SpecificCharacterSet {
    /// Obtain the character set identified by the given defined term.
    ///
    /// Only the first value of a multi-valued term is considered,
    /// and an empty term means the default repertoire.
    ///
    /// # Example
    ///
    /// ```
    /// # use dcmstream_encoding::text::SpecificCharacterSet;
    /// let character_set = SpecificCharacterSet::from_code("ISO_IR 100");
    /// assert_eq!(character_set, Some(SpecificCharacterSet::IsoIr100));
    /// ```
    pub fn from_code(code: &str) -> Option<Self> {
        use self::SpecificCharacterSet::*;
        let code = code.split('\\').next().unwrap_or_default();
        match code.trim_matches(|c: char| c == ' ' || c == '\0') {
            "" | "Default" | "ISO_IR_6" | "ISO_IR 6" | "ISO 2022 IR 6" => Some(Default),
            "ISO_IR_100" | "ISO_IR 100" | "ISO 2022 IR 100" => Some(IsoIr100),
            "ISO_IR_101" | "ISO_IR 101" | "ISO 2022 IR 101" => Some(IsoIr101),
            "ISO_IR_109" | "ISO_IR 109" | "ISO 2022 IR 109" => Some(IsoIr109),
            "ISO_IR_110" | "ISO_IR 110" | "ISO 2022 IR 110" => Some(IsoIr110),
            "ISO_IR_144" | "ISO_IR 144" | "ISO 2022 IR 144" => Some(IsoIr144),
            "ISO_IR_192" | "ISO_IR 192" => Some(IsoIr192),
            "GB18030" => Some(Gb18030),
            _ => None,
        }
    }

    fn backend(self) -> &'static dyn Encoding {
        match self {
            // ISO 8859-1 is a superset of the default repertoire
            SpecificCharacterSet::Default | SpecificCharacterSet::IsoIr100 => ISO_8859_1,
            SpecificCharacterSet::IsoIr101 => ISO_8859_2,
            SpecificCharacterSet::IsoIr109 => ISO_8859_3,
            SpecificCharacterSet::IsoIr110 => ISO_8859_4,
            SpecificCharacterSet::IsoIr144 => ISO_8859_5,
            SpecificCharacterSet::IsoIr192 => UTF_8,
            SpecificCharacterSet::Gb18030 => GB18030,
        }
    }
}

impl TextCodec for SpecificCharacterSet {
    fn name(&self) -> &'static str {
        match self {
            SpecificCharacterSet::Default => "ISO_IR 6",
            SpecificCharacterSet::IsoIr100 => "ISO_IR 100",
            SpecificCharacterSet::IsoIr101 => "ISO_IR 101",
            SpecificCharacterSet::IsoIr109 => "ISO_IR 109",
            SpecificCharacterSet::IsoIr110 => "ISO_IR 110",
            SpecificCharacterSet::IsoIr144 => "ISO_IR 144",
            SpecificCharacterSet::IsoIr192 => "ISO_IR 192",
            SpecificCharacterSet::Gb18030 => "GB18030",
        }
    }

    fn decode(&self, text: &[u8]) -> DecodeResult<String> {
        self.backend()
            .decode(text, DecoderTrap::Strict)
            .map_err(|message| {
                DecodeCustomSnafu {
                    charset: self.name(),
                    message,
                }
                .build()
            })
    }

    fn encode(&self, text: &str) -> EncodeResult<Vec<u8>> {
        self.backend()
            .encode(text, EncoderTrap::Strict)
            .map_err(|message| {
                EncodeCustomSnafu {
                    charset: self.name(),
                    message,
                }
                .build()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_codec<T>(codec: T, string: &str, bytes: &[u8])
    where
        T: TextCodec,
    {
        assert_eq!(codec.encode(string).expect("encoding"), bytes);
        assert_eq!(codec.decode(bytes).expect("decoding"), string);
    }

    #[test]
    fn iso_ir_6_baseline() {
        let codec = SpecificCharacterSet::Default;
        test_codec(codec, "Smith^John", b"Smith^John");
    }

    #[test]
    fn iso_ir_192_baseline() {
        let codec = SpecificCharacterSet::IsoIr192;
        test_codec(&codec, "Simões^John", "Simões^John".as_bytes());
        test_codec(codec, "Иванков^Андрей", "Иванков^Андрей".as_bytes());
    }

    #[test]
    fn iso_ir_100_baseline() {
        let codec = SpecificCharacterSet::IsoIr100;
        test_codec(&codec, "Simões^João", b"Sim\xF5es^Jo\xE3o");
        test_codec(codec, "Günther^Hans", b"G\xfcnther^Hans");
    }

    #[test]
    fn iso_ir_144_baseline() {
        let codec = SpecificCharacterSet::IsoIr144;
        test_codec(
            codec,
            "Иванков^Андрей",
            b"\xb8\xd2\xd0\xdd\xda\xde\xd2^\xb0\xdd\xd4\xe0\xd5\xd9",
        );
    }

    #[test]
    fn invalid_utf8_fails() {
        let codec = SpecificCharacterSet::IsoIr192;
        assert!(codec.decode(b"Smith\xFF\xFE").is_err());
    }

    #[test]
    fn defined_terms() {
        assert_eq!(
            SpecificCharacterSet::from_code("ISO_IR 192 "),
            Some(SpecificCharacterSet::IsoIr192)
        );
        assert_eq!(
            SpecificCharacterSet::from_code(""),
            Some(SpecificCharacterSet::Default)
        );
        assert_eq!(
            SpecificCharacterSet::from_code("ISO 2022 IR 100\\ISO 2022 IR 87"),
            Some(SpecificCharacterSet::IsoIr100)
        );
        assert_eq!(SpecificCharacterSet::from_code("ISO_IR 13"), None);
        assert_eq!(SpecificCharacterSet::Gb18030.name(), "GB18030");
    }
}
