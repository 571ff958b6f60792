//! One-shot decoding of a complete DICOM file in memory.
//!
//! The input is checked for the Part 10 preamble and magic code,
//! then the file meta group is decoded in Explicit VR Little Endian
//! to find the transfer syntax of the main data set,
//! which is decoded to the end of the input.
use crate::dataset::DataSet;
use crate::decode::{read_element, read_to_end, DecodeState, ParseDepth};
use crate::error::{
    MissingTransferSyntaxSnafu, NotDicomSnafu, ReadFileSnafu, Result, TooShortSnafu,
    UnsupportedTransferSyntaxSnafu,
};
use crate::meta::{DICM_MAGIC_CODE, PREAMBLE_LEN};
use dcmstream_dictionary_std::tags;
use dcmstream_transfer_syntax_registry::{trim_uid, TransferSyntaxRegistry};
use snafu::{ensure, ResultExt};
use std::path::Path;

/// Decode a complete DICOM file held in memory,
/// with the default options.
pub fn from_bytes(bytes: &[u8]) -> Result<DataSet> {
    OpenOptions::new().from_bytes(bytes)
}

/// Read and decode a DICOM file from disk,
/// with the default options.
pub fn open_file<P>(path: P) -> Result<DataSet>
where
    P: AsRef<Path>,
{
    OpenOptions::new().open_file(path)
}

/// An enumerate of supported options for
/// whether to expect the 128-byte DICOM file preamble.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub enum ReadPreamble {
    /// Look for the magic code at the start of the data
    /// and right after a 128-byte preamble,
    /// and read the data as a bare data set if neither is there.
    Auto,
    /// Never read the preamble:
    /// the data starts with the magic code or the data set.
    Never,
    /// Always read the preamble and the magic code,
    /// failing if the magic code is not there.
    Always,
}

impl Default for ReadPreamble {
    fn default() -> Self {
        ReadPreamble::Auto
    }
}

/// A builder type for decoding a DICOM file with additional options.
///
/// # Example
///
/// ```no_run
/// # use dcmstream_parser::{OpenOptions, ParseDepth};
/// let dataset = OpenOptions::new()
///     .depth(ParseDepth::Light)
///     .open_file("path/to/file.dcm")?;
/// # Result::<(), Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug, Default, Clone)]
#[non_exhaustive]
pub struct OpenOptions {
    depth: ParseDepth,
    read_preamble: ReadPreamble,
    registry: Option<TransferSyntaxRegistry>,
}

impl OpenOptions {
    pub fn new() -> Self {
        OpenOptions::default()
    }

    /// Set how much of each element is decoded.
    pub fn depth(mut self, depth: ParseDepth) -> Self {
        self.depth = depth;
        self
    }

    /// Set whether to expect the 128-byte DICOM file preamble.
    pub fn read_preamble(mut self, option: ReadPreamble) -> Self {
        self.read_preamble = option;
        self
    }

    /// Set the transfer syntax registry used to interpret
    /// the transfer syntax UID of the file.
    ///
    /// The process-wide default registry is used otherwise.
    pub fn transfer_syntax_registry(mut self, registry: TransferSyntaxRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Read the file at the given path and decode it.
    pub fn open_file<P>(self, path: P) -> Result<DataSet>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let bytes = std::fs::read(path).context(ReadFileSnafu { path })?;
        self.from_bytes(&bytes)
    }

    /// Decode a complete DICOM file held in memory.
    pub fn from_bytes(self, bytes: &[u8]) -> Result<DataSet> {
        ensure!(!bytes.is_empty(), TooShortSnafu { len: 0_usize });
        let start = match detect_preamble(bytes, self.read_preamble, true)? {
            Some(start) => start,
            None => return TooShortSnafu { len: bytes.len() }.fail(),
        };
        let registry = self
            .registry
            .as_ref()
            .unwrap_or_else(|| TransferSyntaxRegistry::default_registry());

        let mut meta_state = DecodeState::file_meta();
        let mut cursor = meta_state.cursor(&bytes[start..], start as u64);
        let mut meta = Vec::new();
        while matches!(cursor.peek_tag(), Ok(tag) if tag.group() == 0x0002) {
            meta.push(read_element(&mut cursor, &mut meta_state, ParseDepth::Full)?);
        }

        let (mut state, ts_uid) = if meta.is_empty() {
            tracing::debug!("No file meta group, reading Implicit VR Little Endian");
            default_encoding()
        } else {
            let uid = meta
                .iter()
                .find(|e| e.header().tag == tags::TRANSFER_SYNTAX_UID)
                .and_then(|e| e.to_str().ok());
            body_encoding(uid.as_deref(), registry)?
        };
        cursor.set_endianness(state.endianness());

        let mut dataset =
            DataSet::with_encoding(ts_uid, state.explicit_vr(), state.endianness(), state.charset());
        dataset.extend(meta);
        read_to_end(&mut cursor, &mut state, self.depth, &mut dataset)?;
        Ok(dataset)
    }
}

/// Find where the file meta group or data set starts.
///
/// Returns `None` if more bytes are needed to decide,
/// which never happens once `eof` is set.
pub(crate) fn detect_preamble(
    buf: &[u8],
    mode: ReadPreamble,
    eof: bool,
) -> Result<Option<usize>> {
    let magic_end = PREAMBLE_LEN + DICM_MAGIC_CODE.len();
    match mode {
        ReadPreamble::Never if buf.starts_with(&DICM_MAGIC_CODE) => Ok(Some(DICM_MAGIC_CODE.len())),
        ReadPreamble::Never if buf.len() < DICM_MAGIC_CODE.len() && !eof => {
            Ok(if DICM_MAGIC_CODE.starts_with(buf) { None } else { Some(0) })
        }
        ReadPreamble::Never => Ok(Some(0)),
        ReadPreamble::Always if buf.len() < magic_end => {
            ensure!(!eof, TooShortSnafu { len: buf.len() });
            Ok(None)
        }
        ReadPreamble::Always => {
            ensure!(
                buf[PREAMBLE_LEN..magic_end] == DICM_MAGIC_CODE,
                NotDicomSnafu {
                    offset: PREAMBLE_LEN as u64
                }
            );
            Ok(Some(magic_end))
        }
        ReadPreamble::Auto => {
            if buf.starts_with(&DICM_MAGIC_CODE) {
                Ok(Some(DICM_MAGIC_CODE.len()))
            } else if buf.len() >= magic_end {
                if buf[PREAMBLE_LEN..magic_end] == DICM_MAGIC_CODE {
                    Ok(Some(magic_end))
                } else {
                    Ok(Some(0))
                }
            } else if eof {
                Ok(Some(0))
            } else {
                Ok(None)
            }
        }
    }
}

/// The decoding state for the data set after a file meta group
/// declaring the given transfer syntax,
/// along with the UID to record in the data set.
pub(crate) fn body_encoding(
    uid: Option<&str>,
    registry: &TransferSyntaxRegistry,
) -> Result<(DecodeState, String)> {
    let uid = match uid.map(trim_uid) {
        Some(uid) if !uid.is_empty() => uid,
        _ => return MissingTransferSyntaxSnafu.fail(),
    };
    let ts = registry.get_or_fallback(uid);
    ensure!(
        ts.can_parse(),
        UnsupportedTransferSyntaxSnafu {
            uid,
            name: ts.name()
        }
    );
    tracing::debug!("Reading data set in {}", ts.name());
    Ok((DecodeState::for_transfer_syntax(ts), uid.to_string()))
}

/// The decoding state for a data set without a file meta group.
pub(crate) fn default_encoding() -> (DecodeState, String) {
    let ts = dcmstream_transfer_syntax_registry::default();
    (DecodeState::for_transfer_syntax(&ts), ts.uid().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn preamble_detection() {
        let mut file = vec![0u8; 128];
        file.extend_from_slice(b"DICM");
        file.extend_from_slice(&[0x02, 0x00]);

        assert_eq!(detect_preamble(&file, ReadPreamble::Auto, true).unwrap(), Some(132));
        assert_eq!(detect_preamble(&file, ReadPreamble::Always, true).unwrap(), Some(132));
        assert_eq!(detect_preamble(&file, ReadPreamble::Never, true).unwrap(), Some(0));
        assert_eq!(detect_preamble(&file[128..], ReadPreamble::Auto, true).unwrap(), Some(4));
        assert_eq!(detect_preamble(&file[128..], ReadPreamble::Never, true).unwrap(), Some(4));
        // undecided until 132 bytes or the end of data
        assert_eq!(detect_preamble(&file[..64], ReadPreamble::Auto, false).unwrap(), None);
        assert_eq!(detect_preamble(&file[..64], ReadPreamble::Auto, true).unwrap(), Some(0));
        assert!(matches!(
            detect_preamble(&file[..64], ReadPreamble::Always, true),
            Err(Error::TooShort { len: 64, .. })
        ));
        file[130] = b'X';
        assert!(matches!(
            detect_preamble(&file, ReadPreamble::Always, true),
            Err(Error::NotDicom { offset: 128, .. })
        ));
    }

    #[test]
    fn empty_input() {
        assert!(matches!(from_bytes(&[]), Err(Error::TooShort { len: 0, .. })));
    }

    #[test]
    fn unsupported_transfer_syntax() {
        let registry = TransferSyntaxRegistry::with_standard_entries();
        let err = body_encoding(Some("1.2.840.10008.1.2.1.99\0"), &registry).unwrap_err();
        assert!(matches!(err, Error::UnsupportedTransferSyntax { .. }));
        assert!(err.is_fatal());
        assert!(matches!(
            body_encoding(Some(""), &registry),
            Err(Error::MissingTransferSyntax { .. })
        ));
        // unknown UIDs are read as Explicit VR Little Endian
        let (state, uid) = body_encoding(Some("1.2.3.4.5"), &registry).unwrap();
        assert!(state.explicit_vr());
        assert_eq!(uid, "1.2.3.4.5");
    }
}
