//! Incremental decoding of a DICOM stream delivered in chunks.
//!
//! A [`StreamParser`] buffers incoming bytes in a window
//! and emits each data element to its [`StreamHandler`]
//! as soon as all of its bytes were received.
//! Elements are decoded by the same routine as the one-shot driver,
//! always over a contiguous slice holding the whole element,
//! so the emitted elements do not depend on how the stream was split.
//!
//! When an element cannot be completed yet,
//! the parser records it as pending and waits for the next chunk.
//! Values of undefined length are located with a
//! [`StructureScanner`](crate::scan::StructureScanner)
//! which resumes where the previous chunk ended.
//!
//! Header and value errors are passed to [`StreamHandler::on_error`],
//! after which the parser looks for the next plausible element header.
//! Resource limits and lifecycle misuse are returned as errors.

use crate::dataset::InMemElement;
use crate::decode::{deferred_element, read_element, DecodeState, ParseDepth};
use crate::error::{
    AlreadyInitializedSnafu, BufferLimitSnafu, Error, FinalizedSnafu, IterationLimitSnafu,
    NotInitializedSnafu, Result, TruncatedElementSnafu, TruncatedHeaderSnafu,
    UnexpectedDelimiterSnafu, ValueDecodeSnafu,
};
use crate::open::{body_encoding, default_encoding, detect_preamble, ReadPreamble};
use crate::scan::{ScanOutcome, StructureScanner};
use dcmstream_core::dictionary::DataDictionary;
use dcmstream_core::header::{DataElementHeader, HasLength, Header};
use dcmstream_dictionary_std::{tags, StandardDataDictionary};
use dcmstream_encoding::decode::{self, Decode};
use dcmstream_transfer_syntax_registry::{entries, TransferSyntaxRegistry};
use snafu::{ensure, Report};

mod buffer;
mod pending;

use self::buffer::BufferWindow;
use self::pending::{PendingElement, Stage};

/// The default bound on the number of bytes held by a stream parser.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 10 * 1024 * 1024;

/// The default bound on decoding steps per chunk.
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

const MIN_COMPACTION_THRESHOLD: usize = 64 * 1024;

/// Receiver of the output of a [`StreamParser`].
pub trait StreamHandler {
    /// Called with each decoded element, in stream order.
    fn on_element(&mut self, element: InMemElement);

    /// Called with each recoverable error.
    fn on_error(&mut self, error: Error);
}

impl<T: ?Sized> StreamHandler for &mut T
where
    T: StreamHandler,
{
    fn on_element(&mut self, element: InMemElement) {
        (**self).on_element(element)
    }

    fn on_error(&mut self, error: Error) {
        (**self).on_error(error)
    }
}

/// A stream handler made of two closures.
///
/// # Example
///
/// ```
/// # use dcmstream_parser::stream::{FnHandler, StreamOptions, StreamParser};
/// let mut tags = Vec::new();
/// let mut parser = StreamParser::new(
///     FnHandler::new(|e: dcmstream_parser::InMemElement| tags.push(e.header().tag), |_| {}),
///     StreamOptions::default(),
/// );
/// // (0010,0020) in Implicit VR Little Endian
/// parser.initialize(&[0x10, 0x00, 0x20, 0x00, 0x02, 0x00, 0x00, 0x00])?;
/// parser.process_chunk(b"ID")?;
/// parser.finalize()?;
/// drop(parser);
/// assert_eq!(tags.len(), 1);
/// # Result::<(), Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug, Clone)]
pub struct FnHandler<E, R> {
    on_element: E,
    on_error: R,
}

impl<E, R> FnHandler<E, R>
where
    E: FnMut(InMemElement),
    R: FnMut(Error),
{
    pub fn new(on_element: E, on_error: R) -> Self {
        FnHandler {
            on_element,
            on_error,
        }
    }
}

impl<E, R> StreamHandler for FnHandler<E, R>
where
    E: FnMut(InMemElement),
    R: FnMut(Error),
{
    fn on_element(&mut self, element: InMemElement) {
        (self.on_element)(element)
    }

    fn on_error(&mut self, error: Error) {
        (self.on_error)(error)
    }
}

/// Options of a [`StreamParser`].
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct StreamOptions {
    max_buffer_size: usize,
    max_iterations: usize,
    depth: ParseDepth,
    read_preamble: ReadPreamble,
    registry: Option<TransferSyntaxRegistry>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        StreamOptions {
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            depth: ParseDepth::default(),
            read_preamble: ReadPreamble::default(),
            registry: None,
        }
    }
}

impl StreamOptions {
    pub fn new() -> Self {
        StreamOptions::default()
    }

    /// Set the maximum number of received bytes
    /// which may be held without being decoded.
    pub fn max_buffer_size(mut self, size: usize) -> Self {
        self.max_buffer_size = size;
        self
    }

    /// Set the maximum number of decoding steps per chunk.
    ///
    /// At least one step is always allowed.
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
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
    /// the transfer syntax UID of the stream.
    pub fn transfer_syntax_registry(mut self, registry: TransferSyntaxRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    fn compaction_threshold(&self) -> usize {
        usize::max(MIN_COMPACTION_THRESHOLD, self.max_buffer_size / 4)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Lifecycle {
    Uninitialized,
    Active,
    Finalized,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Phase {
    Preamble,
    Meta,
    Body,
}

/// The result of one decoding step.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Step {
    /// An element was emitted or bytes were consumed.
    Advanced,
    /// An error was reported.
    Recovered,
    /// Nothing more can be done with the bytes received so far.
    Parked,
}

/// A resumable DICOM parser fed with chunks of bytes.
#[derive(Debug)]
pub struct StreamParser<H> {
    handler: H,
    options: StreamOptions,
    lifecycle: Lifecycle,
    phase: Phase,
    window: BufferWindow,
    state: DecodeState,
    pending: Option<PendingElement>,
    resync_at: Option<u64>,
    meta_seen: bool,
    meta_ts: Option<String>,
    transfer_syntax: Option<String>,
    last_tag: Option<dcmstream_core::Tag>,
}

impl<H> StreamParser<H>
where
    H: StreamHandler,
{
    /// Create a parser which passes its output to `handler`.
    pub fn new(handler: H, options: StreamOptions) -> Self {
        StreamParser {
            handler,
            options,
            lifecycle: Lifecycle::Uninitialized,
            phase: Phase::Preamble,
            window: BufferWindow::default(),
            state: DecodeState::file_meta(),
            pending: None,
            resync_at: None,
            meta_seen: false,
            meta_ts: None,
            transfer_syntax: None,
            last_tag: None,
        }
    }

    /// Start parsing with the first chunk of the stream.
    pub fn initialize(&mut self, first_chunk: &[u8]) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Uninitialized => {}
            Lifecycle::Active => return AlreadyInitializedSnafu.fail(),
            Lifecycle::Finalized => return FinalizedSnafu.fail(),
        }
        self.lifecycle = Lifecycle::Active;
        tracing::debug!("Stream parser initialized");
        self.feed(first_chunk)
    }

    /// Decode as many elements as possible with the next chunk of the stream.
    pub fn process_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        self.check_active()?;
        self.feed(chunk)
    }

    /// Decode what remains in the buffer and end the stream.
    ///
    /// An element which is still incomplete is reported to the handler.
    pub fn finalize(&mut self) -> Result<()> {
        self.check_active()?;
        self.lifecycle = Lifecycle::Finalized;
        self.run(true, None)?;
        if let Some(PendingElement { start, stage }) = self.pending.take() {
            let error = match stage {
                Stage::Header { field } => {
                    tracing::debug!("Stream ended within the {} of a header", field);
                    TruncatedHeaderSnafu { offset: start }.build()
                }
                Stage::Value { header, .. } | Stage::Structure { header, .. } => {
                    TruncatedElementSnafu {
                        tag: header.tag(),
                        offset: start,
                    }
                    .build()
                }
                Stage::Skip { tag, .. } => TruncatedElementSnafu { tag, offset: start }.build(),
            };
            self.handler.on_error(error);
        }
        tracing::debug!("Stream parser finalized at offset {}", self.window.end());
        Ok(())
    }

    /// The handler receiving the output.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// The handler receiving the output, mutably.
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Consume the parser, returning its handler.
    pub fn into_handler(self) -> H {
        self.handler
    }

    /// The stream offset of the first byte not yet consumed.
    pub fn position(&self) -> u64 {
        self.window.position()
    }

    /// The transfer syntax of the data set,
    /// once the file meta group was read.
    pub fn transfer_syntax(&self) -> Option<&str> {
        self.transfer_syntax.as_deref()
    }

    /// Whether [`finalize`](Self::finalize) was called.
    pub fn is_finalized(&self) -> bool {
        self.lifecycle == Lifecycle::Finalized
    }

    fn check_active(&self) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Active => Ok(()),
            Lifecycle::Uninitialized => NotInitializedSnafu.fail(),
            Lifecycle::Finalized => FinalizedSnafu.fail(),
        }
    }

    fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        self.window.append(chunk);
        self.run(false, Some(self.options.max_iterations))?;
        self.window.compact(self.options.compaction_threshold());
        let size = self.window.unconsumed();
        let max = self.options.max_buffer_size;
        ensure!(size <= max, BufferLimitSnafu { size, max });
        Ok(())
    }

    fn run(&mut self, eof: bool, limit: Option<usize>) -> Result<()> {
        let mut steps = 0;
        let mut stable = false;
        loop {
            if let Some(max) = limit {
                if steps >= max {
                    ensure!(stable, IterationLimitSnafu { max });
                    return Ok(());
                }
            }
            steps += 1;
            match self.step(eof)? {
                Step::Advanced => stable = true,
                Step::Recovered => {}
                Step::Parked => return Ok(()),
            }
        }
    }

    fn step(&mut self, eof: bool) -> Result<Step> {
        if let Some(at) = self.resync_at.take() {
            return Ok(self.resync(at, eof));
        }
        if let Some(pending) = self.pending.take() {
            return self.resume(pending);
        }
        match self.phase {
            Phase::Preamble => self.step_preamble(eof),
            Phase::Meta => self.step_meta(eof),
            Phase::Body => Ok(self.step_element()),
        }
    }

    fn step_preamble(&mut self, eof: bool) -> Result<Step> {
        match detect_preamble(self.window.available(), self.options.read_preamble, eof)? {
            Some(skip) => {
                self.window.consume(skip);
                self.phase = Phase::Meta;
                tracing::debug!("Reading file meta group at offset {}", skip);
                Ok(Step::Advanced)
            }
            None => Ok(Step::Parked),
        }
    }

    fn step_meta(&mut self, eof: bool) -> Result<Step> {
        let cursor = self.state.cursor(self.window.available(), self.window.position());
        match cursor.peek_tag() {
            Ok(tag) if tag.group() == 0x0002 => {
                self.meta_seen = true;
                Ok(self.step_element())
            }
            Ok(_) => self.finish_meta(),
            Err(_) if eof => self.finish_meta(),
            Err(_) => Ok(Step::Parked),
        }
    }

    fn finish_meta(&mut self) -> Result<Step> {
        let registry = self
            .options
            .registry
            .as_ref()
            .unwrap_or_else(|| TransferSyntaxRegistry::default_registry());
        let encoding = if self.meta_seen {
            body_encoding(self.meta_ts.as_deref(), registry)
        } else {
            tracing::debug!("No file meta group, reading Implicit VR Little Endian");
            Ok(default_encoding())
        };
        let (state, uid) = match encoding {
            Ok(encoding) => encoding,
            Err(e) if !e.is_fatal() => {
                self.handler.on_error(e);
                let ts = entries::EXPLICIT_VR_LITTLE_ENDIAN;
                (DecodeState::for_transfer_syntax(&ts), ts.uid().to_string())
            }
            Err(e) => return Err(e),
        };
        tracing::debug!(
            "Reading data set in transfer syntax {} at offset {}",
            uid,
            self.window.position()
        );
        self.state = state;
        self.transfer_syntax = Some(uid);
        self.phase = Phase::Body;
        Ok(Step::Advanced)
    }

    fn depth(&self) -> ParseDepth {
        match self.phase {
            Phase::Body => self.options.depth,
            _ => ParseDepth::Full,
        }
    }

    /// Start decoding the element at the window position.
    fn step_element(&mut self) -> Step {
        let start = self.window.position();
        let mut cursor = self.state.cursor(self.window.available(), start);
        if cursor.is_empty() {
            return Step::Parked;
        }
        let header = match self.state.decoder().decode_header(&mut cursor) {
            Ok(header) => header,
            Err(decode::Error::Incomplete { field, .. }) => {
                tracing::trace!("Header at offset {} parked at its {}", start, field);
                self.pending = Some(PendingElement {
                    start,
                    stage: Stage::Header { field },
                });
                return Step::Parked;
            }
            Err(e) => return self.recover(e.into(), start),
        };
        if header.is_delimiting() {
            let error = UnexpectedDelimiterSnafu {
                tag: header.tag(),
                offset: start,
            }
            .build();
            return self.recover(error, start);
        }
        let header_len = (cursor.absolute_position() - start) as usize;
        let depth = self.depth();

        let stage = match header.length().get() {
            Some(len) if depth.defers(&header) => {
                self.window.consume(header_len);
                self.emit(deferred_element(&header, start + header_len as u64), start);
                Stage::Skip {
                    tag: header.tag(),
                    remaining: u64::from(len),
                }
            }
            Some(len) => Stage::Value {
                header,
                total: header_len + len as usize,
            },
            None => Stage::Structure {
                header,
                header_len,
                scanner: StructureScanner::new(&self.state, &header, start + header_len as u64),
                decode: !depth.defers(&header),
            },
        };
        match self.resume(PendingElement { start, stage }) {
            Ok(Step::Parked) => Step::Advanced,
            Ok(step) => step,
            Err(e) => self.recover(e, start),
        }
    }

    /// Continue with an element for which more bytes may have arrived.
    fn resume(&mut self, pending: PendingElement) -> Result<Step> {
        let PendingElement { start, stage } = pending;
        match stage {
            Stage::Header { .. } => Ok(self.step_element()),
            Stage::Value { header, total } => {
                if self.window.unconsumed() < total {
                    self.park(start, Stage::Value { header, total });
                    return Ok(Step::Parked);
                }
                Ok(self.decode_buffered(start, total))
            }
            Stage::Skip { tag, remaining } => {
                let n = u64::min(remaining, self.window.unconsumed() as u64);
                self.window.consume(n as usize);
                let remaining = remaining - n;
                if remaining > 0 {
                    self.park(start, Stage::Skip { tag, remaining });
                    return Ok(Step::Parked);
                }
                Ok(Step::Advanced)
            }
            Stage::Structure {
                header,
                header_len,
                mut scanner,
                decode,
            } => {
                let outcome = match scanner.scan(self.window.available(), self.window.position()) {
                    Ok(outcome) => outcome,
                    Err(e) => return Ok(self.recover(e, start)),
                };
                if !decode {
                    self.window
                        .consume_to(u64::min(scanner.position(), self.window.end()));
                }
                match outcome {
                    ScanOutcome::NeedMore => {
                        self.park(
                            start,
                            Stage::Structure {
                                header,
                                header_len,
                                scanner,
                                decode,
                            },
                        );
                        Ok(Step::Parked)
                    }
                    ScanOutcome::Complete(end) if decode => {
                        Ok(self.decode_buffered(start, (end - start) as usize))
                    }
                    ScanOutcome::Complete(end) => {
                        self.window.consume_to(end);
                        let value_offset = start + header_len as u64;
                        self.emit(deferred_element(&header, value_offset), start);
                        Ok(Step::Advanced)
                    }
                }
            }
        }
    }

    fn park(&mut self, start: u64, stage: Stage) {
        tracing::trace!("Element at offset {} parked", start);
        self.pending = Some(PendingElement { start, stage });
    }

    /// Decode the `total` bytes of a complete element
    /// at the start of the window.
    fn decode_buffered(&mut self, start: u64, total: usize) -> Step {
        let depth = self.depth();
        let avail = self.window.available();
        let mut cursor = self.state.cursor(&avail[..total], start);
        let result = read_element(&mut cursor, &mut self.state, depth);
        self.window.consume(total);
        match result {
            Ok(element) => {
                self.emit(element, start);
                Step::Advanced
            }
            Err(e) => {
                self.handler.on_error(e);
                Step::Recovered
            }
        }
    }

    fn emit(&mut self, element: InMemElement, offset: u64) {
        let tag = element.tag();
        if self.phase == Phase::Meta && tag == tags::TRANSFER_SYNTAX_UID {
            self.meta_ts = element.to_str().ok().map(|uid| uid.into_owned());
        }
        self.last_tag = Some(tag);
        let warning = element.decode_warning().map(|message| {
            ValueDecodeSnafu {
                tag,
                offset,
                message,
            }
            .build()
        });
        self.handler.on_element(element);
        if let Some(warning) = warning {
            self.handler.on_error(warning);
        }
    }

    /// Report an error and look for the next element header
    /// past the given offset.
    fn recover(&mut self, error: Error, at: u64) -> Step {
        tracing::warn!("{}", Report::from_error(&error));
        self.handler.on_error(error);
        self.pending = None;
        self.resync_at = Some(u64::max(at + 2, self.window.position()));
        Step::Recovered
    }

    /// Skip bytes until a plausible element header,
    /// starting at the stream offset `at`.
    fn resync(&mut self, at: u64, eof: bool) -> Step {
        self.window.consume_to(at);
        if self.window.position() < at {
            self.resync_at = Some(at);
            return Step::Parked;
        }
        let from = self.window.position();
        let avail = self.window.available();
        let mut skip = 0;
        let found = loop {
            if skip >= avail.len() {
                break false;
            }
            let mut cursor = self.state.cursor(&avail[skip..], from + skip as u64);
            match self.state.decoder().decode_header(&mut cursor) {
                Ok(header) if self.is_plausible(&header) => break true,
                Err(e) if e.is_incomplete() => break false,
                _ => skip += 2,
            }
        };
        self.window.consume(skip);
        if found {
            tracing::warn!("Resynchronized at offset {}", self.window.position());
            return Step::Recovered;
        }
        if eof {
            let rest = self.window.unconsumed();
            tracing::warn!("Dropped {} trailing bytes", rest);
            self.window.consume(rest);
        } else {
            self.resync_at = Some(self.window.position());
        }
        Step::Parked
    }

    fn is_plausible(&self, header: &DataElementHeader) -> bool {
        if header.is_delimiting() {
            return false;
        }
        if matches!(self.last_tag, Some(last) if header.tag() <= last) {
            return false;
        }
        self.state.explicit_vr() || StandardDataDictionary.by_tag(header.tag()).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Category;
    use dcmstream_core::Tag;

    #[derive(Debug, Default)]
    struct Collect {
        elements: Vec<InMemElement>,
        errors: Vec<Error>,
    }

    impl StreamHandler for Collect {
        fn on_element(&mut self, element: InMemElement) {
            self.elements.push(element);
        }

        fn on_error(&mut self, error: Error) {
            self.errors.push(error);
        }
    }

    // no preamble
    fn raw_options() -> StreamOptions {
        StreamOptions::new().read_preamble(ReadPreamble::Never)
    }

    #[rustfmt::skip]
    const PATIENT: &[u8] = &[
        // (0002,0010) UI "1.2.840.10008.1.2.1\0"
        0x02, 0x00, 0x10, 0x00, b'U', b'I', 0x14, 0x00,
            b'1', b'.', b'2', b'.', b'8', b'4', b'0', b'.', b'1', b'0',
            b'0', b'0', b'8', b'.', b'1', b'.', b'2', b'.', b'1', 0x00,
        // (0010,0010) PN "Test^Patient"
        0x10, 0x00, 0x10, 0x00, b'P', b'N', 0x0C, 0x00,
            b'T', b'e', b's', b't', b'^', b'P', b'a', b't', b'i', b'e', b'n', b't',
    ];

    #[test]
    fn person_name_split_within_value() {
        // split after the 6th value byte of the PN
        let split = 28 + 8 + 6;
        let mut parser = StreamParser::new(Collect::default(), raw_options());
        parser.initialize(&PATIENT[..split]).unwrap();
        assert_eq!(parser.handler().elements.len(), 1);
        parser.process_chunk(&PATIENT[split..]).unwrap();
        parser.finalize().unwrap();

        let out = parser.into_handler();
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        assert_eq!(out.elements.len(), 2);
        let name = &out.elements[1];
        assert_eq!(name.tag(), Tag(0x0010, 0x0010));
        assert_eq!(name.to_person_name().unwrap().family(), Some("Test"));
        assert_eq!(name.to_person_name().unwrap().given(), Some("Patient"));
    }

    #[test]
    fn lifecycle_misuse() {
        let mut parser = StreamParser::new(Collect::default(), raw_options());
        let e = parser.process_chunk(&[]).unwrap_err();
        assert!(matches!(e, Error::NotInitialized { .. }));
        assert!(matches!(parser.finalize(), Err(Error::NotInitialized { .. })));
        parser.initialize(&[]).unwrap();
        let e = parser.initialize(&[]).unwrap_err();
        assert!(matches!(e, Error::AlreadyInitialized { .. }));
        assert_eq!(e.category(), Category::Lifecycle);
        parser.finalize().unwrap();
        assert!(parser.is_finalized());
        assert!(matches!(parser.process_chunk(&[0]), Err(Error::Finalized { .. })));
        assert!(matches!(parser.initialize(&[0]), Err(Error::Finalized { .. })));
        assert!(matches!(parser.finalize(), Err(Error::Finalized { .. })));
    }

    #[test]
    fn buffer_limit() {
        // implicit VR, a value of 4096 bytes which never completes
        let header = [0x09, 0x00, 0x10, 0x10, 0x00, 0x10, 0x00, 0x00];
        let mut parser =
            StreamParser::new(Collect::default(), raw_options().max_buffer_size(1024));
        parser.initialize(&header).unwrap();
        let chunk = [0u8; 256];
        let mut result = Ok(());
        for _ in 0..8 {
            result = parser.process_chunk(&chunk);
            if result.is_err() {
                break;
            }
        }
        let e = result.unwrap_err();
        assert!(matches!(e, Error::BufferLimit { max: 1024, .. }));
        assert_eq!(e.category(), Category::ResourceLimit);
    }

    #[test]
    fn iteration_limit_pauses_between_elements() {
        // three short implicit VR elements in one chunk
        #[rustfmt::skip]
        let raw: &[u8] = &[
            0x08, 0x00, 0x60, 0x00, 0x02, 0x00, 0x00, 0x00, b'M', b'R',
            0x10, 0x00, 0x20, 0x00, 0x02, 0x00, 0x00, 0x00, b'I', b'D',
            0x10, 0x00, 0x40, 0x00, 0x02, 0x00, 0x00, 0x00, b'F', b' ',
        ];
        let mut parser = StreamParser::new(
            Collect::default(),
            StreamOptions::new()
                .read_preamble(ReadPreamble::Never)
                .max_iterations(2),
        );
        parser.initialize(raw).unwrap();
        let first = parser.handler().elements.len();
        assert!(first < 3);
        parser.finalize().unwrap();
        assert_eq!(parser.handler().elements.len(), 3);
    }

    #[test]
    fn iteration_limit_without_progress() {
        let mut parser = StreamParser::new(
            Collect::default(),
            StreamOptions::new()
                .read_preamble(ReadPreamble::Never)
                .max_iterations(1),
        );
        // one step per call: preamble, meta group, first element
        parser
            .initialize(&[0x10, 0x00, 0x20, 0x00, 0x02, 0x00, 0x00, 0x00, b'I', b'D'])
            .unwrap();
        parser.process_chunk(&[]).unwrap();
        parser.process_chunk(&[]).unwrap();
        assert_eq!(parser.handler().elements.len(), 1);

        // a stray sequence delimiter: only an error from here
        let e = parser
            .process_chunk(&[0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00])
            .unwrap_err();
        assert!(matches!(e, Error::IterationLimit { max: 1, .. }));
    }

    #[test]
    fn zero_iterations_allow_one_step() {
        let mut parser = StreamParser::new(
            Collect::default(),
            StreamOptions::new()
                .read_preamble(ReadPreamble::Never)
                .max_iterations(0),
        );
        parser
            .initialize(&[0x10, 0x00, 0x20, 0x00, 0x02, 0x00, 0x00, 0x00, b'I', b'D'])
            .unwrap();
        parser.process_chunk(&[]).unwrap();
        parser.process_chunk(&[]).unwrap();
        assert_eq!(parser.handler().elements.len(), 1);
    }
}
