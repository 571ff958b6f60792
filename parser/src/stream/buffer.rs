/// A growable byte buffer over a contiguous range of the input stream.
///
/// `base` is the stream offset of the first buffered byte
/// and `start` the index of the first byte not yet consumed.
#[derive(Debug, Default)]
pub(crate) struct BufferWindow {
    buf: Vec<u8>,
    start: usize,
    base: u64,
}

impl BufferWindow {
    pub fn append(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// The bytes received but not consumed.
    pub fn available(&self) -> &[u8] {
        &self.buf[self.start..]
    }

    /// The stream offset of the first unconsumed byte.
    pub fn position(&self) -> u64 {
        self.base + self.start as u64
    }

    /// The stream offset right after the last received byte.
    pub fn end(&self) -> u64 {
        self.base + self.buf.len() as u64
    }

    pub fn unconsumed(&self) -> usize {
        self.buf.len() - self.start
    }

    pub fn consume(&mut self, n: usize) {
        self.start = usize::min(self.start + n, self.buf.len());
    }

    /// Consume all bytes up to the given stream offset,
    /// or as many as were received.
    pub fn consume_to(&mut self, pos: u64) {
        let pos = u64::min(pos, self.end());
        if pos > self.position() {
            self.consume((pos - self.position()) as usize);
        }
    }

    /// Discard the consumed prefix if it reached `threshold` bytes.
    pub fn compact(&mut self, threshold: usize) -> bool {
        if self.start < threshold || self.start == 0 {
            return false;
        }
        self.buf.drain(..self.start);
        self.base += self.start as u64;
        self.start = 0;
        tracing::trace!("Compacted stream buffer, now starting at offset {}", self.base);
        true
    }
}
