use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use crate::decoder::{DecoderConfig, DecoderStats, StreamDecoder};
use crate::error::{FrameError, Result};
use crate::format::MAX_FRAME_SIZE;
use crate::message::Message;

const DEFAULT_READ_CHUNK_SIZE: usize = 1024;

/// Discard buffer cap used by [`ReaderConfig::default`].
pub const DEFAULT_MAX_NOISE_LEN: usize = 4 * MAX_FRAME_SIZE;

/// Configuration for [`FrameReader`].
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Passed through to the underlying [`StreamDecoder`]. The default caps
    /// the discard buffer at [`DEFAULT_MAX_NOISE_LEN`].
    pub decoder: DecoderConfig,
    /// Maximum number of bytes requested per `read` call. Default: 1 KiB.
    pub read_chunk_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            decoder: DecoderConfig {
                max_noise_len: Some(DEFAULT_MAX_NOISE_LEN),
                ..DecoderConfig::default()
            },
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }
}

/// Reads decoded messages from any `Read` byte source (serial port, socket, file).
///
/// Noise and malformed frames are logged and skipped; callers only see
/// complete messages.
pub struct FrameReader<T> {
    inner: T,
    decoder: StreamDecoder,
    queue: VecDeque<Message>,
    scratch: Vec<u8>,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, ReaderConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: ReaderConfig) -> Self {
        Self {
            inner,
            decoder: StreamDecoder::with_config(config.decoder),
            queue: VecDeque::new(),
            scratch: vec![0u8; config.read_chunk_size.max(1)],
        }
    }

    /// Read the next complete message (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_message(&mut self) -> Result<Message> {
        loop {
            if let Some(message) = self.queue.pop_front() {
                return Ok(message);
            }

            let read = match self.inner.read(&mut self.scratch) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                let noise = self.decoder.take_noise();
                if !noise.is_empty() {
                    tracing::debug!(len = noise.len(), "discarding trailing bytes at EOF");
                }
                if self.decoder.in_frame() {
                    tracing::debug!("stream closed mid-frame");
                    self.decoder.reset();
                }
                return Err(FrameError::ConnectionClosed);
            }

            self.decoder.feed(&self.scratch[..read], &mut self.queue);
        }
    }

    /// Decoder totals so far.
    pub fn stats(&self) -> DecoderStats {
        self.decoder.stats()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read> Iterator for FrameReader<T> {
    type Item = Result<Message>;

    /// Yields messages until EOF; I/O errors are yielded once each.
    fn next(&mut self) -> Option<Self::Item> {
        match self.read_message() {
            Ok(message) => Some(Ok(message)),
            Err(FrameError::ConnectionClosed) => None,
            Err(err) => Some(Err(err)),
        }
    }
}
