use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::encoder::{encode_frame, Encoder};
use crate::error::{FrameError, Result};
use crate::format::MAX_FRAME_SIZE;
use crate::message::Payload;

/// Writes complete frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    encoder: Encoder,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer stamping frames with the current time.
    pub fn new(inner: T) -> Self {
        Self::with_encoder(inner, Encoder::new())
    }

    /// Create a new frame writer with an explicit encoder.
    pub fn with_encoder(inner: T, encoder: Encoder) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(MAX_FRAME_SIZE),
            encoder,
        }
    }

    /// Encode and send a payload.
    ///
    /// Nothing is written when the payload fails validation.
    pub fn send(&mut self, payload: &Payload) -> Result<()> {
        self.buf.clear();
        encode_frame(self.encoder.timestamp(), payload, &mut self.buf)?;

        let frame = self.buf.split();
        let result = self.write_frame(&frame);
        self.buf.unsplit(frame);
        result
    }

    /// Write an already encoded frame (blocking) and flush.
    pub fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < frame.len() {
            match self.inner.write(&frame[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// The encoder used by [`FrameWriter::send`].
    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }
}
