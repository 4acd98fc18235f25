//! `tokio-util` codec for use with `FramedRead` / `FramedWrite`.

use std::collections::VecDeque;

use bytes::BytesMut;
use tokio_util::codec;

use crate::decoder::{DecoderConfig, DecoderStats, StreamDecoder};
use crate::encoder::{encode_frame, Encoder};
use crate::error::FrameError;
use crate::message::{Message, Payload};

/// Decodes [`Message`]s from and encodes [`Payload`]s to an async byte stream.
///
/// Every byte handed to [`codec::Decoder::decode`] is consumed; partial frames
/// live inside the wrapped [`StreamDecoder`].
#[derive(Debug, Default)]
pub struct VanguardCodec {
    decoder: StreamDecoder,
    queue: VecDeque<Message>,
    encoder: Encoder,
}

impl VanguardCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DecoderConfig, encoder: Encoder) -> Self {
        Self {
            decoder: StreamDecoder::with_config(config),
            queue: VecDeque::new(),
            encoder,
        }
    }

    pub fn stats(&self) -> DecoderStats {
        self.decoder.stats()
    }
}

impl codec::Decoder for VanguardCodec {
    type Item = Message;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, FrameError> {
        if !src.is_empty() {
            let chunk = src.split();
            self.decoder.feed(&chunk, &mut self.queue);
        }
        Ok(self.queue.pop_front())
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Message>, FrameError> {
        if let Some(message) = self.decode(src)? {
            return Ok(Some(message));
        }
        let noise = self.decoder.take_noise();
        if !noise.is_empty() {
            tracing::debug!(len = noise.len(), "discarding trailing bytes at EOF");
        }
        if self.decoder.in_frame() {
            tracing::debug!("stream closed mid-frame");
            self.decoder.reset();
        }
        Ok(None)
    }
}

impl codec::Encoder<Payload> for VanguardCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Payload, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame(self.encoder.timestamp(), &item, dst)
    }
}
