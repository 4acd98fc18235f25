//! Incremental, resynchronizing stream decoder.
//!
//! [`StreamDecoder::feed`] accepts whatever bytes the transport delivered and
//! advances the state machine as far as they allow:
//!
//! ```text
//! SEEKING ──A3 9A──▶ HEADER ──10 bytes──▶ DISPATCH ──▶ PAYLOAD ──▶ TRAILER ──9B 92──▶ emit
//!    ▲                                       │            │            │
//!    └──────────── malformed frame ──────────┴────────────┴────────────┘
//! ```
//!
//! Partially read fields are kept between calls. A malformed frame never
//! surfaces as an error: it is reported to [`DecoderSink::malformed`] and the
//! decoder resumes seeking at the next unread byte.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};

use crate::checksum;
use crate::error::MalformedFrame;
use crate::format::{
    MessageType, BEGIN_MARKER, END_MARKER, HEADER_FIELDS_SIZE, MAX_DATA_LEN, TRAILER_SIZE,
};
use crate::message::{Header, Message, Payload};
use crate::schema::{Schema, VariableLayout};

const BEGIN: [u8; 2] = BEGIN_MARKER.to_be_bytes();

/// Receives decoded messages and decoder diagnostics.
///
/// Only [`DecoderSink::message`] is required. The diagnostic methods log
/// through `tracing` unless overridden.
pub trait DecoderSink {
    /// A complete frame was recognized. Messages arrive in stream order.
    fn message(&mut self, message: Message);

    /// Bytes skipped while seeking a begin marker, flushed once a marker is found.
    fn noise(&mut self, bytes: &[u8]) {
        tracing::debug!(len = bytes.len(), "discarding out of sync bytes");
    }

    /// A frame was dropped.
    fn malformed(&mut self, error: &MalformedFrame) {
        tracing::warn!(%error, "dropping malformed frame");
    }
}

impl DecoderSink for Vec<Message> {
    fn message(&mut self, message: Message) {
        self.push(message);
    }
}

impl DecoderSink for VecDeque<Message> {
    fn message(&mut self, message: Message) {
        self.push_back(message);
    }
}

/// Everything a decoder can report, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeEvent {
    Message(Message),
    Noise(Bytes),
    Malformed(MalformedFrame),
}

impl DecoderSink for Vec<DecodeEvent> {
    fn message(&mut self, message: Message) {
        self.push(DecodeEvent::Message(message));
    }

    fn noise(&mut self, bytes: &[u8]) {
        self.push(DecodeEvent::Noise(Bytes::copy_from_slice(bytes)));
    }

    fn malformed(&mut self, error: &MalformedFrame) {
        self.push(DecodeEvent::Malformed(error.clone()));
    }
}

/// Decoder behaviour switches.
#[derive(Debug, Clone, Default)]
pub struct DecoderConfig {
    /// Check each frame's crc32 and drop frames that fail. Default: off.
    pub verify_checksum: bool,
    /// Flush the discard buffer once it holds this many bytes, even without
    /// a marker. Default: unbounded.
    pub max_noise_len: Option<usize>,
}

/// Running totals since the decoder was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    pub messages: u64,
    pub noise_bytes: u64,
    pub malformed: u64,
}

#[derive(Debug, Clone, Copy)]
struct PendingHeader {
    timestamp: u32,
    message_type: MessageType,
    data_length: u8,
    crc32: u32,
}

#[derive(Debug)]
enum State {
    /// `candidate` is set when the last byte seen was the first marker byte.
    Seeking { candidate: bool },
    Header {
        buf: [u8; HEADER_FIELDS_SIZE],
        filled: usize,
    },
    /// `unchecked` holds a variable layout whose sub-header has not been validated yet.
    Payload {
        header: PendingHeader,
        unchecked: Option<VariableLayout>,
    },
    Trailer {
        header: PendingHeader,
        buf: [u8; TRAILER_SIZE],
        filled: usize,
    },
}

impl Default for State {
    fn default() -> Self {
        Self::Seeking { candidate: false }
    }
}

/// Turns an unbounded byte stream into [`Message`]s.
///
/// One instance per stream; calls must be serialized by the caller.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    state: State,
    data: BytesMut,
    noise: Vec<u8>,
    stats: DecoderStats,
    config: DecoderConfig,
}

impl StreamDecoder {
    /// Create a decoder with default configuration.
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    /// Create a decoder with explicit configuration.
    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            state: State::default(),
            data: BytesMut::with_capacity(MAX_DATA_LEN),
            noise: Vec::new(),
            stats: DecoderStats::default(),
            config,
        }
    }

    /// Feed newly arrived bytes.
    ///
    /// Every complete frame is handed to `sink` before this returns; anything
    /// left over is kept for the next call.
    pub fn feed<S: DecoderSink + ?Sized>(&mut self, input: &[u8], sink: &mut S) {
        let mut offset = 0usize;
        while offset < input.len() {
            let rest = &input[offset..];
            let (next, used) = match std::mem::take(&mut self.state) {
                State::Seeking { candidate } => self.seek(candidate, rest, sink),
                State::Header { buf, filled } => self.read_header(buf, filled, rest, sink),
                State::Payload { header, unchecked } => {
                    self.read_payload(header, unchecked, rest, sink)
                }
                State::Trailer {
                    header,
                    buf,
                    filled,
                } => self.read_trailer(header, buf, filled, rest, sink),
            };
            self.state = next;
            offset += used;
        }
    }

    /// Discarded bytes not yet flushed to a sink.
    pub fn pending_noise(&self) -> &[u8] {
        &self.noise
    }

    /// Drain the discard buffer, e.g. at end of stream.
    ///
    /// Includes a trailing first marker byte that was still waiting for its partner.
    pub fn take_noise(&mut self) -> Bytes {
        if let State::Seeking { candidate: true } = self.state {
            self.noise.push(BEGIN[0]);
            self.state = State::default();
        }
        self.stats.noise_bytes += self.noise.len() as u64;
        Bytes::from(std::mem::take(&mut self.noise))
    }

    /// True while part of a frame has been consumed but not yet emitted.
    pub fn in_frame(&self) -> bool {
        !matches!(self.state, State::Seeking { .. })
    }

    /// Totals since creation.
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Current decoder configuration.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Drop any partial frame and pending noise and start seeking again.
    pub fn reset(&mut self) {
        self.state = State::default();
        self.data.clear();
        self.noise.clear();
    }

    fn seek<S: DecoderSink + ?Sized>(
        &mut self,
        mut candidate: bool,
        input: &[u8],
        sink: &mut S,
    ) -> (State, usize) {
        for (i, &byte) in input.iter().enumerate() {
            if candidate && byte == BEGIN[1] {
                self.flush_noise(sink);
                let next = State::Header {
                    buf: [0; HEADER_FIELDS_SIZE],
                    filled: 0,
                };
                return (next, i + 1);
            }
            if candidate {
                self.push_noise(BEGIN[0], sink);
            }
            candidate = byte == BEGIN[0];
            if !candidate {
                self.push_noise(byte, sink);
            }
        }
        (State::Seeking { candidate }, input.len())
    }

    fn push_noise<S: DecoderSink + ?Sized>(&mut self, byte: u8, sink: &mut S) {
        self.noise.push(byte);
        if let Some(max) = self.config.max_noise_len {
            if self.noise.len() >= max {
                self.flush_noise(sink);
            }
        }
    }

    fn flush_noise<S: DecoderSink + ?Sized>(&mut self, sink: &mut S) {
        if self.noise.is_empty() {
            return;
        }
        self.stats.noise_bytes += self.noise.len() as u64;
        sink.noise(&self.noise);
        self.noise.clear();
    }

    fn read_header<S: DecoderSink + ?Sized>(
        &mut self,
        mut buf: [u8; HEADER_FIELDS_SIZE],
        filled: usize,
        input: &[u8],
        sink: &mut S,
    ) -> (State, usize) {
        let take = (HEADER_FIELDS_SIZE - filled).min(input.len());
        buf[filled..filled + take].copy_from_slice(&input[..take]);
        let filled = filled + take;
        if filled < HEADER_FIELDS_SIZE {
            return (State::Header { buf, filled }, take);
        }
        (self.dispatch(&buf, sink), take)
    }

    fn dispatch<S: DecoderSink + ?Sized>(
        &mut self,
        buf: &[u8; HEADER_FIELDS_SIZE],
        sink: &mut S,
    ) -> State {
        let code = buf[4];
        let data_length = buf[5];
        let Some(message_type) = MessageType::from_code(code) else {
            return self.reject(MalformedFrame::UnsupportedType { code }, sink);
        };

        let schema = Schema::for_type(message_type);
        if let Err(err) = schema.check_data_length(message_type, data_length) {
            return self.reject(err, sink);
        }

        let header = PendingHeader {
            timestamp: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            message_type,
            data_length,
            crc32: u32::from_be_bytes([buf[6], buf[7], buf[8], buf[9]]),
        };
        tracing::trace!(
            message_type = %message_type,
            data_length,
            timestamp = header.timestamp,
            "frame header"
        );

        self.data.clear();
        if data_length == 0 {
            return State::Trailer {
                header,
                buf: [0; TRAILER_SIZE],
                filled: 0,
            };
        }
        let unchecked = match schema {
            Schema::Variable(layout) => Some(layout),
            Schema::Fixed(_) | Schema::Unsupported => None,
        };
        State::Payload { header, unchecked }
    }

    fn read_payload<S: DecoderSink + ?Sized>(
        &mut self,
        header: PendingHeader,
        unchecked: Option<VariableLayout>,
        input: &[u8],
        sink: &mut S,
    ) -> (State, usize) {
        // Stop at the end of an unchecked sub-header so it is validated
        // before any trailing bytes are read.
        let target = match unchecked {
            Some(layout) => layout.sub_header_len() as usize,
            None => header.data_length as usize,
        };
        let take = (target - self.data.len()).min(input.len());
        self.data.extend_from_slice(&input[..take]);
        if self.data.len() < target {
            return (State::Payload { header, unchecked }, take);
        }

        if let Some(layout) = unchecked {
            if let Err(err) = layout.check_sub_header(&self.data, header.data_length) {
                return (self.reject(err, sink), take);
            }
            if self.data.len() < header.data_length as usize {
                return (
                    State::Payload {
                        header,
                        unchecked: None,
                    },
                    take,
                );
            }
        }

        let next = State::Trailer {
            header,
            buf: [0; TRAILER_SIZE],
            filled: 0,
        };
        (next, take)
    }

    fn read_trailer<S: DecoderSink + ?Sized>(
        &mut self,
        header: PendingHeader,
        mut buf: [u8; TRAILER_SIZE],
        filled: usize,
        input: &[u8],
        sink: &mut S,
    ) -> (State, usize) {
        let take = (TRAILER_SIZE - filled).min(input.len());
        buf[filled..filled + take].copy_from_slice(&input[..take]);
        let filled = filled + take;
        if filled < TRAILER_SIZE {
            return (
                State::Trailer {
                    header,
                    buf,
                    filled,
                },
                take,
            );
        }

        let found = u16::from_be_bytes(buf);
        if found != END_MARKER {
            return (
                self.reject(MalformedFrame::BadEndMarker { found }, sink),
                take,
            );
        }
        (self.complete(header, sink), take)
    }

    fn complete<S: DecoderSink + ?Sized>(&mut self, header: PendingHeader, sink: &mut S) -> State {
        let data = self.data.split().freeze();
        if self.config.verify_checksum {
            if let Err(err) = checksum::verify(header.crc32, &data) {
                return self.reject(err, sink);
            }
        }

        let payload = match Payload::parse(header.message_type, data) {
            Ok(payload) => payload,
            Err(err) => return self.reject(err, sink),
        };

        self.stats.messages += 1;
        tracing::debug!(
            message_type = %header.message_type,
            data_length = header.data_length,
            "frame decoded"
        );
        sink.message(Message {
            header: Header {
                timestamp: header.timestamp,
                data_length: header.data_length,
                crc32: header.crc32,
            },
            payload,
        });
        self.data.reserve(MAX_DATA_LEN);
        State::default()
    }

    fn reject<S: DecoderSink + ?Sized>(&mut self, err: MalformedFrame, sink: &mut S) -> State {
        self.stats.malformed += 1;
        self.data.clear();
        sink.malformed(&err);
        State::default()
    }
}

/// Decode a complete buffer in one go, keeping only the messages.
pub fn decode_all(input: &[u8]) -> Vec<Message> {
    let mut messages = Vec::new();
    StreamDecoder::new().feed(input, &mut messages);
    messages
}
