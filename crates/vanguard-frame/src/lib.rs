//! Framed binary telemetry protocol for an unreliable byte link.
//!
//! Every frame on the wire is laid out as:
//! - a 2-byte begin marker (`A3 9A`)
//! - a 4-byte big-endian timestamp, a 1-byte type code and a 1-byte data length
//! - a 4-byte big-endian CRC-32 of the data
//! - up to 255 data bytes
//! - a 2-byte end marker (`9B 92`)
//!
//! [`StreamDecoder`] turns arbitrary byte deliveries into [`Message`]s and
//! resynchronizes after noise or malformed frames. [`Encoder`] builds frames.

pub mod checksum;
pub mod chunk;
#[cfg(feature = "async")]
pub mod codec;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod format;
pub mod message;
pub mod reader;
pub mod schema;
pub mod writer;

pub use chunk::{photo_chunks, program_result_chunks, program_upload_chunks};
#[cfg(feature = "async")]
pub use codec::VanguardCodec;
pub use decoder::{
    decode_all, DecodeEvent, DecoderConfig, DecoderSink, DecoderStats, StreamDecoder,
};
pub use encoder::{encode_frame, Encoder};
pub use error::{FrameError, MalformedFrame, Result};
pub use format::{MessageType, BEGIN_MARKER, END_MARKER, MAX_DATA_LEN, MAX_FRAME_SIZE};
pub use message::{
    Header, Location, Message, Payload, PhotoData, Ping, ProgramResult, ProgramUpload,
    StartPhotoData, Telemetry,
};
pub use reader::{FrameReader, ReaderConfig, DEFAULT_MAX_NOISE_LEN};
pub use writer::FrameWriter;
