//! Decoded message model.
//!
//! A [`Message`] is what the stream decoder hands to its consumer: the header
//! fields that matter to an application plus a typed [`Payload`]. The same
//! payload types are what the encoder consumes.

use bytes::{Buf, Bytes};

use crate::error::MalformedFrame;
use crate::format::MessageType;
use crate::schema::{
    PHOTO_SUB_HEADER_LEN, PROGRAM_RESULT_SUB_HEADER_LEN, PROGRAM_UPLOAD_SUB_HEADER_LEN,
};

/// Telemetry `mode` before launch.
pub const MODE_PREFLIGHT: u8 = 0;
/// Telemetry `mode` while climbing.
pub const MODE_ASCENT: u8 = 1;
/// Telemetry `mode` while falling.
pub const MODE_DESCENT: u8 = 2;
/// Telemetry `mode` after touchdown.
pub const MODE_LANDED: u8 = 3;
/// Telemetry `cpu` when usage could not be sampled.
pub const CPU_UNKNOWN: u8 = 127;
/// Telemetry temperature/humidity sentinel when a sensor is unavailable.
pub const TEMP_UNKNOWN: f32 = -999.999;

/// Header fields exposed alongside every decoded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Header {
    /// Seconds since the Unix epoch, as written by the sender.
    pub timestamp: u32,
    /// Length of the data segment.
    pub data_length: u8,
    /// Checksum from the header. Not verified unless the consumer opts in.
    pub crc32: u32,
}

/// A complete message recognized on the stream.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Message {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub header: Header,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub payload: Payload,
}

impl Message {
    /// The message type of the payload.
    pub fn message_type(&self) -> MessageType {
        self.payload.message_type()
    }

    /// Human-readable type label (`"location"`, `"ping"`, ...).
    pub fn label(&self) -> &'static str {
        self.payload.message_type().label()
    }

    /// Recompute the checksum over the payload and compare it with the header's value.
    ///
    /// The decoder never does this on its own unless
    /// [`DecoderConfig::verify_checksum`](crate::decoder::DecoderConfig) is set.
    pub fn verify_checksum(&self) -> Result<(), MalformedFrame> {
        let mut data = bytes::BytesMut::new();
        crate::encoder::put_payload(&self.payload, &mut data);
        crate::checksum::verify(self.header.crc32, &data)
    }
}

/// Typed payload, tagged by message type.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "kebab-case"))]
pub enum Payload {
    Location(Location),
    Telemetry(Telemetry),
    PhotoData(PhotoData),
    Ping(Ping),
    Pong(Ping),
    ProgramUpload(ProgramUpload),
    ProgramResult(ProgramResult),
    StartPhotoData(StartPhotoData),
    StopPhotoData,
}

impl Payload {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Location(_) => MessageType::Location,
            Self::Telemetry(_) => MessageType::Telemetry,
            Self::PhotoData(_) => MessageType::PhotoData,
            Self::Ping(_) => MessageType::Ping,
            Self::Pong(_) => MessageType::Pong,
            Self::ProgramUpload(_) => MessageType::ProgramUpload,
            Self::ProgramResult(_) => MessageType::ProgramResult,
            Self::StartPhotoData(_) => MessageType::StartPhotoData,
            Self::StopPhotoData => MessageType::StopPhotoData,
        }
    }

    /// Parse a data segment whose length the decoder has already validated
    /// against the type's schema.
    pub(crate) fn parse(message_type: MessageType, data: Bytes) -> Result<Self, MalformedFrame> {
        let mut buf = &data[..];
        let payload = match message_type {
            MessageType::Location => Self::Location(Location {
                lat: buf.get_f64(),
                lon: buf.get_f64(),
                alt: buf.get_f32(),
                quality: buf.get_u8(),
                satellites: buf.get_u8(),
                speed: buf.get_f32(),
            }),
            MessageType::Telemetry => Self::Telemetry(Telemetry {
                uptime: buf.get_u32(),
                mode: buf.get_u8(),
                cpu: buf.get_u8(),
                free_mem: buf.get_u16(),
                int_temp: buf.get_f32(),
                int_humidity: buf.get_f32(),
                ext_temp: buf.get_f32(),
            }),
            MessageType::Ping => Self::Ping(Ping {
                magic: buf.get_u32(),
            }),
            MessageType::Pong => Self::Pong(Ping {
                magic: buf.get_u32(),
            }),
            MessageType::PhotoData => Self::PhotoData(PhotoData {
                index: buf.get_u16(),
                chunk: buf.get_u16(),
                chunk_count: buf.get_u16(),
                file_size: buf.get_u32(),
                data: data.slice(PHOTO_SUB_HEADER_LEN as usize..),
            }),
            MessageType::ProgramUpload => {
                let (index, chunk, chunk_count) = (buf.get_u16(), buf.get_u16(), buf.get_u16());
                let (name_len, data_len) = (buf.get_u16(), buf.get_u16());
                let (program_name, program_data) =
                    split_program(&data, PROGRAM_UPLOAD_SUB_HEADER_LEN, name_len)?;
                Self::ProgramUpload(ProgramUpload {
                    index,
                    chunk,
                    chunk_count,
                    program_name_len: name_len,
                    program_data_len: data_len,
                    program_name,
                    program_data,
                })
            }
            MessageType::ProgramResult => {
                let (index, chunk, chunk_count) = (buf.get_u16(), buf.get_u16(), buf.get_u16());
                let (name_len, data_len) = (buf.get_u16(), buf.get_u16());
                let exit_code = buf.get_i8();
                let (program_name, program_data) =
                    split_program(&data, PROGRAM_RESULT_SUB_HEADER_LEN, name_len)?;
                Self::ProgramResult(ProgramResult {
                    index,
                    chunk,
                    chunk_count,
                    exit_code,
                    program_name_len: name_len,
                    program_data_len: data_len,
                    program_name,
                    program_data,
                })
            }
            MessageType::StartPhotoData => Self::StartPhotoData(StartPhotoData {
                index: buf.get_u16(),
            }),
            MessageType::StopPhotoData => Self::StopPhotoData,
        };
        Ok(payload)
    }
}

fn split_program(
    data: &Bytes,
    sub_header_len: u8,
    name_len: u16,
) -> Result<(String, Bytes), MalformedFrame> {
    let name_start = sub_header_len as usize;
    let name_end = name_start + name_len as usize;
    let name = String::from_utf8(data[name_start..name_end].to_vec())
        .map_err(|_| MalformedFrame::InvalidProgramName)?;
    Ok((name, data.slice(name_end..)))
}

/// GPS fix.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    pub alt: f32,
    pub quality: u8,
    pub satellites: u8,
    pub speed: f32,
}

/// Device health sample.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Telemetry {
    /// Seconds since boot.
    pub uptime: u32,
    /// One of the `MODE_*` constants.
    pub mode: u8,
    /// CPU usage percentage, or [`CPU_UNKNOWN`].
    pub cpu: u8,
    /// Free memory in KiB.
    pub free_mem: u16,
    pub int_temp: f32,
    pub int_humidity: f32,
    pub ext_temp: f32,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            uptime: 0,
            mode: MODE_PREFLIGHT,
            cpu: CPU_UNKNOWN,
            free_mem: 0,
            int_temp: TEMP_UNKNOWN,
            int_humidity: TEMP_UNKNOWN,
            ext_temp: TEMP_UNKNOWN,
        }
    }
}

/// One chunk of a photo transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct PhotoData {
    /// Photo number.
    pub index: u16,
    /// 1-based chunk number.
    pub chunk: u16,
    pub chunk_count: u16,
    /// Size of the whole photo, not of this chunk.
    pub file_size: u32,
    pub data: Bytes,
}

impl PhotoData {
    pub fn new(
        index: u16,
        chunk: u16,
        chunk_count: u16,
        file_size: u32,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            index,
            chunk,
            chunk_count,
            file_size,
            data: data.into(),
        }
    }
}

/// Keep-alive probe. Shared by ping and pong.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Ping {
    pub magic: u32,
}

/// Asks the camera to start capturing photo `index`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StartPhotoData {
    pub index: u16,
}

/// One chunk of a program sent to the device.
///
/// The declared lengths travel on the wire; [`ProgramUpload::new`] keeps them
/// in step with the content, and the encoder rejects values where they disagree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ProgramUpload {
    pub index: u16,
    pub chunk: u16,
    pub chunk_count: u16,
    pub program_name_len: u16,
    pub program_data_len: u16,
    pub program_name: String,
    pub program_data: Bytes,
}

impl ProgramUpload {
    pub fn new(
        index: u16,
        chunk: u16,
        chunk_count: u16,
        program_name: impl Into<String>,
        program_data: impl Into<Bytes>,
    ) -> Self {
        let program_name = program_name.into();
        let program_data = program_data.into();
        Self {
            index,
            chunk,
            chunk_count,
            program_name_len: declared_len(program_name.len()),
            program_data_len: declared_len(program_data.len()),
            program_name,
            program_data,
        }
    }
}

/// One chunk of a program's output, with its exit code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ProgramResult {
    pub index: u16,
    pub chunk: u16,
    pub chunk_count: u16,
    pub exit_code: i8,
    pub program_name_len: u16,
    pub program_data_len: u16,
    pub program_name: String,
    pub program_data: Bytes,
}

impl ProgramResult {
    pub fn new(
        index: u16,
        chunk: u16,
        chunk_count: u16,
        exit_code: i8,
        program_name: impl Into<String>,
        program_data: impl Into<Bytes>,
    ) -> Self {
        let program_name = program_name.into();
        let program_data = program_data.into();
        Self {
            index,
            chunk,
            chunk_count,
            exit_code,
            program_name_len: declared_len(program_name.len()),
            program_data_len: declared_len(program_data.len()),
            program_name,
            program_data,
        }
    }
}

// Saturates so oversized content still fails the encoder's length check.
fn declared_len(len: usize) -> u16 {
    u16::try_from(len).unwrap_or(u16::MAX)
}
