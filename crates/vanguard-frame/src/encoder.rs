use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{BufMut, Bytes, BytesMut};

use crate::checksum;
use crate::error::{FrameError, Result};
use crate::format::{frame_size, BEGIN_MARKER, END_MARKER, HEADER_SIZE, MAX_DATA_LEN};
use crate::message::{
    Location, Payload, PhotoData, Ping, ProgramResult, ProgramUpload, StartPhotoData, Telemetry,
};
use crate::schema::{
    LOCATION_LEN, PHOTO_SUB_HEADER_LEN, PING_LEN, PROGRAM_RESULT_SUB_HEADER_LEN,
    PROGRAM_UPLOAD_SUB_HEADER_LEN, START_PHOTO_DATA_LEN, STOP_PHOTO_DATA_LEN, TELEMETRY_LEN,
};

/// Offset of the crc32 field from the start of a frame.
const CRC_OFFSET: usize = 8;

/// Check a payload's declared lengths against its content and return the data length.
///
/// Fails with [`FrameError::LengthMismatch`] when a program's declared name or
/// data length disagrees with the bytes supplied, and with
/// [`FrameError::PayloadTooLarge`] when the data segment would exceed 255 bytes.
pub fn data_length(payload: &Payload) -> Result<u8> {
    let size = match payload {
        Payload::Location(_) => return Ok(LOCATION_LEN),
        Payload::Telemetry(_) => return Ok(TELEMETRY_LEN),
        Payload::Ping(_) | Payload::Pong(_) => return Ok(PING_LEN),
        Payload::StartPhotoData(_) => return Ok(START_PHOTO_DATA_LEN),
        Payload::StopPhotoData => return Ok(STOP_PHOTO_DATA_LEN),
        Payload::PhotoData(photo) => PHOTO_SUB_HEADER_LEN as usize + photo.data.len(),
        Payload::ProgramUpload(upload) => {
            check_declared(
                "programNameLen",
                upload.program_name_len,
                upload.program_name.len(),
            )?;
            check_declared(
                "programDataLen",
                upload.program_data_len,
                upload.program_data.len(),
            )?;
            PROGRAM_UPLOAD_SUB_HEADER_LEN as usize
                + upload.program_name.len()
                + upload.program_data.len()
        }
        Payload::ProgramResult(result) => {
            check_declared(
                "programNameLen",
                result.program_name_len,
                result.program_name.len(),
            )?;
            check_declared(
                "programDataLen",
                result.program_data_len,
                result.program_data.len(),
            )?;
            PROGRAM_RESULT_SUB_HEADER_LEN as usize
                + result.program_name.len()
                + result.program_data.len()
        }
    };

    u8::try_from(size).map_err(|_| FrameError::PayloadTooLarge {
        size,
        max: MAX_DATA_LEN,
    })
}

fn check_declared(field: &'static str, declared: u16, actual: usize) -> Result<()> {
    if declared as usize != actual {
        return Err(FrameError::LengthMismatch {
            field,
            declared: declared as usize,
            actual,
        });
    }
    Ok(())
}

/// Encode a complete frame into `dst`.
///
/// Nothing is written when validation fails. The crc32 slot in the header is
/// filled once the data segment has been written.
pub fn encode_frame(timestamp: u32, payload: &Payload, dst: &mut BytesMut) -> Result<()> {
    let data_len = data_length(payload)?;

    let start = dst.len();
    dst.reserve(frame_size(data_len));
    dst.put_u16(BEGIN_MARKER);
    dst.put_u32(timestamp);
    dst.put_u8(payload.message_type().code());
    dst.put_u8(data_len);
    dst.put_u32(0);

    let data_start = dst.len();
    put_payload(payload, dst);
    debug_assert_eq!(dst.len() - data_start, data_len as usize);

    let crc = checksum::compute(&dst[data_start..]);
    dst[start + CRC_OFFSET..start + HEADER_SIZE].copy_from_slice(&crc.to_be_bytes());
    dst.put_u16(END_MARKER);
    Ok(())
}

/// Write the data segment of `payload`, without length validation.
pub(crate) fn put_payload(payload: &Payload, dst: &mut BytesMut) {
    match payload {
        Payload::Location(loc) => {
            dst.put_f64(loc.lat);
            dst.put_f64(loc.lon);
            dst.put_f32(loc.alt);
            dst.put_u8(loc.quality);
            dst.put_u8(loc.satellites);
            dst.put_f32(loc.speed);
        }
        Payload::Telemetry(t) => {
            dst.put_u32(t.uptime);
            dst.put_u8(t.mode);
            dst.put_u8(t.cpu);
            dst.put_u16(t.free_mem);
            dst.put_f32(t.int_temp);
            dst.put_f32(t.int_humidity);
            dst.put_f32(t.ext_temp);
        }
        Payload::Ping(ping) | Payload::Pong(ping) => dst.put_u32(ping.magic),
        Payload::StartPhotoData(start) => dst.put_u16(start.index),
        Payload::StopPhotoData => {}
        Payload::PhotoData(photo) => {
            dst.put_u16(photo.index);
            dst.put_u16(photo.chunk);
            dst.put_u16(photo.chunk_count);
            dst.put_u32(photo.file_size);
            dst.put_slice(&photo.data);
        }
        Payload::ProgramUpload(upload) => {
            dst.put_u16(upload.index);
            dst.put_u16(upload.chunk);
            dst.put_u16(upload.chunk_count);
            dst.put_u16(upload.program_name_len);
            dst.put_u16(upload.program_data_len);
            dst.put_slice(upload.program_name.as_bytes());
            dst.put_slice(&upload.program_data);
        }
        Payload::ProgramResult(result) => {
            dst.put_u16(result.index);
            dst.put_u16(result.chunk);
            dst.put_u16(result.chunk_count);
            dst.put_u16(result.program_name_len);
            dst.put_u16(result.program_data_len);
            dst.put_i8(result.exit_code);
            dst.put_slice(result.program_name.as_bytes());
            dst.put_slice(&result.program_data);
        }
    }
}

/// Current wall-clock time in whole seconds, saturating at the `u32` range.
pub fn unix_timestamp() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

/// Builds ready-to-transmit frames, one constructor per message type.
///
/// Each call produces an independent buffer. Frames are stamped with the
/// current time unless a fixed timestamp was set.
#[derive(Debug, Clone, Copy, Default)]
pub struct Encoder {
    timestamp: Option<u32>,
}

impl Encoder {
    /// Encoder stamping frames with the current time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoder stamping every frame with `timestamp`.
    pub fn with_timestamp(timestamp: u32) -> Self {
        Self {
            timestamp: Some(timestamp),
        }
    }

    /// The timestamp the next frame will carry.
    pub fn timestamp(&self) -> u32 {
        self.timestamp.unwrap_or_else(unix_timestamp)
    }

    /// Encode any payload into a fresh buffer.
    pub fn encode(&self, payload: &Payload) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        encode_frame(self.timestamp(), payload, &mut buf)?;
        Ok(buf.freeze())
    }

    pub fn location(&self, location: &Location) -> Result<Bytes> {
        self.encode(&Payload::Location(*location))
    }

    pub fn telemetry(&self, telemetry: &Telemetry) -> Result<Bytes> {
        self.encode(&Payload::Telemetry(*telemetry))
    }

    pub fn photo_data(&self, photo: &PhotoData) -> Result<Bytes> {
        self.encode(&Payload::PhotoData(photo.clone()))
    }

    pub fn ping(&self, magic: u32) -> Result<Bytes> {
        self.encode(&Payload::Ping(Ping { magic }))
    }

    pub fn pong(&self, magic: u32) -> Result<Bytes> {
        self.encode(&Payload::Pong(Ping { magic }))
    }

    pub fn start_photo_data(&self, index: u16) -> Result<Bytes> {
        self.encode(&Payload::StartPhotoData(StartPhotoData { index }))
    }

    pub fn stop_photo_data(&self) -> Result<Bytes> {
        self.encode(&Payload::StopPhotoData)
    }

    pub fn program_upload(&self, upload: &ProgramUpload) -> Result<Bytes> {
        self.encode(&Payload::ProgramUpload(upload.clone()))
    }

    pub fn program_result(&self, result: &ProgramResult) -> Result<Bytes> {
        self.encode(&Payload::ProgramResult(result.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{frame_size, MAX_FRAME_SIZE};

    #[test]
    fn ping_wire_layout() {
        let frame = Encoder::with_timestamp(0x5F00_0001)
            .ping(0x0102_0304)
            .unwrap();
        let crc = checksum::compute(&[1, 2, 3, 4]).to_be_bytes();

        assert_eq!(frame.len(), 18);
        assert_eq!(&frame[0..2], &[0xA3, 0x9A]);
        assert_eq!(&frame[2..6], &[0x5F, 0x00, 0x00, 0x01]);
        assert_eq!(frame[6], 0x0C);
        assert_eq!(frame[7], 0x04);
        assert_eq!(&frame[8..12], &crc);
        assert_eq!(&frame[12..16], &[1, 2, 3, 4]);
        assert_eq!(&frame[16..18], &[0x9B, 0x92]);
    }

    #[test]
    fn photo_control_frames() {
        let encoder = Encoder::with_timestamp(1);

        let start = encoder.start_photo_data(7).unwrap();
        assert_eq!(start.len(), frame_size(2));
        assert_eq!(&start[6..8], &[0x0A, 0x02]);
        assert_eq!(&start[8..12], &checksum::compute(&[0, 7]).to_be_bytes());
        assert_eq!(&start[12..14], &[0x00, 0x07]);

        let stop = encoder.stop_photo_data().unwrap();
        assert_eq!(stop.len(), frame_size(0));
        assert_eq!(&stop[6..8], &[0x0B, 0x00]);
        assert_eq!(&stop[8..12], &[0, 0, 0, 0]);
        assert_eq!(&stop[12..14], &[0x9B, 0x92]);
    }

    #[test]
    fn location_is_26_bytes_big_endian() {
        let loc = Location {
            lat: 1.5,
            lon: -2.0,
            alt: 3.0,
            quality: 4,
            satellites: 5,
            speed: 6.0,
        };
        let frame = Encoder::with_timestamp(1).location(&loc).unwrap();

        assert_eq!(frame.len(), frame_size(26));
        assert_eq!(frame[7], 26);
        assert_eq!(&frame[12..20], &1.5f64.to_be_bytes());
        assert_eq!(&frame[20..28], &(-2.0f64).to_be_bytes());
        assert_eq!(&frame[28..32], &3.0f32.to_be_bytes());
        assert_eq!(frame[32], 4);
        assert_eq!(frame[33], 5);
        assert_eq!(&frame[34..38], &6.0f32.to_be_bytes());
    }

    #[test]
    fn telemetry_is_20_bytes() {
        let frame = Encoder::with_timestamp(1)
            .telemetry(&Telemetry::default())
            .unwrap();
        assert_eq!(frame[6], 1);
        assert_eq!(frame[7], 20);
        assert_eq!(frame.len(), frame_size(20));
    }

    #[test]
    fn program_result_exit_code_is_eleventh_byte() {
        let result = ProgramResult::new(1, 2, 3, -5, "ab", &b"out"[..]);
        let frame = Encoder::with_timestamp(1).program_result(&result).unwrap();

        assert_eq!(frame[7], 11 + 2 + 3);
        let data = &frame[12..12 + 16];
        assert_eq!(&data[..10], &[0, 1, 0, 2, 0, 3, 0, 2, 0, 3]);
        assert_eq!(data[10] as i8, -5);
        assert_eq!(&data[11..], b"about");
    }

    #[test]
    fn mismatched_program_name_len_rejected() {
        let mut upload = ProgramUpload::new(0, 1, 1, "main.js", &b"x"[..]);
        upload.program_name_len = 3;

        let err = Encoder::new().program_upload(&upload).unwrap_err();
        assert!(matches!(
            err,
            FrameError::LengthMismatch {
                field: "programNameLen",
                declared: 3,
                actual: 7,
            }
        ));
    }

    #[test]
    fn mismatched_program_data_len_rejected() {
        let mut result = ProgramResult::new(0, 1, 1, 0, "p", &b"abc"[..]);
        result.program_data_len = 4;

        let err = Encoder::new().program_result(&result).unwrap_err();
        assert!(matches!(
            err,
            FrameError::LengthMismatch {
                field: "programDataLen",
                ..
            }
        ));
    }

    #[test]
    fn photo_fills_exactly_255() {
        let photo = PhotoData::new(0, 1, 1, 245, vec![0xAB; 245]);
        let frame = Encoder::with_timestamp(1).photo_data(&photo).unwrap();
        assert_eq!(frame[7], 255);
        assert_eq!(frame.len(), MAX_FRAME_SIZE);
    }

    #[test]
    fn oversized_photo_rejected() {
        let photo = PhotoData::new(0, 1, 1, 246, vec![0xAB; 246]);
        let err = Encoder::new().photo_data(&photo).unwrap_err();
        assert!(matches!(
            err,
            FrameError::PayloadTooLarge {
                size: 256,
                max: 255,
            }
        ));
    }

    #[test]
    fn oversized_program_rejected() {
        let upload = ProgramUpload::new(0, 1, 1, "n".repeat(100), vec![0; 146]);
        assert!(matches!(
            Encoder::new().program_upload(&upload),
            Err(FrameError::PayloadTooLarge { size: 256, .. })
        ));
    }

    #[test]
    fn failed_encode_leaves_buffer_untouched() {
        let mut dst = BytesMut::from(&b"prefix"[..]);
        let photo = Payload::PhotoData(PhotoData::new(0, 1, 1, 0, vec![0; 300]));

        assert!(encode_frame(1, &photo, &mut dst).is_err());
        assert_eq!(dst.as_ref(), b"prefix");
    }

    #[test]
    fn frames_append_back_to_back() {
        let mut dst = BytesMut::new();
        encode_frame(1, &Payload::Ping(Ping { magic: 1 }), &mut dst).unwrap();
        encode_frame(2, &Payload::Pong(Ping { magic: 2 }), &mut dst).unwrap();

        assert_eq!(dst.len(), 36);
        assert_eq!(dst[18 + 6], 13);
        assert_eq!(
            &dst[18 + 8..18 + 12],
            &checksum::compute(&[0, 0, 0, 2]).to_be_bytes()
        );
    }

    #[test]
    fn default_encoder_uses_wall_clock() {
        let before = unix_timestamp();
        let frame = Encoder::new().ping(0).unwrap();
        let stamped = u32::from_be_bytes([frame[2], frame[3], frame[4], frame[5]]);
        assert!(stamped >= before);
    }
}
