//! Wire layout shared by the encoder and the stream decoder.
//!
//! ```text
//! ┌────────────┬───────────┬──────┬──────────┬──────────┬──────────────┬────────────┐
//! │ Begin (2B) │ Timestamp │ Type │ Data len │ CRC32    │ Data         │ End (2B)   │
//! │ 0xA39A     │ (4B BE)   │ (1B) │ (1B)     │ (4B BE)  │ (len bytes)  │ 0x9B92     │
//! └────────────┴───────────┴──────┴──────────┴──────────┴──────────────┴────────────┘
//! ```
//!
//! All multi-byte fields are big-endian. The checksum covers the data segment only.

/// Frame start marker (`'V' + 'M'`, `'S' + 'G'`).
pub const BEGIN_MARKER: u16 = 0xA39A;

/// Frame end marker (`'V' + 'E'`, `'N' + 'D'`).
pub const END_MARKER: u16 = 0x9B92;

/// Size of either marker on the wire.
pub const MARKER_SIZE: usize = 2;

/// Header fields following the begin marker: timestamp (4) + type (1) + length (1) + crc32 (4).
pub const HEADER_FIELDS_SIZE: usize = 10;

/// Begin marker plus header fields.
pub const HEADER_SIZE: usize = MARKER_SIZE + HEADER_FIELDS_SIZE;

/// End marker.
pub const TRAILER_SIZE: usize = MARKER_SIZE;

/// Largest data segment a single frame can carry.
pub const MAX_DATA_LEN: usize = u8::MAX as usize;

/// Largest possible frame on the wire.
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_DATA_LEN + TRAILER_SIZE;

/// Total wire size of a frame carrying `data_len` bytes of data.
pub const fn frame_size(data_len: u8) -> usize {
    HEADER_SIZE + data_len as usize + TRAILER_SIZE
}

/// Message type codes carried in the header's type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum MessageType {
    Location,
    Telemetry,
    PhotoData,
    ProgramUpload,
    ProgramResult,
    /// Camera control: begin a photo transfer.
    StartPhotoData,
    /// Camera control: end a photo transfer. Carries no data.
    StopPhotoData,
    Ping,
    Pong,
}

impl MessageType {
    /// Every known type, in code order.
    pub const ALL: [MessageType; 9] = [
        MessageType::Location,
        MessageType::Telemetry,
        MessageType::PhotoData,
        MessageType::ProgramUpload,
        MessageType::ProgramResult,
        MessageType::StartPhotoData,
        MessageType::StopPhotoData,
        MessageType::Ping,
        MessageType::Pong,
    ];

    /// Resolve a wire type code. Returns `None` for codes the protocol never assigned.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Location),
            1 => Some(Self::Telemetry),
            3 => Some(Self::PhotoData),
            4 => Some(Self::ProgramUpload),
            5 => Some(Self::ProgramResult),
            10 => Some(Self::StartPhotoData),
            11 => Some(Self::StopPhotoData),
            12 => Some(Self::Ping),
            13 => Some(Self::Pong),
            _ => None,
        }
    }

    /// The wire type code.
    pub const fn code(self) -> u8 {
        match self {
            Self::Location => 0,
            Self::Telemetry => 1,
            Self::PhotoData => 3,
            Self::ProgramUpload => 4,
            Self::ProgramResult => 5,
            Self::StartPhotoData => 10,
            Self::StopPhotoData => 11,
            Self::Ping => 12,
            Self::Pong => 13,
        }
    }

    /// Human-readable label handed to consumers in place of the numeric code.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::Telemetry => "telemetry",
            Self::PhotoData => "photo-data",
            Self::ProgramUpload => "program-upload",
            Self::ProgramResult => "program-result",
            Self::StartPhotoData => "start-photo-data",
            Self::StopPhotoData => "stop-photo-data",
            Self::Ping => "ping",
            Self::Pong => "pong",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_size_adds_header_and_trailer() {
        assert_eq!(frame_size(0), 14);
        assert_eq!(frame_size(4), 18);
        assert_eq!(frame_size(u8::MAX), 269);
        assert_eq!(frame_size(u8::MAX), MAX_FRAME_SIZE);
    }

    #[test]
    fn header_is_twelve_bytes() {
        assert_eq!(HEADER_SIZE, 12);
        assert_eq!(TRAILER_SIZE, 2);
    }

    #[test]
    fn codes_roundtrip() {
        for ty in MessageType::ALL {
            assert_eq!(MessageType::from_code(ty.code()), Some(ty));
        }
    }

    #[test]
    fn unassigned_codes_are_unknown() {
        for code in [2u8, 6, 7, 8, 9, 14, 100, 255] {
            assert_eq!(MessageType::from_code(code), None);
        }
    }

    #[test]
    fn labels() {
        assert_eq!(MessageType::Location.label(), "location");
        assert_eq!(MessageType::PhotoData.label(), "photo-data");
        assert_eq!(MessageType::ProgramResult.to_string(), "program-result");
        assert_eq!(MessageType::StartPhotoData.label(), "start-photo-data");
        assert_eq!(MessageType::StopPhotoData.code(), 11);
    }
}
