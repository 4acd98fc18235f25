//! Per-type payload layouts.
//!
//! Fixed types must declare exactly their schema length. Variable types start
//! with a fixed sub-header whose length fields govern the rest of the data.

use crate::error::MalformedFrame;
use crate::format::MessageType;

/// `lat f64, lon f64, alt f32, quality u8, satellites u8, speed f32`.
pub const LOCATION_LEN: u8 = 26;

/// `uptime u32, mode u8, cpu u8, free_mem u16, int_temp f32, int_humidity f32, ext_temp f32`.
pub const TELEMETRY_LEN: u8 = 20;

/// `magic u32`.
pub const PING_LEN: u8 = 4;

/// `index u16`.
pub const START_PHOTO_DATA_LEN: u8 = 2;

/// Stop-photo frames carry no data.
pub const STOP_PHOTO_DATA_LEN: u8 = 0;

/// `index u16, chunk u16, chunk_count u16, file_size u32`.
pub const PHOTO_SUB_HEADER_LEN: u8 = 10;

/// `index u16, chunk u16, chunk_count u16, name_len u16, data_len u16`.
pub const PROGRAM_UPLOAD_SUB_HEADER_LEN: u8 = 10;

/// Program upload sub-header followed by `exit_code i8`.
pub const PROGRAM_RESULT_SUB_HEADER_LEN: u8 = 11;

/// Offset of `name_len` inside both program sub-headers.
const PROGRAM_NAME_LEN_OFFSET: usize = 6;

/// Offset of `data_len` inside both program sub-headers.
const PROGRAM_DATA_LEN_OFFSET: usize = 8;

/// How a message type lays out its data segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// The data segment is always exactly this long.
    Fixed(u8),
    /// A sub-header followed by length-governed trailing bytes.
    Variable(VariableLayout),
    /// No layout is known; the frame cannot be decoded.
    Unsupported,
}

/// Variable-length layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableLayout {
    /// Sub-header then `data_length - 10` bytes of photo data.
    PhotoData,
    /// Sub-header then `name_len` bytes of name and `data_len` bytes of program.
    ProgramUpload,
    /// As [`VariableLayout::ProgramUpload`] with a trailing exit code in the sub-header.
    ProgramResult,
}

impl Schema {
    /// Resolve a raw type code.
    pub fn resolve(code: u8) -> Self {
        match MessageType::from_code(code) {
            Some(message_type) => Self::for_type(message_type),
            None => Self::Unsupported,
        }
    }

    /// Layout for a known message type.
    pub fn for_type(message_type: MessageType) -> Self {
        match message_type {
            MessageType::Location => Self::Fixed(LOCATION_LEN),
            MessageType::Telemetry => Self::Fixed(TELEMETRY_LEN),
            MessageType::Ping | MessageType::Pong => Self::Fixed(PING_LEN),
            MessageType::PhotoData => Self::Variable(VariableLayout::PhotoData),
            MessageType::ProgramUpload => Self::Variable(VariableLayout::ProgramUpload),
            MessageType::ProgramResult => Self::Variable(VariableLayout::ProgramResult),
            MessageType::StartPhotoData => Self::Fixed(START_PHOTO_DATA_LEN),
            MessageType::StopPhotoData => Self::Fixed(STOP_PHOTO_DATA_LEN),
        }
    }

    /// Check a header's declared data length against this layout.
    ///
    /// Variable layouts only check that the sub-header fits; the length fields
    /// inside it are checked by [`VariableLayout::check_sub_header`] once read.
    pub fn check_data_length(
        self,
        message_type: MessageType,
        data_length: u8,
    ) -> Result<(), MalformedFrame> {
        match self {
            Self::Fixed(expected) if expected == data_length => Ok(()),
            Self::Fixed(expected) => Err(MalformedFrame::FixedLengthMismatch {
                message_type,
                expected,
                actual: data_length,
            }),
            Self::Variable(layout) => {
                let min = layout.sub_header_len();
                if data_length < min {
                    return Err(MalformedFrame::SubHeaderTooShort {
                        message_type,
                        min,
                        actual: data_length,
                    });
                }
                Ok(())
            }
            Self::Unsupported => Err(MalformedFrame::UnsupportedType {
                code: message_type.code(),
            }),
        }
    }
}

impl VariableLayout {
    /// Size of the fixed sub-header.
    pub const fn sub_header_len(self) -> u8 {
        match self {
            Self::PhotoData => PHOTO_SUB_HEADER_LEN,
            Self::ProgramUpload => PROGRAM_UPLOAD_SUB_HEADER_LEN,
            Self::ProgramResult => PROGRAM_RESULT_SUB_HEADER_LEN,
        }
    }

    /// The message type this layout belongs to.
    pub const fn message_type(self) -> MessageType {
        match self {
            Self::PhotoData => MessageType::PhotoData,
            Self::ProgramUpload => MessageType::ProgramUpload,
            Self::ProgramResult => MessageType::ProgramResult,
        }
    }

    /// Validate the length fields of a complete sub-header against the header's data length.
    ///
    /// `sub_header` must be exactly [`VariableLayout::sub_header_len`] bytes.
    pub fn check_sub_header(
        self,
        sub_header: &[u8],
        data_length: u8,
    ) -> Result<(), MalformedFrame> {
        match self {
            Self::PhotoData => Ok(()),
            Self::ProgramUpload | Self::ProgramResult => {
                let name_len = read_u16(sub_header, PROGRAM_NAME_LEN_OFFSET);
                let data_len = read_u16(sub_header, PROGRAM_DATA_LEN_OFFSET);
                let total =
                    u32::from(self.sub_header_len()) + u32::from(name_len) + u32::from(data_len);
                if total != u32::from(data_length) {
                    return Err(MalformedFrame::InconsistentLengths {
                        message_type: self.message_type(),
                        name_len,
                        data_len,
                        data_length,
                    });
                }
                Ok(())
            }
        }
    }
}

fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buf[offset], buf[offset + 1]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_lengths() {
        assert_eq!(Schema::resolve(0), Schema::Fixed(26));
        assert_eq!(Schema::resolve(1), Schema::Fixed(20));
        assert_eq!(Schema::resolve(12), Schema::Fixed(4));
        assert_eq!(Schema::resolve(13), Schema::Fixed(4));
        assert_eq!(Schema::resolve(10), Schema::Fixed(2));
        assert_eq!(Schema::resolve(11), Schema::Fixed(0));
    }

    #[test]
    fn variable_layouts() {
        assert_eq!(Schema::resolve(3), Schema::Variable(VariableLayout::PhotoData));
        assert_eq!(Schema::resolve(4), Schema::Variable(VariableLayout::ProgramUpload));
        assert_eq!(Schema::resolve(5), Schema::Variable(VariableLayout::ProgramResult));
        assert_eq!(VariableLayout::ProgramResult.sub_header_len(), 11);
    }

    #[test]
    fn unassigned_codes_are_unsupported() {
        assert_eq!(Schema::resolve(2), Schema::Unsupported);
        assert_eq!(Schema::resolve(200), Schema::Unsupported);
    }

    #[test]
    fn stop_photo_data_must_be_empty() {
        let schema = Schema::for_type(MessageType::StopPhotoData);
        assert!(schema.check_data_length(MessageType::StopPhotoData, 0).is_ok());
        assert_eq!(
            schema.check_data_length(MessageType::StopPhotoData, 2),
            Err(MalformedFrame::FixedLengthMismatch {
                message_type: MessageType::StopPhotoData,
                expected: 0,
                actual: 2,
            })
        );
    }

    #[test]
    fn fixed_length_must_match_exactly() {
        let schema = Schema::for_type(MessageType::Telemetry);
        assert!(schema.check_data_length(MessageType::Telemetry, 20).is_ok());
        assert_eq!(
            schema.check_data_length(MessageType::Telemetry, 19),
            Err(MalformedFrame::FixedLengthMismatch {
                message_type: MessageType::Telemetry,
                expected: 20,
                actual: 19,
            })
        );
    }

    #[test]
    fn variable_length_needs_room_for_sub_header() {
        let schema = Schema::for_type(MessageType::ProgramResult);
        assert!(schema.check_data_length(MessageType::ProgramResult, 11).is_ok());
        assert!(schema.check_data_length(MessageType::ProgramResult, 255).is_ok());
        assert!(matches!(
            schema.check_data_length(MessageType::ProgramResult, 10),
            Err(MalformedFrame::SubHeaderTooShort { min: 11, .. })
        ));
    }

    #[test]
    fn program_lengths_must_sum_to_data_length() {
        // index, chunk, chunk_count, name_len = 3, data_len = 5
        let sub_header = [0, 1, 0, 1, 0, 1, 0, 3, 0, 5];
        let layout = VariableLayout::ProgramUpload;
        assert!(layout.check_sub_header(&sub_header, 18).is_ok());
        assert!(matches!(
            layout.check_sub_header(&sub_header, 19),
            Err(MalformedFrame::InconsistentLengths {
                name_len: 3,
                data_len: 5,
                data_length: 19,
                ..
            })
        ));
    }

    #[test]
    fn program_lengths_do_not_overflow() {
        let sub_header = [0, 0, 0, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF, 0];
        let layout = VariableLayout::ProgramResult;
        assert!(layout.check_sub_header(&sub_header, 255).is_err());
    }

    #[test]
    fn photo_sub_header_has_no_length_fields() {
        let sub_header = [0u8; 10];
        assert!(VariableLayout::PhotoData.check_sub_header(&sub_header, 10).is_ok());
    }
}
