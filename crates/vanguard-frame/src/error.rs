use crate::format::MessageType;

/// Errors that can occur while building, writing or reading frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A declared length field disagrees with the content it describes.
    #[error("{field} declares {declared} bytes but {actual} were supplied")]
    LengthMismatch {
        field: &'static str,
        declared: usize,
        actual: usize,
    },

    /// The data segment does not fit in a single frame.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream reached EOF before another complete frame arrived.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;

/// Why the stream decoder dropped a frame.
///
/// These are recovered inside the decoder and only reported through
/// [`DecoderSink::malformed`](crate::decoder::DecoderSink::malformed).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedFrame {
    /// The type code is unassigned or has no payload layout.
    #[error("unsupported message type {code}")]
    UnsupportedType { code: u8 },

    /// A fixed-size type declared the wrong data length.
    #[error("{message_type} expects {expected} data bytes, header declares {actual}")]
    FixedLengthMismatch {
        message_type: MessageType,
        expected: u8,
        actual: u8,
    },

    /// A variable-size type cannot even hold its sub-header.
    #[error("{message_type} needs at least {min} data bytes, header declares {actual}")]
    SubHeaderTooShort {
        message_type: MessageType,
        min: u8,
        actual: u8,
    },

    /// Length fields inside the sub-header do not add up to the header's data length.
    #[error(
        "{message_type} sub-header declares name {name_len} + data {data_len} bytes, \
         inconsistent with data length {data_length}"
    )]
    InconsistentLengths {
        message_type: MessageType,
        name_len: u16,
        data_len: u16,
        data_length: u8,
    },

    /// The two bytes after the data segment were not the end marker.
    #[error("bad end marker 0x{found:04X}")]
    BadEndMarker { found: u16 },

    /// The program name is not valid UTF-8.
    #[error("program name is not valid UTF-8")]
    InvalidProgramName,

    /// Opt-in checksum verification failed.
    #[error("checksum mismatch (header 0x{header:08X}, computed 0x{computed:08X})")]
    ChecksumMismatch { header: u32, computed: u32 },
}
