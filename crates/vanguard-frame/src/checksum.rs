//! CRC-32 (IEEE 802.3) over the data segment.
//!
//! The encoder always fills the header checksum. The decoder leaves checking
//! it to the consumer: either [`verify`] / [`Message::verify_checksum`] after the
//! fact, or [`DecoderConfig::verify_checksum`] to drop failing frames up front.
//!
//! [`Message::verify_checksum`]: crate::message::Message::verify_checksum
//! [`DecoderConfig::verify_checksum`]: crate::decoder::DecoderConfig

use crc32fast::Hasher;

use crate::error::MalformedFrame;

/// Checksum of a data segment.
pub fn compute(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Compare a header checksum with the checksum of `data`.
pub fn verify(header: u32, data: &[u8]) -> Result<(), MalformedFrame> {
    let computed = compute(data);
    if computed != header {
        return Err(MalformedFrame::ChecksumMismatch { header, computed });
    }
    Ok(())
}
