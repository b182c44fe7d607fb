//! CRC32 trailer handling.
//!
//! Every image ends in a 4-byte little-endian CRC32 (zlib polynomial)
//! computed over all bytes before the trailer. The trailer bytes are never
//! part of their own checksum, so sealing is idempotent: re-sealing an
//! already sealed image writes the same four bytes.

use crate::image::CRC_TRAILER_LEN;
use crate::{FirmwareError, Result};
use tracing::debug;

/// CRC32 over the payload, excluding the trailer itself.
pub fn payload_crc32(data: &[u8]) -> u32 {
    let payload = &data[..data.len() - CRC_TRAILER_LEN];
    crc32fast::hash(payload)
}

/// Compute and write the trailer in place.
pub fn seal(data: &mut [u8]) {
    let crc = payload_crc32(data);
    let len = data.len();
    data[len - CRC_TRAILER_LEN..].copy_from_slice(&crc.to_le_bytes());
    debug!(crc = format_args!("{crc:#010x}"), len, "image sealed");
}

/// Read back the stored trailer.
pub fn stored_crc32(data: &[u8]) -> u32 {
    let len = data.len();
    u32::from_le_bytes([data[len - 4], data[len - 3], data[len - 2], data[len - 1]])
}

/// Check the trailer against a fresh computation.
pub fn verify(data: &[u8]) -> Result<()> {
    let stored = stored_crc32(data);
    let computed = payload_crc32(data);
    if stored != computed {
        return Err(FirmwareError::CrcMismatch { stored, computed });
    }
    Ok(())
}

/// Repair the trailer of an existing image without touching the payload.
///
/// The input must still be one of the two image classes by size; anything
/// else is rejected rather than stamped with a CRC it should not carry.
pub fn fix_crc(data: &[u8]) -> Result<Vec<u8>> {
    crate::image::ImageKind::from_len(data.len())?;
    let mut fixed = data.to_vec();
    seal(&mut fixed);
    Ok(fixed)
}
