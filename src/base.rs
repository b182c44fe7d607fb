//! Default base images.
//!
//! A build normally starts from the vendor-supplied binaries shipped with
//! the BSP, but a scenario can also be assembled from scratch. These
//! synthesized bases carry exactly the fields the validator requires of
//! any image (marker, device ID, and for the switch class the
//! configuration flags word); everything else is zero until the assembler
//! writes it.

use crate::image::{
    CONFIG_FLAGS, CONFIG_FLAGS_OFFSET, DEVICE_ID, DEVICE_ID_OFFSET, IMAGE_VALID_MARKER,
    SWITCH_IMAGE_LEN, UC_IMAGE_LEN,
};

/// Factory for the two default base images.
#[derive(Debug)]
pub struct BaseImages;

impl BaseImages {
    /// Zero-filled UC base with marker and device ID in place. The CRC
    /// trailer is left zeroed; it is sealed at the end of a build.
    pub fn uc_base() -> Vec<u8> {
        let mut data = vec![0u8; UC_IMAGE_LEN];
        data[..IMAGE_VALID_MARKER.len()].copy_from_slice(&IMAGE_VALID_MARKER);
        data[DEVICE_ID_OFFSET..DEVICE_ID_OFFSET + 4].copy_from_slice(&DEVICE_ID.to_le_bytes());
        data
    }

    /// Zero-filled switch base with marker, device ID, and configuration
    /// flags in place.
    pub fn switch_base() -> Vec<u8> {
        let mut data = vec![0u8; SWITCH_IMAGE_LEN];
        data[..IMAGE_VALID_MARKER.len()].copy_from_slice(&IMAGE_VALID_MARKER);
        data[DEVICE_ID_OFFSET..DEVICE_ID_OFFSET + 4].copy_from_slice(&DEVICE_ID.to_le_bytes());
        data[CONFIG_FLAGS_OFFSET..CONFIG_FLAGS_OFFSET + 4]
            .copy_from_slice(&CONFIG_FLAGS.to_le_bytes());
        data
    }
}
