//! Firmware image buffers and the fixed offset map.
//!
//! Both image classes share the same layout discipline: a repeating valid
//! marker, the device ID, and little-endian fields at documented offsets.
//! The switch image additionally carries three fixed-stride FRER table
//! windows. An image is built by deep-copying a vendor base and mutating
//! it region by region; after the CRC trailer is written it is treated as
//! write-once.
//!
//! ## Switch image map
//!
//! | Offset   | Field                      | Size |
//! |----------|----------------------------|------|
//! | 0x000000 | Image valid marker         | 8    |
//! | 0x000008 | Device ID (LE)             | 4    |
//! | 0x00000C | Configuration flags        | 4    |
//! | 0x034000 | FRMREPEN                   | 4    |
//! | 0x034004 | Host port                  | 1    |
//! | 0x034005 | Cascade port               | 1    |
//! | 0x080000 | Sequence Generation table  | 16×N |
//! | 0x090000 | Individual Recovery table  | 12×N |
//! | 0x0A0000 | DPI table                  | 12×N |
//! | EOF−4    | CRC32 trailer (LE)         | 4    |

use crate::tables::{DpiEntry, IndividualRecoveryEntry, SequenceGenEntry};
use crate::{FirmwareError, Result};
use tracing::trace;

/// Image valid marker from the NXP driver (`0x6A, 0xA6` repeating).
pub const IMAGE_VALID_MARKER: [u8; 8] = [0x6A, 0xA6, 0x6A, 0xA6, 0x6A, 0xA6, 0x6A, 0xA6];

/// SJA1110 device ID, stored little-endian at offset 8.
pub const DEVICE_ID: u32 = 0xB700030E;

/// Byte offset of the device ID field.
pub const DEVICE_ID_OFFSET: usize = 0x8;

/// Configuration flags word (switch image only): CF_CONFIGS | CF_CRCCHKL
/// | CF_IDS | CF_CRCCHKG, as the vendor base sets them.
pub const CONFIG_FLAGS: u32 = 0xF000_0000;

/// Byte offset of the configuration flags word.
pub const CONFIG_FLAGS_OFFSET: usize = 0xC;

/// General Parameters area: FRMREPEN word.
pub const FRMREPEN_OFFSET: usize = 0x034000;

/// Host (CPU) port byte, switch image only.
pub const HOST_PORT_OFFSET: usize = 0x034004;

/// Cascade port byte, switch image only.
pub const CASCADE_PORT_OFFSET: usize = 0x034005;

/// Scenario tag stamped into the UC image (32 bytes, NUL-padded).
pub const UC_SCENARIO_TAG_OFFSET: usize = 0xC;
pub const UC_SCENARIO_TAG_LEN: usize = 32;

/// UC image size, trailer included.
pub const UC_IMAGE_LEN: usize = 320_280;

/// Switch image size, trailer included: three 64 KiB table windows after
/// 0x080000 plus the 4-byte CRC32.
pub const SWITCH_IMAGE_LEN: usize = 0x0B0004;

/// CRC trailer width.
pub const CRC_TRAILER_LEN: usize = 4;

/// The two firmware image classes the SJA1110 driver loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    /// Microcontroller subsystem firmware (`sja1110_uc.bin`).
    Uc,
    /// Static switch configuration (`sja1110_switch.bin`).
    Switch,
}

impl ImageKind {
    /// Expected total image length for this class, trailer included.
    pub fn expected_len(self) -> usize {
        match self {
            ImageKind::Uc => UC_IMAGE_LEN,
            ImageKind::Switch => SWITCH_IMAGE_LEN,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ImageKind::Uc => "UC",
            ImageKind::Switch => "switch",
        }
    }

    /// Classify a buffer by length.
    pub fn from_len(len: usize) -> Result<Self> {
        match len {
            UC_IMAGE_LEN => Ok(ImageKind::Uc),
            SWITCH_IMAGE_LEN => Ok(ImageKind::Switch),
            _ => Err(FirmwareError::SizeMismatch {
                actual: len,
                uc: UC_IMAGE_LEN,
                switch: SWITCH_IMAGE_LEN,
            }),
        }
    }
}

/// The three indexed fixed-stride table regions of the switch image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    SequenceGeneration,
    IndividualRecovery,
    Dpi,
}

impl Region {
    pub const ALL: [Region; 3] =
        [Region::SequenceGeneration, Region::IndividualRecovery, Region::Dpi];

    /// Base offset of the region inside the switch image.
    pub fn base(self) -> usize {
        match self {
            Region::SequenceGeneration => 0x080000,
            Region::IndividualRecovery => 0x090000,
            Region::Dpi => 0x0A0000,
        }
    }

    /// First offset past the region: the next documented boundary.
    pub fn end(self) -> usize {
        match self {
            Region::SequenceGeneration => 0x090000,
            Region::IndividualRecovery => 0x0A0000,
            Region::Dpi => 0x0B0000,
        }
    }

    /// Entry stride in bytes.
    pub fn stride(self) -> usize {
        match self {
            Region::SequenceGeneration => SequenceGenEntry::SIZE,
            Region::IndividualRecovery => IndividualRecoveryEntry::SIZE,
            Region::Dpi => DpiEntry::SIZE,
        }
    }

    /// Number of entries that fit before the region boundary.
    pub fn capacity(self) -> usize {
        (self.end() - self.base()) / self.stride()
    }

    pub fn name(self) -> &'static str {
        match self {
            Region::SequenceGeneration => "Sequence Generation",
            Region::IndividualRecovery => "Individual Recovery",
            Region::Dpi => "DPI",
        }
    }
}

/// An owned, fixed-capacity firmware image under construction.
///
/// Created from a base image by deep copy, mutated in place through the
/// typed writers below, then sealed by the CRC trailer and handed off as
/// an immutable byte buffer.
#[derive(Debug, Clone)]
pub struct FirmwareImage {
    kind: ImageKind,
    data: Vec<u8>,
}

impl FirmwareImage {
    /// Copy a base image into a fresh mutable buffer.
    ///
    /// The base must already be exactly the class size; a build never
    /// resizes, so an undersized base would corrupt the offset map.
    pub fn from_base(kind: ImageKind, base: &[u8]) -> Result<Self> {
        if base.len() != kind.expected_len() {
            return Err(FirmwareError::BaseSizeMismatch {
                kind: kind.name(),
                expected: kind.expected_len(),
                actual: base.len(),
            });
        }
        Ok(Self { kind, data: base.to_vec() })
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Hand the buffer off once construction is finished.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Place one encoded table entry at `index` within `region`.
    ///
    /// `index` is the stream's ordinal position in the scenario; insertion
    /// order is table order, nothing is reordered. Fails with
    /// `RegionOverflow` when the entry would cross the region boundary —
    /// a hard limit on streams per scenario, never silent truncation.
    pub fn place(&mut self, region: Region, index: usize, entry: &[u8]) -> Result<()> {
        debug_assert_eq!(entry.len(), region.stride(), "entry length must match region stride");

        // Only the switch image carries the table windows; the UC buffer
        // ends well before them.
        if self.kind != ImageKind::Switch {
            return Err(FirmwareError::RegionNotInImage {
                region: region.name(),
                kind: self.kind.name(),
            });
        }

        let offset = region.base() + index * region.stride();
        if offset + region.stride() > region.end() {
            return Err(FirmwareError::RegionOverflow {
                region: region.name(),
                index,
                capacity: region.capacity(),
            });
        }

        trace!(region = region.name(), index, offset = format_args!("{offset:#x}"), "placing entry");
        self.data[offset..offset + entry.len()].copy_from_slice(entry);
        Ok(())
    }

    /// Write the General Parameters scalars (switch image).
    ///
    /// Written once per image, independent of stream count. FRMREPEN must
    /// be 1 whenever at least one stream is defined, 0 otherwise; the
    /// scenario assembler owns that rule, this is the raw write.
    pub fn set_general_params(&mut self, frmrepen: bool, host_port: u8, cascade_port: u8) {
        self.write_u32_le(FRMREPEN_OFFSET, frmrepen as u32);
        self.data[HOST_PORT_OFFSET] = host_port;
        self.data[CASCADE_PORT_OFFSET] = cascade_port;
    }

    /// Write the FRMREPEN word only (UC image carries no host/cascade
    /// bytes).
    pub fn set_frmrepen(&mut self, frmrepen: bool) {
        self.write_u32_le(FRMREPEN_OFFSET, frmrepen as u32);
    }

    /// Stamp the scenario name into the UC image tag field, truncated to
    /// 32 bytes and NUL-padded.
    pub fn set_scenario_tag(&mut self, name: &str) {
        let field =
            &mut self.data[UC_SCENARIO_TAG_OFFSET..UC_SCENARIO_TAG_OFFSET + UC_SCENARIO_TAG_LEN];
        field.fill(0);
        let bytes = name.as_bytes();
        let n = bytes.len().min(UC_SCENARIO_TAG_LEN);
        field[..n].copy_from_slice(&bytes[..n]);
    }

    fn write_u32_le(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }
}

/// Bounds-checked little-endian reads used by the validator.
pub(crate) fn read_u32_le(data: &[u8], offset: usize) -> Result<u32> {
    let end = offset + 4;
    if end > data.len() {
        return Err(FirmwareError::SizeMismatch {
            actual: data.len(),
            uc: UC_IMAGE_LEN,
            switch: SWITCH_IMAGE_LEN,
        });
    }
    Ok(u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]]))
}
