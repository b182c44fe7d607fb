//! Type-safe builder and validator for NXP SJA1110 FRER firmware images.
//!
//! Frerforge compiles declarative IEEE 802.1CB stream definitions into the
//! two flashable binaries the SJA1110 automotive Ethernet switch (as found
//! on the NXP S32G-VNP-GLDBOX) loads at boot: the microcontroller firmware
//! (`sja1110_uc.bin`) and the static switch configuration
//! (`sja1110_switch.bin`).
//!
//! # Features
//!
//! - **Declarative streams**: one [`StreamDefinition`] per replication
//!   rule, validated against the Gold Box port map before a byte is written
//! - **Byte-exact output**: fixed offset map, little-endian fields, and a
//!   CRC32 trailer make builds reproducible bit for bit
//! - **Standalone validation**: any binary can be checked and decoded back
//!   into the stream definitions it encodes
//!
//! # Quick Start
//!
//! ```rust
//! use frerforge::{Scenario, StreamDefinition, validate};
//!
//! fn main() -> Result<(), frerforge::FirmwareError> {
//!     let mut scenario = Scenario::new("ring");
//!     scenario.add_stream(StreamDefinition::new(1, 4, [2, 3], 100, 6));
//!
//!     let out = scenario.build()?;
//!     let summary = validate(&out.switch_image)?;
//!     assert_eq!(summary.stream_count, 1);
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
pub mod ports;
pub mod stream;

// Binary image layer
pub mod base;
pub mod crc;
pub mod image;
pub mod tables;

// Assembly and validation
pub mod scenario;
pub mod validate;

// Core exports
pub use error::{ErrorCategory, FirmwareError, Result};
pub use stream::StreamDefinition;

// Image exports
pub use base::BaseImages;
pub use crc::fix_crc;
pub use image::{FirmwareImage, ImageKind, Region};

// Assembly exports
pub use scenario::{BuildOutput, Manifest, Scenario, build_scenario};
pub use validate::{ImageSummary, decode_streams, validate};
