//! Error types for firmware image construction and validation.
//!
//! All errors are fatal to the current build: the core is a pure in-memory
//! transform with no transient failure mode, so nothing is retried. Errors
//! carry the offending stream ID, region, or byte-level detail so a caller
//! can correct the scenario and rebuild.
//!
//! ## Error Categories
//!
//! - **Definition**: a `StreamDefinition` field is out of range. Caught
//!   before any byte is written.
//! - **PortReachability**: a definition names a port the switch fabric
//!   cannot reach (out of range or wired straight to the host processor).
//! - **Capacity**: a table region would overflow its documented boundary,
//!   or the target image class has no such region. Caught during placement.
//! - **Integrity**: a finished or externally supplied image fails the
//!   marker, device ID, size, CRC, or table-consistency checks.

use thiserror::Error;

/// Result type alias for firmware operations.
pub type Result<T, E = FirmwareError> = std::result::Result<T, E>;

/// Coarse classification of a [`FirmwareError`], mirroring the taxonomy
/// callers report against: fix the scenario, shrink the scenario, or
/// inspect the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Stream definition rejected before encoding.
    Definition,
    /// Definition names a port unreachable through the switch fabric.
    PortReachability,
    /// Table region capacity exceeded during placement.
    Capacity,
    /// Assembled or supplied image failed validation.
    Integrity,
}

/// Main error type for firmware image operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FirmwareError {
    #[error("stream {stream_id}: VLAN ID {vlan_id} exceeds maximum 4094")]
    InvalidVlan { stream_id: u16, vlan_id: u16 },

    #[error("stream {stream_id}: priority {priority} exceeds maximum 7")]
    InvalidPriority { stream_id: u16, priority: u8 },

    #[error("stream {stream_id}: {count} egress ports supplied, on-wire format has 4 slots")]
    TooManyEgressPorts { stream_id: u16, count: usize },

    #[error("stream {stream_id}: egress port list is empty")]
    EmptyEgressPorts { stream_id: u16 },

    #[error("stream {stream_id}: egress port {port} listed more than once")]
    DuplicateEgressPort { stream_id: u16, port: u8 },

    #[error("stream {stream_id}: egress port {port} equals the ingress port")]
    EgressEqualsIngress { stream_id: u16, port: u8 },

    #[error("stream {stream_id}: {connector} (port {port}) is not a switch port")]
    PortOutOfRange { stream_id: u16, port: u8, connector: &'static str },

    #[error(
        "stream {stream_id}: {connector} (port {port}) is wired directly to the host \
         processor and never passes through the switch fabric"
    )]
    DirectAttachedPort { stream_id: u16, port: u8, connector: &'static str },

    #[error("stream ID {stream_id} defined more than once in this scenario")]
    DuplicateStreamId { stream_id: u16 },

    #[error("{region} table overflow: entry index {index} exceeds capacity {capacity}")]
    RegionOverflow { region: &'static str, index: usize, capacity: usize },

    #[error("{kind} image class carries no {region} table region")]
    RegionNotInImage { region: &'static str, kind: &'static str },

    #[error("image size {actual} bytes matches no image class (UC {uc} or switch {switch})")]
    SizeMismatch { actual: usize, uc: usize, switch: usize },

    #[error("image valid marker missing at offset 0x0 (found {found:02x?})")]
    MissingMarker { found: [u8; 8] },

    #[error("device ID mismatch at offset 0x8: expected {expected:#010x}, found {found:#010x}")]
    DeviceIdMismatch { expected: u32, found: u32 },

    #[error("CRC32 trailer mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    CrcMismatch { stored: u32, computed: u32 },

    #[error("{region} table inconsistent at entry {index}: {details}")]
    TableConsistency { region: &'static str, index: usize, details: String },

    #[error("base image for {kind} class must be {expected} bytes, got {actual}")]
    BaseSizeMismatch { kind: &'static str, expected: usize, actual: usize },
}

impl FirmwareError {
    /// Classify this error per the taxonomy in the module docs.
    pub fn category(&self) -> ErrorCategory {
        match self {
            FirmwareError::InvalidVlan { .. }
            | FirmwareError::InvalidPriority { .. }
            | FirmwareError::TooManyEgressPorts { .. }
            | FirmwareError::EmptyEgressPorts { .. }
            | FirmwareError::DuplicateEgressPort { .. }
            | FirmwareError::EgressEqualsIngress { .. }
            | FirmwareError::DuplicateStreamId { .. } => ErrorCategory::Definition,
            FirmwareError::PortOutOfRange { .. }
            | FirmwareError::DirectAttachedPort { .. } => ErrorCategory::PortReachability,
            FirmwareError::RegionOverflow { .. }
            | FirmwareError::RegionNotInImage { .. } => ErrorCategory::Capacity,
            FirmwareError::SizeMismatch { .. }
            | FirmwareError::MissingMarker { .. }
            | FirmwareError::DeviceIdMismatch { .. }
            | FirmwareError::CrcMismatch { .. }
            | FirmwareError::TableConsistency { .. }
            | FirmwareError::BaseSizeMismatch { .. } => ErrorCategory::Integrity,
        }
    }

    /// The stream ID this error is reported against, if it concerns a
    /// single stream definition.
    pub fn stream_id(&self) -> Option<u16> {
        match self {
            FirmwareError::InvalidVlan { stream_id, .. }
            | FirmwareError::InvalidPriority { stream_id, .. }
            | FirmwareError::TooManyEgressPorts { stream_id, .. }
            | FirmwareError::EmptyEgressPorts { stream_id }
            | FirmwareError::DuplicateEgressPort { stream_id, .. }
            | FirmwareError::EgressEqualsIngress { stream_id, .. }
            | FirmwareError::PortOutOfRange { stream_id, .. }
            | FirmwareError::DirectAttachedPort { stream_id, .. }
            | FirmwareError::DuplicateStreamId { stream_id } => Some(*stream_id),
            _ => None,
        }
    }
}
