//! CB and DPI table entry encoding.
//!
//! Defines the three fixed-size binary entry formats the SJA1110 consumes
//! for FRER: Sequence Generation (replication), Individual Recovery
//! (duplicate elimination), and DPI (stream identification). Each type
//! encodes from a [`StreamDefinition`] and decodes back for validation.
//!
//! Encoding is a pure function of the stream definition: the same input
//! always yields the identical byte layout, so image CRCs are reproducible
//! across builds. All multi-byte fields are little-endian.

use crate::{FirmwareError, Result, StreamDefinition, stream};

/// Enable bit carried in the flags byte of both CB entry kinds.
const FLAG_ENABLED: u8 = 0x80;

/// Sequence Generation table entry: one replication rule.
///
/// Byte layout (16 bytes, little-endian):
/// ```text
/// 0   stream_handle   u16
/// 2   port_mask       u16
/// 4   flags           u8   (bit 7 = enable)
/// 5   replica_count   u8
/// 6   seq_num         u16  (initial 0)
/// 8   egress_ports    [u8; 4]  (caller order, zero-filled)
/// 12  ingress_port    u8
/// 13  priority        u8
/// 14  reserved        [u8; 2]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceGenEntry {
    pub stream_handle: u16,
    pub port_mask: u16,
    pub enabled: bool,
    pub replica_count: u8,
    pub seq_num: u16,
    pub egress_ports: [u8; 4],
    pub ingress_port: u8,
    pub priority: u8,
}

impl SequenceGenEntry {
    /// Entry stride in the Sequence Generation table.
    pub const SIZE: usize = 16;

    /// Encode a stream into a Sequence Generation entry.
    ///
    /// The port mask collapses the egress set into bits; the slot array
    /// additionally preserves the caller's replication order.
    pub fn encode(def: &StreamDefinition) -> Result<Self> {
        check_encodable(def)?;

        let mut egress_ports = [0u8; 4];
        egress_ports[..def.egress_ports.len()].copy_from_slice(&def.egress_ports);

        Ok(Self {
            stream_handle: def.stream_id,
            port_mask: def.port_mask(),
            enabled: true,
            replica_count: def.replica_count(),
            seq_num: 0,
            egress_ports,
            ingress_port: def.ingress_port,
            priority: def.priority,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..2].copy_from_slice(&self.stream_handle.to_le_bytes());
        buf[2..4].copy_from_slice(&self.port_mask.to_le_bytes());
        buf[4] = if self.enabled { FLAG_ENABLED } else { 0 };
        buf[5] = self.replica_count;
        buf[6..8].copy_from_slice(&self.seq_num.to_le_bytes());
        buf[8..12].copy_from_slice(&self.egress_ports);
        buf[12] = self.ingress_port;
        buf[13] = self.priority;
        buf
    }

    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        Self {
            stream_handle: u16::from_le_bytes([bytes[0], bytes[1]]),
            port_mask: u16::from_le_bytes([bytes[2], bytes[3]]),
            enabled: bytes[4] & FLAG_ENABLED != 0,
            replica_count: bytes[5],
            seq_num: u16::from_le_bytes([bytes[6], bytes[7]]),
            egress_ports: [bytes[8], bytes[9], bytes[10], bytes[11]],
            ingress_port: bytes[12],
            priority: bytes[13],
        }
    }
}

/// Individual Recovery table entry: one duplicate-elimination rule.
///
/// Byte layout (12 bytes, little-endian):
/// ```text
/// 0   stream_handle    u16
/// 2   ingress_port     u8
/// 3   flags            u8   (bit 7 = enable)
/// 4   seq_num          u16  (initial 0)
/// 6   history_length   u16
/// 8   reset_timeout_ms u16
/// 10  replica_count    u8
/// 11  reserved         u8
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndividualRecoveryEntry {
    pub stream_handle: u16,
    pub ingress_port: u8,
    pub enabled: bool,
    pub seq_num: u16,
    pub history_length: u16,
    pub reset_timeout_ms: u16,
    pub replica_count: u8,
}

impl IndividualRecoveryEntry {
    /// Entry stride in the Individual Recovery table.
    pub const SIZE: usize = 12;

    pub fn encode(def: &StreamDefinition) -> Result<Self> {
        check_encodable(def)?;
        Ok(Self {
            stream_handle: def.stream_id,
            ingress_port: def.ingress_port,
            enabled: true,
            seq_num: 0,
            history_length: def.history_length,
            reset_timeout_ms: def.reset_timeout_ms,
            replica_count: def.replica_count(),
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..2].copy_from_slice(&self.stream_handle.to_le_bytes());
        buf[2] = self.ingress_port;
        buf[3] = if self.enabled { FLAG_ENABLED } else { 0 };
        buf[4..6].copy_from_slice(&self.seq_num.to_le_bytes());
        buf[6..8].copy_from_slice(&self.history_length.to_le_bytes());
        buf[8..10].copy_from_slice(&self.reset_timeout_ms.to_le_bytes());
        buf[10] = self.replica_count;
        buf
    }

    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        Self {
            stream_handle: u16::from_le_bytes([bytes[0], bytes[1]]),
            ingress_port: bytes[2],
            enabled: bytes[3] & FLAG_ENABLED != 0,
            seq_num: u16::from_le_bytes([bytes[4], bytes[5]]),
            history_length: u16::from_le_bytes([bytes[6], bytes[7]]),
            reset_timeout_ms: u16::from_le_bytes([bytes[8], bytes[9]]),
            replica_count: bytes[10],
        }
    }
}

/// DPI table entry: stream identification by VLAN and R-TAG.
///
/// Byte layout (12 bytes, little-endian):
/// ```text
/// 0   stream_id       u16
/// 2   vlan_id         u16  (12-bit effective)
/// 4   rtag_type       u16
/// 6   cb_enable       u8
/// 7   sn_num_greater  u8   (always 1)
/// 8   priority        u8
/// 9   ingress_port    u8
/// 10  reserved        [u8; 2]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DpiEntry {
    pub stream_id: u16,
    pub vlan_id: u16,
    pub rtag_type: u16,
    pub cb_enable: u8,
    pub sn_num_greater: u8,
    pub priority: u8,
    pub ingress_port: u8,
}

impl DpiEntry {
    /// Entry stride in the DPI table.
    pub const SIZE: usize = 12;

    pub fn encode(def: &StreamDefinition) -> Result<Self> {
        check_encodable(def)?;
        Ok(Self {
            stream_id: def.stream_id,
            vlan_id: def.vlan_id,
            rtag_type: def.rtag_ethertype,
            cb_enable: 1,
            sn_num_greater: 1,
            priority: def.priority,
            ingress_port: def.ingress_port,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..2].copy_from_slice(&self.stream_id.to_le_bytes());
        buf[2..4].copy_from_slice(&self.vlan_id.to_le_bytes());
        buf[4..6].copy_from_slice(&self.rtag_type.to_le_bytes());
        buf[6] = self.cb_enable;
        buf[7] = self.sn_num_greater;
        buf[8] = self.priority;
        buf[9] = self.ingress_port;
        buf
    }

    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        Self {
            stream_id: u16::from_le_bytes([bytes[0], bytes[1]]),
            vlan_id: u16::from_le_bytes([bytes[2], bytes[3]]),
            rtag_type: u16::from_le_bytes([bytes[4], bytes[5]]),
            cb_enable: bytes[6],
            sn_num_greater: bytes[7],
            priority: bytes[8],
            ingress_port: bytes[9],
        }
    }
}

/// Field-range checks shared by the three encoders. The scenario assembler
/// runs the full definition validation first; encoding re-checks the
/// fields it serializes so the encoders stay safe as standalone entry
/// points.
fn check_encodable(def: &StreamDefinition) -> Result<()> {
    if def.egress_ports.len() > stream::MAX_EGRESS_PORTS {
        return Err(FirmwareError::TooManyEgressPorts {
            stream_id: def.stream_id,
            count: def.egress_ports.len(),
        });
    }
    if def.vlan_id > stream::MAX_VLAN_ID {
        return Err(FirmwareError::InvalidVlan {
            stream_id: def.stream_id,
            vlan_id: def.vlan_id,
        });
    }
    if def.priority > stream::MAX_PRIORITY {
        return Err(FirmwareError::InvalidPriority {
            stream_id: def.stream_id,
            priority: def.priority,
        });
    }
    Ok(())
}
