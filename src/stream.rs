//! FRER stream definitions.
//!
//! A [`StreamDefinition`] is one replication rule: frames entering on the
//! ingress port are duplicated to every egress port, tagged with an R-TAG
//! sequence header. Duplicate elimination happens on the receiving device;
//! this crate only produces the replication-side configuration.
//!
//! Definitions are created by the caller, validated as a whole, and
//! immutable once handed to the encoders.

use crate::{FirmwareError, Result, ports};
use serde::{Deserialize, Serialize};

/// Highest encodable VLAN ID (4095 is reserved).
pub const MAX_VLAN_ID: u16 = 4094;

/// Highest 802.1Q priority code point.
pub const MAX_PRIORITY: u8 = 7;

/// The on-wire Sequence Generation entry has exactly four egress slots.
pub const MAX_EGRESS_PORTS: usize = 4;

/// IEEE 802.1CB R-TAG EtherType.
pub const RTAG_ETHERTYPE: u16 = 0xF1C1;

/// Default duplicate-detection history window, in sequence numbers.
pub const DEFAULT_HISTORY_LENGTH: u16 = 32;

/// Default sequence recovery reset timeout, in milliseconds.
pub const DEFAULT_RESET_TIMEOUT_MS: u16 = 100;

/// One FRER replication rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDefinition {
    /// Stream handle, unique within a scenario.
    pub stream_id: u16,
    /// Switch port frames enter on.
    pub ingress_port: u8,
    /// Ports frames are replicated to, in caller order (1–4 entries).
    pub egress_ports: Vec<u8>,
    /// VLAN the stream is identified by (0–4094).
    pub vlan_id: u16,
    /// 802.1Q priority code point (0–7).
    pub priority: u8,
    /// Duplicate-detection history window for the recovery entry.
    #[serde(default = "default_history_length")]
    pub history_length: u16,
    /// Recovery reset timeout in milliseconds.
    #[serde(default = "default_reset_timeout")]
    pub reset_timeout_ms: u16,
    /// R-TAG EtherType; fixed by IEEE 802.1CB.
    #[serde(default = "default_rtag_ethertype")]
    pub rtag_ethertype: u16,
}

fn default_history_length() -> u16 {
    DEFAULT_HISTORY_LENGTH
}

fn default_reset_timeout() -> u16 {
    DEFAULT_RESET_TIMEOUT_MS
}

fn default_rtag_ethertype() -> u16 {
    RTAG_ETHERTYPE
}

impl StreamDefinition {
    /// Create a stream definition with the documented defaults for
    /// history, timeout, and R-TAG EtherType. No validation happens here;
    /// call [`StreamDefinition::validate`] (the scenario assembler does).
    pub fn new(
        stream_id: u16,
        ingress_port: u8,
        egress_ports: impl Into<Vec<u8>>,
        vlan_id: u16,
        priority: u8,
    ) -> Self {
        Self {
            stream_id,
            ingress_port,
            egress_ports: egress_ports.into(),
            vlan_id,
            priority,
            history_length: DEFAULT_HISTORY_LENGTH,
            reset_timeout_ms: DEFAULT_RESET_TIMEOUT_MS,
            rtag_ethertype: RTAG_ETHERTYPE,
        }
    }

    /// Validate every field against the definition rules.
    ///
    /// Checks, in order: ingress reachability, egress list shape (non-empty,
    /// at most four, no duplicates, none equal to ingress), egress
    /// reachability, VLAN range, priority range. The first failure is
    /// returned; nothing is encoded for an invalid stream.
    pub fn validate(&self) -> Result<()> {
        ports::check_reachable(self.stream_id, self.ingress_port)?;

        if self.egress_ports.is_empty() {
            return Err(FirmwareError::EmptyEgressPorts { stream_id: self.stream_id });
        }
        if self.egress_ports.len() > MAX_EGRESS_PORTS {
            return Err(FirmwareError::TooManyEgressPorts {
                stream_id: self.stream_id,
                count: self.egress_ports.len(),
            });
        }
        for (i, &port) in self.egress_ports.iter().enumerate() {
            if port == self.ingress_port {
                return Err(FirmwareError::EgressEqualsIngress {
                    stream_id: self.stream_id,
                    port,
                });
            }
            if self.egress_ports[..i].contains(&port) {
                return Err(FirmwareError::DuplicateEgressPort {
                    stream_id: self.stream_id,
                    port,
                });
            }
            ports::check_reachable(self.stream_id, port)?;
        }

        if self.vlan_id > MAX_VLAN_ID {
            return Err(FirmwareError::InvalidVlan {
                stream_id: self.stream_id,
                vlan_id: self.vlan_id,
            });
        }
        if self.priority > MAX_PRIORITY {
            return Err(FirmwareError::InvalidPriority {
                stream_id: self.stream_id,
                priority: self.priority,
            });
        }
        Ok(())
    }

    /// Replication port mask: bit `p` set for every egress port `p`.
    pub fn port_mask(&self) -> u16 {
        self.egress_ports.iter().fold(0u16, |mask, &p| mask | (1 << p))
    }

    /// Number of replicas produced per ingress frame.
    pub fn replica_count(&self) -> u8 {
        self.egress_ports.len() as u8
    }
}
