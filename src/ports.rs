//! Gold Box port map and FRER reachability rules.
//!
//! The SJA1110 on the S32G-VNP-GLDBOX exposes eleven switch ports (0–10).
//! Three further RJ45 connectors on the board (P3A, P3B, P5) are wired
//! straight to the S32G processor and never pass through the switch
//! fabric, so they are structurally invalid FRER endpoints. They are kept
//! in a static table rather than hard-coded per scenario: a new board
//! revision only needs this one lookup updated.

use crate::{FirmwareError, Result};

/// Number of SJA1110 switch ports (0–10).
pub const SWITCH_PORT_COUNT: u8 = 11;

/// Highest valid switch port index.
pub const MAX_SWITCH_PORT: u8 = SWITCH_PORT_COUNT - 1;

/// Default host (CPU) port: the S32G PFE attaches at switch port 0.
pub const DEFAULT_HOST_PORT: u8 = 0;

/// Default cascade port for multi-switch setups.
pub const DEFAULT_CASCADE_PORT: u8 = 10;

/// Gold Box connectors that bypass the SJA1110 entirely (direct S32G
/// attachments). Their board IDs sit above the switch port range.
pub const DIRECT_ATTACHED_PORTS: [u8; 3] = [20, 21, 22];

/// Human-readable connector name for a port ID, used in logs and errors.
pub fn connector_name(port: u8) -> &'static str {
    match port {
        0 => "S32G PFE (SGMII)",
        1 => "P1 (100BASE-TX)",
        2 => "P2A (1000BASE-T)",
        3 => "P2B (1000BASE-T)",
        4 => "P3 (1000BASE-T)",
        5 => "P6 (100BASE-T1)",
        6 => "P7 (100BASE-T1)",
        7 => "P8 (100BASE-T1)",
        8 => "P9 (100BASE-T1)",
        9 => "P10 (100BASE-T1)",
        10 => "P11 (100BASE-T1)",
        20 => "P3A (S32G GMAC0)",
        21 => "P3B (S32G PFE_MAC2)",
        22 => "P5 (S32G PFE_MAC1)",
        _ => "unknown connector",
    }
}

/// Whether `port` is reachable through the switch fabric.
pub fn is_switch_port(port: u8) -> bool {
    port <= MAX_SWITCH_PORT
}

/// Check that `port` is a valid FRER endpoint for the given stream.
///
/// Direct-attached connectors get a dedicated error so the caller can tell
/// a wiring mistake from a plain typo.
pub fn check_reachable(stream_id: u16, port: u8) -> Result<()> {
    if DIRECT_ATTACHED_PORTS.contains(&port) {
        return Err(FirmwareError::DirectAttachedPort {
            stream_id,
            port,
            connector: connector_name(port),
        });
    }
    if !is_switch_port(port) {
        return Err(FirmwareError::PortOutOfRange {
            stream_id,
            port,
            connector: connector_name(port),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_switch_ports_are_reachable() {
        for port in 0..SWITCH_PORT_COUNT {
            check_reachable(1, port).unwrap();
        }
    }

    #[test]
    fn direct_attached_connectors_are_rejected() {
        for port in DIRECT_ATTACHED_PORTS {
            let err = check_reachable(7, port).unwrap_err();
            assert!(matches!(
                err,
                FirmwareError::DirectAttachedPort { stream_id: 7, .. }
            ));
        }
    }

    #[test]
    fn out_of_range_ports_are_rejected() {
        for port in [11u8, 15, 19, 23, 255] {
            let err = check_reachable(3, port).unwrap_err();
            assert!(matches!(err, FirmwareError::PortOutOfRange { port: p, .. } if p == port));
        }
    }

    #[test]
    fn connector_names_cover_the_port_map() {
        assert_eq!(connector_name(0), "S32G PFE (SGMII)");
        assert_eq!(connector_name(2), "P2A (1000BASE-T)");
        assert_eq!(connector_name(20), "P3A (S32G GMAC0)");
        assert_eq!(connector_name(99), "unknown connector");
    }
}
