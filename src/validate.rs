//! Standalone image validation and decoding.
//!
//! The validator accepts any byte buffer claiming to be an SJA1110 image
//! and checks it outside-in: size class first, then the header fields, the
//! CRC trailer, and finally (switch images only) the cross-table FRER
//! consistency rules. Checks short-circuit in that order so the first
//! error reported is the outermost one.
//!
//! Decoding inverts the build: a valid switch image yields back the
//! stream definitions it was assembled from.

use crate::image::{
    self, CASCADE_PORT_OFFSET, DEVICE_ID, DEVICE_ID_OFFSET, FRMREPEN_OFFSET, HOST_PORT_OFFSET,
    IMAGE_VALID_MARKER, ImageKind, Region,
};
use crate::stream::{MAX_EGRESS_PORTS, MAX_PRIORITY, MAX_VLAN_ID, StreamDefinition};
use crate::tables::{DpiEntry, IndividualRecoveryEntry, SequenceGenEntry};
use crate::{FirmwareError, Result, crc, ports};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What a successful validation learned about an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSummary {
    pub kind: ImageKind,
    /// Populated FRER streams (always 0 for the UC class).
    pub stream_count: usize,
    /// FRMREPEN word at 0x034000.
    pub frmrepen: bool,
    /// Host port byte, switch class only.
    pub host_port: Option<u8>,
    /// Cascade port byte, switch class only.
    pub cascade_port: Option<u8>,
}

/// Validate a firmware image end to end.
pub fn validate(data: &[u8]) -> Result<ImageSummary> {
    let kind = ImageKind::from_len(data.len())?;
    check_header(data)?;
    crc::verify(data)?;

    let frmrepen = image::read_u32_le(data, FRMREPEN_OFFSET)? != 0;

    let summary = match kind {
        ImageKind::Uc => ImageSummary {
            kind,
            stream_count: 0,
            frmrepen,
            host_port: None,
            cascade_port: None,
        },
        ImageKind::Switch => {
            let stream_count = check_tables(data)?;
            if frmrepen != (stream_count > 0) {
                return Err(FirmwareError::TableConsistency {
                    region: "General Parameters",
                    index: 0,
                    details: format!(
                        "FRMREPEN is {} but {stream_count} stream(s) are populated",
                        frmrepen as u32
                    ),
                });
            }
            ImageSummary {
                kind,
                stream_count,
                frmrepen,
                host_port: Some(data[HOST_PORT_OFFSET]),
                cascade_port: Some(data[CASCADE_PORT_OFFSET]),
            }
        }
    };

    debug!(kind = kind.name(), streams = summary.stream_count, "image validated");
    Ok(summary)
}

/// Recover the stream definitions a valid switch image encodes.
///
/// Validation runs first; a buffer that fails any check never decodes.
/// Egress order is recovered from the slot array, so the result matches
/// the original definitions field for field (seeded defaults included).
pub fn decode_streams(data: &[u8]) -> Result<Vec<StreamDefinition>> {
    let summary = validate(data)?;
    if summary.kind != ImageKind::Switch {
        return Ok(Vec::new());
    }

    let mut streams = Vec::with_capacity(summary.stream_count);
    for index in 0..summary.stream_count {
        let sg = SequenceGenEntry::from_bytes(&entry_at(data, Region::SequenceGeneration, index));
        let ir =
            IndividualRecoveryEntry::from_bytes(&entry_at(data, Region::IndividualRecovery, index));
        let dpi = DpiEntry::from_bytes(&entry_at(data, Region::Dpi, index));

        streams.push(StreamDefinition {
            stream_id: sg.stream_handle,
            ingress_port: sg.ingress_port,
            egress_ports: sg.egress_ports[..sg.replica_count as usize].to_vec(),
            vlan_id: dpi.vlan_id,
            priority: sg.priority,
            history_length: ir.history_length,
            reset_timeout_ms: ir.reset_timeout_ms,
            rtag_ethertype: dpi.rtag_type,
        });
    }
    Ok(streams)
}

/// Marker and device ID; the configuration-flags word is a vendor bitfield
/// and passes through unchecked.
fn check_header(data: &[u8]) -> Result<()> {
    let mut found = [0u8; 8];
    found.copy_from_slice(&data[..8]);
    if found != IMAGE_VALID_MARKER {
        return Err(FirmwareError::MissingMarker { found });
    }

    let device_id = image::read_u32_le(data, DEVICE_ID_OFFSET)?;
    if device_id != DEVICE_ID {
        return Err(FirmwareError::DeviceIdMismatch { expected: DEVICE_ID, found: device_id });
    }
    Ok(())
}

/// Cross-table consistency for a switch image; returns the stream count.
///
/// Each region must hold one contiguous run of populated entries starting
/// at its base, all three runs the same length, with matching handles and
/// ports at every index.
fn check_tables(data: &[u8]) -> Result<usize> {
    let sg_count = populated_run(data, Region::SequenceGeneration)?;
    let ir_count = populated_run(data, Region::IndividualRecovery)?;
    let dpi_count = populated_run(data, Region::Dpi)?;

    if ir_count != sg_count || dpi_count != sg_count {
        return Err(FirmwareError::TableConsistency {
            region: "Sequence Generation",
            index: sg_count,
            details: format!(
                "table lengths diverge: {sg_count} generation, {ir_count} recovery, \
                 {dpi_count} DPI entries"
            ),
        });
    }

    for index in 0..sg_count {
        check_entry(data, index)?;
    }
    Ok(sg_count)
}

/// Length of the contiguous populated run at the start of `region`.
/// A populated entry after the first empty slot is corruption, not a
/// shorter table.
fn populated_run(data: &[u8], region: Region) -> Result<usize> {
    let stride = region.stride();
    let mut count = None;
    for index in 0..region.capacity() {
        let offset = region.base() + index * stride;
        let populated = data[offset..offset + stride].iter().any(|&b| b != 0);
        match (populated, count) {
            (true, None) => {}
            (false, None) => count = Some(index),
            (false, Some(_)) => {}
            (true, Some(end)) => {
                return Err(FirmwareError::TableConsistency {
                    region: region.name(),
                    index,
                    details: format!("populated entry after the table ended at index {end}"),
                });
            }
        }
    }
    Ok(count.unwrap_or(region.capacity()))
}

fn check_entry(data: &[u8], index: usize) -> Result<()> {
    let sg = SequenceGenEntry::from_bytes(&entry_at(data, Region::SequenceGeneration, index));
    let ir = IndividualRecoveryEntry::from_bytes(&entry_at(data, Region::IndividualRecovery, index));
    let dpi = DpiEntry::from_bytes(&entry_at(data, Region::Dpi, index));

    let fail = |region: &'static str, details: String| {
        Err(FirmwareError::TableConsistency { region, index, details })
    };

    if !sg.enabled {
        return fail("Sequence Generation", "populated entry has the enable bit clear".into());
    }
    if sg.port_mask == 0 || sg.port_mask >> ports::SWITCH_PORT_COUNT != 0 {
        return fail(
            "Sequence Generation",
            format!("port mask {:#06x} names ports outside the switch fabric", sg.port_mask),
        );
    }
    if sg.replica_count as usize > MAX_EGRESS_PORTS {
        return fail(
            "Sequence Generation",
            format!(
                "replica count {} exceeds the {MAX_EGRESS_PORTS} egress slots",
                sg.replica_count
            ),
        );
    }
    if u32::from(sg.replica_count) != sg.port_mask.count_ones() {
        return fail(
            "Sequence Generation",
            format!(
                "replica count {} disagrees with port mask {:#06x}",
                sg.replica_count, sg.port_mask
            ),
        );
    }
    let slots = &sg.egress_ports[..sg.replica_count as usize];
    let mut slot_mask = 0u16;
    for &port in slots {
        if !ports::is_switch_port(port) {
            return fail(
                "Sequence Generation",
                format!("egress slot names port {port} outside the switch fabric"),
            );
        }
        slot_mask |= 1 << port;
    }
    if slot_mask != sg.port_mask {
        return fail(
            "Sequence Generation",
            format!(
                "egress slots {slots:?} disagree with port mask {:#06x}",
                sg.port_mask
            ),
        );
    }
    if sg.egress_ports[sg.replica_count as usize..].iter().any(|&b| b != 0) {
        return fail("Sequence Generation", "unused egress slots are not zero-filled".into());
    }
    if !ports::is_switch_port(sg.ingress_port) {
        return fail(
            "Sequence Generation",
            format!("ingress port {} is not a switch port", sg.ingress_port),
        );
    }
    if sg.priority > MAX_PRIORITY {
        return fail("Sequence Generation", format!("priority {} out of range", sg.priority));
    }

    if !ir.enabled {
        return fail("Individual Recovery", "populated entry has the enable bit clear".into());
    }
    if ir.stream_handle != sg.stream_handle {
        return fail(
            "Individual Recovery",
            format!("stream handle {} does not match generation entry {}", ir.stream_handle, sg.stream_handle),
        );
    }
    if ir.ingress_port != sg.ingress_port || ir.replica_count != sg.replica_count {
        return fail(
            "Individual Recovery",
            format!(
                "ingress/replica ({}, {}) disagree with generation entry ({}, {})",
                ir.ingress_port, ir.replica_count, sg.ingress_port, sg.replica_count
            ),
        );
    }

    if dpi.cb_enable != 1 {
        return fail("DPI", format!("cb_enable is {}, expected 1", dpi.cb_enable));
    }
    if dpi.stream_id != sg.stream_handle {
        return fail(
            "DPI",
            format!("stream ID {} does not match generation entry {}", dpi.stream_id, sg.stream_handle),
        );
    }
    if dpi.vlan_id > MAX_VLAN_ID {
        return fail("DPI", format!("VLAN {} out of range", dpi.vlan_id));
    }
    if dpi.priority != sg.priority || dpi.ingress_port != sg.ingress_port {
        return fail(
            "DPI",
            format!(
                "priority/ingress ({}, {}) disagree with generation entry ({}, {})",
                dpi.priority, dpi.ingress_port, sg.priority, sg.ingress_port
            ),
        );
    }
    Ok(())
}

fn entry_at<const N: usize>(data: &[u8], region: Region, index: usize) -> [u8; N] {
    debug_assert_eq!(N, region.stride());
    let offset = region.base() + index * region.stride();
    let mut buf = [0u8; N];
    buf.copy_from_slice(&data[offset..offset + N]);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::BaseImages;
    use crate::image::FirmwareImage;

    fn sealed_switch(streams: &[StreamDefinition]) -> Vec<u8> {
        let mut image =
            FirmwareImage::from_base(ImageKind::Switch, &BaseImages::switch_base()).unwrap();
        for (i, def) in streams.iter().enumerate() {
            image
                .place(
                    Region::SequenceGeneration,
                    i,
                    &SequenceGenEntry::encode(def).unwrap().to_bytes(),
                )
                .unwrap();
            image
                .place(
                    Region::IndividualRecovery,
                    i,
                    &IndividualRecoveryEntry::encode(def).unwrap().to_bytes(),
                )
                .unwrap();
            image.place(Region::Dpi, i, &DpiEntry::encode(def).unwrap().to_bytes()).unwrap();
        }
        image.set_general_params(!streams.is_empty(), 0, 10);
        let mut data = image.into_bytes();
        crc::seal(&mut data);
        data
    }

    #[test]
    fn empty_switch_image_validates() {
        let data = sealed_switch(&[]);
        let summary = validate(&data).unwrap();
        assert_eq!(summary.kind, ImageKind::Switch);
        assert_eq!(summary.stream_count, 0);
        assert!(!summary.frmrepen);
        assert_eq!(summary.host_port, Some(0));
        assert_eq!(summary.cascade_port, Some(10));
    }

    #[test]
    fn populated_switch_image_reports_its_stream_count() {
        let streams = [
            StreamDefinition::new(1, 4, [2, 3], 100, 6),
            StreamDefinition::new(2, 2, [4, 5, 6], 200, 3),
        ];
        let summary = validate(&sealed_switch(&streams)).unwrap();
        assert_eq!(summary.stream_count, 2);
        assert!(summary.frmrepen);
    }

    #[test]
    fn uc_image_validates_without_table_checks() {
        let mut data = BaseImages::uc_base();
        crc::seal(&mut data);
        let summary = validate(&data).unwrap();
        assert_eq!(summary.kind, ImageKind::Uc);
        assert_eq!(summary.host_port, None);
    }

    #[test]
    fn wrong_size_is_the_first_error() {
        assert!(matches!(
            validate(&[0u8; 64]).unwrap_err(),
            FirmwareError::SizeMismatch { actual: 64, .. }
        ));
    }

    #[test]
    fn missing_marker_is_detected() {
        let mut data = sealed_switch(&[]);
        data[0] = 0x00;
        crc::seal(&mut data); // keep the CRC valid so the marker check is what fires
        assert!(matches!(validate(&data).unwrap_err(), FirmwareError::MissingMarker { .. }));
    }

    #[test]
    fn wrong_device_id_is_detected() {
        let mut data = sealed_switch(&[]);
        data[8..12].copy_from_slice(&0xDEADBEEFu32.to_le_bytes());
        crc::seal(&mut data);
        assert!(matches!(
            validate(&data).unwrap_err(),
            FirmwareError::DeviceIdMismatch { found: 0xDEADBEEF, .. }
        ));
    }

    #[test]
    fn stale_crc_is_detected() {
        let mut data = sealed_switch(&[]);
        data[0x034000] ^= 0x01;
        assert!(matches!(validate(&data).unwrap_err(), FirmwareError::CrcMismatch { .. }));
    }

    #[test]
    fn entry_after_a_gap_is_corruption() {
        let def = StreamDefinition::new(1, 4, [2, 3], 100, 6);
        let mut image =
            FirmwareImage::from_base(ImageKind::Switch, &BaseImages::switch_base()).unwrap();
        let entry = SequenceGenEntry::encode(&def).unwrap().to_bytes();
        image.place(Region::SequenceGeneration, 0, &entry).unwrap();
        image.place(Region::SequenceGeneration, 2, &entry).unwrap(); // index 1 left empty
        image.set_general_params(true, 0, 10);
        let mut data = image.into_bytes();
        crc::seal(&mut data);

        assert!(matches!(
            validate(&data).unwrap_err(),
            FirmwareError::TableConsistency { region: "Sequence Generation", index: 2, .. }
        ));
    }

    #[test]
    fn diverging_table_lengths_are_detected() {
        let def = StreamDefinition::new(1, 4, [2, 3], 100, 6);
        let mut image =
            FirmwareImage::from_base(ImageKind::Switch, &BaseImages::switch_base()).unwrap();
        image
            .place(Region::SequenceGeneration, 0, &SequenceGenEntry::encode(&def).unwrap().to_bytes())
            .unwrap();
        // Recovery and DPI tables left empty.
        image.set_general_params(true, 0, 10);
        let mut data = image.into_bytes();
        crc::seal(&mut data);

        assert!(matches!(
            validate(&data).unwrap_err(),
            FirmwareError::TableConsistency { .. }
        ));
    }

    #[test]
    fn frmrepen_must_match_the_stream_count() {
        let def = StreamDefinition::new(1, 4, [2, 3], 100, 6);
        let mut data = sealed_switch(&[def]);
        data[0x034000..0x034004].copy_from_slice(&0u32.to_le_bytes());
        crc::seal(&mut data);

        let err = validate(&data).unwrap_err();
        assert!(matches!(
            err,
            FirmwareError::TableConsistency { region: "General Parameters", .. }
        ));
    }

    #[test]
    fn replica_count_must_match_the_port_mask() {
        let def = StreamDefinition::new(1, 4, [2, 3], 100, 6);
        let mut data = sealed_switch(&[def]);
        data[0x080000 + 5] = 3; // replica_count byte, mask still has two bits
        crc::seal(&mut data);

        assert!(matches!(
            validate(&data).unwrap_err(),
            FirmwareError::TableConsistency { region: "Sequence Generation", index: 0, .. }
        ));
    }

    #[test]
    fn replica_count_past_the_slot_array_is_rejected_not_decoded() {
        let def = StreamDefinition::new(1, 0, [1, 2, 3, 4], 100, 0);
        let mut data = sealed_switch(&[def]);
        // Five mask bits and a replica count of five claim a fifth slot
        // the 4-slot array does not have.
        data[0x080002..0x080004].copy_from_slice(&0x001Fu16.to_le_bytes());
        data[0x080005] = 5;
        data[0x090000 + 10] = 5;
        crc::seal(&mut data);

        assert!(matches!(
            validate(&data).unwrap_err(),
            FirmwareError::TableConsistency { region: "Sequence Generation", index: 0, .. }
        ));
        assert!(decode_streams(&data).is_err());
    }

    #[test]
    fn egress_slots_must_agree_with_the_port_mask() {
        let def = StreamDefinition::new(1, 4, [2, 3], 100, 6);
        let mut data = sealed_switch(&[def]);
        data[0x080002..0x080004].copy_from_slice(&0x0060u16.to_le_bytes()); // ports 5,6
        crc::seal(&mut data);

        assert!(matches!(
            validate(&data).unwrap_err(),
            FirmwareError::TableConsistency { region: "Sequence Generation", index: 0, .. }
        ));
    }

    #[test]
    fn nonzero_unused_egress_slot_is_rejected() {
        let def = StreamDefinition::new(1, 4, [2, 3], 100, 6);
        let mut data = sealed_switch(&[def]);
        data[0x080000 + 11] = 9; // fourth slot of a two-replica entry
        crc::seal(&mut data);

        assert!(matches!(
            validate(&data).unwrap_err(),
            FirmwareError::TableConsistency { region: "Sequence Generation", index: 0, .. }
        ));
    }

    #[test]
    fn vendor_configuration_flags_pass_through_unchecked() {
        let mut data = sealed_switch(&[]);
        data[0xC..0x10].copy_from_slice(&0x8000_0000u32.to_le_bytes());
        crc::seal(&mut data);
        validate(&data).unwrap();
    }

    #[test]
    fn decode_recovers_the_original_definitions() {
        let streams = vec![
            StreamDefinition::new(1, 4, [2, 3], 100, 6),
            StreamDefinition::new(7, 0, [3, 2, 5], 42, 0),
        ];
        let decoded = decode_streams(&sealed_switch(&streams)).unwrap();
        assert_eq!(decoded, streams);
    }

    #[test]
    fn decode_of_a_uc_image_yields_no_streams() {
        let mut data = BaseImages::uc_base();
        crc::seal(&mut data);
        assert!(decode_streams(&data).unwrap().is_empty());
    }
}
