//! Scenario assembly: stream definitions in, sealed image pair out.
//!
//! A scenario is a named set of stream definitions compiled into one
//! UC/switch image pair. Assembly is all-or-nothing: every definition is
//! validated before a single byte is written, and both finished images are
//! re-validated before they are returned, so a `BuildOutput` is flashable
//! by construction.

use crate::base::BaseImages;
use crate::image::{FirmwareImage, ImageKind, Region};
use crate::tables::{DpiEntry, IndividualRecoveryEntry, SequenceGenEntry};
use crate::validate::validate;
use crate::{FirmwareError, Result, StreamDefinition, crc, ports};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A named scenario under construction.
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    name: String,
    streams: Vec<StreamDefinition>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), streams: Vec::new() }
    }

    /// Append a stream. Validation is deferred to [`Scenario::build`] so a
    /// scenario can be assembled incrementally and corrected in place.
    pub fn add_stream(&mut self, stream: StreamDefinition) -> &mut Self {
        debug!(
            scenario = %self.name,
            stream_id = stream.stream_id,
            ingress = stream.ingress_port,
            "stream added"
        );
        self.streams.push(stream);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn streams(&self) -> &[StreamDefinition] {
        &self.streams
    }

    /// Compile against the default base images.
    pub fn build(&self) -> Result<BuildOutput> {
        build_scenario(&self.name, &self.streams, &BaseImages::switch_base(), &BaseImages::uc_base())
    }

    /// Compile against vendor-supplied base images.
    pub fn build_from(&self, base_switch: &[u8], base_uc: &[u8]) -> Result<BuildOutput> {
        build_scenario(&self.name, &self.streams, base_switch, base_uc)
    }
}

/// The sealed image pair plus its manifest.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub switch_image: Vec<u8>,
    pub uc_image: Vec<u8>,
    pub manifest: Manifest,
}

/// Build record emitted alongside the binaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub scenario_name: String,
    pub uc_size: usize,
    pub switch_size: usize,
    pub uc_file_crc32: u32,
    pub switch_file_crc32: u32,
    pub streams: Vec<StreamDefinition>,
}

impl Manifest {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Compile a scenario into a sealed UC/switch image pair.
///
/// Steps, in order: duplicate stream-ID check, per-stream validation, base
/// copies, table placement in definition order, General Parameters
/// scalars, CRC seal, and a full re-validation of both outputs. The first
/// failure aborts the build with nothing emitted.
pub fn build_scenario(
    name: &str,
    streams: &[StreamDefinition],
    base_switch: &[u8],
    base_uc: &[u8],
) -> Result<BuildOutput> {
    info!(scenario = name, streams = streams.len(), "building scenario");

    for (i, stream) in streams.iter().enumerate() {
        if streams[..i].iter().any(|s| s.stream_id == stream.stream_id) {
            return Err(FirmwareError::DuplicateStreamId { stream_id: stream.stream_id });
        }
        stream.validate()?;
    }

    let mut switch = FirmwareImage::from_base(ImageKind::Switch, base_switch)?;
    let mut uc = FirmwareImage::from_base(ImageKind::Uc, base_uc)?;

    for (index, stream) in streams.iter().enumerate() {
        switch.place(
            Region::SequenceGeneration,
            index,
            &SequenceGenEntry::encode(stream)?.to_bytes(),
        )?;
        switch.place(
            Region::IndividualRecovery,
            index,
            &IndividualRecoveryEntry::encode(stream)?.to_bytes(),
        )?;
        switch.place(Region::Dpi, index, &DpiEntry::encode(stream)?.to_bytes())?;
    }

    let frmrepen = !streams.is_empty();
    switch.set_general_params(frmrepen, ports::DEFAULT_HOST_PORT, ports::DEFAULT_CASCADE_PORT);
    uc.set_frmrepen(frmrepen);
    uc.set_scenario_tag(name);

    let mut switch_image = switch.into_bytes();
    let mut uc_image = uc.into_bytes();
    crc::seal(&mut switch_image);
    crc::seal(&mut uc_image);

    validate(&switch_image)?;
    validate(&uc_image)?;

    let manifest = Manifest {
        scenario_name: name.to_string(),
        uc_size: uc_image.len(),
        switch_size: switch_image.len(),
        uc_file_crc32: crc32fast::hash(&uc_image),
        switch_file_crc32: crc32fast::hash(&switch_image),
        streams: streams.to_vec(),
    };

    info!(
        scenario = name,
        switch_crc = format_args!("{:#010x}", manifest.switch_file_crc32),
        uc_crc = format_args!("{:#010x}", manifest.uc_file_crc32),
        "scenario built"
    );
    Ok(BuildOutput { switch_image, uc_image, manifest })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{SWITCH_IMAGE_LEN, UC_IMAGE_LEN};

    fn ring_scenario() -> Scenario {
        let mut scenario = Scenario::new("ring");
        scenario
            .add_stream(StreamDefinition::new(1, 4, [2, 3], 100, 6))
            .add_stream(StreamDefinition::new(2, 2, [4], 200, 3));
        scenario
    }

    #[test]
    fn build_produces_both_image_classes() {
        let out = ring_scenario().build().unwrap();
        assert_eq!(out.switch_image.len(), SWITCH_IMAGE_LEN);
        assert_eq!(out.uc_image.len(), UC_IMAGE_LEN);
        crc::verify(&out.switch_image).unwrap();
        crc::verify(&out.uc_image).unwrap();
    }

    #[test]
    fn builds_are_reproducible() {
        let a = ring_scenario().build().unwrap();
        let b = ring_scenario().build().unwrap();
        assert_eq!(a.switch_image, b.switch_image);
        assert_eq!(a.uc_image, b.uc_image);
        assert_eq!(a.manifest, b.manifest);
    }

    #[test]
    fn duplicate_stream_ids_abort_before_encoding() {
        let mut scenario = Scenario::new("dup");
        scenario
            .add_stream(StreamDefinition::new(5, 1, [2], 10, 0))
            .add_stream(StreamDefinition::new(5, 3, [4], 20, 1));
        assert!(matches!(
            scenario.build().unwrap_err(),
            FirmwareError::DuplicateStreamId { stream_id: 5 }
        ));
    }

    #[test]
    fn an_invalid_stream_aborts_the_whole_build() {
        let mut scenario = ring_scenario();
        scenario.add_stream(StreamDefinition::new(3, 20, [2], 10, 0));
        assert!(matches!(
            scenario.build().unwrap_err(),
            FirmwareError::DirectAttachedPort { stream_id: 3, port: 20, .. }
        ));
    }

    #[test]
    fn empty_scenario_builds_with_frmrepen_clear() {
        let out = Scenario::new("idle").build().unwrap();
        assert_eq!(&out.switch_image[0x034000..0x034004], &0u32.to_le_bytes());
        assert_eq!(&out.uc_image[0x034000..0x034004], &0u32.to_le_bytes());
        validate(&out.switch_image).unwrap();
    }

    #[test]
    fn frmrepen_is_set_in_both_images_when_streams_exist() {
        let out = ring_scenario().build().unwrap();
        assert_eq!(&out.switch_image[0x034000..0x034004], &1u32.to_le_bytes());
        assert_eq!(&out.uc_image[0x034000..0x034004], &1u32.to_le_bytes());
    }

    #[test]
    fn uc_image_carries_the_scenario_tag() {
        let out = ring_scenario().build().unwrap();
        assert_eq!(&out.uc_image[0xC..0xC + 4], b"ring");
        assert_eq!(out.uc_image[0xC + 4], 0);
    }

    #[test]
    fn manifest_crcs_cover_the_whole_files() {
        let out = ring_scenario().build().unwrap();
        assert_eq!(out.manifest.uc_file_crc32, crc32fast::hash(&out.uc_image));
        assert_eq!(out.manifest.switch_file_crc32, crc32fast::hash(&out.switch_image));
        assert_eq!(out.manifest.scenario_name, "ring");
        assert_eq!(out.manifest.streams.len(), 2);
    }

    #[test]
    fn manifest_serializes_to_json() {
        let out = ring_scenario().build().unwrap();
        let json = out.manifest.to_json().unwrap();
        let back: Manifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, out.manifest);
    }

    #[test]
    fn vendor_base_with_different_config_flags_builds() {
        let mut base_switch = BaseImages::switch_base();
        base_switch[0xC..0x10].copy_from_slice(&0x8000_0000u32.to_le_bytes());

        let out = ring_scenario().build_from(&base_switch, &BaseImages::uc_base()).unwrap();
        assert_eq!(&out.switch_image[0xC..0x10], &0x8000_0000u32.to_le_bytes());
        validate(&out.switch_image).unwrap();
    }

    #[test]
    fn oversized_base_is_rejected() {
        let scenario = ring_scenario();
        let bad_base = vec![0u8; 1000];
        assert!(matches!(
            scenario.build_from(&bad_base, &BaseImages::uc_base()).unwrap_err(),
            FirmwareError::BaseSizeMismatch { kind: "switch", .. }
        ));
    }
}
