//! Pixel to millimetre measurement of the mirror package.
//!
//! The chip carrier guide is the only calibration reference: its pixel size
//! divided by the carrier's known physical size gives pixels per millimetre,
//! which then converts the mirror and extra guides into physical offsets
//! from the carrier centre.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::guide::GuideSet;

/// Errors from computing, saving or loading an alignment measurement
#[derive(Error, Debug)]
pub enum AlignmentError {
    /// Reference dimension was zero, negative or not finite
    #[error("Reference dimension must be a positive number of millimetres, got {0}")]
    InvalidReference(f64),

    /// Chip guide has no extent so no scale factor exists
    #[error("Chip guide size is {chip_size} px; align the chip guide to the carrier first")]
    DegenerateCalibration { chip_size: i32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Measurement derived from one set of guides.
///
/// Offsets are guide centre minus chip centre, in image axes (x right,
/// y down), converted to millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentResult {
    /// Scale factor from the chip guide
    pub pixels_per_mm: f64,
    /// Physical chip carrier size the scale was derived from
    pub reference_mm: f64,
    pub mirror_offset_mm: (f64, f64),
    pub mirror_diameter_mm: f64,
    pub extra_offset_mm: (f64, f64),
    pub extra_diameter_mm: f64,
    /// Unix epoch seconds when the measurement was taken
    pub timestamp: u64,
}

impl AlignmentResult {
    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), AlignmentError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, AlignmentError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl fmt::Display for AlignmentResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "Scale: {:.4} pixels per mm ({} mm reference)",
            self.pixels_per_mm, self.reference_mm
        )?;
        writeln!(
            f,
            "Mirror offset XY: ({:.4}, {:.4}) mm",
            self.mirror_offset_mm.0, self.mirror_offset_mm.1
        )?;
        writeln!(f, "Mirror diameter: {:.4} mm", self.mirror_diameter_mm)?;
        writeln!(
            f,
            "Extra point offset XY: ({:.4}, {:.4}) mm",
            self.extra_offset_mm.0, self.extra_offset_mm.1
        )?;
        write!(f, "Extra point diameter: {:.4} mm", self.extra_diameter_mm)
    }
}

/// Convert the guides to physical measurements.
///
/// # Arguments
/// * `guides` - Guides as last placed by the operator
/// * `chip_size_mm` - Known physical side length of the chip carrier
///
/// # Errors
/// `InvalidReference` unless `chip_size_mm` is finite and positive,
/// `DegenerateCalibration` if the chip guide size is not positive.
pub fn compute_alignment(
    guides: &GuideSet,
    chip_size_mm: f64,
) -> Result<AlignmentResult, AlignmentError> {
    if !chip_size_mm.is_finite() || chip_size_mm <= 0.0 {
        return Err(AlignmentError::InvalidReference(chip_size_mm));
    }
    let chip = &guides.chip;
    if chip.size <= 0 {
        return Err(AlignmentError::DegenerateCalibration {
            chip_size: chip.size,
        });
    }

    let pixels_per_mm = chip.size as f64 / chip_size_mm;
    info!("{pixels_per_mm} pixels per mm");

    let offset = |x: i32, y: i32| {
        (
            (x as f64 - chip.x as f64) / pixels_per_mm,
            (y as f64 - chip.y as f64) / pixels_per_mm,
        )
    };

    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let result = AlignmentResult {
        pixels_per_mm,
        reference_mm: chip_size_mm,
        mirror_offset_mm: offset(guides.mirror.x, guides.mirror.y),
        mirror_diameter_mm: guides.mirror.size as f64 / pixels_per_mm,
        extra_offset_mm: offset(guides.extra.x, guides.extra.y),
        extra_diameter_mm: guides.extra.size as f64 / pixels_per_mm,
        timestamp,
    };
    info!(
        "Mirror offset ({:.4}, {:.4}) mm, diameter {:.4} mm; extra offset ({:.4}, {:.4}) mm, diameter {:.4} mm",
        result.mirror_offset_mm.0,
        result.mirror_offset_mm.1,
        result.mirror_diameter_mm,
        result.extra_offset_mm.0,
        result.extra_offset_mm.1,
        result.extra_diameter_mm
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guide::{Guide, GuideRole};
    use approx::assert_relative_eq;

    fn bench_guides() -> GuideSet {
        GuideSet {
            chip: Guide::for_role(GuideRole::Chip, 640, 512, 200),
            mirror: Guide::for_role(GuideRole::Mirror, 700, 550, 100),
            extra: Guide::for_role(GuideRole::Extra, 600, 480, 25),
        }
    }

    #[test]
    fn test_ten_mm_reference() {
        let result = compute_alignment(&bench_guides(), 10.0).unwrap();

        assert_relative_eq!(result.pixels_per_mm, 20.0, epsilon = 1e-12);
        assert_relative_eq!(result.mirror_offset_mm.0, 3.0, epsilon = 1e-12);
        assert_relative_eq!(result.mirror_offset_mm.1, 1.9, epsilon = 1e-12);
        assert_relative_eq!(result.mirror_diameter_mm, 5.0, epsilon = 1e-12);
        assert_relative_eq!(result.extra_offset_mm.0, -2.0, epsilon = 1e-12);
        assert_relative_eq!(result.extra_offset_mm.1, -1.6, epsilon = 1e-12);
        assert_relative_eq!(result.extra_diameter_mm, 1.25, epsilon = 1e-12);
        assert_relative_eq!(result.reference_mm, 10.0);
    }

    #[test]
    fn test_concentric_guides_have_zero_offset() {
        let result = compute_alignment(&GuideSet::default(), 10.0).unwrap();
        assert_relative_eq!(result.mirror_offset_mm.0, 0.0);
        assert_relative_eq!(result.mirror_offset_mm.1, 0.0);
        assert_relative_eq!(result.mirror_diameter_mm, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_extreme_offsets_do_not_overflow() {
        let mut guides = bench_guides();
        guides.chip.x = -1;
        guides.mirror.x = i32::MAX;

        let result = compute_alignment(&guides, 10.0).unwrap();
        assert_relative_eq!(
            result.mirror_offset_mm.0,
            (i32::MAX as f64 + 1.0) / 20.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_zero_chip_size_is_error() {
        let mut guides = bench_guides();
        guides.chip.size = 0;

        match compute_alignment(&guides, 10.0) {
            Err(AlignmentError::DegenerateCalibration { chip_size }) => assert_eq!(chip_size, 0),
            other => panic!("expected DegenerateCalibration, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_reference() {
        let guides = bench_guides();
        assert!(matches!(
            compute_alignment(&guides, 0.0),
            Err(AlignmentError::InvalidReference(_))
        ));
        assert!(matches!(
            compute_alignment(&guides, -3.0),
            Err(AlignmentError::InvalidReference(_))
        ));
        assert!(matches!(
            compute_alignment(&guides, f64::NAN),
            Err(AlignmentError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");
        let result = compute_alignment(&bench_guides(), 10.0).unwrap();

        result.save_to_file(&path).unwrap();
        let loaded = AlignmentResult::load_from_file(&path).unwrap();

        assert_eq!(loaded, result);
    }

    #[test]
    fn test_display_lists_all_measurements() {
        let text = compute_alignment(&bench_guides(), 10.0).unwrap().to_string();
        assert!(text.contains("20.0000 pixels per mm"));
        assert!(text.contains("Mirror offset XY: (3.0000, 1.9000) mm"));
        assert!(text.contains("Extra point diameter: 1.2500 mm"));
    }
}
