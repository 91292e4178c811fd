//! Command-line camera selection shared by the binaries.

use anyhow::{Context, Result};
use clap::Args;
use hardware::camera::simulated::SimulatedSdk;
use hardware::camera::{CameraSession, ErrorPolicy, ExposureSettings};
use shared::image_size::ImageSize;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct CameraArgs {
    #[arg(
        short = 'c',
        long,
        default_value = "0",
        help = "Camera index (0 = first available)"
    )]
    pub camera_index: u32,

    #[arg(
        long,
        default_value = "1280",
        help = "Sensor width in pixels for the simulated camera"
    )]
    pub sensor_width: usize,

    #[arg(
        long,
        default_value = "1024",
        help = "Sensor height in pixels for the simulated camera"
    )]
    pub sensor_height: usize,

    #[arg(
        long,
        help = "Fail on the first camera SDK error instead of logging and continuing"
    )]
    pub strict: bool,
}

impl CameraArgs {
    pub fn policy(&self) -> ErrorPolicy {
        if self.strict {
            ErrorPolicy::Strict
        } else {
            ErrorPolicy::Advisory
        }
    }

    pub fn sensor_size(&self) -> ImageSize {
        ImageSize::from_width_height(self.sensor_width, self.sensor_height)
    }
}

#[derive(Args, Debug, Clone)]
pub struct ExposureArgs {
    #[arg(long, default_value = "24", help = "Pixel clock in MHz")]
    pub pixel_clock_mhz: u32,

    #[arg(long, default_value = "10.0", help = "Frame rate in frames per second")]
    pub frame_rate_fps: f64,

    #[arg(
        short = 'e',
        long,
        default_value = "5.0",
        help = "Exposure time in milliseconds",
        long_help = "Exposure time in milliseconds. Should not exceed one frame \
            period (1000 / frame rate); the value is passed to the camera unchecked."
    )]
    pub exposure_ms: f64,
}

impl ExposureArgs {
    pub fn settings(&self) -> ExposureSettings {
        ExposureSettings {
            pixel_clock_mhz: self.pixel_clock_mhz,
            frame_rate_fps: self.frame_rate_fps,
            exposure_ms: self.exposure_ms,
        }
    }
}

/// Open the camera selected by `camera` and apply `exposure`
pub fn initialize_camera(
    camera: &CameraArgs,
    exposure: &ExposureArgs,
) -> Result<CameraSession<SimulatedSdk>> {
    let size = camera.sensor_size();
    info!(
        "Opening simulated camera {} ({}, {:?} policy)",
        camera.camera_index,
        size,
        camera.policy()
    );

    let sdk = SimulatedSdk::new(size);
    let mut session = CameraSession::open(sdk, camera.camera_index, camera.policy())
        .with_context(|| format!("Failed to open camera {}", camera.camera_index))?;

    let settings = exposure.settings();
    if settings != ExposureSettings::default() {
        session
            .configure(settings)
            .context("Failed to apply exposure settings")?;
    }
    if let Some(fps) = session.actual_frame_rate() {
        info!("Camera running at {fps:.2} fps");
    }
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestArgs {
        #[command(flatten)]
        camera: CameraArgs,

        #[command(flatten)]
        exposure: ExposureArgs,
    }

    #[test]
    fn test_defaults() {
        let args = TestArgs::parse_from(["test"]);
        assert_eq!(args.camera.camera_index, 0);
        assert_eq!(args.camera.policy(), ErrorPolicy::Advisory);
        assert_eq!(args.exposure.settings(), ExposureSettings::default());
        assert_eq!(
            args.camera.sensor_size(),
            ImageSize::from_width_height(1280, 1024)
        );
    }

    #[test]
    fn test_initialize_applies_exposure() {
        let args = TestArgs::parse_from([
            "test",
            "--strict",
            "--sensor-width",
            "64",
            "--sensor-height",
            "48",
            "-e",
            "2.0",
        ]);
        let session = initialize_camera(&args.camera, &args.exposure).unwrap();
        assert_eq!(session.policy(), ErrorPolicy::Strict);
        assert_eq!(session.sensor_size(), ImageSize::from_width_height(64, 48));
        assert_eq!(session.settings().exposure_ms, 2.0);
    }

    #[test]
    fn test_strict_unknown_camera_fails() {
        let args = TestArgs::parse_from(["test", "--strict", "-c", "5"]);
        assert!(initialize_camera(&args.camera, &args.exposure).is_err());
    }
}
