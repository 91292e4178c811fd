//! Vendor camera SDK boundary and the session built on top of it.
//!
//! The SDK follows the usual industrial-camera call sequence: initialize a
//! handle, pick a colour mode, query the sensor, choose a trigger, hand the
//! driver a frame buffer, set timing, then freeze single frames into that
//! buffer. Every call reports an integer status, `0` meaning success.

mod error;
mod frame;
mod session;
#[cfg(feature = "simulated")]
pub mod simulated;

pub use error::{CameraError, CameraResult, ErrorPolicy};
pub use frame::Frame;
pub use session::{CameraSession, ExposureSettings};

use shared::image_size::ImageSize;
use std::fmt;

/// Raw status code returned by a vendor SDK call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SdkStatus(pub i32);

impl SdkStatus {
    pub const SUCCESS: SdkStatus = SdkStatus(0);
    pub const NO_SUCCESS: SdkStatus = SdkStatus(-1);
    pub const INVALID_HANDLE: SdkStatus = SdkStatus(1);
    pub const CANT_OPEN_DEVICE: SdkStatus = SdkStatus(3);
    pub const INVALID_PARAMETER: SdkStatus = SdkStatus(125);
    pub const NOT_SUPPORTED: SdkStatus = SdkStatus(155);

    pub fn is_success(&self) -> bool {
        *self == Self::SUCCESS
    }

    fn name(&self) -> Option<&'static str> {
        match *self {
            Self::SUCCESS => Some("SUCCESS"),
            Self::NO_SUCCESS => Some("NO_SUCCESS"),
            Self::INVALID_HANDLE => Some("INVALID_HANDLE"),
            Self::CANT_OPEN_DEVICE => Some("CANT_OPEN_DEVICE"),
            Self::INVALID_PARAMETER => Some("INVALID_PARAMETER"),
            Self::NOT_SUPPORTED => Some("NOT_SUPPORTED"),
            _ => None,
        }
    }
}

impl fmt::Display for SdkStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({name})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Result of a single SDK call; the error is the failing status code
pub type SdkResult<T> = Result<T, SdkStatus>;

/// Handle the SDK assigns to an initialized camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CameraHandle(pub u32);

/// Identifier of a driver-owned image buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryId(pub i32);

/// Pixel layout the camera writes into image memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    /// 3 channels, 8 bits each, blue first
    Bgr8Packed,
    /// 3 channels, 8 bits each, red first
    Rgb8Packed,
    /// Single 8 bit channel
    Mono8,
}

impl ColorMode {
    pub fn bits_per_pixel(&self) -> u32 {
        match self {
            ColorMode::Bgr8Packed | ColorMode::Rgb8Packed => 24,
            ColorMode::Mono8 => 8,
        }
    }
}

/// How a capture is started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    /// Each freeze call triggers one exposure
    Software,
    /// Sensor runs continuously at the configured frame rate
    Freerun,
}

/// Static sensor description reported by the SDK
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorInfo {
    pub sensor_name: String,
    /// Full-frame dimensions
    pub max_size: ImageSize,
    pub is_color: bool,
}

/// Vendor camera SDK calls used by [`CameraSession`].
///
/// Implementations wrap a real driver library or simulate one. Calls are
/// synchronous; `freeze_video` with `wait` blocks until the exposure and
/// readout are complete.
pub trait CameraSdk {
    /// Open camera `camera_id` (0 selects the first available camera)
    fn init_camera(&mut self, camera_id: u32) -> SdkResult<CameraHandle>;

    fn set_color_mode(&mut self, handle: CameraHandle, mode: ColorMode) -> SdkResult<()>;

    fn sensor_info(&mut self, handle: CameraHandle) -> SdkResult<SensorInfo>;

    fn set_trigger(&mut self, handle: CameraHandle, mode: TriggerMode) -> SdkResult<()>;

    /// Allocate driver memory for one frame
    fn alloc_image_mem(
        &mut self,
        handle: CameraHandle,
        size: ImageSize,
        bits_per_pixel: u32,
    ) -> SdkResult<MemoryId>;

    /// Make `memory` the buffer that captures are written into
    fn set_image_mem(&mut self, handle: CameraHandle, memory: MemoryId) -> SdkResult<()>;

    fn free_image_mem(&mut self, handle: CameraHandle, memory: MemoryId) -> SdkResult<()>;

    fn set_pixel_clock(&mut self, handle: CameraHandle, mhz: u32) -> SdkResult<()>;

    /// Request a frame rate; returns the rate the sensor actually runs at
    fn set_frame_rate(&mut self, handle: CameraHandle, fps: f64) -> SdkResult<f64>;

    fn set_exposure(&mut self, handle: CameraHandle, exposure_ms: f64) -> SdkResult<()>;

    /// Capture one frame into the active image memory
    fn freeze_video(&mut self, handle: CameraHandle, wait: bool) -> SdkResult<()>;

    /// Raw contents of an image memory
    fn image_data(&self, handle: CameraHandle, memory: MemoryId) -> SdkResult<&[u8]>;

    fn exit_camera(&mut self, handle: CameraHandle) -> SdkResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(SdkStatus::SUCCESS.to_string(), "0 (SUCCESS)");
        assert_eq!(SdkStatus(42).to_string(), "42");
        assert!(!SdkStatus::INVALID_PARAMETER.is_success());
    }

    #[test]
    fn test_bits_per_pixel() {
        assert_eq!(ColorMode::Bgr8Packed.bits_per_pixel(), 24);
        assert_eq!(ColorMode::Mono8.bits_per_pixel(), 8);
    }
}
