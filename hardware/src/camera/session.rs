use std::path::Path;

use shared::image_size::ImageSize;
use tracing::{debug, info, warn};

use super::{
    CameraError, CameraHandle, CameraResult, CameraSdk, ColorMode, ErrorPolicy, Frame, MemoryId,
    SensorInfo, TriggerMode,
};

/// Pixel clock, frame rate and exposure applied together.
///
/// The three interact: exposure must fit inside one frame period
/// (`exposure_ms <= 1000 / frame_rate_fps`) and the achievable frame rate
/// depends on the pixel clock. Nothing here checks that; the SDK decides
/// what to do with incompatible values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureSettings {
    pub pixel_clock_mhz: u32,
    pub frame_rate_fps: f64,
    pub exposure_ms: f64,
}

impl Default for ExposureSettings {
    fn default() -> Self {
        Self {
            pixel_clock_mhz: 24,
            frame_rate_fps: 10.0,
            exposure_ms: 5.0,
        }
    }
}

/// An open camera with its frame buffer and most recent frame.
///
/// Created by [`CameraSession::open`] and released by [`CameraSession::close`]
/// or, failing that, on drop. Closing is idempotent.
pub struct CameraSession<S: CameraSdk> {
    sdk: S,
    handle: CameraHandle,
    policy: ErrorPolicy,
    color_mode: ColorMode,
    sensor: SensorInfo,
    memory: Option<MemoryId>,
    settings: ExposureSettings,
    actual_frame_rate: Option<f64>,
    current: Option<Frame>,
    frames_captured: u64,
    open: bool,
}

impl<S: CameraSdk> CameraSession<S> {
    /// Connect to camera `camera_id` (0 for the first available) and set it up
    /// for software-triggered BGR capture at the default exposure settings.
    ///
    /// Under [`ErrorPolicy::Strict`] the first failing call aborts and
    /// whatever was already acquired is released before returning.
    pub fn open(sdk: S, camera_id: u32, policy: ErrorPolicy) -> CameraResult<Self> {
        let mut session = Self {
            sdk,
            handle: CameraHandle(camera_id),
            policy,
            color_mode: ColorMode::Bgr8Packed,
            sensor: SensorInfo::default(),
            memory: None,
            settings: ExposureSettings::default(),
            actual_frame_rate: None,
            current: None,
            frames_captured: 0,
            open: false,
        };

        debug!("Attempt to open camera {camera_id}");
        if let Some(handle) = policy.check("init_camera", session.sdk.init_camera(camera_id))? {
            session.handle = handle;
        }
        session.open = true;
        let handle = session.handle;

        debug!("Set colour mode to {:?}", session.color_mode);
        policy.check(
            "set_color_mode",
            session.sdk.set_color_mode(handle, session.color_mode),
        )?;

        debug!("Ask camera for info");
        match policy.check("sensor_info", session.sdk.sensor_info(handle))? {
            Some(info) => session.sensor = info,
            None => warn!("No sensor info; frames will be empty"),
        }
        info!(
            "Camera {} ({}) sensor {}",
            camera_id, session.sensor.sensor_name, session.sensor.max_size
        );

        debug!("Set trigger");
        policy.check(
            "set_trigger",
            session.sdk.set_trigger(handle, TriggerMode::Software),
        )?;

        debug!("Allocate memory");
        let size = session.sensor.max_size;
        let bits = session.color_mode.bits_per_pixel();
        if let Some(memory) = policy.check(
            "alloc_image_mem",
            session.sdk.alloc_image_mem(handle, size, bits),
        )? {
            session.memory = Some(memory);
            policy.check("set_image_mem", session.sdk.set_image_mem(handle, memory))?;
        }

        session.configure(ExposureSettings::default())?;
        Ok(session)
    }

    /// Change pixel clock, frame rate and exposure in one go.
    ///
    /// Values go to the SDK unvalidated; see [`ExposureSettings`].
    pub fn configure(&mut self, settings: ExposureSettings) -> CameraResult<()> {
        self.ensure_open()?;
        info!(
            "Set pixel clock {} MHz, frame rate {} fps, exposure {} ms",
            settings.pixel_clock_mhz, settings.frame_rate_fps, settings.exposure_ms
        );
        let handle = self.handle;

        self.policy.check(
            "set_pixel_clock",
            self.sdk.set_pixel_clock(handle, settings.pixel_clock_mhz),
        )?;

        if let Some(actual) = self.policy.check(
            "set_frame_rate",
            self.sdk.set_frame_rate(handle, settings.frame_rate_fps),
        )? {
            debug!("New frame rate {actual}");
            self.actual_frame_rate = Some(actual);
        }

        self.policy.check(
            "set_exposure",
            self.sdk.set_exposure(handle, settings.exposure_ms),
        )?;

        self.settings = settings;
        Ok(())
    }

    /// Trigger one exposure, wait for it and make it the current frame.
    ///
    /// Under [`ErrorPolicy::Advisory`] a failed capture still yields a frame
    /// of sensor size: the stale buffer contents, or black if there is no
    /// usable buffer.
    pub fn capture_frame(&mut self) -> CameraResult<&Frame> {
        self.ensure_open()?;
        let handle = self.handle;
        let policy = self.policy;

        debug!("Take image");
        policy.check("freeze_video", self.sdk.freeze_video(handle, true))?;

        let size = self.sensor.max_size;
        let line_increment = size.line_increment(self.color_mode.bits_per_pixel());
        let frame_number = self.frames_captured + 1;

        let frame = match self.memory {
            Some(memory) => match policy.check("image_data", self.sdk.image_data(handle, memory))? {
                Some(data) => match Frame::from_bgr_packed(data, size, line_increment, frame_number)
                {
                    Ok(frame) => frame,
                    Err(e) => {
                        policy.escalate(e)?;
                        Frame::blank(size, frame_number)
                    }
                },
                None => Frame::blank(size, frame_number),
            },
            None => {
                policy.escalate(CameraError::BufferSize {
                    expected: line_increment * size.height,
                    actual: 0,
                })?;
                Frame::blank(size, frame_number)
            }
        };

        self.frames_captured = frame_number;
        debug!("Image of dims {} taken", frame.size());
        Ok(&*self.current.insert(frame))
    }

    /// Write the current frame to `path`; the extension picks the format
    pub fn save_frame(&self, path: &Path) -> CameraResult<()> {
        info!("Save image as {}", path.display());
        let frame = self.current.as_ref().ok_or(CameraError::NoFrame)?;
        frame.save(path)?;
        debug!("Saved frame {} to {}", frame.frame_number(), path.display());
        Ok(())
    }

    /// Release the frame buffer and the camera.
    ///
    /// Safe to call any number of times; only the first call talks to the
    /// SDK. Both release steps are attempted even if the first one fails.
    pub fn close(&mut self) -> CameraResult<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        let handle = self.handle;

        debug!("Close camera {}", handle.0);
        let freed = self.memory.take().map(|memory| {
            self.policy
                .check("free_image_mem", self.sdk.free_image_mem(handle, memory))
        });
        let exited = self
            .policy
            .check("exit_camera", self.sdk.exit_camera(handle));

        if let Some(result) = freed {
            result?;
        }
        exited?;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    /// Full sensor dimensions; every frame has this size
    pub fn sensor_size(&self) -> ImageSize {
        self.sensor.max_size
    }

    pub fn sensor_info(&self) -> &SensorInfo {
        &self.sensor
    }

    /// Settings last requested through [`configure`](Self::configure)
    pub fn settings(&self) -> ExposureSettings {
        self.settings
    }

    /// Frame rate the SDK reported after the last configure, if any
    pub fn actual_frame_rate(&self) -> Option<f64> {
        self.actual_frame_rate
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.current.as_ref()
    }

    pub fn current_frame_mut(&mut self) -> Option<&mut Frame> {
        self.current.as_mut()
    }

    pub fn frames_captured(&self) -> u64 {
        self.frames_captured
    }

    pub fn sdk(&self) -> &S {
        &self.sdk
    }

    fn ensure_open(&self) -> CameraResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(CameraError::Closed)
        }
    }
}

impl<S: CameraSdk> Drop for CameraSession<S> {
    fn drop(&mut self) {
        if self.open {
            debug!("Camera session dropped while open, releasing");
            if let Err(e) = self.close() {
                warn!("Failed to release camera {}: {e}", self.handle.0);
            }
        }
    }
}

#[cfg(all(test, feature = "simulated"))]
mod tests {
    use super::*;
    use crate::camera::simulated::SimulatedSdk;
    use crate::camera::SdkStatus;
    use std::sync::atomic::Ordering;

    fn sensor() -> ImageSize {
        ImageSize::from_width_height(320, 240)
    }

    #[test]
    fn test_open_reads_sensor_size() {
        let session = CameraSession::open(SimulatedSdk::new(sensor()), 0, ErrorPolicy::Strict)
            .unwrap();
        assert!(session.is_open());
        assert_eq!(session.sensor_size(), sensor());
        assert_eq!(session.settings(), ExposureSettings::default());
        assert_eq!(session.actual_frame_rate(), Some(10.0));
    }

    #[test]
    fn test_capture_has_sensor_dimensions() {
        let mut session =
            CameraSession::open(SimulatedSdk::new(sensor()), 0, ErrorPolicy::Strict).unwrap();

        let frame = session.capture_frame().unwrap();
        assert_eq!(frame.size(), sensor());
        assert_eq!(frame.frame_number(), 1);

        session.capture_frame().unwrap();
        assert_eq!(session.frames_captured(), 2);
        assert_eq!(session.current_frame().unwrap().frame_number(), 2);
    }

    #[test]
    fn test_save_without_frame() {
        let session =
            CameraSession::open(SimulatedSdk::new(sensor()), 0, ErrorPolicy::Advisory).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = session.save_frame(&dir.path().join("x.png")).unwrap_err();
        assert!(matches!(err, CameraError::NoFrame));
    }

    #[test]
    fn test_close_twice_is_safe() {
        let sdk = SimulatedSdk::new(sensor());
        let exits = sdk.exit_counter();
        let mut session = CameraSession::open(sdk, 0, ErrorPolicy::Strict).unwrap();

        session.close().unwrap();
        session.close().unwrap();
        assert!(!session.is_open());
        assert_eq!(exits.load(Ordering::SeqCst), 1);

        drop(session);
        assert_eq!(exits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases_camera() {
        let sdk = SimulatedSdk::new(sensor());
        let exits = sdk.exit_counter();
        {
            let mut session = CameraSession::open(sdk, 0, ErrorPolicy::Advisory).unwrap();
            session.capture_frame().unwrap();
        }
        assert_eq!(exits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_closed_session_refuses_capture() {
        let mut session =
            CameraSession::open(SimulatedSdk::new(sensor()), 0, ErrorPolicy::Advisory).unwrap();
        session.close().unwrap();
        assert!(matches!(session.capture_frame(), Err(CameraError::Closed)));
        assert!(matches!(
            session.configure(ExposureSettings::default()),
            Err(CameraError::Closed)
        ));
    }

    #[test]
    fn test_strict_open_failure_releases_camera() {
        let sdk = SimulatedSdk::new(sensor()).with_failure("set_trigger");
        let exits = sdk.exit_counter();

        let err = CameraSession::open(sdk, 0, ErrorPolicy::Strict)
            .err()
            .expect("open should fail");
        assert!(matches!(
            err,
            CameraError::Sdk {
                call: "set_trigger",
                ..
            }
        ));
        assert_eq!(exits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_advisory_open_continues_past_failure() {
        let sdk = SimulatedSdk::new(sensor()).with_failure("set_trigger");
        let mut session = CameraSession::open(sdk, 0, ErrorPolicy::Advisory).unwrap();
        assert!(session.capture_frame().is_ok());
    }

    #[test]
    fn test_advisory_missing_memory_gives_blank_frame() {
        let sdk = SimulatedSdk::new(sensor()).with_failure("alloc_image_mem");
        let mut session = CameraSession::open(sdk, 0, ErrorPolicy::Advisory).unwrap();

        let frame = session.capture_frame().unwrap();
        assert_eq!(frame.size(), sensor());
        assert!(frame.image().pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_strict_capture_failure() {
        let sdk = SimulatedSdk::new(sensor()).with_failure("freeze_video");
        let mut session = CameraSession::open(sdk, 0, ErrorPolicy::Strict).unwrap();
        let err = session.capture_frame().unwrap_err();
        assert!(matches!(
            err,
            CameraError::Sdk {
                call: "freeze_video",
                status: SdkStatus::NO_SUCCESS
            }
        ));
    }

    #[test]
    fn test_unknown_camera_strict_vs_advisory() {
        let strict = CameraSession::open(SimulatedSdk::new(sensor()), 7, ErrorPolicy::Strict);
        assert!(matches!(
            strict.err(),
            Some(CameraError::Sdk {
                call: "init_camera",
                status: SdkStatus::CANT_OPEN_DEVICE
            })
        ));

        let advisory =
            CameraSession::open(SimulatedSdk::new(sensor()), 7, ErrorPolicy::Advisory).unwrap();
        assert!(advisory.is_open());
        assert_eq!(advisory.sensor_size(), ImageSize::default());
    }

    #[test]
    fn test_configure_passes_values_through() {
        let mut session =
            CameraSession::open(SimulatedSdk::new(sensor()), 0, ErrorPolicy::Strict).unwrap();
        let settings = ExposureSettings {
            pixel_clock_mhz: 30,
            frame_rate_fps: 20.0,
            exposure_ms: 2.5,
        };
        session.configure(settings).unwrap();

        assert_eq!(session.settings(), settings);
        assert_eq!(session.sdk().exposure_ms(), 2.5);
        assert_eq!(session.sdk().pixel_clock_mhz(), 30);
    }
}
