//! Synthetic camera that renders a chip-and-mirror scene.
//!
//! Behaves like a single connected color camera: ids 0 and 1 open it, any
//! other id fails. Timing parameters are range-checked the way the real
//! driver does and the rendered brightness follows the exposure time, so
//! the whole session code path runs without hardware.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use shared::image_size::ImageSize;
use tracing::debug;

use super::{
    CameraHandle, CameraSdk, ColorMode, MemoryId, SdkResult, SdkStatus, SensorInfo, TriggerMode,
};

const HANDLE: CameraHandle = CameraHandle(1);
const PIXEL_CLOCK_RANGE: std::ops::RangeInclusive<u32> = 5..=43;
const BACKGROUND: [u8; 3] = [25, 25, 25];
const CARRIER: [u8; 3] = [180, 150, 60];
const MIRROR: [u8; 3] = [200, 205, 210];
const HOLE: [u8; 3] = [8, 8, 8];
/// Exposure at which the scene renders at nominal brightness
const NOMINAL_EXPOSURE_MS: f64 = 5.0;

struct ImageMemory {
    id: MemoryId,
    data: Vec<u8>,
}

pub struct SimulatedSdk {
    sensor_size: ImageSize,
    open: bool,
    color_mode: ColorMode,
    trigger: TriggerMode,
    pixel_clock_mhz: u32,
    frame_rate_fps: f64,
    exposure_ms: f64,
    memories: Vec<ImageMemory>,
    active_memory: Option<MemoryId>,
    next_memory: i32,
    frames: u64,
    failing: HashSet<&'static str>,
    exits: Arc<AtomicUsize>,
}

impl SimulatedSdk {
    pub fn new(sensor_size: ImageSize) -> Self {
        Self {
            sensor_size,
            open: false,
            color_mode: ColorMode::Bgr8Packed,
            trigger: TriggerMode::Freerun,
            pixel_clock_mhz: 24,
            frame_rate_fps: 10.0,
            exposure_ms: NOMINAL_EXPOSURE_MS,
            memories: Vec::new(),
            active_memory: None,
            next_memory: 1,
            frames: 0,
            failing: HashSet::new(),
            exits: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make every call named `call` fail with `NO_SUCCESS`
    pub fn with_failure(mut self, call: &'static str) -> Self {
        self.failing.insert(call);
        self
    }

    /// Counts `exit_camera` calls; stays readable after the SDK is dropped
    pub fn exit_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.exits)
    }

    pub fn pixel_clock_mhz(&self) -> u32 {
        self.pixel_clock_mhz
    }

    pub fn frame_rate_fps(&self) -> f64 {
        self.frame_rate_fps
    }

    pub fn exposure_ms(&self) -> f64 {
        self.exposure_ms
    }

    pub fn trigger(&self) -> TriggerMode {
        self.trigger
    }

    /// Number of image memories currently allocated
    pub fn allocated_memories(&self) -> usize {
        self.memories.len()
    }

    fn call(&self, name: &'static str, handle: CameraHandle) -> SdkResult<()> {
        if self.failing.contains(name) {
            debug!("Simulated failure for {name}");
            return Err(SdkStatus::NO_SUCCESS);
        }
        if !self.open || handle != HANDLE {
            return Err(SdkStatus::INVALID_HANDLE);
        }
        Ok(())
    }

    /// Highest frame rate the sensor reaches at the current pixel clock
    fn max_frame_rate(&self) -> f64 {
        let pixels = self.sensor_size.pixel_count().max(1) as f64;
        self.pixel_clock_mhz as f64 * 1.0e6 / pixels
    }

    fn memory_mut(&mut self, id: MemoryId) -> Option<&mut ImageMemory> {
        self.memories.iter_mut().find(|m| m.id == id)
    }

    fn render(&self, frame: u64) -> Vec<u8> {
        let size = self.sensor_size;
        let bytes = (self.color_mode.bits_per_pixel() / 8) as usize;
        let line = size.line_increment(self.color_mode.bits_per_pixel());
        let mut data = vec![0u8; line * size.height];

        let (w, h) = (size.width as i64, size.height as i64);
        let (cx, cy) = (w / 2, h / 2);
        let half = w.min(h) / 5;
        let mirror_r = half / 2;
        let (mx, my) = (cx + half / 8, cy - half / 10);
        let hole_r = (half / 10).max(1);
        let (hx, hy) = (cx - half + 2 * hole_r, cy + half - 2 * hole_r);

        let gain = self.exposure_ms / NOMINAL_EXPOSURE_MS;
        let flicker = 1.0 + 0.02 * ((frame % 7) as f64 - 3.0) / 3.0;
        let scale = gain * flicker;

        for y in 0..h {
            for x in 0..w {
                let inside = |ox: i64, oy: i64, r: i64| (x - ox).pow(2) + (y - oy).pow(2) <= r * r;
                let rgb = if inside(hx, hy, hole_r) {
                    HOLE
                } else if inside(mx, my, mirror_r) {
                    MIRROR
                } else if (x - cx).abs() <= half && (y - cy).abs() <= half {
                    CARRIER
                } else {
                    BACKGROUND
                };

                let level = |c: u8| (c as f64 * scale).round().clamp(0.0, 255.0) as u8;
                let offset = y as usize * line + x as usize * bytes;
                let px = &mut data[offset..offset + bytes];
                match self.color_mode {
                    ColorMode::Bgr8Packed => {
                        px.copy_from_slice(&[level(rgb[2]), level(rgb[1]), level(rgb[0])])
                    }
                    ColorMode::Rgb8Packed => {
                        px.copy_from_slice(&[level(rgb[0]), level(rgb[1]), level(rgb[2])])
                    }
                    ColorMode::Mono8 => {
                        let luma = (rgb[0] as u32 * 299 + rgb[1] as u32 * 587 + rgb[2] as u32 * 114)
                            / 1000;
                        px[0] = level(luma as u8);
                    }
                }
            }
        }
        data
    }
}

impl CameraSdk for SimulatedSdk {
    fn init_camera(&mut self, camera_id: u32) -> SdkResult<CameraHandle> {
        if self.failing.contains("init_camera") {
            return Err(SdkStatus::NO_SUCCESS);
        }
        match camera_id {
            0 | 1 => {
                self.open = true;
                debug!("Simulated camera {camera_id} opened");
                Ok(HANDLE)
            }
            _ => Err(SdkStatus::CANT_OPEN_DEVICE),
        }
    }

    fn set_color_mode(&mut self, handle: CameraHandle, mode: ColorMode) -> SdkResult<()> {
        self.call("set_color_mode", handle)?;
        self.color_mode = mode;
        Ok(())
    }

    fn sensor_info(&mut self, handle: CameraHandle) -> SdkResult<SensorInfo> {
        self.call("sensor_info", handle)?;
        Ok(SensorInfo {
            sensor_name: "Simulated".to_string(),
            max_size: self.sensor_size,
            is_color: true,
        })
    }

    fn set_trigger(&mut self, handle: CameraHandle, mode: TriggerMode) -> SdkResult<()> {
        self.call("set_trigger", handle)?;
        self.trigger = mode;
        Ok(())
    }

    fn alloc_image_mem(
        &mut self,
        handle: CameraHandle,
        size: ImageSize,
        bits_per_pixel: u32,
    ) -> SdkResult<MemoryId> {
        self.call("alloc_image_mem", handle)?;
        if size.is_empty() || bits_per_pixel == 0 {
            return Err(SdkStatus::INVALID_PARAMETER);
        }
        let id = MemoryId(self.next_memory);
        self.next_memory += 1;
        self.memories.push(ImageMemory {
            id,
            data: vec![0; size.buffer_len(bits_per_pixel)],
        });
        Ok(id)
    }

    fn set_image_mem(&mut self, handle: CameraHandle, memory: MemoryId) -> SdkResult<()> {
        self.call("set_image_mem", handle)?;
        if self.memories.iter().all(|m| m.id != memory) {
            return Err(SdkStatus::INVALID_PARAMETER);
        }
        self.active_memory = Some(memory);
        Ok(())
    }

    fn free_image_mem(&mut self, handle: CameraHandle, memory: MemoryId) -> SdkResult<()> {
        self.call("free_image_mem", handle)?;
        let before = self.memories.len();
        self.memories.retain(|m| m.id != memory);
        if self.memories.len() == before {
            return Err(SdkStatus::INVALID_PARAMETER);
        }
        if self.active_memory == Some(memory) {
            self.active_memory = None;
        }
        Ok(())
    }

    fn set_pixel_clock(&mut self, handle: CameraHandle, mhz: u32) -> SdkResult<()> {
        self.call("set_pixel_clock", handle)?;
        if !PIXEL_CLOCK_RANGE.contains(&mhz) {
            return Err(SdkStatus::INVALID_PARAMETER);
        }
        self.pixel_clock_mhz = mhz;
        Ok(())
    }

    fn set_frame_rate(&mut self, handle: CameraHandle, fps: f64) -> SdkResult<f64> {
        self.call("set_frame_rate", handle)?;
        if !(fps.is_finite() && fps > 0.0) {
            return Err(SdkStatus::INVALID_PARAMETER);
        }
        self.frame_rate_fps = fps.min(self.max_frame_rate());
        Ok(self.frame_rate_fps)
    }

    fn set_exposure(&mut self, handle: CameraHandle, exposure_ms: f64) -> SdkResult<()> {
        self.call("set_exposure", handle)?;
        if !(exposure_ms.is_finite() && exposure_ms > 0.0) {
            return Err(SdkStatus::INVALID_PARAMETER);
        }
        let period_ms = 1000.0 / self.frame_rate_fps;
        self.exposure_ms = exposure_ms.min(period_ms);
        Ok(())
    }

    fn freeze_video(&mut self, handle: CameraHandle, wait: bool) -> SdkResult<()> {
        self.call("freeze_video", handle)?;
        let active = self.active_memory.ok_or(SdkStatus::NO_SUCCESS)?;
        if wait {
            // Blocks for the exposure like the real driver
            thread::sleep(Duration::from_secs_f64(self.exposure_ms / 1000.0));
        }
        self.frames += 1;
        let rendered = self.render(self.frames);
        let memory = self.memory_mut(active).ok_or(SdkStatus::NO_SUCCESS)?;
        let n = rendered.len().min(memory.data.len());
        memory.data[..n].copy_from_slice(&rendered[..n]);
        Ok(())
    }

    fn image_data(&self, handle: CameraHandle, memory: MemoryId) -> SdkResult<&[u8]> {
        self.call("image_data", handle)?;
        self.memories
            .iter()
            .find(|m| m.id == memory)
            .map(|m| m.data.as_slice())
            .ok_or(SdkStatus::INVALID_PARAMETER)
    }

    fn exit_camera(&mut self, handle: CameraHandle) -> SdkResult<()> {
        self.exits.fetch_add(1, Ordering::SeqCst);
        self.call("exit_camera", handle)?;
        self.open = false;
        self.memories.clear();
        self.active_memory = None;
        Ok(())
    }
}
