//! Interactive alignment of a MEMS mirror package under a camera.
//!
//! A [`MirrorAligner`] owns a camera session, a frame display and a control
//! source. Each render reads the three guide placements from the controls,
//! outlines them on the current frame and shows it. Once the operator has
//! matched the guides to the chip carrier, the mirror and the extra feature,
//! the pixel offsets are converted to millimetres using the chip carrier's
//! known size.
//!
//! # Features
//!
//! - `sdl2` - Native window display ([`sdl_display::SdlDisplay`])

pub mod aligner;
pub mod camera_init;
pub mod controls;
pub mod display;
pub mod overlay;
#[cfg(feature = "sdl2")]
pub mod sdl_display;

pub use aligner::MirrorAligner;
pub use controls::{ControlPanel, ControlSource};
pub use display::{DisplayError, FrameDisplay, Key};

use hardware::camera::CameraError;
use shared::mirror_alignment::AlignmentError;
use thiserror::Error;

/// Anything that can go wrong while aligning
#[derive(Error, Debug)]
pub enum AlignError {
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Alignment error: {0}")]
    Alignment(#[from] AlignmentError),

    #[error("Display error: {0}")]
    Display(#[from] DisplayError),
}
