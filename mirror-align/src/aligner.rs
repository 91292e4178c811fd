use std::path::Path;

use hardware::camera::{CameraError, CameraSdk, CameraSession, Frame};
use shared::guide::GuideSet;
use shared::mirror_alignment::{compute_alignment, AlignmentResult};
use tracing::debug;

use crate::controls::{read_guides, ControlSource};
use crate::display::{FrameDisplay, Key};
use crate::overlay::draw_guides;
use crate::AlignError;

/// Camera session plus the guides the operator is lining up on it.
///
/// The aligner owns all three collaborators. Guides are re-read from the
/// control source on every [`render_guides`](Self::render_guides) call and
/// the last set drawn is kept for [`compute_alignment`](Self::compute_alignment).
pub struct MirrorAligner<S: CameraSdk, D: FrameDisplay, C: ControlSource> {
    session: CameraSession<S>,
    display: D,
    controls: C,
    guides: Option<GuideSet>,
}

impl<S: CameraSdk, D: FrameDisplay, C: ControlSource> MirrorAligner<S, D, C> {
    pub fn new(session: CameraSession<S>, display: D, controls: C) -> Self {
        Self {
            session,
            display,
            controls,
            guides: None,
        }
    }

    /// Grab a new frame from the camera
    pub fn capture_frame(&mut self) -> Result<&Frame, AlignError> {
        Ok(self.session.capture_frame()?)
    }

    /// Draw the current guides over the latest frame and show it.
    ///
    /// Returns the key the operator pressed while the frame was up, if any.
    /// The outlines are drawn into the captured frame itself, so a following
    /// [`save_frame`](Self::save_frame) stores the overlay too.
    pub fn render_guides(&mut self) -> Result<Option<Key>, AlignError> {
        let guides = read_guides(&self.controls);
        let frame = self
            .session
            .current_frame_mut()
            .ok_or(CameraError::NoFrame)?;

        draw_guides(frame.image_mut(), &guides);
        self.guides = Some(guides);

        let key = self.display.show(frame.image())?;
        if let Some(key) = key {
            debug!("Key pressed: {key:?}");
        }
        Ok(key)
    }

    /// Convert the guide offsets to millimetres.
    ///
    /// `reference_mm` is the physical side length of the chip carrier. Uses
    /// the guides from the last render, or the live controls if nothing has
    /// been rendered yet.
    pub fn compute_alignment(&self, reference_mm: f64) -> Result<AlignmentResult, AlignError> {
        let guides = self.current_guides();
        Ok(compute_alignment(&guides, reference_mm)?)
    }

    pub fn save_frame(&self, path: &Path) -> Result<(), AlignError> {
        Ok(self.session.save_frame(path)?)
    }

    /// Release the camera; later captures fail with [`CameraError::Closed`]
    pub fn close(&mut self) -> Result<(), AlignError> {
        Ok(self.session.close()?)
    }

    /// Guides from the last render, falling back to the live controls
    pub fn current_guides(&self) -> GuideSet {
        self.guides.unwrap_or_else(|| read_guides(&self.controls))
    }

    /// Guides drawn by the last render
    pub fn last_guides(&self) -> Option<&GuideSet> {
        self.guides.as_ref()
    }

    pub fn session(&self) -> &CameraSession<S> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut CameraSession<S> {
        &mut self.session
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn controls(&self) -> &C {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut C {
        &mut self.controls
    }
}
