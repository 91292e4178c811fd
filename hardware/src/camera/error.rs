use thiserror::Error;
use tracing::{debug, warn};

use super::{SdkResult, SdkStatus};

/// Errors surfaced by a camera session
#[derive(Error, Debug)]
pub enum CameraError {
    /// An SDK call failed and the policy escalated it
    #[error("SDK call {call} failed with status {status}")]
    Sdk {
        call: &'static str,
        status: SdkStatus,
    },

    /// Image memory was missing or too small for a full frame
    #[error("Image memory holds {actual} bytes, frame needs {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("No frame has been captured yet")]
    NoFrame,

    #[error("Camera session is closed")]
    Closed,

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type CameraResult<T> = Result<T, CameraError>;

/// How failed SDK calls are treated.
///
/// Cameras on the bench regularly return odd statuses for calls that still
/// half-work, so the default is to log and carry on with whatever the driver
/// produced. `Strict` turns every failure into an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Log failures at warn level and continue
    #[default]
    Advisory,
    /// Return the first failure to the caller
    Strict,
}

impl ErrorPolicy {
    /// Route one SDK call's outcome through the policy.
    ///
    /// Returns `Ok(Some(value))` on success, `Ok(None)` for a tolerated
    /// failure and `Err` for an escalated one.
    pub fn check<T>(&self, call: &'static str, result: SdkResult<T>) -> CameraResult<Option<T>> {
        match result {
            Ok(value) => {
                debug!("{call}: camera says {}", SdkStatus::SUCCESS);
                Ok(Some(value))
            }
            Err(status) => {
                debug!("{call}: camera says {status}");
                self.escalate(CameraError::Sdk { call, status })?;
                Ok(None)
            }
        }
    }

    /// Apply the policy to a non-SDK failure
    pub fn escalate(&self, error: CameraError) -> CameraResult<()> {
        match self {
            ErrorPolicy::Advisory => {
                warn!("Ignoring camera failure: {error}");
                Ok(())
            }
            ErrorPolicy::Strict => Err(error),
        }
    }
}
