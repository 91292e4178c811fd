//! Shared components for the mirror alignment bench.
//!
//! Holds the pieces that do not depend on camera hardware or a display:
//! image dimensions, the operator guides and their pixel geometry, the
//! pixel-to-millimetre measurement, and on-disk storage of results.

#[cfg(feature = "config-storage")]
pub mod config_storage;
pub mod guide;
pub mod image_size;
pub mod mirror_alignment;
