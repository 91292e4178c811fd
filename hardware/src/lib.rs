//! Camera acquisition for the mirror alignment bench.
//!
//! The vendor SDK sits behind the [`camera::CameraSdk`] trait; a
//! [`camera::CameraSession`] drives it through open, configure, capture and
//! close, routing every SDK status through an explicit error policy.
//!
//! # Features
//!
//! - `simulated` - Synthetic camera backend usable without hardware (default)

pub mod camera;
