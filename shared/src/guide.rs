//! Operator guides drawn over the camera feed.
//!
//! A guide is a shape the operator slides and resizes until it sits on a
//! physical feature in the image. The chip carrier gets a square, the
//! mirror and the optional extra feature get circles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outline colours in RGB order
pub const CHIP_COLOR: [u8; 3] = [0, 255, 0];
pub const MIRROR_COLOR: [u8; 3] = [0, 0, 255];
pub const EXTRA_COLOR: [u8; 3] = [255, 0, 0];

/// Shape used to draw a guide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuideKind {
    /// Axis-aligned square with side `size`
    Rectangle,
    /// Circle with diameter `size`
    Circle,
}

/// Which of the three guides a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GuideRole {
    Chip,
    Mirror,
    Extra,
}

impl GuideRole {
    pub const ALL: [GuideRole; 3] = [GuideRole::Chip, GuideRole::Mirror, GuideRole::Extra];

    /// Label prefix used for this guide's controls
    pub fn label(&self) -> &'static str {
        match self {
            GuideRole::Chip => "Chip",
            GuideRole::Mirror => "Mirror",
            GuideRole::Extra => "Extra",
        }
    }

    pub fn kind(&self) -> GuideKind {
        match self {
            GuideRole::Chip => GuideKind::Rectangle,
            GuideRole::Mirror | GuideRole::Extra => GuideKind::Circle,
        }
    }

    pub fn color(&self) -> [u8; 3] {
        match self {
            GuideRole::Chip => CHIP_COLOR,
            GuideRole::Mirror => MIRROR_COLOR,
            GuideRole::Extra => EXTRA_COLOR,
        }
    }

    /// Default (x, y, size) before the operator touches anything
    pub fn default_placement(&self) -> (i32, i32, i32) {
        match self {
            GuideRole::Chip | GuideRole::Mirror => (640, 512, 200),
            GuideRole::Extra => (640, 512, 25),
        }
    }
}

impl fmt::Display for GuideRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single guide in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guide {
    pub kind: GuideKind,
    /// Centre X in pixels
    pub x: i32,
    /// Centre Y in pixels
    pub y: i32,
    /// Side length (rectangle) or diameter (circle) in pixels
    pub size: i32,
    /// Outline colour, RGB
    pub color: [u8; 3],
}

impl Guide {
    pub fn new(kind: GuideKind, x: i32, y: i32, size: i32, color: [u8; 3]) -> Self {
        Self {
            kind,
            x,
            y,
            size,
            color,
        }
    }

    /// Guide for `role` at the given placement, with that role's shape and colour
    pub fn for_role(role: GuideRole, x: i32, y: i32, size: i32) -> Self {
        Self::new(role.kind(), x, y, size, role.color())
    }

    /// Half of the size, truncated.
    ///
    /// Odd sizes lose a pixel here: a 201 px guide has a half extent of 100.
    pub fn half_extent(&self) -> i32 {
        self.size / 2
    }

    /// Top-left and bottom-right corners (inclusive) of the rectangle outline
    pub fn corners(&self) -> ((i32, i32), (i32, i32)) {
        let half = self.half_extent();
        (
            (self.x.saturating_sub(half), self.y.saturating_sub(half)),
            (self.x.saturating_add(half), self.y.saturating_add(half)),
        )
    }

    /// Radius of the circle outline
    pub fn radius(&self) -> i32 {
        self.half_extent()
    }
}

/// The three guides the operator aligns, as observed at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuideSet {
    pub chip: Guide,
    pub mirror: Guide,
    pub extra: Guide,
}

impl GuideSet {
    pub fn get(&self, role: GuideRole) -> &Guide {
        match role {
            GuideRole::Chip => &self.chip,
            GuideRole::Mirror => &self.mirror,
            GuideRole::Extra => &self.extra,
        }
    }

    /// Guides in draw order: chip, mirror, extra
    pub fn iter(&self) -> impl Iterator<Item = &Guide> {
        [&self.chip, &self.mirror, &self.extra].into_iter()
    }
}

impl Default for GuideSet {
    fn default() -> Self {
        let place = |role: GuideRole| {
            let (x, y, size) = role.default_placement();
            Guide::for_role(role, x, y, size)
        };
        Self {
            chip: place(GuideRole::Chip),
            mirror: place(GuideRole::Mirror),
            extra: place(GuideRole::Extra),
        }
    }
}
