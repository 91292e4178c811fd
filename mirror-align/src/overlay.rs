//! Guide outlines drawn into a frame.
//!
//! Shapes are 1 px outlines in the guide's colour. Anything falling outside
//! the image is clipped; the image dimensions never change.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use shared::guide::{Guide, GuideKind, GuideSet};

/// Outline one guide onto `image`
pub fn draw_guide(image: &mut RgbImage, guide: &Guide) {
    let color = Rgb(guide.color);
    match guide.kind {
        GuideKind::Rectangle => {
            let ((x1, y1), (x2, y2)) = guide.corners();
            // Corners are inclusive, so a half extent h spans 2h + 1 pixels
            let span = |a: i32, b: i32| (b as i64 - a as i64 + 1).clamp(1, u32::MAX as i64) as u32;
            let width = span(x1, x2);
            let height = span(y1, y2);
            draw_hollow_rect_mut(image, Rect::at(x1, y1).of_size(width, height), color);
        }
        GuideKind::Circle => {
            draw_hollow_circle_mut(image, (guide.x, guide.y), guide.radius().max(0), color);
        }
    }
}

/// Outline all guides, chip first and extra last
pub fn draw_guides(image: &mut RgbImage, guides: &GuideSet) {
    for guide in guides.iter() {
        draw_guide(image, guide);
    }
}
