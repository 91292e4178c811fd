//! SDL2 window display.

use std::fmt::Display;

use image::RgbImage;
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::{Color, PixelFormatEnum};
use sdl2::rect::Rect;
use sdl2::render::WindowCanvas;
use sdl2::{EventPump, Sdl};
use tracing::{debug, warn};

use crate::display::{DisplayError, FrameDisplay, Key};

fn backend<E: Display>(context: &'static str) -> impl FnOnce(E) -> DisplayError {
    move |e| DisplayError::Backend(format!("{context}: {e}"))
}

/// Resizable window that letterboxes each frame to fit.
///
/// Printable keys arrive as text input so `+`, `[` and friends work on any
/// layout. Closing the window reports [`Key::Escape`].
pub struct SdlDisplay {
    _context: Sdl,
    canvas: WindowCanvas,
    event_pump: EventPump,
    title: String,
}

impl SdlDisplay {
    pub fn new(title: &str, width: u32, height: u32) -> Result<Self, DisplayError> {
        let context = sdl2::init().map_err(backend("SDL init failed"))?;
        let video = context
            .video()
            .map_err(backend("Video subsystem init failed"))?;
        video.text_input().start();

        let window = video
            .window(title, width, height)
            .position_centered()
            .resizable()
            .build()
            .map_err(backend("Failed to create window"))?;
        let canvas = window
            .into_canvas()
            .build()
            .map_err(backend("Failed to create canvas"))?;
        let event_pump = context
            .event_pump()
            .map_err(backend("Failed to get event pump"))?;

        Ok(Self {
            _context: context,
            canvas,
            event_pump,
            title: title.to_string(),
        })
    }

    fn poll_key(&mut self) -> Option<Key> {
        let mut pressed = None;
        for event in self.event_pump.poll_iter() {
            let key = match event {
                Event::Quit { .. } => Some(Key::Escape),
                Event::TextInput { text, .. } => text.chars().next().map(Key::Char),
                Event::KeyDown {
                    keycode: Some(keycode),
                    ..
                } => match keycode {
                    Keycode::Up => Some(Key::Up),
                    Keycode::Down => Some(Key::Down),
                    Keycode::Left => Some(Key::Left),
                    Keycode::Right => Some(Key::Right),
                    Keycode::Tab => Some(Key::Tab),
                    Keycode::Escape => Some(Key::Escape),
                    _ => None,
                },
                _ => None,
            };
            // First key wins, the rest of the queue is drained
            if pressed.is_none() {
                pressed = key;
            }
        }
        pressed
    }
}

impl FrameDisplay for SdlDisplay {
    fn show(&mut self, image: &RgbImage) -> Result<Option<Key>, DisplayError> {
        let (width, height) = image.dimensions();
        let texture_creator = self.canvas.texture_creator();
        let mut texture = texture_creator
            .create_texture_streaming(PixelFormatEnum::RGB24, width, height)
            .map_err(backend("Failed to create texture"))?;
        texture
            .update(None, image.as_raw(), (width * 3) as usize)
            .map_err(backend("Failed to update texture"))?;

        let (window_width, window_height) = self
            .canvas
            .output_size()
            .map_err(backend("Failed to get output size"))?;
        let scale = (window_width as f32 / width.max(1) as f32)
            .min(window_height as f32 / height.max(1) as f32);
        let scaled_width = (width as f32 * scale) as u32;
        let scaled_height = (height as f32 * scale) as u32;
        let x = (window_width.saturating_sub(scaled_width) / 2) as i32;
        let y = (window_height.saturating_sub(scaled_height) / 2) as i32;
        let dst_rect = Rect::new(x, y, scaled_width, scaled_height);

        self.canvas.set_draw_color(Color::RGB(0, 0, 0));
        self.canvas.clear();
        self.canvas
            .copy(&texture, None, Some(dst_rect))
            .map_err(backend("Failed to copy texture"))?;
        self.canvas.present();

        let key = self.poll_key();
        if let Some(key) = key {
            debug!("SDL key {key:?}");
        }
        Ok(key)
    }

    fn set_status(&mut self, text: &str) {
        let title = format!("{} - {}", self.title, text);
        if let Err(e) = self.canvas.window_mut().set_title(&title) {
            warn!("Failed to set window title: {e}");
        }
    }
}
