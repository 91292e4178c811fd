//! Where rendered frames go and where key presses come from.

use std::collections::VecDeque;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::{Receiver, TryRecvError};
use image::RgbImage;
use shared::image_size::ImageSize;
use thiserror::Error;
use tracing::{debug, info};

/// A key press reported by a display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Up,
    Down,
    Left,
    Right,
    Tab,
    Escape,
}

#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("Failed to write preview: {0}")]
    Preview(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Display backend error: {0}")]
    Backend(String),
}

/// Shows frames to the operator and reports keys pressed while they look.
pub trait FrameDisplay {
    /// Present `image`, poll briefly for input and return the key pressed,
    /// if any. Must not block waiting for a key.
    fn show(&mut self, image: &RgbImage) -> Result<Option<Key>, DisplayError>;

    /// One-line status for the operator (selected guide, step size, ...)
    fn set_status(&mut self, _text: &str) {}
}

impl<D: FrameDisplay + ?Sized> FrameDisplay for Box<D> {
    fn show(&mut self, image: &RgbImage) -> Result<Option<Key>, DisplayError> {
        (**self).show(image)
    }

    fn set_status(&mut self, text: &str) {
        (**self).set_status(text)
    }
}

/// Pick the display for a binary.
///
/// With a `preview` path, or when built without the `sdl2` feature, frames
/// go to a [`TerminalDisplay`] preview file (default `<title>_preview.png`).
/// Otherwise an SDL window sized to the sensor is opened.
pub fn open_display(
    title: &str,
    preview: Option<PathBuf>,
    preview_every: u64,
    size: ImageSize,
) -> Result<Box<dyn FrameDisplay>, DisplayError> {
    info!("Frames are {size}");
    #[cfg(feature = "sdl2")]
    {
        if preview.is_none() {
            let (width, height) = size.to_u32();
            let display = crate::sdl_display::SdlDisplay::new(title, width, height)?;
            return Ok(Box::new(display));
        }
    }

    let path = preview.unwrap_or_else(|| PathBuf::from(format!("{title}_preview.png")));
    Ok(Box::new(TerminalDisplay::new(path, preview_every)))
}

/// Headless display that replays a fixed key sequence.
///
/// Each `show` consumes one scripted entry; once the script runs out every
/// call reports no key. Frame sizes and status lines are recorded.
#[derive(Debug, Default)]
pub struct ScriptedDisplay {
    script: VecDeque<Option<Key>>,
    shown: Vec<ImageSize>,
    statuses: Vec<String>,
    last_image: Option<RgbImage>,
}

impl ScriptedDisplay {
    pub fn new<I>(script: I) -> Self
    where
        I: IntoIterator<Item = Option<Key>>,
    {
        Self {
            script: script.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Script that presses `keys` one per frame
    pub fn pressing(keys: &[Key]) -> Self {
        Self::new(keys.iter().copied().map(Some))
    }

    pub fn frames_shown(&self) -> usize {
        self.shown.len()
    }

    pub fn shown_sizes(&self) -> &[ImageSize] {
        &self.shown
    }

    pub fn statuses(&self) -> &[String] {
        &self.statuses
    }

    /// Copy of the most recently shown image
    pub fn last_image(&self) -> Option<&RgbImage> {
        self.last_image.as_ref()
    }
}

impl FrameDisplay for ScriptedDisplay {
    fn show(&mut self, image: &RgbImage) -> Result<Option<Key>, DisplayError> {
        self.shown.push(ImageSize::of_image(image));
        self.last_image = Some(image.clone());
        Ok(self.script.pop_front().flatten())
    }

    fn set_status(&mut self, text: &str) {
        self.statuses.push(text.to_string());
    }
}

/// Display for machines without a window system.
///
/// Every `preview_every`th frame is written to `preview_path` for an image
/// viewer to pick up. Keys are typed on stdin followed by Enter; see
/// [`parse_key_line`] for the accepted spellings. End of input counts as
/// Escape.
pub struct TerminalDisplay {
    preview_path: PathBuf,
    preview_every: u64,
    frames_shown: u64,
    keys: Receiver<Key>,
    input_closed: bool,
    status: String,
}

impl TerminalDisplay {
    /// Start reading keys from stdin on a background thread
    pub fn new(preview_path: PathBuf, preview_every: u64) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                for key in parse_key_line(&line) {
                    if tx.send(key).is_err() {
                        return;
                    }
                }
            }
            debug!("stdin closed, key reader exiting");
        });
        Self::with_keys(preview_path, preview_every, rx)
    }

    /// Use an existing key channel instead of stdin
    pub fn with_keys(preview_path: PathBuf, preview_every: u64, keys: Receiver<Key>) -> Self {
        info!(
            "Writing preview to {} every {} frame(s)",
            preview_path.display(),
            preview_every.max(1)
        );
        Self {
            preview_path,
            preview_every: preview_every.max(1),
            frames_shown: 0,
            keys,
            input_closed: false,
            status: String::new(),
        }
    }

    pub fn preview_path(&self) -> &Path {
        &self.preview_path
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }

    fn poll_key(&mut self) -> Option<Key> {
        if self.input_closed {
            return None;
        }
        match self.keys.try_recv() {
            Ok(key) => Some(key),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                info!("Key input closed, treating as Escape");
                self.input_closed = true;
                Some(Key::Escape)
            }
        }
    }
}

impl FrameDisplay for TerminalDisplay {
    fn show(&mut self, image: &RgbImage) -> Result<Option<Key>, DisplayError> {
        if self.frames_shown % self.preview_every == 0 {
            image.save(&self.preview_path)?;
        }
        self.frames_shown += 1;
        Ok(self.poll_key())
    }

    fn set_status(&mut self, text: &str) {
        if text != self.status {
            eprintln!("{text}");
            self.status = text.to_string();
        }
    }
}

/// Translate one line typed on the terminal into key presses.
///
/// Whole-word names `up`, `down`, `left`, `right`, `tab`, `esc`/`escape`
/// produce the matching special key; anything else produces one
/// [`Key::Char`] per non-whitespace character, so `ddd` moves right three
/// steps.
pub fn parse_key_line(line: &str) -> Vec<Key> {
    let mut keys = Vec::new();
    for word in line.split_whitespace() {
        let special = match word.to_ascii_lowercase().as_str() {
            "up" => Some(Key::Up),
            "down" => Some(Key::Down),
            "left" => Some(Key::Left),
            "right" => Some(Key::Right),
            "tab" => Some(Key::Tab),
            "esc" | "escape" => Some(Key::Escape),
            _ => None,
        };
        match special {
            Some(key) => keys.push(key),
            None => keys.extend(word.chars().map(Key::Char)),
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_display_replays_keys() {
        let mut display = ScriptedDisplay::new([None, Some(Key::Char('q'))]);
        let img = RgbImage::new(4, 3);

        assert_eq!(display.show(&img).unwrap(), None);
        assert_eq!(display.show(&img).unwrap(), Some(Key::Char('q')));
        assert_eq!(display.show(&img).unwrap(), None);
        assert_eq!(display.frames_shown(), 3);
        assert_eq!(display.shown_sizes()[0], ImageSize::from_width_height(4, 3));
    }

    #[test]
    fn test_parse_key_line() {
        assert_eq!(
            parse_key_line("dd up +"),
            vec![Key::Char('d'), Key::Char('d'), Key::Up, Key::Char('+')]
        );
        assert_eq!(parse_key_line("ESC"), vec![Key::Escape]);
        assert!(parse_key_line("   ").is_empty());
    }

    #[test]
    fn test_terminal_display_writes_preview_and_polls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.png");
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut display = TerminalDisplay::with_keys(path.clone(), 2, rx);
        let img = RgbImage::new(8, 8);

        assert_eq!(display.show(&img).unwrap(), None);
        assert!(path.exists());

        tx.send(Key::Char('1')).unwrap();
        assert_eq!(display.show(&img).unwrap(), Some(Key::Char('1')));
        assert_eq!(display.frames_shown(), 2);
    }

    #[test]
    fn test_terminal_display_closed_input_is_escape_once() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = crossbeam_channel::unbounded::<Key>();
        drop(tx);
        let mut display = TerminalDisplay::with_keys(dir.path().join("p.png"), 1, rx);
        let img = RgbImage::new(2, 2);

        assert_eq!(display.show(&img).unwrap(), Some(Key::Escape));
        assert_eq!(display.show(&img).unwrap(), None);
    }
}
