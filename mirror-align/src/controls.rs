//! Live guide placement values.
//!
//! Guides are positioned through nine named integer controls, three per
//! guide. Whatever supplies them (a window's trackbars, a keyboard-driven
//! panel, a test fixture) implements [`ControlSource`]; the aligner reads
//! them fresh on every render.

use std::collections::HashMap;

use shared::guide::{Guide, GuideRole, GuideSet};
use tracing::debug;

use crate::display::Key;

/// Read access to named integer controls
pub trait ControlSource {
    /// Current value of control `name`, or `None` if it does not exist
    fn get(&self, name: &str) -> Option<i32>;
}

impl ControlSource for HashMap<String, i32> {
    fn get(&self, name: &str) -> Option<i32> {
        HashMap::get(self, name).copied()
    }
}

/// Which placement value of a guide a control sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Size,
}

/// Name and range of one control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSpec {
    pub name: &'static str,
    pub role: GuideRole,
    pub axis: Axis,
    pub min: i32,
    pub default: i32,
    pub max: i32,
}

impl ControlSpec {
    const fn new(
        name: &'static str,
        role: GuideRole,
        axis: Axis,
        default: i32,
        max: i32,
    ) -> Self {
        Self {
            name,
            role,
            axis,
            min: 0,
            default,
            max,
        }
    }

    pub fn clamp(&self, value: i32) -> i32 {
        value.clamp(self.min, self.max)
    }
}

/// Every control, grouped by guide in draw order
pub const CONTROLS: [ControlSpec; 9] = [
    ControlSpec::new("Chip X pos", GuideRole::Chip, Axis::X, 640, 1280),
    ControlSpec::new("Chip Y pos", GuideRole::Chip, Axis::Y, 512, 1024),
    ControlSpec::new("Chip size", GuideRole::Chip, Axis::Size, 200, 1024),
    ControlSpec::new("Mirror X pos", GuideRole::Mirror, Axis::X, 640, 1280),
    ControlSpec::new("Mirror Y pos", GuideRole::Mirror, Axis::Y, 512, 1024),
    ControlSpec::new("Mirror size", GuideRole::Mirror, Axis::Size, 200, 1024),
    ControlSpec::new("Extra X pos", GuideRole::Extra, Axis::X, 640, 1280),
    ControlSpec::new("Extra Y pos", GuideRole::Extra, Axis::Y, 512, 1024),
    ControlSpec::new("Extra size", GuideRole::Extra, Axis::Size, 25, 1024),
];

/// Step sizes cycled with `[` and `]`
pub const STEP_SIZES: [i32; 3] = [1, 5, 25];

fn spec_index(role: GuideRole, axis: Axis) -> usize {
    let row = match role {
        GuideRole::Chip => 0,
        GuideRole::Mirror => 1,
        GuideRole::Extra => 2,
    };
    let col = match axis {
        Axis::X => 0,
        Axis::Y => 1,
        Axis::Size => 2,
    };
    row * 3 + col
}

/// Spec of the control holding `axis` of `role`
pub fn control_spec(role: GuideRole, axis: Axis) -> &'static ControlSpec {
    &CONTROLS[spec_index(role, axis)]
}

/// Read one guide, falling back to a control's default when it is missing.
///
/// Values are clamped to the control's range whatever the source reports.
pub fn read_guide<C: ControlSource + ?Sized>(source: &C, role: GuideRole) -> Guide {
    let value = |axis| {
        let spec = control_spec(role, axis);
        spec.clamp(source.get(spec.name).unwrap_or(spec.default))
    };
    Guide::for_role(role, value(Axis::X), value(Axis::Y), value(Axis::Size))
}

/// Snapshot all three guides from `source`
pub fn read_guides<C: ControlSource + ?Sized>(source: &C) -> GuideSet {
    GuideSet {
        chip: read_guide(source, GuideRole::Chip),
        mirror: read_guide(source, GuideRole::Mirror),
        extra: read_guide(source, GuideRole::Extra),
    }
}

/// In-memory controls with keyboard editing.
///
/// Values are clamped to their control's range whenever they are set, the
/// way a trackbar cannot be dragged past its ends. Keys act on the selected
/// guide:
///
/// | key                | action                           |
/// |--------------------|----------------------------------|
/// | `1` `2` `3` / Tab  | select chip / mirror / extra     |
/// | arrows, `w a s d`  | move by the step size            |
/// | `+` `-`            | grow / shrink by the step size   |
/// | `[` `]`            | smaller / larger step (1, 5, 25) |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPanel {
    values: [i32; 9],
    selected: GuideRole,
    step_index: usize,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            values: CONTROLS.map(|spec| spec.default),
            selected: GuideRole::Chip,
            step_index: 0,
        }
    }
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Panel whose controls match `guides` (clamped to range)
    pub fn from_guides(guides: &GuideSet) -> Self {
        let mut panel = Self::default();
        for role in GuideRole::ALL {
            panel.set_guide(role, guides.get(role));
        }
        panel
    }

    /// Set control `name`; returns the clamped value actually stored, or
    /// `None` if there is no such control
    pub fn set(&mut self, name: &str, value: i32) -> Option<i32> {
        let index = CONTROLS.iter().position(|spec| spec.name == name)?;
        Some(self.store(index, value))
    }

    pub fn value(&self, role: GuideRole, axis: Axis) -> i32 {
        self.values[spec_index(role, axis)]
    }

    pub fn set_value(&mut self, role: GuideRole, axis: Axis, value: i32) -> i32 {
        self.store(spec_index(role, axis), value)
    }

    pub fn set_guide(&mut self, role: GuideRole, guide: &Guide) {
        self.set_value(role, Axis::X, guide.x);
        self.set_value(role, Axis::Y, guide.y);
        self.set_value(role, Axis::Size, guide.size);
    }

    pub fn guides(&self) -> GuideSet {
        read_guides(self)
    }

    pub fn selected(&self) -> GuideRole {
        self.selected
    }

    pub fn select(&mut self, role: GuideRole) {
        self.selected = role;
    }

    pub fn step(&self) -> i32 {
        STEP_SIZES[self.step_index]
    }

    /// Apply one key press. Returns `false` if the key means nothing here.
    pub fn apply_key(&mut self, key: Key) -> bool {
        let step = self.step();
        let role = self.selected;
        match key {
            Key::Char('1') => self.select(GuideRole::Chip),
            Key::Char('2') => self.select(GuideRole::Mirror),
            Key::Char('3') => self.select(GuideRole::Extra),
            Key::Tab => {
                let next = match role {
                    GuideRole::Chip => GuideRole::Mirror,
                    GuideRole::Mirror => GuideRole::Extra,
                    GuideRole::Extra => GuideRole::Chip,
                };
                self.select(next);
            }
            Key::Up | Key::Char('w') => self.nudge(role, Axis::Y, -step),
            Key::Down | Key::Char('s') => self.nudge(role, Axis::Y, step),
            Key::Left | Key::Char('a') => self.nudge(role, Axis::X, -step),
            Key::Right | Key::Char('d') => self.nudge(role, Axis::X, step),
            Key::Char('+') | Key::Char('=') => self.nudge(role, Axis::Size, step),
            Key::Char('-') | Key::Char('_') => self.nudge(role, Axis::Size, -step),
            Key::Char('[') => self.step_index = self.step_index.saturating_sub(1),
            Key::Char(']') => self.step_index = (self.step_index + 1).min(STEP_SIZES.len() - 1),
            _ => return false,
        }
        debug!("Key {:?}: {}", key, self.status_line());
        true
    }

    /// Selected guide, its placement and the step size
    pub fn status_line(&self) -> String {
        let role = self.selected;
        format!(
            "{} x={} y={} size={} step={}",
            role,
            self.value(role, Axis::X),
            self.value(role, Axis::Y),
            self.value(role, Axis::Size),
            self.step()
        )
    }

    fn nudge(&mut self, role: GuideRole, axis: Axis, delta: i32) {
        let current = self.value(role, axis);
        self.set_value(role, axis, current.saturating_add(delta));
    }

    fn store(&mut self, index: usize, value: i32) -> i32 {
        let clamped = CONTROLS[index].clamp(value);
        self.values[index] = clamped;
        clamped
    }
}

impl ControlSource for ControlPanel {
    fn get(&self, name: &str) -> Option<i32> {
        let index = CONTROLS.iter().position(|spec| spec.name == name)?;
        Some(self.values[index])
    }
}
