//! Input model: button masks, the normalized mouse state machine, and the
//! semantic event payloads forwarded to layers.
//!
//! [`MouseState`] is the only state the stage keeps between raw pointer
//! events. [`MouseState::update`] folds one raw event into it and reports
//! which semantic events the event produced as a [`MouseTransition`]; the
//! stage dispatches them press first, then release, then move.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use std::ops::{BitAnd, BitOr, Not};

use crate::consts::{BUTTON_AUXILIARY, BUTTON_PRIMARY, BUTTON_SECONDARY, DOM_DELTA_LINE, DOM_DELTA_PAGE, LINE_HEIGHT_PX};

/// A `MouseEvent.buttons`-style bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Buttons(pub u16);

impl Buttons {
    pub const NONE: Self = Self(0);
    pub const PRIMARY: Self = Self(BUTTON_PRIMARY);
    pub const SECONDARY: Self = Self(BUTTON_SECONDARY);
    pub const AUXILIARY: Self = Self(BUTTON_AUXILIARY);

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every bit of `other` is set in `self`.
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        !other.is_empty() && self.0 & other.0 == other.0
    }
}

impl BitAnd for Buttons {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitOr for Buttons {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl Not for Buttons {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

/// The stage's persistent pointer state, in stage pixels.
///
/// `dx`/`dy` hold the motion of the most recent event.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MouseState {
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
    pub buttons: Buttons,
}

/// Semantic events produced by one raw pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MouseTransition {
    /// Buttons newly pressed while in bounds.
    pub pressed: Buttons,
    /// Buttons newly released, wherever the pointer is.
    pub released: Buttons,
    /// Whether a relevant move happened.
    pub moved: bool,
}

impl MouseTransition {
    /// Whether anything needs dispatching (and therefore a render).
    #[must_use]
    pub fn any(&self) -> bool {
        !self.pressed.is_empty() || !self.released.is_empty() || self.moved
    }
}

impl MouseState {
    /// Fold a raw pointer event at `(px, py)` with button mask `buttons` into
    /// the state, for a stage of `width` x `height` pixels.
    ///
    /// The stored position is never clamped: window-level events past the
    /// stage edge keep tracking so a drag resolves on release. Presses that
    /// start outside the stage are masked out; releases never are. A move is
    /// relevant when buttons are held or the pointer is in bounds.
    pub fn update(&mut self, px: f64, py: f64, buttons: Buttons, width: f64, height: f64) -> MouseTransition {
        let in_bounds = px >= 0.0 && py >= 0.0 && px <= width && py <= height;

        self.dx = px - self.x;
        self.dy = py - self.y;
        self.x = px;
        self.y = py;

        let pressed = if in_bounds { buttons & !self.buttons } else { Buttons::NONE };
        let released = !buttons & self.buttons;
        self.buttons = buttons;

        let shifted = self.dx != 0.0 || self.dy != 0.0;
        let moved = shifted && (!buttons.is_empty() || in_bounds);

        MouseTransition { pressed, released, moved }
    }
}

/// Raw wheel deltas, in the browser's units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelDelta {
    pub dx: f64,
    pub dy: f64,
}

impl WheelDelta {
    /// Normalize a DOM `WheelEvent` delta to pixels.
    ///
    /// `mode` is `deltaMode`: 0 pixels, 1 lines, 2 pages. A page is
    /// `page_height` pixels; unknown modes are taken as pixels.
    #[must_use]
    pub fn from_dom(dx: f64, dy: f64, mode: u32, page_height: f64) -> Self {
        let unit = match mode {
            DOM_DELTA_LINE => LINE_HEIGHT_PX,
            DOM_DELTA_PAGE => page_height,
            _ => 1.0,
        };
        Self { dx: dx * unit, dy: dy * unit }
    }
}

/// Whether a layer consumed a wheel event.
///
/// `Ignored` lets the host keep the browser's default scrolling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WheelOutcome {
    Absorbed,
    #[default]
    Ignored,
}

impl WheelOutcome {
    /// `Absorbed` if either side absorbed.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        if self == Self::Absorbed || other == Self::Absorbed { Self::Absorbed } else { Self::Ignored }
    }
}

/// Stage dimensions before and after a resize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeEvent {
    pub width: f64,
    pub height: f64,
    pub old_width: f64,
    pub old_height: f64,
}
