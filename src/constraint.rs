//! Constraints: pure clamps that keep an [`AffineState`] inside a permitted region.
//!
//! A [`Constraint`] is an ordered list of [`Clamp`] primitives, each bound to
//! a fixed target box. Applying a constraint runs the state through every
//! primitive in registration order. Each primitive is idempotent and leaves
//! an already-valid state untouched. Conflicting primitives are the caller's
//! problem; nothing here detects them.
//!
//! Degenerate boxes and sizes are widened to [`MIN_EXTENT`] before being used
//! as divisors, and the resulting scale never drops below [`MIN_SCALE`], so a
//! constraint never produces `NaN` or a non-positive scale.

#[cfg(test)]
#[path = "constraint_test.rs"]
mod constraint_test;

use serde::{Deserialize, Serialize};

use crate::consts::{MIN_EXTENT, MIN_SCALE};
use crate::geom::{AffineState, Size};

/// A fixed target box in parent coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub size: Size,
}

impl Bounds {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, size: Size::new(width, height) }
    }

    fn extent(&self) -> Size {
        Size::new(self.size.x.max(MIN_EXTENT), self.size.y.max(MIN_EXTENT))
    }
}

/// One clamp primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Clamp {
    /// Keep the entity on screen inside the box (map-view behaviour).
    ///
    /// Scale is bounded below by the value at which the whole entity fits the
    /// box. Along an axis where the footprint is larger than the box, the
    /// position is clamped so the box stays covered; along an axis where it
    /// is not, the footprint is centered in the box.
    Contain(Bounds),
    /// Keep the box fully covered by the footprint.
    Fit(Bounds),
    /// Keep the footprint fully inside the box; scale is bounded above.
    Within(Bounds),
    /// Upper bound on scale. Position is left alone.
    MaxScale(f64),
}

impl Clamp {
    /// The scale this primitive leaves for an entity of intrinsic `size`.
    /// Position plays no part, so scale-only callers can bound a target
    /// before placing it.
    #[must_use]
    pub fn clamp_scale(&self, scale: f64, size: Size) -> f64 {
        let scale = sanitize_scale(scale);
        let size = intrinsic(size);
        match *self {
            Clamp::Contain(bounds) => {
                let ext = bounds.extent();
                scale.max((ext.x / size.x).min(ext.y / size.y))
            }
            Clamp::Fit(bounds) => {
                let ext = bounds.extent();
                scale.max((ext.x / size.x).max(ext.y / size.y))
            }
            Clamp::Within(bounds) => {
                let ext = bounds.extent();
                scale.min((ext.x / size.x).min(ext.y / size.y)).max(MIN_SCALE)
            }
            Clamp::MaxScale(max) => scale.min(max.max(MIN_SCALE)),
        }
    }

    /// Clamp `state` into the region this primitive permits.
    #[must_use]
    pub fn apply(&self, state: AffineState) -> AffineState {
        let mut out = state;
        out.scale = self.clamp_scale(state.scale, state.size);
        let size = intrinsic(state.size);

        match *self {
            Clamp::Contain(bounds) => {
                let ext = bounds.extent();
                out.x = contain_axis(out.x, bounds.x, ext.x, size.x * out.scale);
                out.y = contain_axis(out.y, bounds.y, ext.y, size.y * out.scale);
            }
            Clamp::Fit(bounds) => {
                let ext = bounds.extent();
                out.x = cover_axis(out.x, bounds.x, ext.x, size.x * out.scale);
                out.y = cover_axis(out.y, bounds.y, ext.y, size.y * out.scale);
            }
            Clamp::Within(bounds) => {
                let ext = bounds.extent();
                out.x = clamp_range(out.x, bounds.x, bounds.x + ext.x - size.x * out.scale);
                out.y = clamp_range(out.y, bounds.y, bounds.y + ext.y - size.y * out.scale);
            }
            Clamp::MaxScale(_) => {}
        }

        out
    }
}

/// An ordered set of clamp primitives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraint {
    clamps: Vec<Clamp>,
}

impl Constraint {
    /// A constraint that permits everything (apart from a non-positive scale).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Constraint::push`].
    #[must_use]
    pub fn with(mut self, clamp: Clamp) -> Self {
        self.clamps.push(clamp);
        self
    }

    /// Append a primitive; it runs after every primitive already registered.
    pub fn push(&mut self, clamp: Clamp) {
        self.clamps.push(clamp);
    }

    /// Drop every primitive.
    pub fn clear(&mut self) {
        self.clamps.clear();
    }

    /// The scale [`Constraint::apply`] would settle on for an entity of
    /// intrinsic `size`, regardless of where it sits.
    #[must_use]
    pub fn clamp_scale(&self, scale: f64, size: Size) -> f64 {
        self.clamps.iter().fold(sanitize_scale(scale), |acc, clamp| clamp.clamp_scale(acc, size))
    }

    /// Run `state` through every primitive in registration order.
    #[must_use]
    pub fn apply(&self, state: AffineState) -> AffineState {
        let start = AffineState { scale: sanitize_scale(state.scale), ..state };
        self.clamps.iter().fold(start, |acc, clamp| clamp.apply(acc))
    }
}

fn sanitize_scale(scale: f64) -> f64 {
    if scale.is_finite() { scale.max(MIN_SCALE) } else { MIN_SCALE }
}

fn intrinsic(size: Size) -> Size {
    Size::new(size.x.max(MIN_EXTENT), size.y.max(MIN_EXTENT))
}

/// Clamp into `[lo, hi]`; an empty range collapses to its midpoint.
fn clamp_range(value: f64, lo: f64, hi: f64) -> f64 {
    if lo > hi { (lo + hi) / 2.0 } else { value.max(lo).min(hi) }
}

fn contain_axis(pos: f64, start: f64, extent: f64, footprint: f64) -> f64 {
    if footprint > extent {
        clamp_range(pos, start + extent - footprint, start)
    } else {
        start + (extent - footprint) / 2.0
    }
}

fn cover_axis(pos: f64, start: f64, extent: f64, footprint: f64) -> f64 {
    clamp_range(pos, start + extent - footprint, start)
}
