//! Operations: pending, uncommitted edits to an [`AffineState`].
//!
//! A drag gesture creates one [`Operation`] on pointer-down, grows its
//! `delta` on every pointer-move, and either commits it on pointer-up or drops
//! it. Until the commit, every frame renders `constrain(op.apply(committed))`
//! via [`preview`], so intermediate frames are reproducible and a cancel only
//! has to forget the operation.

#[cfg(test)]
#[path = "operation_test.rs"]
mod operation_test;

use crate::constraint::Constraint;
use crate::consts::{MIN_EXTENT, MIN_SCALE};
use crate::geom::{AffineState, Point, Size};

/// Unique identifier for a scene entity.
pub type EntityId = uuid::Uuid;

/// What an operation does to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Add `delta` to the position.
    Translate,
    /// Uniform scale derived from `delta`, keeping `anchor` stationary.
    Scale,
}

/// A pending edit to one entity's state.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Entity whose state this operation edits.
    pub target: EntityId,
    pub kind: OperationKind,
    /// Translate: the click point. Scale: the fixed corner, in parent space.
    pub anchor: Option<Point>,
    /// Accumulated pointer motion in the target's parent space.
    pub delta: Point,
    /// Size that scale ratios are measured against instead of the target's own size.
    pub target_size_override: Option<Size>,
}

impl Operation {
    /// A translate with no anchor and zero delta.
    #[must_use]
    pub fn translate(target: EntityId) -> Self {
        Self {
            target,
            kind: OperationKind::Translate,
            anchor: None,
            delta: Point::default(),
            target_size_override: None,
        }
    }

    /// A translate anchored at the point that started the drag.
    #[must_use]
    pub fn translate_from(target: EntityId, anchor: Point) -> Self {
        Self { anchor: Some(anchor), ..Self::translate(target) }
    }

    /// An anchor-scale whose initial `delta` is the dragged corner minus the anchor.
    #[must_use]
    pub fn scale(target: EntityId, anchor: Point, delta: Point, target_size_override: Option<Size>) -> Self {
        Self {
            target,
            kind: OperationKind::Scale,
            anchor: Some(anchor),
            delta,
            target_size_override,
        }
    }

    /// Whether this operation edits `id`.
    #[must_use]
    pub fn targets(&self, id: EntityId) -> bool {
        self.target == id
    }

    /// Add relative pointer motion to the accumulated delta.
    pub fn accumulate(&mut self, motion: Point) {
        self.delta = self.delta + motion;
    }

    /// The unconstrained state this operation would produce from `state`.
    #[must_use]
    pub fn apply(&self, state: AffineState) -> AffineState {
        self.apply_within(state, &Constraint::new())
    }

    /// Like [`Operation::apply`], but a scale is first bounded by the scale
    /// range `constraint` permits, so the anchor holds even when a limit
    /// engages. Position is left for the constraint to settle.
    #[must_use]
    pub fn apply_within(&self, state: AffineState, constraint: &Constraint) -> AffineState {
        match self.kind {
            OperationKind::Translate => AffineState {
                x: state.x + self.delta.x,
                y: state.y + self.delta.y,
                ..state
            },
            OperationKind::Scale => {
                let scale = constraint.clamp_scale(self.target_scale(state), state.size);
                self.scale_about_anchor(state, scale)
            }
        }
    }

    /// `max(|dx| / w, |dy| / h)` against the override size if one is set.
    fn target_scale(&self, state: AffineState) -> f64 {
        let basis = self.target_size_override.unwrap_or(state.size);
        let basis = Size::new(basis.x.max(MIN_EXTENT), basis.y.max(MIN_EXTENT));
        (self.delta.x.abs() / basis.x)
            .max(self.delta.y.abs() / basis.y)
            .max(MIN_SCALE)
    }

    fn scale_about_anchor(&self, state: AffineState, scale: f64) -> AffineState {
        let ratio = scale / state.scale.max(MIN_SCALE);
        let anchor = self.anchor.unwrap_or_else(|| state.position());
        AffineState {
            x: anchor.x - (anchor.x - state.x) * ratio,
            y: anchor.y - (anchor.y - state.y) * ratio,
            scale,
            size: state.size,
        }
    }
}

/// The state `op` would produce from `state` once `constraint` is applied.
///
/// Pure: neither argument is modified.
#[must_use]
pub fn preview(state: AffineState, constraint: &Constraint, op: &Operation) -> AffineState {
    constraint.apply(op.apply_within(state, constraint))
}
