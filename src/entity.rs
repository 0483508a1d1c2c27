//! Transformable scene entities.
//!
//! Every entity owns one committed [`AffineState`] and one [`Constraint`];
//! payload-specific behaviour (map backdrop, screens group, token) is a
//! [`Payload`] variant rather than a type hierarchy. The committed state only
//! changes through [`Entity::apply`]; everything else reads it through
//! [`Entity::preview`], which folds in an in-flight [`Operation`] when that
//! operation targets this entity.
//!
//! Hit-testing never fails: a miss is `None`.

#[cfg(test)]
#[path = "entity_test.rs"]
mod entity_test;

use crate::config::StageConfig;
use crate::constraint::Constraint;
use crate::geom::{AffineState, Point, Size};
use crate::operation::{self, EntityId, Operation};
use crate::records::{ScreenCell, ScreenLayoutRecord, TokenRecord};
use crate::render::{ImageHandle, RenderError, Surface};

/// Styling inputs for one draw call.
#[derive(Debug, Clone, Copy)]
pub struct DrawStyle<'a> {
    pub config: &'a StageConfig,
    /// Parent-space units per screen pixel (the inverse of the view scale).
    pub pixel: f64,
}

/// A rectangle in an entity's local (intrinsic) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LocalRect {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

/// A group of physical screens moved and scaled as one.
///
/// Cells are stored normalized so the group's bounding box starts at the
/// local origin. One cell is active: it carries the selection outline and the
/// scale handles.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenLayout {
    cells: Vec<ScreenCell>,
    active: usize,
    /// Raw top-left of the cells before normalization.
    origin: Point,
}

impl ScreenLayout {
    /// Build a layout from raw cells, returning it with its bounding size.
    ///
    /// An empty list falls back to a single `default_cell`.
    #[must_use]
    pub fn new(cells: Vec<ScreenCell>, default_cell: ScreenCell) -> (Self, Size) {
        let (cells, origin, size) = normalize(cells, default_cell);
        (Self { cells, active: 0, origin }, size)
    }

    #[must_use]
    pub fn cells(&self) -> &[ScreenCell] {
        &self.cells
    }

    #[must_use]
    pub fn active(&self) -> usize {
        self.active
    }

    #[must_use]
    pub fn active_cell(&self) -> Option<&ScreenCell> {
        self.cells.get(self.active)
    }

    fn active_rect(&self, fallback: Size) -> LocalRect {
        match self.active_cell() {
            Some(c) => LocalRect { x: c.x, y: c.y, w: c.width, h: c.height },
            None => LocalRect { x: 0.0, y: 0.0, w: fallback.x, h: fallback.y },
        }
    }
}

/// Normalize cells to start at the origin; returns (cells, removed top-left offset, size).
fn normalize(cells: Vec<ScreenCell>, default_cell: ScreenCell) -> (Vec<ScreenCell>, Point, Size) {
    let mut cells = if cells.is_empty() { vec![default_cell] } else { cells };

    let left = cells.iter().map(|c| c.x).fold(f64::INFINITY, f64::min);
    let top = cells.iter().map(|c| c.y).fold(f64::INFINITY, f64::min);
    let right = cells.iter().map(|c| c.x + c.width).fold(f64::NEG_INFINITY, f64::max);
    let bottom = cells.iter().map(|c| c.y + c.height).fold(f64::NEG_INFINITY, f64::max);

    for cell in &mut cells {
        cell.x -= left;
        cell.y -= top;
    }
    (cells, Point::new(left, top), Size::new(right - left, bottom - top))
}

/// Payload-specific data and behaviour.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The map backdrop; the view entity.
    Map { image: Option<ImageHandle> },
    /// The screens group.
    Screens(ScreenLayout),
    /// A token with its backing record.
    Token { record: TokenRecord, image: Option<ImageHandle> },
}

/// A transformable scene entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: EntityId,
    pub state: AffineState,
    pub constraint: Constraint,
    pub payload: Payload,
}

impl Entity {
    /// The map view, sized to the map image (empty until one resolves).
    #[must_use]
    pub fn map(image: Option<ImageHandle>) -> Self {
        let size = image.as_ref().map_or(Size::default(), |i| Size::new(i.width, i.height));
        Self {
            id: EntityId::new_v4(),
            state: AffineState { size, ..AffineState::default() },
            constraint: Constraint::new(),
            payload: Payload::Map { image },
        }
    }

    /// A screens group built from raw cells.
    #[must_use]
    pub fn screens(cells: Vec<ScreenCell>, default_cell: ScreenCell) -> Self {
        let (layout, size) = ScreenLayout::new(cells, default_cell);
        Self {
            id: EntityId::new_v4(),
            state: AffineState { size, ..AffineState::default() },
            constraint: Constraint::new(),
            payload: Payload::Screens(layout),
        }
    }

    /// A screens group restored from a persisted layout.
    #[must_use]
    pub fn screens_from_record(record: &ScreenLayoutRecord, default_cell: ScreenCell) -> Self {
        let mut entity = Self::screens(record.cells.clone(), default_cell);
        entity.state.x = record.x;
        entity.state.y = record.y;
        entity.state.scale = record.scale;
        entity
    }

    /// A token of intrinsic side `side` placed where its record says.
    #[must_use]
    pub fn token(record: TokenRecord, side: f64) -> Self {
        let state = AffineState::new(record.x, record.y, record.scale, Size::new(side, side));
        Self {
            id: EntityId::new_v4(),
            state,
            constraint: Constraint::new(),
            payload: Payload::Token { record, image: None },
        }
    }

    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    // --- State ---

    /// The state to render and hit-test against: the committed state, or the
    /// previewed one when `op` targets this entity. Never mutates.
    #[must_use]
    pub fn preview(&self, op: Option<&Operation>) -> AffineState {
        match op {
            Some(op) if op.targets(self.id) => operation::preview(self.state, &self.constraint, op),
            _ => self.state,
        }
    }

    /// Commit `op` if it targets this entity. Returns whether it did.
    pub fn apply(&mut self, op: &Operation) -> bool {
        if !op.targets(self.id) {
            return false;
        }
        self.state = operation::preview(self.state, &self.constraint, op);
        true
    }

    /// Re-run the constraint on the committed state (after its boxes change).
    pub fn constrain(&mut self) {
        self.state = self.constraint.apply(self.state);
    }

    /// Install a resolved image. Maps and tokens take the image's size.
    pub fn set_image(&mut self, image: ImageHandle) {
        match &mut self.payload {
            Payload::Map { image: slot } => {
                self.state.size = Size::new(image.width, image.height);
                *slot = Some(image);
            }
            Payload::Token { image: slot, .. } => {
                self.state.size = Size::new(image.width, image.height);
                *slot = Some(image);
            }
            Payload::Screens(_) => {}
        }
    }

    /// Replace the cells of a screens group, keeping the active cell stationary
    /// on the map when it survives the update.
    pub fn update_cells(&mut self, cells: Vec<ScreenCell>, default_cell: ScreenCell) {
        let Payload::Screens(layout) = &mut self.payload else {
            return;
        };
        let previous = layout.active_cell().copied();
        let previous_origin = layout.origin;
        let (cells, origin, size) = normalize(cells, default_cell);

        // Match the old active cell by its raw (un-normalized) position.
        let survivor = previous.and_then(|prev| {
            cells.iter().position(|c| {
                same(c.x + origin.x, prev.x + previous_origin.x) && same(c.y + origin.y, prev.y + previous_origin.y)
            })
        });

        if let (Some(prev), Some(index)) = (previous, survivor) {
            self.state.x += (prev.x - cells[index].x) * self.state.scale;
            self.state.y += (prev.y - cells[index].y) * self.state.scale;
            layout.active = index;
        } else {
            layout.active = 0;
        }

        layout.cells = cells;
        layout.origin = origin;
        self.state.size = size;
    }

    /// The layout record to persist for a screens group.
    #[must_use]
    pub fn layout_record(&self) -> Option<ScreenLayoutRecord> {
        match &self.payload {
            Payload::Screens(layout) => Some(ScreenLayoutRecord {
                x: self.state.x,
                y: self.state.y,
                scale: self.state.scale,
                cells: layout.cells.clone(),
            }),
            _ => None,
        }
    }

    // --- Hit-testing ---

    /// A fresh translate anchored at `world` if it lands on this entity's
    /// (possibly previewed) footprint.
    ///
    /// For a screens group, cells are tested in order and the first hit
    /// becomes the active cell.
    pub fn hit_test_translate(&mut self, world: Point, op: Option<&Operation>) -> Option<Operation> {
        let state = self.preview(op);
        match &mut self.payload {
            Payload::Screens(layout) => {
                let index = layout.cells.iter().position(|c| {
                    let x = state.x + c.x * state.scale;
                    let y = state.y + c.y * state.scale;
                    world.x >= x
                        && world.x <= x + c.width * state.scale
                        && world.y >= y
                        && world.y <= y + c.height * state.scale
                })?;
                layout.active = index;
                Some(Operation::translate_from(self.id, world))
            }
            Payload::Map { .. } | Payload::Token { .. } => {
                state.contains(world).then(|| Operation::translate_from(self.id, world))
            }
        }
    }

    /// A scale operation if `world` lands within `radius` of a corner handle of
    /// the (possibly previewed) handled rectangle. The opposite corner anchors.
    #[must_use]
    pub fn hit_test_scale(&self, world: Point, radius: f64, op: Option<&Operation>) -> Option<Operation> {
        let state = self.preview(op);
        let rect = self.handled_rect();
        let corners = rect_corners(&state, rect);

        let hit = corners
            .iter()
            .position(|c| (world.x - c.x).abs() <= radius && (world.y - c.y).abs() <= radius)?;
        // Corners are ordered tl, tr, bl, br; the opposite corner is 3 - i.
        let anchor = corners[3 - hit];
        let override_size = match self.payload {
            Payload::Screens(_) => Some(Size::new(rect.w, rect.h)),
            _ => None,
        };
        Some(Operation::scale(self.id, anchor, world - anchor, override_size))
    }

    fn handled_rect(&self) -> LocalRect {
        match &self.payload {
            Payload::Screens(layout) => layout.active_rect(self.state.size),
            _ => LocalRect { x: 0.0, y: 0.0, w: self.state.size.x, h: self.state.size.y },
        }
    }

    // --- Drawing ---

    /// Paint the entity at its (possibly previewed) state.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a surface call fails.
    pub fn draw(&self, surface: &mut dyn Surface, op: Option<&Operation>, style: DrawStyle<'_>) -> Result<(), RenderError> {
        let state = self.preview(op);
        surface.save();
        let result = self.draw_local(surface, &state, style);
        surface.restore();
        result
    }

    fn draw_local(&self, surface: &mut dyn Surface, state: &AffineState, style: DrawStyle<'_>) -> Result<(), RenderError> {
        enter_local(surface, state)?;
        let palette = &style.config.palette;

        match &self.payload {
            Payload::Map { image } => {
                if let Some(image) = image {
                    surface.draw_image(image, 0.0, 0.0, state.size.x, state.size.y)?;
                }
            }
            Payload::Screens(layout) => {
                surface.set_fill_style(&palette.screen_fill);
                for c in &layout.cells {
                    surface.fill_rect(c.x, c.y, c.width, c.height);
                }
                surface.set_stroke_style(&palette.screen_stroke);
                surface.set_line_width(style.config.screen_border * style.pixel / state.scale);
                for c in &layout.cells {
                    surface.stroke_rect(c.x, c.y, c.width, c.height);
                }
            }
            Payload::Token { image, .. } => match image {
                Some(image) => surface.draw_image(image, 0.0, 0.0, state.size.x, state.size.y)?,
                None => {
                    surface.set_stroke_style(&palette.placeholder);
                    surface.set_line_width(style.pixel / state.scale);
                    surface.stroke_rect(0.0, 0.0, state.size.x, state.size.y);
                }
            },
        }
        Ok(())
    }

    /// Paint the selection outline and the four corner handles.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a surface call fails.
    pub fn draw_handles(
        &self,
        surface: &mut dyn Surface,
        op: Option<&Operation>,
        style: DrawStyle<'_>,
    ) -> Result<(), RenderError> {
        let state = self.preview(op);
        surface.save();
        let result = self.draw_handles_local(surface, &state, style);
        surface.restore();
        result
    }

    fn draw_handles_local(
        &self,
        surface: &mut dyn Surface,
        state: &AffineState,
        style: DrawStyle<'_>,
    ) -> Result<(), RenderError> {
        enter_local(surface, state)?;
        let rect = self.handled_rect();
        let palette = &style.config.palette;

        surface.set_stroke_style(&palette.select_stroke);
        surface.set_line_width(style.config.select_border * style.pixel / state.scale);
        surface.stroke_rect(rect.x, rect.y, rect.w, rect.h);

        let side = style.config.handle_size * style.pixel / state.scale;
        surface.set_fill_style(&palette.select_fill);
        for x in [rect.x, rect.x + rect.w] {
            for y in [rect.y, rect.y + rect.h] {
                surface.fill_rect(x - side / 2.0, y - side / 2.0, side, side);
            }
        }
        Ok(())
    }
}

fn same(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn enter_local(surface: &mut dyn Surface, state: &AffineState) -> Result<(), RenderError> {
    surface.translate(state.x, state.y)?;
    surface.scale(state.scale, state.scale)
}

/// Parent-space corners of a local rect: tl, tr, bl, br.
fn rect_corners(state: &AffineState, rect: LocalRect) -> [Point; 4] {
    [
        state.to_parent(Point::new(rect.x, rect.y)),
        state.to_parent(Point::new(rect.x + rect.w, rect.y)),
        state.to_parent(Point::new(rect.x, rect.y + rect.h)),
        state.to_parent(Point::new(rect.x + rect.w, rect.y + rect.h)),
    ]
}
