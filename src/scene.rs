//! Map editor scene.
//!
//! [`MapEditor`] owns the map view entity and the entities placed on the map
//! (the screens group and tokens), plus the single in-flight [`Operation`].
//! Pointer events arrive in stage pixels; the editor converts them to map
//! space through the (previewed) view state.
//!
//! Gestures:
//!
//! - press on a corner handle of the selected entity: anchor-scale it
//! - press on an entity: select it and drag it
//! - press on empty map: deselect and pan the view
//! - wheel: zoom the view about the pointer
//!
//! [`install`] wires an editor onto a stage as two layers: the map layer
//! (map image, entities, selection handles) and the bounds layer above it
//! (the frame around the visible map). [`install_peek`] puts the map region
//! under the active screen cell on a second stage.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::config::StageConfig;
use crate::constraint::{Bounds, Clamp, Constraint};
use crate::consts::{MIN_EXTENT, MIN_SCALE, SCALE_EPSILON};
use crate::entity::{DrawStyle, Entity, Payload};
use crate::geom::{AffineState, Point};
use crate::input::{Buttons, MouseState, ResizeEvent, WheelDelta, WheelOutcome};
use crate::operation::{EntityId, Operation};
use crate::records::{ScreenCell, ScreenLayoutRecord, TokenRecord};
use crate::render::{ImageHandle, RenderError, Surface};
use crate::services::LayoutStore;
use crate::stage::{LayerHandlers, LayerId, Stage, StageError};

/// Editing state for one map stage.
pub struct MapEditor {
    config: StageConfig,
    /// The map backdrop; its state is the stage-pixel placement of map space.
    view: Entity,
    /// Entities in map space, in paint order.
    entities: Vec<Entity>,
    pending: Option<Operation>,
    selected: Option<EntityId>,
    width: f64,
    height: f64,
    layout_store: Option<Rc<dyn LayoutStore>>,
}

impl MapEditor {
    /// An editor for a stage of `width` x `height` pixels with no map yet.
    #[must_use]
    pub fn new(config: StageConfig, width: f64, height: f64) -> Self {
        let mut editor = Self {
            config,
            view: Entity::map(None),
            entities: Vec::new(),
            pending: None,
            selected: None,
            width,
            height,
            layout_store: None,
        };
        editor.rebuild_view_constraint();
        editor.view.constrain();
        editor
    }

    /// Persist the screens layout through `store` after every screens commit.
    #[must_use]
    pub fn with_layout_store(mut self, store: Rc<dyn LayoutStore>) -> Self {
        self.layout_store = Some(store);
        self
    }

    #[must_use]
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    #[must_use]
    pub fn view(&self) -> &Entity {
        &self.view
    }

    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id() == id)
    }

    #[must_use]
    pub fn pending(&self) -> Option<&Operation> {
        self.pending.as_ref()
    }

    #[must_use]
    pub fn selected(&self) -> Option<EntityId> {
        self.selected
    }

    #[must_use]
    pub fn screens_id(&self) -> Option<EntityId> {
        self.entities
            .iter()
            .find(|e| matches!(e.payload, Payload::Screens(_)))
            .map(Entity::id)
    }

    /// Map-space rectangle under the active screen cell, following an
    /// in-flight gesture on the screens group.
    #[must_use]
    pub fn peek_rect(&self) -> Option<Bounds> {
        let screens = self.entities.iter().find(|e| matches!(e.payload, Payload::Screens(_)))?;
        let Payload::Screens(layout) = &screens.payload else {
            return None;
        };
        let cell = layout.active_cell()?;
        let state = screens.preview(self.pending.as_ref());
        Some(Bounds::new(
            state.x + cell.x * state.scale,
            state.y + cell.y * state.scale,
            cell.width * state.scale,
            cell.height * state.scale,
        ))
    }

    // --- Scene data ---

    /// Install a new map image: the view resets to the whole-map zoom and
    /// every entity is re-constrained to the new map bounds.
    pub fn set_map_image(&mut self, image: ImageHandle) {
        log::debug!("map image {} ({}x{})", image.id, image.width, image.height);
        self.pending = None;
        self.view.set_image(image);
        self.view.state.scale = MIN_SCALE;
        self.view.constrain();

        let bounds = self.map_bounds();
        for entity in &mut self.entities {
            constrain_to_map(&self.config, bounds, entity);
        }
    }

    /// Replace the screens group with one restored from `record`.
    pub fn set_screens(&mut self, record: &ScreenLayoutRecord) -> EntityId {
        if let Some(id) = self.screens_id() {
            self.remove(id);
        }
        let mut screens = Entity::screens_from_record(record, self.default_cell());
        constrain_to_map(&self.config, self.map_bounds(), &mut screens);
        let id = screens.id();
        self.entities.push(screens);
        id
    }

    /// Swap in a new set of physical screen cells, keeping the active cell
    /// where it is on the map. Returns false if there is no screens group.
    pub fn update_screen_cells(&mut self, cells: Vec<ScreenCell>) -> bool {
        let default_cell = self.default_cell();
        let bounds = self.map_bounds();
        let Some(screens) = self.entities.iter_mut().find(|e| matches!(e.payload, Payload::Screens(_))) else {
            return false;
        };
        screens.update_cells(cells, default_cell);
        constrain_to_map(&self.config, bounds, screens);
        true
    }

    /// Build the screens group from the server's `cells`, at the last stored
    /// `placement` if there is one, otherwise at the map origin.
    pub fn restore_screens(&mut self, placement: Option<&ScreenLayoutRecord>, cells: Vec<ScreenCell>) -> EntityId {
        let Some(placement) = placement else {
            return self.set_screens(&ScreenLayoutRecord { x: 0.0, y: 0.0, scale: 1.0, cells });
        };
        let id = self.set_screens(placement);
        self.update_screen_cells(cells);
        id
    }

    /// Place a token on the map. Its image arrives later via [`Self::set_image`].
    pub fn add_token(&mut self, record: TokenRecord) -> EntityId {
        let mut token = Entity::token(record, self.config.token_size);
        constrain_to_map(&self.config, self.map_bounds(), &mut token);
        let id = token.id();
        self.entities.push(token);
        id
    }

    /// Install a resolved image on an entity. Returns false for an unknown id.
    pub fn set_image(&mut self, id: EntityId, image: ImageHandle) -> bool {
        let bounds = self.map_bounds();
        let Some(entity) = self.entities.iter_mut().find(|e| e.id() == id) else {
            return false;
        };
        entity.set_image(image);
        constrain_to_map(&self.config, bounds, entity);
        true
    }

    /// Remove an entity, dropping any selection or gesture on it.
    pub fn remove(&mut self, id: EntityId) -> bool {
        let before = self.entities.len();
        self.entities.retain(|e| e.id() != id);
        if self.selected == Some(id) {
            self.selected = None;
        }
        if self.pending.as_ref().is_some_and(|op| op.targets(id)) {
            self.pending = None;
        }
        self.entities.len() != before
    }

    /// Adopt new stage dimensions without rescaling the view.
    pub fn set_stage_size(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.rebuild_view_constraint();
        self.view.constrain();
    }

    // --- Coordinates ---

    /// Map-space point under a stage pixel, honoring an in-flight pan.
    #[must_use]
    pub fn to_world(&self, px: f64, py: f64) -> Point {
        self.view_state().to_local(Point::new(px, py))
    }

    fn view_state(&self) -> AffineState {
        self.view.preview(self.pending.as_ref())
    }

    fn view_box(&self) -> Bounds {
        let b = self.config.view_border;
        Bounds::new(b, b, self.width - 2.0 * b, self.height - 2.0 * b)
    }

    /// Map space extent, once a map image is installed.
    fn map_bounds(&self) -> Option<Bounds> {
        match &self.view.payload {
            Payload::Map { image: Some(_) } => {
                Some(Bounds::new(0.0, 0.0, self.view.state.size.x, self.view.state.size.y))
            }
            _ => None,
        }
    }

    fn default_cell(&self) -> ScreenCell {
        ScreenCell::new(0.0, 0.0, self.config.screen_width, self.config.screen_height)
    }

    fn rebuild_view_constraint(&mut self) {
        self.view.constraint = Constraint::new()
            .with(Clamp::MaxScale(self.config.max_zoom))
            .with(Clamp::Contain(self.view_box()));
    }

    // --- Events ---

    /// Start a gesture. Only the primary button starts one, only when no
    /// other gesture is in flight, and only once a map is showing.
    pub fn mousedown(&mut self, mouse: &MouseState, buttons: Buttons) {
        if !buttons.contains(Buttons::PRIMARY) || self.pending.is_some() || self.map_bounds().is_none() {
            return;
        }
        let world = self.to_world(mouse.x, mouse.y);
        let radius = self.config.handle_size / 2.0 / self.view.state.scale.max(MIN_SCALE);

        let scale_op = self
            .selected
            .and_then(|id| self.entity(id))
            .and_then(|e| e.hit_test_scale(world, radius, None));
        if let Some(op) = scale_op {
            self.pending = Some(op);
            return;
        }

        // Topmost first.
        for entity in self.entities.iter_mut().rev() {
            if let Some(op) = entity.hit_test_translate(world, None) {
                self.selected = Some(entity.id());
                self.pending = Some(op);
                return;
            }
        }

        self.selected = None;
        self.pending = Some(Operation::translate(self.view.id()));
    }

    /// Grow the in-flight gesture by the last pointer motion.
    pub fn mousemove(&mut self, mouse: &MouseState) {
        let Some(op) = self.pending.as_mut() else {
            return;
        };
        if op.targets(self.view.id()) {
            op.accumulate(Point::new(mouse.dx, mouse.dy));
        } else {
            let scale = self.view.state.scale.max(MIN_SCALE);
            op.accumulate(Point::new(mouse.dx / scale, mouse.dy / scale));
        }
    }

    /// Commit the in-flight gesture when the primary button comes up.
    pub fn mouseup(&mut self, _mouse: &MouseState, buttons: Buttons) {
        if !buttons.contains(Buttons::PRIMARY) {
            return;
        }
        if let Some(op) = self.pending.take() {
            self.commit(&op);
        }
    }

    fn commit(&mut self, op: &Operation) {
        if self.view.apply(op) {
            log::debug!("view committed at scale {:.4}", self.view.state.scale);
            return;
        }
        let Some(entity) = self.entities.iter_mut().find(|e| op.targets(e.id())) else {
            log::warn!("dropped operation for missing entity {}", op.target);
            return;
        };
        entity.apply(op);
        log::debug!("entity {} committed at ({:.1}, {:.1})", op.target, entity.state.x, entity.state.y);

        if let (Some(record), Some(store)) = (entity.layout_record(), &self.layout_store) {
            store.persist(&record);
        }
    }

    /// Zoom the view about the pointer.
    ///
    /// Returns `Ignored`, leaving the view untouched, when the zoom cannot
    /// change (already at a limit, no map yet, or a drag is in flight) so the
    /// host can let the page scroll.
    pub fn wheel(&mut self, mouse: &MouseState, delta: WheelDelta) -> WheelOutcome {
        if self.pending.is_some() || self.map_bounds().is_none() {
            return WheelOutcome::Ignored;
        }
        let old = self.view.state.scale;
        let size = self.view.state.size;
        let target = old - delta.dy * self.config.wheel_zoom_rate;
        let scale = self.view.constraint.clamp_scale(target, size);
        if (scale - old).abs() < SCALE_EPSILON {
            return WheelOutcome::Ignored;
        }

        let op = Operation::scale(
            self.view.id(),
            Point::new(mouse.x, mouse.y),
            Point::new(scale * size.x, scale * size.y),
            None,
        );
        self.view.apply(&op);
        WheelOutcome::Absorbed
    }

    /// Keep the apparent zoom across a stage resize, then re-derive the
    /// view's box.
    pub fn resize(&mut self, event: ResizeEvent) {
        let factor = if event.old_width > 0.0 && event.old_height > 0.0 {
            (event.width / event.old_width).max(event.height / event.old_height)
        } else {
            1.0
        };
        // The border inset is fixed in pixels; only the map offset scales.
        let b = self.config.view_border;
        self.view.state.x = (self.view.state.x - b) * factor + b;
        self.view.state.y = (self.view.state.y - b) * factor + b;
        self.view.state.scale *= factor;
        self.set_stage_size(event.width, event.height);
    }

    // --- Drawing ---

    /// Paint the map image, then every entity and the selection handles in
    /// map space. Nothing is painted until a map image is installed.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a surface call fails.
    pub fn draw_map(&self, surface: &mut dyn Surface) -> Result<(), RenderError> {
        if self.map_bounds().is_none() {
            return Ok(());
        }
        let op = self.pending.as_ref();
        let view = self.view_state();
        self.view.draw(surface, op, DrawStyle { config: &self.config, pixel: 1.0 })?;

        surface.save();
        let result = self.draw_entities(surface, &view);
        surface.restore();
        result
    }

    fn draw_entities(&self, surface: &mut dyn Surface, view: &AffineState) -> Result<(), RenderError> {
        surface.translate(view.x, view.y)?;
        surface.scale(view.scale, view.scale)?;

        let op = self.pending.as_ref();
        let style = DrawStyle { config: &self.config, pixel: 1.0 / view.scale.max(MIN_SCALE) };
        for entity in &self.entities {
            entity.draw(surface, op, style)?;
        }
        if let Some(selected) = self.selected.and_then(|id| self.entity(id)) {
            selected.draw_handles(surface, op, style)?;
        }
        Ok(())
    }

    /// Frame the visible part of the map.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a surface call fails.
    pub fn draw_bounds(&self, surface: &mut dyn Surface) -> Result<(), RenderError> {
        if self.map_bounds().is_none() {
            return Ok(());
        }
        let view = self.view_state();
        let footprint = view.footprint();
        let b = self.config.view_border;

        let left = view.x.max(b);
        let top = view.y.max(b);
        let right = (view.x + footprint.x).min(self.width - b);
        let bottom = (view.y + footprint.y).min(self.height - b);
        if right <= left || bottom <= top {
            return Ok(());
        }

        surface.set_stroke_style(&self.config.palette.foreground);
        surface.set_line_width(b);
        surface.stroke_rect(left - b / 2.0, top - b / 2.0, right - left + b, bottom - top + b);
        Ok(())
    }

    /// Paint the map region under the active screen cell, stretched over a
    /// `width` x `height` surface: what that physical screen shows.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a surface call fails.
    pub fn draw_peek(&self, surface: &mut dyn Surface, width: f64, height: f64) -> Result<(), RenderError> {
        let Payload::Map { image: Some(image) } = &self.view.payload else {
            return Ok(());
        };
        let Some(rect) = self.peek_rect() else {
            return Ok(());
        };
        let size = self.view.state.size;

        surface.save();
        let result = surface
            .scale(width / rect.size.x.max(MIN_EXTENT), height / rect.size.y.max(MIN_EXTENT))
            .and_then(|()| surface.translate(-rect.x, -rect.y))
            .and_then(|()| surface.draw_image(image, 0.0, 0.0, size.x, size.y));
        surface.restore();
        result
    }
}

impl std::fmt::Debug for MapEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapEditor")
            .field("view", &self.view.state)
            .field("entities", &self.entities.len())
            .field("pending", &self.pending)
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

/// Bound an entity to the map: screens also get a scale ceiling. Without a
/// map only the ceiling applies.
fn constrain_to_map(config: &StageConfig, bounds: Option<Bounds>, entity: &mut Entity) {
    entity.constraint.clear();
    if matches!(entity.payload, Payload::Screens(_)) {
        entity.constraint.push(Clamp::MaxScale(config.max_screens_scale));
    }
    if let Some(bounds) = bounds {
        entity.constraint.push(Clamp::Within(bounds));
    }
    entity.constrain();
}

/// Add the map and bounds layers for `editor` to `stage`.
///
/// # Errors
///
/// Propagates [`StageError`] from layer registration.
pub fn install<S: Surface>(
    stage: &mut Stage<S>,
    editor: &Rc<RefCell<MapEditor>>,
    map_surface: S,
    bounds_surface: S,
) -> Result<(LayerId, LayerId), StageError> {
    editor.borrow_mut().set_stage_size(stage.width(), stage.height());

    let (draw, down, up, moved, wheel, resize) =
        (editor.clone(), editor.clone(), editor.clone(), editor.clone(), editor.clone(), editor.clone());
    let map_layer = LayerHandlers::new()
        .on_draw(move |s| draw.borrow().draw_map(s))
        .on_mousedown(move |m, b| down.borrow_mut().mousedown(m, b))
        .on_mouseup(move |m, b| up.borrow_mut().mouseup(m, b))
        .on_mousemove(move |m| moved.borrow_mut().mousemove(m))
        .on_wheel(move |m, d| wheel.borrow_mut().wheel(m, d))
        .on_resize(move |e| resize.borrow_mut().resize(e));
    let map_id = stage.add_layer(map_surface, map_layer)?;

    let frame = editor.clone();
    let bounds_layer = LayerHandlers::new().on_draw(move |s| frame.borrow().draw_bounds(s));
    let bounds_id = stage.add_layer(bounds_surface, bounds_layer)?;

    Ok((map_id, bounds_id))
}

/// Add a peek layer for `editor` to a separate `stage`: the map under the
/// active screen cell, scaled to that stage.
///
/// # Errors
///
/// Propagates [`StageError`] from layer registration.
pub fn install_peek<S: Surface>(
    stage: &mut Stage<S>,
    editor: &Rc<RefCell<MapEditor>>,
    surface: S,
) -> Result<LayerId, StageError> {
    let size = Rc::new(Cell::new((stage.width(), stage.height())));
    let (draw, drawn_size, resized) = (editor.clone(), Rc::clone(&size), size);
    let layer = LayerHandlers::new()
        .on_draw(move |s| {
            let (width, height) = drawn_size.get();
            draw.borrow().draw_peek(s, width, height)
        })
        .on_resize(move |e| resized.set((e.width, e.height)));
    stage.add_layer(surface, layer)
}
