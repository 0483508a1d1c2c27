//! Stage: an ordered stack of layers fed by one pointer/resize pipeline.
//!
//! The stage owns the [`MouseState`] machine and the render loop. Raw pointer
//! events go through [`Stage::update_mouse`], which turns them into semantic
//! `mousedown`/`mouseup`/`mousemove` calls on every layer (in that order) and
//! renders once if anything fired. Wheel and resize events are forwarded
//! directly.
//!
//! Layers are painted in registration order. Each layer's surface is reset
//! and cleared right before its own draw callback runs; layers composite by
//! stacking, never by blending here.
//!
//! The stage is generic over [`Surface`] so the whole pipeline runs without a
//! browser. [`crate::dom::DomStage`] wires it to real canvases and listeners.

#[cfg(test)]
#[path = "stage_test.rs"]
mod stage_test;

use crate::input::{Buttons, MouseState, ResizeEvent, WheelDelta, WheelOutcome};
use crate::render::{RenderError, Surface};

/// Paints a layer. Receives the surface already reset and cleared.
pub type DrawHandler = Box<dyn FnMut(&mut dyn Surface) -> Result<(), RenderError>>;
/// Receives the mouse state and the buttons that changed.
pub type ButtonHandler = Box<dyn FnMut(&MouseState, Buttons)>;
pub type MoveHandler = Box<dyn FnMut(&MouseState)>;
pub type WheelHandler = Box<dyn FnMut(&MouseState, WheelDelta) -> WheelOutcome>;
pub type ResizeHandler = Box<dyn FnMut(ResizeEvent)>;
/// Runs after every full render pass.
pub type RenderedHook = Box<dyn FnMut()>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    #[error("{layer}: no draw handler")]
    MissingDraw { layer: LayerId },
}

/// Position of a layer in the stack; later layers paint on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub usize);

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// Callbacks a layer registers. Only `draw` is required.
#[derive(Default)]
pub struct LayerHandlers {
    pub draw: Option<DrawHandler>,
    pub mousedown: Option<ButtonHandler>,
    pub mouseup: Option<ButtonHandler>,
    pub mousemove: Option<MoveHandler>,
    pub wheel: Option<WheelHandler>,
    pub resize: Option<ResizeHandler>,
}

impl LayerHandlers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_draw(mut self, f: impl FnMut(&mut dyn Surface) -> Result<(), RenderError> + 'static) -> Self {
        self.draw = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_mousedown(mut self, f: impl FnMut(&MouseState, Buttons) + 'static) -> Self {
        self.mousedown = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_mouseup(mut self, f: impl FnMut(&MouseState, Buttons) + 'static) -> Self {
        self.mouseup = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_mousemove(mut self, f: impl FnMut(&MouseState) + 'static) -> Self {
        self.mousemove = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_wheel(mut self, f: impl FnMut(&MouseState, WheelDelta) -> WheelOutcome + 'static) -> Self {
        self.wheel = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_resize(mut self, f: impl FnMut(ResizeEvent) + 'static) -> Self {
        self.resize = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for LayerHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerHandlers")
            .field("draw", &self.draw.is_some())
            .field("mousedown", &self.mousedown.is_some())
            .field("mouseup", &self.mouseup.is_some())
            .field("mousemove", &self.mousemove.is_some())
            .field("wheel", &self.wheel.is_some())
            .field("resize", &self.resize.is_some())
            .finish()
    }
}

/// One surface bound to its draw callback.
struct Layer<S> {
    id: LayerId,
    surface: S,
    draw: DrawHandler,
    handlers: LayerHandlers,
}

impl<S: Surface> Layer<S> {
    /// Reset, clear, and repaint the whole surface.
    fn paint(&mut self, width: f64, height: f64) -> Result<(), RenderError> {
        self.surface.reset_transform()?;
        self.surface.clear_rect(0.0, 0.0, width, height);
        (self.draw)(&mut self.surface)
    }
}

/// The layer stack plus its pointer state.
pub struct Stage<S: Surface> {
    layers: Vec<Layer<S>>,
    rendered: Vec<RenderedHook>,
    mouse: MouseState,
    width: f64,
    height: f64,
}

impl<S: Surface> Stage<S> {
    /// An empty stage of `width` x `height` pixels with fresh mouse state.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            layers: Vec::new(),
            rendered: Vec::new(),
            mouse: MouseState::default(),
            width,
            height,
        }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    #[must_use]
    pub fn mouse(&self) -> &MouseState {
        &self.mouse
    }

    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn surface(&self, id: LayerId) -> Option<&S> {
        self.layers.get(id.0).map(|l| &l.surface)
    }

    /// Append a layer on top of the stack and paint it once.
    ///
    /// The first paint does not clear: the surface is freshly sized.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::MissingDraw`] if `handlers` has no draw callback.
    pub fn add_layer(&mut self, mut surface: S, mut handlers: LayerHandlers) -> Result<LayerId, StageError> {
        let id = LayerId(self.layers.len());
        let mut draw = handlers.draw.take().ok_or(StageError::MissingDraw { layer: id })?;

        surface.set_size(self.width, self.height);
        if let Err(e) = draw(&mut surface) {
            log::error!("{id}: first paint failed: {e}");
        }
        log::debug!("{id}: attached ({}x{})", self.width, self.height);

        self.layers.push(Layer { id, surface, draw, handlers });
        Ok(id)
    }

    /// Run `hook` after every render pass, e.g. to repaint a dependent stage.
    pub fn on_rendered(&mut self, hook: impl FnMut() + 'static) {
        self.rendered.push(Box::new(hook));
    }

    /// Repaint every layer in registration order, then run the render hooks.
    /// A failing layer is logged and the rest still paint.
    pub fn render(&mut self) {
        let (width, height) = (self.width, self.height);
        for layer in &mut self.layers {
            if let Err(e) = layer.paint(width, height) {
                log::error!("{}: render failed: {e}", layer.id);
            }
        }
        for hook in &mut self.rendered {
            hook();
        }
    }

    /// Feed one raw pointer event in stage pixels. Returns whether anything
    /// was dispatched (and the stage re-rendered).
    pub fn update_mouse(&mut self, px: f64, py: f64, buttons: Buttons) -> bool {
        let transition = self.mouse.update(px, py, buttons, self.width, self.height);
        let mouse = self.mouse;

        if !transition.pressed.is_empty() {
            for layer in &mut self.layers {
                if let Some(f) = layer.handlers.mousedown.as_mut() {
                    f(&mouse, transition.pressed);
                }
            }
        }
        if !transition.released.is_empty() {
            for layer in &mut self.layers {
                if let Some(f) = layer.handlers.mouseup.as_mut() {
                    f(&mouse, transition.released);
                }
            }
        }
        if transition.moved {
            for layer in &mut self.layers {
                if let Some(f) = layer.handlers.mousemove.as_mut() {
                    f(&mouse);
                }
            }
        }

        let fired = transition.any();
        if fired {
            self.render();
        }
        fired
    }

    /// Forward a wheel event to every layer, then render.
    ///
    /// Returns `Absorbed` if any layer absorbed it.
    pub fn wheel(&mut self, delta: WheelDelta) -> WheelOutcome {
        let mouse = self.mouse;
        let mut outcome = WheelOutcome::Ignored;
        for layer in &mut self.layers {
            if let Some(f) = layer.handlers.wheel.as_mut() {
                outcome = outcome.merge(f(&mouse, delta));
            }
        }
        self.render();
        outcome
    }

    /// Resize every surface, tell every layer the new and old dimensions,
    /// then render.
    pub fn resize(&mut self, width: f64, height: f64) {
        let event = ResizeEvent {
            width,
            height,
            old_width: self.width,
            old_height: self.height,
        };
        self.width = width;
        self.height = height;
        log::debug!("stage resized {}x{} -> {width}x{height}", event.old_width, event.old_height);

        for layer in &mut self.layers {
            layer.surface.set_size(width, height);
            if let Some(f) = layer.handlers.resize.as_mut() {
                f(event);
            }
        }
        self.render();
    }
}

impl<S: Surface> std::fmt::Debug for Stage<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("layers", &self.layers.len())
            .field("rendered", &self.rendered.len())
            .field("mouse", &self.mouse)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}
