//! Browser binding.
//!
//! [`CanvasSurface`] implements [`Surface`] over a `<canvas>` 2D context.
//! [`DomStage`] attaches a [`Stage`] to a container element: it creates one
//! canvas per layer, and registers the pointer, wheel and resize listeners
//! for as long as it lives. Dropping it removes the listeners and canvases.
//!
//! [`MapStageApp`] is the JS-facing entry point that wires a [`MapEditor`],
//! the HTTP services and the active-scene hub onto a `DomStage`.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_timers::callback::Interval;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    AddEventListenerOptions, CanvasRenderingContext2d, Document, Event, EventTarget, HtmlCanvasElement, HtmlElement,
    HtmlImageElement, MouseEvent, WheelEvent, Window,
};

use crate::config::{ConfigError, StageConfig};
use crate::input::{Buttons, WheelDelta, WheelOutcome};
use crate::records::{MapRecord, TokenRecord};
use crate::render::{ImageHandle, RenderError, Surface, js_message};
use crate::scene::{MapEditor, install, install_peek};
use crate::services::{
    HttpLayoutStore, ImageCallback, ImageResolver, MapCatalog, SceneHub, ServiceError, fetch_active_map, fetch_json,
    fetch_maps, fetch_screen_cells, fetch_screen_placement, image_endpoint, map_endpoint,
};
use crate::stage::{LayerHandlers, LayerId, Stage, StageError};

const STAGE_CLASS: &str = "canvas-stage";
const LAYER_CLASS: &str = "canvas-layer";
const SCREENS_POLL_MS: u32 = 2000;

#[derive(Debug, thiserror::Error)]
pub enum DomError {
    #[error("no window or document")]
    NoWindow,
    #[error("no element with id {0}")]
    NoContainer(String),
    #[error("canvas has no 2d context")]
    NoContext,
    #[error("dom call failed: {0}")]
    Js(String),
    #[error(transparent)]
    Stage(#[from] StageError),
}

impl From<JsValue> for DomError {
    fn from(value: JsValue) -> Self {
        Self::Js(js_message(&value))
    }
}

impl From<DomError> for JsValue {
    fn from(e: DomError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}

// =============================================================
// Surface
// =============================================================

/// A `<canvas>` element and its 2D context.
#[derive(Debug, Clone)]
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    /// # Errors
    ///
    /// Returns [`DomError::NoContext`] if the canvas cannot produce a 2D context.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, DomError> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or(DomError::NoContext)?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| DomError::NoContext)?;
        Ok(Self { canvas, ctx })
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_px(value: f64) -> u32 {
    value.max(0.0).round() as u32
}

impl Surface for CanvasSurface {
    fn set_size(&mut self, width: f64, height: f64) {
        self.canvas.set_width(to_px(width));
        self.canvas.set_height(to_px(height));
    }

    fn reset_transform(&mut self) -> Result<(), RenderError> {
        self.ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)?;
        Ok(())
    }

    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.ctx.clear_rect(x, y, width, height);
    }

    fn save(&mut self) {
        self.ctx.save();
    }

    fn restore(&mut self) {
        self.ctx.restore();
    }

    fn translate(&mut self, x: f64, y: f64) -> Result<(), RenderError> {
        self.ctx.translate(x, y)?;
        Ok(())
    }

    fn scale(&mut self, sx: f64, sy: f64) -> Result<(), RenderError> {
        self.ctx.scale(sx, sy)?;
        Ok(())
    }

    fn set_fill_style(&mut self, color: &str) {
        self.ctx.set_fill_style_str(color);
    }

    fn set_stroke_style(&mut self, color: &str) {
        self.ctx.set_stroke_style_str(color);
    }

    fn set_line_width(&mut self, width: f64) {
        self.ctx.set_line_width(width);
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.ctx.fill_rect(x, y, width, height);
    }

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.ctx.stroke_rect(x, y, width, height);
    }

    fn draw_image(&mut self, image: &ImageHandle, x: f64, y: f64, width: f64, height: f64) -> Result<(), RenderError> {
        if let Some(element) = image.element() {
            self.ctx.draw_image_with_html_image_element_and_dw_and_dh(element, x, y, width, height)?;
        }
        Ok(())
    }
}

// =============================================================
// Stage binding
// =============================================================

type EventClosure = Closure<dyn FnMut(Event)>;

struct Listener {
    target: EventTarget,
    event: &'static str,
    closure: EventClosure,
}

/// A [`Stage`] attached to a DOM container.
pub struct DomStage {
    window: Window,
    document: Document,
    container: HtmlElement,
    stage: Rc<RefCell<Stage<CanvasSurface>>>,
    listeners: Vec<Listener>,
    canvases: Vec<HtmlCanvasElement>,
}

impl DomStage {
    /// Attach to the element with id `container_id`, sized to its client box.
    ///
    /// # Errors
    ///
    /// Fails if there is no window, no such element, or a listener cannot be registered.
    pub fn attach(container_id: &str) -> Result<Self, DomError> {
        let window = web_sys::window().ok_or(DomError::NoWindow)?;
        let document = window.document().ok_or(DomError::NoWindow)?;
        let container = document
            .get_element_by_id(container_id)
            .ok_or_else(|| DomError::NoContainer(container_id.to_owned()))?
            .dyn_into::<HtmlElement>()
            .map_err(|_| DomError::NoContainer(container_id.to_owned()))?;
        container.class_list().add_1(STAGE_CLASS)?;

        let (width, height) = client_size(&container);
        let mut dom = Self {
            window,
            document,
            container,
            stage: Rc::new(RefCell::new(Stage::new(width, height))),
            listeners: Vec::new(),
            canvases: Vec::new(),
        };
        dom.listen()?;
        log::info!("stage attached to #{container_id} ({width}x{height})");
        Ok(dom)
    }

    #[must_use]
    pub fn stage(&self) -> Rc<RefCell<Stage<CanvasSurface>>> {
        Rc::clone(&self.stage)
    }

    /// A fresh canvas stacked on top of the existing ones.
    ///
    /// # Errors
    ///
    /// Fails if the canvas cannot be created, appended, or give a 2D context.
    pub fn new_surface(&mut self) -> Result<CanvasSurface, DomError> {
        let canvas = self
            .document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| DomError::NoContext)?;
        canvas.class_list().add_1(LAYER_CLASS)?;
        self.container.append_child(&canvas)?;
        self.canvases.push(canvas.clone());
        CanvasSurface::new(canvas)
    }

    /// Create a canvas and register `handlers` on it as the top layer.
    ///
    /// # Errors
    ///
    /// See [`Self::new_surface`] and [`Stage::add_layer`].
    pub fn add_layer(&mut self, handlers: LayerHandlers) -> Result<LayerId, DomError> {
        let surface = self.new_surface()?;
        Ok(self.stage.borrow_mut().add_layer(surface, handlers)?)
    }

    pub fn render(&self) {
        self.stage.borrow_mut().render();
    }

    fn listen(&mut self) -> Result<(), DomError> {
        let container: EventTarget = self.container.clone().into();
        let window: EventTarget = self.window.clone().into();

        // Presses only count on the stage; moves and releases are tracked
        // page-wide so drags continue past the edge.
        self.add(container.clone(), "mousedown", self.pointer_closure(), false)?;
        self.add(window.clone(), "mousemove", self.pointer_closure(), false)?;
        self.add(window.clone(), "mouseup", self.pointer_closure(), false)?;

        let stage = Rc::clone(&self.stage);
        let wheel = Closure::wrap(Box::new(move |ev: Event| {
            let Some(ev) = ev.dyn_ref::<WheelEvent>() else {
                return;
            };
            let mut stage = stage.borrow_mut();
            let delta = WheelDelta::from_dom(ev.delta_x(), ev.delta_y(), ev.delta_mode(), stage.height());
            if stage.wheel(delta) == WheelOutcome::Absorbed {
                ev.prevent_default();
            }
        }) as Box<dyn FnMut(Event)>);
        self.add(container, "wheel", wheel, true)?;

        let stage = Rc::clone(&self.stage);
        let host = self.container.clone();
        let resize = Closure::wrap(Box::new(move |_ev: Event| {
            let (width, height) = client_size(&host);
            stage.borrow_mut().resize(width, height);
        }) as Box<dyn FnMut(Event)>);
        self.add(window, "resize", resize, false)
    }

    fn pointer_closure(&self) -> EventClosure {
        let stage = Rc::clone(&self.stage);
        let host = self.container.clone();
        Closure::wrap(Box::new(move |ev: Event| {
            let Some(ev) = ev.dyn_ref::<MouseEvent>() else {
                return;
            };
            let rect = host.get_bounding_client_rect();
            let px = f64::from(ev.client_x()) - rect.left();
            let py = f64::from(ev.client_y()) - rect.top();
            stage.borrow_mut().update_mouse(px, py, Buttons(ev.buttons()));
        }) as Box<dyn FnMut(Event)>)
    }

    /// Register `closure`; `active` listeners may call `preventDefault`.
    fn add(&mut self, target: EventTarget, event: &'static str, closure: EventClosure, active: bool) -> Result<(), DomError> {
        let callback = closure.as_ref().unchecked_ref();
        if active {
            let options = AddEventListenerOptions::new();
            options.set_passive(false);
            target.add_event_listener_with_callback_and_add_event_listener_options(event, callback, &options)?;
        } else {
            target.add_event_listener_with_callback(event, callback)?;
        }
        self.listeners.push(Listener { target, event, closure });
        Ok(())
    }
}

impl Drop for DomStage {
    fn drop(&mut self) {
        for listener in self.listeners.drain(..) {
            let callback = listener.closure.as_ref().unchecked_ref();
            if let Err(e) = listener.target.remove_event_listener_with_callback(listener.event, callback) {
                log::warn!("failed to remove {} listener: {e:?}", listener.event);
            }
        }
        for canvas in self.canvases.drain(..) {
            canvas.remove();
        }
        log::debug!("stage detached");
    }
}

fn client_size(el: &HtmlElement) -> (f64, f64) {
    (f64::from(el.client_width()), f64::from(el.client_height()))
}

// =============================================================
// Images
// =============================================================

/// Loads images through `<img>` elements from the file endpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct DomImageResolver;

impl ImageResolver for DomImageResolver {
    fn resolve(&self, file_id: &str, done: ImageCallback) {
        let image = match HtmlImageElement::new() {
            Ok(image) => image,
            Err(e) => {
                log::error!("cannot create image element: {e:?}");
                done(Err(ServiceError::Image { id: file_id.to_owned() }));
                return;
            }
        };

        // Whichever of load/error fires first consumes the callback.
        let slot = Rc::new(RefCell::new(Some(done)));

        let (loaded, id, element) = (Rc::clone(&slot), file_id.to_owned(), image.clone());
        let onload = Closure::once_into_js(move || {
            if let Some(done) = loaded.borrow_mut().take() {
                done(Ok(ImageHandle::from_element(id, element)));
            }
        });
        let (failed, id) = (slot, file_id.to_owned());
        let onerror = Closure::once_into_js(move || {
            if let Some(done) = failed.borrow_mut().take() {
                done(Err(ServiceError::Image { id }));
            }
        });

        image.set_onload(Some(onload.unchecked_ref()));
        image.set_onerror(Some(onerror.unchecked_ref()));
        image.set_src(&image_endpoint(file_id));
    }
}

// =============================================================
// Application entry
// =============================================================

/// Install the console logger and panic hook at the configured level.
pub fn start(config: &StageConfig) {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(config.level()).is_err() {
        log::debug!("console logger already installed");
    }
}

/// The map stage as seen from JavaScript.
#[wasm_bindgen]
pub struct MapStageApp {
    dom: DomStage,
    editor: Rc<RefCell<MapEditor>>,
    hub: Rc<RefCell<SceneHub>>,
    catalog: Rc<RefCell<MapCatalog>>,
    resolver: Rc<DomImageResolver>,
    peek: Option<DomStage>,
    /// Screens layout poll; dropping it cancels the timer.
    poll: RefCell<Option<Interval>>,
}

#[wasm_bindgen]
impl MapStageApp {
    /// Attach to `#container_id`. `config_json` overrides [`StageConfig`] defaults.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration or if the stage cannot be attached.
    #[wasm_bindgen(constructor)]
    pub fn new(container_id: &str, config_json: Option<String>) -> Result<MapStageApp, JsValue> {
        let config = match config_json {
            Some(raw) => StageConfig::from_json(&raw).map_err(config_error)?,
            None => StageConfig::default(),
        };
        start(&config);

        let mut dom = DomStage::attach(container_id)?;
        let stage = dom.stage();
        let (width, height) = {
            let stage = stage.borrow();
            (stage.width(), stage.height())
        };
        let editor = MapEditor::new(config, width, height).with_layout_store(Rc::new(HttpLayoutStore::default()));
        let editor = Rc::new(RefCell::new(editor));

        let map_surface = dom.new_surface()?;
        let bounds_surface = dom.new_surface()?;
        install(&mut stage.borrow_mut(), &editor, map_surface, bounds_surface).map_err(DomError::from)?;

        let app = Self {
            dom,
            editor,
            hub: Rc::new(RefCell::new(SceneHub::new())),
            catalog: Rc::new(RefCell::new(MapCatalog::new())),
            resolver: Rc::new(DomImageResolver),
            peek: None,
            poll: RefCell::new(None),
        };
        app.follow_active_map();
        Ok(app)
    }

    /// Fetch the map listing, the active map and the screens layout, then
    /// keep polling the physical cells.
    pub fn load(&self) {
        let (hub, catalog) = (Rc::clone(&self.hub), Rc::clone(&self.catalog));
        wasm_bindgen_futures::spawn_local(async move {
            match fetch_maps().await {
                Ok(maps) => catalog.borrow_mut().replace_all(maps),
                Err(e) => log::error!("failed to fetch maps: {e}"),
            }
            match fetch_active_map().await {
                Ok(map) => hub.borrow_mut().set_active(map),
                Err(e) => log::error!("failed to fetch active map: {e}"),
            }
        });

        let (editor, stage) = (Rc::clone(&self.editor), self.dom.stage());
        wasm_bindgen_futures::spawn_local(async move {
            let placement = match fetch_screen_placement().await {
                Ok(placement) => placement,
                Err(e) => {
                    log::warn!("no stored screens placement: {e}");
                    None
                }
            };
            match fetch_screen_cells().await {
                Ok(cells) => {
                    editor.borrow_mut().restore_screens(placement.as_ref(), cells);
                    stage.borrow_mut().render();
                }
                Err(e) => log::error!("failed to fetch screens layout: {e}"),
            }
        });

        let (editor, stage) = (Rc::clone(&self.editor), self.dom.stage());
        let poll = Interval::new(SCREENS_POLL_MS, move || {
            let (editor, stage) = (Rc::clone(&editor), Rc::clone(&stage));
            wasm_bindgen_futures::spawn_local(async move {
                match fetch_screen_cells().await {
                    Ok(cells) => {
                        if editor.borrow_mut().update_screen_cells(cells) {
                            stage.borrow_mut().render();
                        }
                    }
                    Err(e) => log::debug!("screens poll failed: {e}"),
                }
            });
        });
        *self.poll.borrow_mut() = Some(poll);
    }

    /// Show the map under the active screen cell in `#container_id`,
    /// repainted after every main stage render.
    ///
    /// # Errors
    ///
    /// Fails if the peek stage cannot be attached.
    pub fn attach_peek(&mut self, container_id: &str) -> Result<(), JsValue> {
        let mut peek = DomStage::attach(container_id)?;
        let surface = peek.new_surface()?;
        let peek_stage = peek.stage();
        install_peek(&mut peek_stage.borrow_mut(), &self.editor, surface).map_err(DomError::from)?;

        let weak = Rc::downgrade(&peek_stage);
        self.dom.stage().borrow_mut().on_rendered(move || {
            if let Some(stage) = weak.upgrade() {
                stage.borrow_mut().render();
            }
        });
        peek_stage.borrow_mut().render();
        self.peek = Some(peek);
        Ok(())
    }

    /// The catalog as a JSON array, sorted by name.
    ///
    /// # Errors
    ///
    /// Fails if the listing cannot be serialized.
    pub fn maps(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.catalog.borrow().sorted()).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Drop a map from the catalog. Returns false if it was not cached.
    pub fn remove_map(&self, map_id: &str) -> bool {
        self.catalog.borrow_mut().invalidate(map_id).is_some()
    }

    #[must_use]
    pub fn active_map_id(&self) -> Option<String> {
        self.hub.borrow().active().map(|m| m.map_id.clone())
    }

    /// Switch to a map record given as JSON.
    ///
    /// # Errors
    ///
    /// Fails if `json` is not a map record.
    pub fn set_active_map(&self, json: &str) -> Result<(), JsValue> {
        let map: MapRecord = serde_json::from_str(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.catalog.borrow_mut().upsert(map.clone());
        self.hub.borrow_mut().set_active(map);
        Ok(())
    }

    /// Switch to a map by id. A map missing from the catalog is fetched
    /// first; returns false in that case.
    pub fn set_active_map_id(&self, map_id: &str) -> bool {
        let cached = self.catalog.borrow().get(map_id).cloned();
        if let Some(map) = cached {
            self.hub.borrow_mut().set_active(map);
            return true;
        }

        let (hub, catalog, url) = (Rc::clone(&self.hub), Rc::clone(&self.catalog), map_endpoint(map_id));
        wasm_bindgen_futures::spawn_local(async move {
            match fetch_json::<MapRecord>(&url).await {
                Ok(map) => {
                    catalog.borrow_mut().upsert(map.clone());
                    hub.borrow_mut().set_active(map);
                }
                Err(e) => log::warn!("unknown map at {url}: {e}"),
            }
        });
        false
    }

    /// Place a token given as JSON; its image loads in the background.
    ///
    /// # Errors
    ///
    /// Fails if `json` is not a token record.
    pub fn add_token(&self, json: &str) -> Result<String, JsValue> {
        let record: TokenRecord = serde_json::from_str(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let file_id = record.file_id.clone();
        let id = self.editor.borrow_mut().add_token(record);
        self.dom.render();

        let (editor, stage) = (Rc::clone(&self.editor), self.dom.stage());
        self.resolver.resolve(
            &file_id,
            Box::new(move |result| match result {
                Ok(image) => {
                    if editor.borrow_mut().set_image(id, image) {
                        stage.borrow_mut().render();
                    } else {
                        log::debug!("token {id} was removed before its image loaded");
                    }
                }
                Err(e) => log::error!("token {id}: {e}"),
            }),
        );
        Ok(id.to_string())
    }

    pub fn render(&self) {
        self.dom.render();
    }
}

impl MapStageApp {
    /// Re-derive the view whenever the active map changes.
    fn follow_active_map(&self) {
        let (editor, stage, resolver) = (Rc::clone(&self.editor), self.dom.stage(), Rc::clone(&self.resolver));
        self.hub.borrow_mut().register(Box::new(move |map: &MapRecord| {
            let (editor, stage, map_id) = (Rc::clone(&editor), Rc::clone(&stage), map.map_id.clone());
            resolver.resolve(
                &map.file_id,
                Box::new(move |result| match result {
                    Ok(image) => {
                        editor.borrow_mut().set_map_image(image);
                        stage.borrow_mut().render();
                    }
                    Err(e) => log::error!("map {map_id}: {e}"),
                }),
            );
        }));
    }
}

fn config_error(e: ConfigError) -> JsValue {
    JsValue::from_str(&e.to_string())
}
