//! Rendering surface abstraction.
//!
//! Layers and entities draw through the [`Surface`] trait rather than a
//! concrete `CanvasRenderingContext2d`, so the render path can run (and be
//! tested) without a browser. [`crate::dom::CanvasSurface`] is the browser
//! implementation.
//!
//! Fallible calls return `Result<(), RenderError>`; the stage logs a failed
//! layer and keeps drawing the others.

use wasm_bindgen::{JsCast, JsValue};
use web_sys::HtmlImageElement;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("canvas call failed: {0}")]
    Canvas(String),
}

impl From<JsValue> for RenderError {
    fn from(value: JsValue) -> Self {
        Self::Canvas(js_message(&value))
    }
}

/// Readable text for a thrown JS value: an `Error`'s message, a string as-is,
/// anything else debug-formatted.
#[must_use]
pub fn js_message(value: &JsValue) -> String {
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

/// A decoded image plus its natural dimensions.
///
/// The element is absent for images that only exist as dimensions (tests,
/// or a host that draws images some other way); drawing such a handle is a
/// no-op on the browser surface.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageHandle {
    pub id: String,
    pub width: f64,
    pub height: f64,
    element: Option<HtmlImageElement>,
}

impl ImageHandle {
    /// An image known only by its dimensions.
    #[must_use]
    pub fn detached(id: impl Into<String>, width: f64, height: f64) -> Self {
        Self { id: id.into(), width, height, element: None }
    }

    /// Wrap a loaded `<img>` element, reading its natural size.
    #[must_use]
    pub fn from_element(id: impl Into<String>, element: HtmlImageElement) -> Self {
        Self {
            id: id.into(),
            width: f64::from(element.natural_width()),
            height: f64::from(element.natural_height()),
            element: Some(element),
        }
    }

    #[must_use]
    pub fn element(&self) -> Option<&HtmlImageElement> {
        self.element.as_ref()
    }
}

/// The subset of the 2D canvas API the stage and its entities draw with.
pub trait Surface {
    /// Resize the backing raster. Clears its contents, like setting canvas width/height.
    fn set_size(&mut self, width: f64, height: f64);

    /// Reset the current transform to identity.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the underlying context rejects the call.
    fn reset_transform(&mut self) -> Result<(), RenderError>;

    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64);

    fn save(&mut self);

    fn restore(&mut self);

    /// # Errors
    ///
    /// Returns `Err` if the underlying context rejects the call.
    fn translate(&mut self, x: f64, y: f64) -> Result<(), RenderError>;

    /// # Errors
    ///
    /// Returns `Err` if the underlying context rejects the call.
    fn scale(&mut self, sx: f64, sy: f64) -> Result<(), RenderError>;

    fn set_fill_style(&mut self, color: &str);

    fn set_stroke_style(&mut self, color: &str);

    fn set_line_width(&mut self, width: f64);

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64);

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64);

    /// Draw `image` stretched into the given rectangle.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the underlying context rejects the call.
    fn draw_image(&mut self, image: &ImageHandle, x: f64, y: f64, width: f64, height: f64) -> Result<(), RenderError>;
}
