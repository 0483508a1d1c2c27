//! Test doubles shared by the unit-test modules.

use crate::render::{ImageHandle, RenderError, Surface};

/// One recorded drawing call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetSize(f64, f64),
    ResetTransform,
    Clear(f64, f64, f64, f64),
    Save,
    Restore,
    Translate(f64, f64),
    Scale(f64, f64),
    FillStyle(String),
    StrokeStyle(String),
    LineWidth(f64),
    FillRect(f64, f64, f64, f64),
    StrokeRect(f64, f64, f64, f64),
    Image(String, f64, f64, f64, f64),
}

/// A surface that records every call instead of drawing.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub calls: Vec<Call>,
    /// When set, `translate` fails with this message.
    pub fail_translate: Option<String>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fill_rects(&self) -> Vec<(f64, f64, f64, f64)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::FillRect(x, y, w, h) => Some((*x, *y, *w, *h)),
                _ => None,
            })
            .collect()
    }

    pub fn stroke_rects(&self) -> Vec<(f64, f64, f64, f64)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::StrokeRect(x, y, w, h) => Some((*x, *y, *w, *h)),
                _ => None,
            })
            .collect()
    }

    pub fn images(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Image(id, ..) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn translations(&self) -> Vec<(f64, f64)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Translate(x, y) => Some((*x, *y)),
                _ => None,
            })
            .collect()
    }

    pub fn scales(&self) -> Vec<f64> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Scale(s, _) => Some(*s),
                _ => None,
            })
            .collect()
    }
}

impl Surface for RecordingSurface {
    fn set_size(&mut self, width: f64, height: f64) {
        self.calls.push(Call::SetSize(width, height));
    }

    fn reset_transform(&mut self) -> Result<(), RenderError> {
        self.calls.push(Call::ResetTransform);
        Ok(())
    }

    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.calls.push(Call::Clear(x, y, width, height));
    }

    fn save(&mut self) {
        self.calls.push(Call::Save);
    }

    fn restore(&mut self) {
        self.calls.push(Call::Restore);
    }

    fn translate(&mut self, x: f64, y: f64) -> Result<(), RenderError> {
        if let Some(msg) = &self.fail_translate {
            return Err(RenderError::Canvas(msg.clone()));
        }
        self.calls.push(Call::Translate(x, y));
        Ok(())
    }

    fn scale(&mut self, sx: f64, sy: f64) -> Result<(), RenderError> {
        self.calls.push(Call::Scale(sx, sy));
        Ok(())
    }

    fn set_fill_style(&mut self, color: &str) {
        self.calls.push(Call::FillStyle(color.to_string()));
    }

    fn set_stroke_style(&mut self, color: &str) {
        self.calls.push(Call::StrokeStyle(color.to_string()));
    }

    fn set_line_width(&mut self, width: f64) {
        self.calls.push(Call::LineWidth(width));
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.calls.push(Call::FillRect(x, y, width, height));
    }

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.calls.push(Call::StrokeRect(x, y, width, height));
    }

    fn draw_image(&mut self, image: &ImageHandle, x: f64, y: f64, width: f64, height: f64) -> Result<(), RenderError> {
        self.calls.push(Call::Image(image.id.clone(), x, y, width, height));
        Ok(())
    }
}
