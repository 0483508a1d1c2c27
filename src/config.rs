//! Stage configuration: layout constants and colors, loadable from JSON.
//!
//! Every field has a default, so a host page only needs to supply the keys it
//! wants to override (for example sizes derived from the root font size).

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::Deserialize;

use crate::consts::{SCREEN_HEIGHT_PX, SCREEN_WIDTH_PX};

pub const DEFAULT_VIEW_BORDER_PX: f64 = 3.2;
pub const DEFAULT_SCREEN_BORDER_PX: f64 = 2.4;
pub const DEFAULT_SELECT_BORDER_PX: f64 = 2.4;
pub const DEFAULT_HANDLE_SIZE_PX: f64 = 8.0;
pub const DEFAULT_WHEEL_ZOOM_RATE: f64 = 0.0005;
pub const DEFAULT_MAX_ZOOM: f64 = 8.0;
pub const DEFAULT_MAX_SCREENS_SCALE: f64 = 2.0;
pub const DEFAULT_TOKEN_SIZE: f64 = 64.0;
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value for {field}: {value}")]
    Invalid { field: &'static str, value: f64 },
}

/// Colors used by the built-in layers, as CSS color strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub foreground: String,
    pub screen_stroke: String,
    pub screen_fill: String,
    pub select_stroke: String,
    pub select_fill: String,
    pub placeholder: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            foreground: "#E0E0E0".into(),
            screen_stroke: "#785EF0".into(),
            screen_fill: "#785EF055".into(),
            select_stroke: "#FFF".into(),
            select_fill: "#FFF".into(),
            placeholder: "#888".into(),
        }
    }
}

/// Layout, input and logging settings for a map stage.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Width of the frame drawn around the map view, in pixels.
    pub view_border: f64,
    /// Outline width of screen cells, in pixels.
    pub screen_border: f64,
    /// Outline width of the selection box, in pixels.
    pub select_border: f64,
    /// Side of a square scale handle, in pixels.
    pub handle_size: f64,
    /// Physical width of one screen cell, in screen pixels.
    pub screen_width: f64,
    /// Physical height of one screen cell, in screen pixels.
    pub screen_height: f64,
    /// Scale change per wheel-delta unit.
    pub wheel_zoom_rate: f64,
    /// Largest view scale the wheel can reach.
    pub max_zoom: f64,
    /// Largest scale the screens group may take on the map.
    pub max_screens_scale: f64,
    /// Intrinsic side of a token whose image has not resolved yet.
    pub token_size: f64,
    /// Console log level (`error`, `warn`, `info`, `debug`, `trace`).
    pub log_level: String,
    pub palette: Palette,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            view_border: DEFAULT_VIEW_BORDER_PX,
            screen_border: DEFAULT_SCREEN_BORDER_PX,
            select_border: DEFAULT_SELECT_BORDER_PX,
            handle_size: DEFAULT_HANDLE_SIZE_PX,
            screen_width: SCREEN_WIDTH_PX,
            screen_height: SCREEN_HEIGHT_PX,
            wheel_zoom_rate: DEFAULT_WHEEL_ZOOM_RATE,
            max_zoom: DEFAULT_MAX_ZOOM,
            max_screens_scale: DEFAULT_MAX_SCREENS_SCALE,
            token_size: DEFAULT_TOKEN_SIZE,
            log_level: DEFAULT_LOG_LEVEL.into(),
            palette: Palette::default(),
        }
    }
}

impl StageConfig {
    /// Parse a JSON object of overrides and validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject sizes and rates that would make the stage unusable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("handle_size", self.handle_size),
            ("screen_width", self.screen_width),
            ("screen_height", self.screen_height),
            ("wheel_zoom_rate", self.wheel_zoom_rate),
            ("max_zoom", self.max_zoom),
            ("max_screens_scale", self.max_screens_scale),
            ("token_size", self.token_size),
        ];
        let non_negative = [
            ("view_border", self.view_border),
            ("screen_border", self.screen_border),
            ("select_border", self.select_border),
        ];

        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid { field, value });
            }
        }
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Invalid { field, value });
            }
        }
        Ok(())
    }

    /// The configured log level, falling back to `Info` for unknown names.
    #[must_use]
    pub fn level(&self) -> log::Level {
        self.log_level.parse().unwrap_or(log::Level::Info)
    }
}
