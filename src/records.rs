//! Wire records exchanged with the map server.
//!
//! These are the already-parsed JSON shapes the stage consumes and emits.
//! Field names follow the server's PascalCase API.

#[cfg(test)]
#[path = "records_test.rs"]
mod records_test;

use serde::{Deserialize, Serialize};

/// A map known to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapRecord {
    #[serde(rename = "MapId")]
    pub map_id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    /// File holding the map image.
    #[serde(rename = "FileId")]
    pub file_id: String,
}

/// A token placed on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    #[serde(rename = "TokenId")]
    pub token_id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    /// File holding the token image.
    #[serde(rename = "FileId")]
    pub file_id: String,
    #[serde(rename = "X", default)]
    pub x: f64,
    #[serde(rename = "Y", default)]
    pub y: f64,
    #[serde(rename = "Scale", default = "unit_scale")]
    pub scale: f64,
}

/// One physical screen inside a screens layout, in screen-pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenCell {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenCell {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }
}

/// The persisted placement of the screens group on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenLayoutRecord {
    /// Map-space position of the group's top-left corner.
    pub x: f64,
    pub y: f64,
    /// Map units per screen pixel.
    pub scale: f64,
    pub cells: Vec<ScreenCell>,
}

fn unit_scale() -> f64 {
    1.0
}
