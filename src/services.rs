//! Collaborator services: screens layout persistence, image resolution, the
//! map catalog, and the active-scene hub.
//!
//! The stage never awaits any of these. Persistence is fire-and-forget: the
//! in-memory state is already committed when a request is sent, and a failed
//! request is only logged. Image resolution completes through a callback,
//! after which the caller installs the image and asks for a render.
//!
//! ERROR HANDLING
//! ==============
//! HTTP helpers return `Result<_, ServiceError>`; callers at the browser
//! boundary log the error and keep the previous data.

#[cfg(test)]
#[path = "services_test.rs"]
mod services_test;

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use crate::records::{MapRecord, ScreenCell, ScreenLayoutRecord};
use crate::render::ImageHandle;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("server responded {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("image {id} failed to load")]
    Image { id: String },
}

impl From<gloo_net::Error> for ServiceError {
    fn from(e: gloo_net::Error) -> Self {
        Self::Http(e.to_string())
    }
}

// =============================================================
// Endpoints
// =============================================================

pub const MAPS_ENDPOINT: &str = "/api/Maps";
pub const ACTIVE_MAP_ENDPOINT: &str = "/api/Maps/active-map";
pub const SCREENS_LAYOUT_ENDPOINT: &str = "/api/Screens/layout";
pub const SCREENS_PLACEMENT_ENDPOINT: &str = "/api/Screens/placement";

#[must_use]
pub fn map_endpoint(map_id: &str) -> String {
    format!("{MAPS_ENDPOINT}/{map_id}")
}

#[must_use]
pub fn image_endpoint(file_id: &str) -> String {
    format!("/api/Files/images/{file_id}")
}

// =============================================================
// HTTP helpers
// =============================================================

/// GET `url` and decode its JSON body.
///
/// # Errors
///
/// `Http` if the request cannot be sent, `Status` for a non-2xx response,
/// `Decode` if the body is not the expected JSON.
pub async fn fetch_json<T: DeserializeOwned>(url: &str) -> Result<T, ServiceError> {
    let resp = gloo_net::http::Request::get(url).send().await?;
    check_status(resp.status())?;
    resp.json::<T>().await.map_err(|e| ServiceError::Decode(e.to_string()))
}

/// POST `body` as JSON to `url`.
///
/// # Errors
///
/// `Http` if the request cannot be built or sent, `Status` for a non-2xx response.
pub async fn post_json<T: serde::Serialize>(url: &str, body: &T) -> Result<(), ServiceError> {
    let resp = gloo_net::http::Request::post(url).json(body)?.send().await?;
    check_status(resp.status())
}

/// Any 2xx status is success.
///
/// # Errors
///
/// Returns [`ServiceError::Status`] otherwise.
pub fn check_status(status: u16) -> Result<(), ServiceError> {
    if (200..300).contains(&status) { Ok(()) } else { Err(ServiceError::Status(status)) }
}

/// # Errors
///
/// See [`fetch_json`].
pub async fn fetch_maps() -> Result<Vec<MapRecord>, ServiceError> {
    fetch_json(MAPS_ENDPOINT).await
}

/// # Errors
///
/// See [`fetch_json`].
pub async fn fetch_active_map() -> Result<MapRecord, ServiceError> {
    fetch_json(ACTIVE_MAP_ENDPOINT).await
}

/// The raw cells of the physical screens layout.
///
/// # Errors
///
/// See [`fetch_json`].
pub async fn fetch_screen_cells() -> Result<Vec<ScreenCell>, ServiceError> {
    fetch_json(SCREENS_LAYOUT_ENDPOINT).await
}

/// The last committed screens placement, or `None` if nothing was stored yet.
///
/// # Errors
///
/// See [`fetch_json`]; a 404 is not an error.
pub async fn fetch_screen_placement() -> Result<Option<ScreenLayoutRecord>, ServiceError> {
    absent_if_not_found(fetch_json(SCREENS_PLACEMENT_ENDPOINT).await)
}

/// Map a 404 to `Ok(None)`.
///
/// # Errors
///
/// Passes every other error through.
pub fn absent_if_not_found<T>(result: Result<T, ServiceError>) -> Result<Option<T>, ServiceError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ServiceError::Status(404)) => Ok(None),
        Err(e) => Err(e),
    }
}

// =============================================================
// Persistence
// =============================================================

/// Where committed screens layouts go.
///
/// Implementations must not block and must not report failure back into the
/// stage; the committed state stands either way.
pub trait LayoutStore {
    fn persist(&self, record: &ScreenLayoutRecord);
}

/// Posts layouts to the server from a spawned task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpLayoutStore {
    url: String,
}

impl HttpLayoutStore {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Default for HttpLayoutStore {
    fn default() -> Self {
        Self::new(SCREENS_PLACEMENT_ENDPOINT)
    }
}

impl LayoutStore for HttpLayoutStore {
    fn persist(&self, record: &ScreenLayoutRecord) {
        let url = self.url.clone();
        let record = record.clone();
        wasm_bindgen_futures::spawn_local(async move {
            match post_json(&url, &record).await {
                Ok(()) => log::debug!("persisted screens layout ({} cells)", record.cells.len()),
                Err(ServiceError::Status(status)) => log::warn!("screens layout rejected: {status}"),
                Err(e) => log::error!("failed to persist screens layout: {e}"),
            }
        });
    }
}

// =============================================================
// Image resolution
// =============================================================

/// Called once with the decoded image or the reason it failed.
pub type ImageCallback = Box<dyn FnOnce(Result<ImageHandle, ServiceError>)>;

/// Resolves a file id to a decoded image, asynchronously.
pub trait ImageResolver {
    fn resolve(&self, file_id: &str, done: ImageCallback);
}

// =============================================================
// Map catalog
// =============================================================

/// Explicit cache of map records keyed by map id.
#[derive(Debug, Default, Clone)]
pub struct MapCatalog {
    maps: HashMap<String, MapRecord>,
}

impl MapCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, map_id: &str) -> Option<&MapRecord> {
        self.maps.get(map_id)
    }

    /// Replace the whole catalog with a fresh listing.
    pub fn replace_all(&mut self, maps: Vec<MapRecord>) {
        self.maps = maps.into_iter().map(|m| (m.map_id.clone(), m)).collect();
    }

    /// Insert or update one record.
    pub fn upsert(&mut self, map: MapRecord) {
        self.maps.insert(map.map_id.clone(), map);
    }

    pub fn invalidate(&mut self, map_id: &str) -> Option<MapRecord> {
        self.maps.remove(map_id)
    }

    /// Records sorted by name, then id.
    #[must_use]
    pub fn sorted(&self) -> Vec<&MapRecord> {
        let mut maps: Vec<&MapRecord> = self.maps.values().collect();
        maps.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.map_id.cmp(&b.map_id)));
        maps
    }
}

// =============================================================
// Active scene
// =============================================================

pub type SceneListener = Box<dyn FnMut(&MapRecord)>;

/// Tracks the active map and tells registered listeners when it changes.
#[derive(Default)]
pub struct SceneHub {
    active: Option<MapRecord>,
    listeners: Vec<SceneListener>,
}

impl SceneHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn active(&self) -> Option<&MapRecord> {
        self.active.as_ref()
    }

    /// Add a listener. If a map is already active the listener hears about it
    /// immediately.
    pub fn register(&mut self, mut listener: SceneListener) {
        if let Some(map) = &self.active {
            listener(map);
        }
        self.listeners.push(listener);
    }

    /// Make `map` active and notify every listener, in registration order.
    /// Setting the map that is already active is a no-op.
    pub fn set_active(&mut self, map: MapRecord) {
        if self.active.as_ref() == Some(&map) {
            return;
        }
        log::debug!("active map is now {}", map.map_id);
        for listener in &mut self.listeners {
            listener(&map);
        }
        self.active = Some(map);
    }
}

impl std::fmt::Debug for SceneHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneHub")
            .field("active", &self.active)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
