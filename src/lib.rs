//! Interactive map stage for a tabletop display.
//!
//! This crate is compiled to WebAssembly and runs in the browser. It keeps a
//! map image, a movable physical-screens overlay, and tokens on a stack of
//! canvas layers, and turns raw pointer, wheel, and resize events into
//! constrained pan, zoom, move, and scale gestures. Gestures are previewed
//! while the pointer moves and committed on release; committed screens
//! layouts are posted back to the server.
//!
//! Everything except [`dom`] is plain Rust and runs under `cargo test`
//! against the recording surface in the test doubles.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`geom`] | Points, sizes, and the [`geom::AffineState`] transform |
//! | [`constraint`] | Clamps that keep a transform inside a permitted region |
//! | [`operation`] | Pending translate/scale edits with preview and commit |
//! | [`entity`] | Transformable map, screens, and token entities |
//! | [`render`] | The 2D [`render::Surface`] abstraction |
//! | [`input`] | Button masks and the mouse state machine |
//! | [`stage`] | Layer stack, event dispatch, and the render loop |
//! | [`scene`] | The map editor that drives the stage |
//! | [`records`] | Wire records exchanged with the map server |
//! | [`services`] | HTTP helpers, layout persistence, catalog, active-map hub |
//! | [`config`] | Stage configuration loaded from JSON |
//! | [`consts`] | Shared numeric constants |
//! | [`dom`] | Browser binding: canvases, listeners, and the exported app |

pub mod config;
pub mod constraint;
pub mod consts;
pub mod dom;
pub mod entity;
pub mod geom;
pub mod input;
pub mod operation;
pub mod records;
pub mod render;
pub mod scene;
pub mod services;
pub mod stage;

#[cfg(test)]
mod testing;
