//! Shared numeric constants for the stage crate.

// ── Math ────────────────────────────────────────────────────────

/// Smallest scale any constraint or operation will produce.
///
/// Keeps footprints strictly positive so later frames never divide by zero
/// or draw inverted rectangles.
pub const MIN_SCALE: f64 = 1e-4;

/// Smallest box or size extent used as a divisor.
pub const MIN_EXTENT: f64 = 1e-6;

/// Tolerance used when deciding whether a wheel tick changed the zoom.
pub const SCALE_EPSILON: f64 = 1e-9;

// ── Mouse buttons ───────────────────────────────────────────────

/// Bit for the primary (left) button in a `MouseEvent.buttons` mask.
pub const BUTTON_PRIMARY: u16 = 1;

/// Bit for the secondary (right) button.
pub const BUTTON_SECONDARY: u16 = 2;

/// Bit for the auxiliary (middle) button.
pub const BUTTON_AUXILIARY: u16 = 4;

// ── Screens ─────────────────────────────────────────────────────

/// Default physical screen width in pixels.
pub const SCREEN_WIDTH_PX: f64 = 1024.0;

/// Default physical screen height in pixels.
pub const SCREEN_HEIGHT_PX: f64 = 600.0;

// ── Wheel ───────────────────────────────────────────────────────

/// `WheelEvent.deltaMode` for deltas counted in lines.
pub const DOM_DELTA_LINE: u32 = 1;

/// `WheelEvent.deltaMode` for deltas counted in pages.
pub const DOM_DELTA_PAGE: u32 = 2;

/// Pixels per line when a wheel reports line deltas.
pub const LINE_HEIGHT_PX: f64 = 16.0;
