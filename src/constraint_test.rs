#![allow(clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn state(x: f64, y: f64, scale: f64, w: f64, h: f64) -> AffineState {
    AffineState::new(x, y, scale, Size::new(w, h))
}

/// A spread of inputs, including states far outside every box used below.
fn sample_states(w: f64, h: f64) -> Vec<AffineState> {
    let mut out = Vec::new();
    for &x in &[-5000.0, -100.0, 0.0, 37.5, 250.0, 9000.0] {
        for &y in &[-3000.0, -1.0, 0.0, 120.0, 7000.0] {
            for &scale in &[0.001, 0.1, 0.5, 1.0, 3.0, 40.0] {
                out.push(state(x, y, scale, w, h));
            }
        }
    }
    out
}

fn inside(s: &AffineState, b: &Bounds) -> bool {
    let f = s.footprint();
    s.x >= b.x - EPSILON
        && s.y >= b.y - EPSILON
        && s.x + f.x <= b.x + b.size.x + EPSILON
        && s.y + f.y <= b.y + b.size.y + EPSILON
}

fn covers(s: &AffineState, b: &Bounds) -> bool {
    let f = s.footprint();
    s.x <= b.x + EPSILON
        && s.y <= b.y + EPSILON
        && s.x + f.x >= b.x + b.size.x - EPSILON
        && s.y + f.y >= b.y + b.size.y - EPSILON
}

// =============================================================
// Contain
// =============================================================

#[test]
fn contain_zoom_out_clamps_to_exact_fit() {
    let c = Clamp::Contain(Bounds::new(0.0, 0.0, 500.0, 500.0));
    let out = c.apply(state(0.0, 0.0, 0.1, 1000.0, 1000.0));
    assert!(approx_eq(out.scale, 0.5));
    assert!(approx_eq(out.x, 0.0));
    assert!(approx_eq(out.y, 0.0));
}

#[test]
fn contain_at_minimum_scale_footprint_is_inside() {
    let b = Bounds::new(10.0, 20.0, 800.0, 450.0);
    let c = Clamp::Contain(b);
    for s in sample_states(1000.0, 1000.0) {
        let min = state(s.x, s.y, 0.0, 1000.0, 1000.0);
        let out = c.apply(min);
        assert!(inside(&out, &b), "{out:?} escapes {b:?}");
    }
}

#[test]
fn contain_oversized_axis_keeps_box_covered() {
    let b = Bounds::new(0.0, 0.0, 500.0, 500.0);
    let c = Clamp::Contain(b);
    let out = c.apply(state(400.0, -9000.0, 2.0, 1000.0, 1000.0));
    assert!(covers(&out, &b));
    assert!(approx_eq(out.x, 0.0));
    assert!(approx_eq(out.y, 500.0 - 2000.0));
}

#[test]
fn contain_centers_only_the_undersized_axis() {
    // Wide viewport, square map at scale 0.8: 800 px wide in a 1000 px box
    // (undersized) and 800 px tall in a 500 px box (oversized).
    let c = Clamp::Contain(Bounds::new(0.0, 0.0, 1000.0, 500.0));
    let out = c.apply(state(-300.0, 100.0, 0.8, 1000.0, 1000.0));
    assert!(approx_eq(out.scale, 0.8));
    assert!(approx_eq(out.x, 100.0));
    assert!(approx_eq(out.y, 0.0));
}

// =============================================================
// Fit
// =============================================================

#[test]
fn fit_always_covers_box() {
    let b = Bounds::new(-50.0, 30.0, 640.0, 360.0);
    let c = Clamp::Fit(b);
    for s in sample_states(300.0, 900.0) {
        let out = c.apply(s);
        assert!(covers(&out, &b), "{out:?} does not cover {b:?}");
        assert!(out.scale > 0.0);
    }
}

#[test]
fn fit_raises_scale_to_cover_larger_axis_ratio() {
    let c = Clamp::Fit(Bounds::new(0.0, 0.0, 400.0, 100.0));
    let out = c.apply(state(0.0, 0.0, 0.01, 100.0, 100.0));
    assert!(approx_eq(out.scale, 4.0));
}

// =============================================================
// Within
// =============================================================

#[test]
fn within_keeps_footprint_inside_for_any_input() {
    let b = Bounds::new(0.0, 0.0, 3500.0, 5180.0);
    let c = Clamp::Within(b);
    for s in sample_states(1024.0, 600.0) {
        let out = c.apply(s);
        assert!(inside(&out, &b), "{out:?} escapes {b:?}");
    }
}

#[test]
fn within_shrinks_oversized_entity() {
    let c = Clamp::Within(Bounds::new(0.0, 0.0, 500.0, 500.0));
    let out = c.apply(state(0.0, 0.0, 1.0, 1000.0, 250.0));
    assert!(approx_eq(out.scale, 0.5));
}

// =============================================================
// MaxScale
// =============================================================

#[test]
fn max_scale_caps_without_moving() {
    let out = Clamp::MaxScale(2.0).apply(state(12.0, 34.0, 9.0, 10.0, 10.0));
    assert_eq!(out.scale, 2.0);
    assert_eq!(out.x, 12.0);
    assert_eq!(out.y, 34.0);
}

// =============================================================
// Constraint composition
// =============================================================

#[test]
fn empty_constraint_is_identity_for_valid_state() {
    let s = state(1.0, 2.0, 0.5, 10.0, 10.0);
    assert_eq!(Constraint::new().apply(s), s);
}

#[test]
fn constraint_is_idempotent() {
    let c = Constraint::new()
        .with(Clamp::MaxScale(8.0))
        .with(Clamp::Contain(Bounds::new(0.0, 0.0, 700.0, 300.0)));
    for s in sample_states(1000.0, 600.0) {
        let once = c.apply(s);
        let twice = c.apply(once);
        assert!(approx_eq(once.x, twice.x));
        assert!(approx_eq(once.y, twice.y));
        assert!(approx_eq(once.scale, twice.scale));
    }
}

#[test]
fn constraint_applies_in_registration_order() {
    let b = Bounds::new(0.0, 0.0, 100.0, 100.0);
    let fit_then_cap = Constraint::new().with(Clamp::Fit(b)).with(Clamp::MaxScale(0.5));
    let cap_then_fit = Constraint::new().with(Clamp::MaxScale(0.5)).with(Clamp::Fit(b));
    let s = state(0.0, 0.0, 0.1, 100.0, 100.0);
    assert!(approx_eq(fit_then_cap.apply(s).scale, 0.5));
    assert!(approx_eq(cap_then_fit.apply(s).scale, 1.0));
}

#[test]
fn clear_removes_all_clamps() {
    let mut c = Constraint::new().with(Clamp::MaxScale(1.0));
    let s = state(0.0, 0.0, 3.0, 10.0, 10.0);
    assert!(approx_eq(c.apply(s).scale, 1.0));
    c.clear();
    assert_eq!(c.apply(s), s);
}

#[test]
fn clamp_scale_matches_apply() {
    let c = Constraint::new()
        .with(Clamp::MaxScale(0.8))
        .with(Clamp::Within(Bounds::new(0.0, 0.0, 500.0, 500.0)));
    for s in sample_states(1000.0, 600.0) {
        assert!(approx_eq(c.clamp_scale(s.scale, s.size), c.apply(s).scale));
    }
}

#[test]
fn clamp_scale_ignores_position() {
    let c = Constraint::new().with(Clamp::Contain(Bounds::new(0.0, 0.0, 500.0, 500.0)));
    let size = Size::new(1000.0, 1000.0);
    assert!(approx_eq(c.clamp_scale(0.1, size), 0.5));
    assert!(approx_eq(c.clamp_scale(3.0, size), 3.0));
}

// =============================================================
// Degenerate inputs
// =============================================================

#[test]
fn zero_sized_box_does_not_produce_nan() {
    let b = Bounds::new(0.0, 0.0, 0.0, 0.0);
    for clamp in [Clamp::Contain(b), Clamp::Fit(b), Clamp::Within(b)] {
        let out = clamp.apply(state(10.0, 10.0, 1.0, 100.0, 100.0));
        assert!(out.x.is_finite() && out.y.is_finite());
        assert!(out.scale.is_finite() && out.scale > 0.0);
    }
}

#[test]
fn zero_sized_entity_does_not_produce_nan() {
    let b = Bounds::new(0.0, 0.0, 100.0, 100.0);
    for clamp in [Clamp::Contain(b), Clamp::Fit(b), Clamp::Within(b)] {
        let out = clamp.apply(state(10.0, 10.0, 1.0, 0.0, 0.0));
        assert!(out.x.is_finite() && out.y.is_finite());
        assert!(out.scale.is_finite() && out.scale > 0.0);
    }
}

#[test]
fn non_finite_scale_is_reset_to_minimum() {
    let out = Constraint::new().apply(state(0.0, 0.0, f64::NEG_INFINITY, 10.0, 10.0));
    assert_eq!(out.scale, MIN_SCALE);
    let out = Constraint::new().apply(state(0.0, 0.0, f64::NAN, 10.0, 10.0));
    assert_eq!(out.scale, MIN_SCALE);
}
