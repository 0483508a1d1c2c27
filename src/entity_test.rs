#![allow(clippy::float_cmp)]

use super::*;
use crate::constraint::{Bounds, Clamp};
use crate::testing::{Call, RecordingSurface};

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn default_cell() -> ScreenCell {
    ScreenCell::new(0.0, 0.0, 1024.0, 600.0)
}

fn token_record(x: f64, y: f64, scale: f64) -> TokenRecord {
    TokenRecord {
        token_id: "t-1".into(),
        name: "Goblin".into(),
        file_id: "f-1".into(),
        x,
        y,
        scale,
    }
}

/// Two side-by-side 100x50 cells.
fn two_screens() -> Entity {
    Entity::screens(
        vec![ScreenCell::new(0.0, 0.0, 100.0, 50.0), ScreenCell::new(100.0, 0.0, 100.0, 50.0)],
        default_cell(),
    )
}

fn active_index(entity: &Entity) -> usize {
    match &entity.payload {
        Payload::Screens(layout) => layout.active(),
        _ => usize::MAX,
    }
}

// =============================================================
// Construction
// =============================================================

#[test]
fn map_without_image_is_unit_sized() {
    let map = Entity::map(None);
    assert_eq!(map.state.size, Size::default());
    assert_eq!(map.state.scale, 1.0);
}

#[test]
fn map_takes_image_size() {
    let map = Entity::map(Some(ImageHandle::detached("map", 400.0, 300.0)));
    assert_eq!(map.state.size, Size::new(400.0, 300.0));
}

#[test]
fn screens_normalize_cells_to_origin() {
    let screens = Entity::screens(
        vec![ScreenCell::new(50.0, 20.0, 100.0, 50.0), ScreenCell::new(150.0, 20.0, 100.0, 50.0)],
        default_cell(),
    );
    assert_eq!(screens.state.size, Size::new(200.0, 50.0));
    let Payload::Screens(layout) = &screens.payload else {
        panic!("expected screens payload");
    };
    assert_eq!(layout.cells()[0], ScreenCell::new(0.0, 0.0, 100.0, 50.0));
    assert_eq!(layout.cells()[1], ScreenCell::new(100.0, 0.0, 100.0, 50.0));
}

#[test]
fn screens_with_no_cells_use_default_cell() {
    let screens = Entity::screens(Vec::new(), default_cell());
    assert_eq!(screens.state.size, Size::new(1024.0, 600.0));
}

#[test]
fn screens_from_record_restores_placement() {
    let record = ScreenLayoutRecord {
        x: 12.0,
        y: 34.0,
        scale: 0.25,
        cells: vec![default_cell()],
    };
    let screens = Entity::screens_from_record(&record, default_cell());
    assert_eq!(screens.state.position(), Point::new(12.0, 34.0));
    assert_eq!(screens.state.scale, 0.25);
    assert_eq!(screens.layout_record(), Some(record));
}

#[test]
fn token_uses_record_placement() {
    let token = Entity::token(token_record(5.0, 6.0, 2.0), 64.0);
    assert_eq!(token.state, AffineState::new(5.0, 6.0, 2.0, Size::new(64.0, 64.0)));
}

#[test]
fn entities_get_distinct_ids() {
    assert_ne!(Entity::map(None).id(), Entity::map(None).id());
}

// =============================================================
// Preview and apply
// =============================================================

#[test]
fn preview_without_operation_is_committed_state() {
    let token = Entity::token(token_record(1.0, 2.0, 1.0), 10.0);
    assert_eq!(token.preview(None), token.state);
}

#[test]
fn preview_ignores_operation_for_other_entity() {
    let token = Entity::token(token_record(1.0, 2.0, 1.0), 10.0);
    let mut op = Operation::translate(EntityId::new_v4());
    op.accumulate(Point::new(50.0, 50.0));
    assert_eq!(token.preview(Some(&op)), token.state);
}

#[test]
fn preview_does_not_mutate() {
    let token = Entity::token(token_record(1.0, 2.0, 1.0), 10.0);
    let before = token.clone();
    let mut op = Operation::translate(token.id());
    op.accumulate(Point::new(7.0, 8.0));
    let previewed = token.preview(Some(&op));
    assert_eq!(previewed.position(), Point::new(8.0, 10.0));
    assert_eq!(token, before);
}

#[test]
fn apply_commits_constrained_preview() {
    let mut token = Entity::token(token_record(10.0, 10.0, 1.0), 10.0);
    token.constraint.push(Clamp::Within(Bounds::new(0.0, 0.0, 100.0, 100.0)));
    let mut op = Operation::translate(token.id());
    op.accumulate(Point::new(500.0, -500.0));

    let expected = token.preview(Some(&op));
    assert!(token.apply(&op));
    assert_eq!(token.state, expected);
    assert_eq!(token.state.position(), Point::new(90.0, 0.0));
}

#[test]
fn apply_rejects_foreign_operation() {
    let mut token = Entity::token(token_record(0.0, 0.0, 1.0), 10.0);
    let before = token.state;
    let mut op = Operation::translate(EntityId::new_v4());
    op.accumulate(Point::new(1.0, 1.0));
    assert!(!token.apply(&op));
    assert_eq!(token.state, before);
}

#[test]
fn constrain_reapplies_after_bounds_change() {
    let mut token = Entity::token(token_record(80.0, 80.0, 1.0), 10.0);
    token.constraint.push(Clamp::Within(Bounds::new(0.0, 0.0, 50.0, 50.0)));
    token.constrain();
    assert_eq!(token.state.position(), Point::new(40.0, 40.0));
}

#[test]
fn set_image_resizes_token() {
    let mut token = Entity::token(token_record(0.0, 0.0, 1.0), 64.0);
    token.set_image(ImageHandle::detached("tok", 32.0, 48.0));
    assert_eq!(token.state.size, Size::new(32.0, 48.0));
}

#[test]
fn set_image_leaves_screens_alone() {
    let mut screens = two_screens();
    screens.set_image(ImageHandle::detached("x", 1.0, 1.0));
    assert_eq!(screens.state.size, Size::new(200.0, 50.0));
}

// =============================================================
// Screens layout updates
// =============================================================

#[test]
fn update_cells_keeps_active_cell_stationary() {
    let mut screens = two_screens();
    screens.state = AffineState { x: 10.0, y: 20.0, scale: 2.0, ..screens.state };
    // Activate the second cell at parent (10 + 100*2, 20).
    let op = screens.hit_test_translate(Point::new(250.0, 30.0), None);
    assert!(op.is_some());
    assert_eq!(active_index(&screens), 1);

    // Remove the first cell and add one to the right.
    screens.update_cells(
        vec![ScreenCell::new(100.0, 0.0, 100.0, 50.0), ScreenCell::new(200.0, 0.0, 100.0, 50.0)],
        default_cell(),
    );

    assert_eq!(active_index(&screens), 0);
    assert!(approx_eq(screens.state.x, 210.0));
    assert!(approx_eq(screens.state.y, 20.0));
    assert_eq!(screens.state.size, Size::new(200.0, 50.0));
}

#[test]
fn update_cells_resets_active_when_cell_disappears() {
    let mut screens = two_screens();
    let _hit = screens.hit_test_translate(Point::new(150.0, 10.0), None);
    assert_eq!(active_index(&screens), 1);
    let before = screens.state.position();

    screens.update_cells(vec![ScreenCell::new(0.0, 300.0, 100.0, 50.0)], default_cell());
    assert_eq!(active_index(&screens), 0);
    assert_eq!(screens.state.position(), before);
}

#[test]
fn update_cells_is_noop_on_tokens() {
    let mut token = Entity::token(token_record(0.0, 0.0, 1.0), 64.0);
    let before = token.clone();
    token.update_cells(vec![default_cell()], default_cell());
    assert_eq!(token, before);
}

#[test]
fn layout_record_only_for_screens() {
    assert!(Entity::map(None).layout_record().is_none());
    let record = two_screens().layout_record();
    assert_eq!(record.map(|r| r.cells.len()), Some(2));
}

// =============================================================
// Hit-testing
// =============================================================

#[test]
fn translate_hit_inside_footprint() {
    let mut token = Entity::token(token_record(10.0, 10.0, 2.0), 10.0);
    let op = token.hit_test_translate(Point::new(15.0, 29.0), None);
    let op = op.map(|o| (o.kind, o.anchor, o.target));
    assert_eq!(op, Some((crate::operation::OperationKind::Translate, Some(Point::new(15.0, 29.0)), token.id())));
}

#[test]
fn translate_miss_outside_footprint() {
    let mut token = Entity::token(token_record(10.0, 10.0, 2.0), 10.0);
    assert!(token.hit_test_translate(Point::new(31.0, 15.0), None).is_none());
    assert!(token.hit_test_translate(Point::new(9.0, 15.0), None).is_none());
}

#[test]
fn translate_hit_follows_previewed_state() {
    let mut token = Entity::token(token_record(0.0, 0.0, 1.0), 10.0);
    let mut op = Operation::translate(token.id());
    op.accumulate(Point::new(100.0, 0.0));
    assert!(token.hit_test_translate(Point::new(105.0, 5.0), Some(&op)).is_some());
    assert!(token.hit_test_translate(Point::new(5.0, 5.0), Some(&op)).is_none());
}

#[test]
fn screens_first_hit_wins_and_becomes_active() {
    let mut screens = two_screens();
    // x = 100 lies on the shared edge; the first cell is tested first.
    assert!(screens.hit_test_translate(Point::new(100.0, 10.0), None).is_some());
    assert_eq!(active_index(&screens), 0);

    assert!(screens.hit_test_translate(Point::new(150.0, 10.0), None).is_some());
    assert_eq!(active_index(&screens), 1);
}

#[test]
fn screens_miss_keeps_active() {
    let mut screens = two_screens();
    let _hit = screens.hit_test_translate(Point::new(150.0, 10.0), None);
    assert!(screens.hit_test_translate(Point::new(150.0, 80.0), None).is_none());
    assert_eq!(active_index(&screens), 1);
}

#[test]
fn scale_handle_anchors_opposite_corner() {
    let token = Entity::token(token_record(10.0, 20.0, 1.0), 100.0);
    // Grab the bottom-right handle.
    let op = token.hit_test_scale(Point::new(111.0, 119.0), 4.0, None);
    let Some(op) = op else {
        panic!("expected a scale hit");
    };
    assert_eq!(op.kind, crate::operation::OperationKind::Scale);
    assert_eq!(op.anchor, Some(Point::new(10.0, 20.0)));
    assert_eq!(op.delta, Point::new(101.0, 99.0));
    assert!(op.target_size_override.is_none());
}

#[test]
fn scale_handle_top_left_anchors_bottom_right() {
    let token = Entity::token(token_record(0.0, 0.0, 2.0), 50.0);
    let op = token.hit_test_scale(Point::new(1.0, 1.0), 4.0, None);
    assert_eq!(op.and_then(|o| o.anchor), Some(Point::new(100.0, 100.0)));
}

#[test]
fn scale_handle_miss_in_the_middle() {
    let token = Entity::token(token_record(0.0, 0.0, 1.0), 100.0);
    assert!(token.hit_test_scale(Point::new(50.0, 50.0), 4.0, None).is_none());
}

#[test]
fn screens_scale_handles_use_active_cell() {
    let mut screens = two_screens();
    let _hit = screens.hit_test_translate(Point::new(150.0, 10.0), None);
    // Active cell spans x 100..200; grab its top-right corner.
    let op = screens.hit_test_scale(Point::new(200.0, 0.0), 4.0, None);
    let Some(op) = op else {
        panic!("expected a scale hit");
    };
    assert_eq!(op.anchor, Some(Point::new(100.0, 50.0)));
    assert_eq!(op.target_size_override, Some(Size::new(100.0, 50.0)));
}

#[test]
fn corner_drag_scales_screens_by_active_cell() {
    let mut screens = two_screens();
    let _hit = screens.hit_test_translate(Point::new(50.0, 10.0), None);
    let op = screens.hit_test_scale(Point::new(100.0, 50.0), 4.0, None);
    let Some(mut op) = op else {
        panic!("expected a scale hit");
    };
    // Drag the bottom-right corner of the 100x50 cell out to double size.
    op.accumulate(Point::new(100.0, 50.0));
    assert!(screens.apply(&op));
    assert!(approx_eq(screens.state.scale, 2.0));
    assert_eq!(screens.state.position(), Point::new(0.0, 0.0));
}

// =============================================================
// Drawing
// =============================================================

fn style(config: &StageConfig) -> DrawStyle<'_> {
    DrawStyle { config, pixel: 1.0 }
}

#[test]
fn draw_map_image_in_local_space() {
    let config = StageConfig::default();
    let mut map = Entity::map(Some(ImageHandle::detached("map", 400.0, 300.0)));
    map.state.x = 5.0;
    map.state.scale = 0.5;
    let mut surface = RecordingSurface::new();
    map.draw(&mut surface, None, style(&config)).unwrap();

    assert_eq!(
        surface.calls,
        vec![
            Call::Save,
            Call::Translate(5.0, 0.0),
            Call::Scale(0.5, 0.5),
            Call::Image("map".into(), 0.0, 0.0, 400.0, 300.0),
            Call::Restore,
        ]
    );
}

#[test]
fn draw_token_placeholder_until_image_resolves() {
    let config = StageConfig::default();
    let mut token = Entity::token(token_record(0.0, 0.0, 1.0), 64.0);
    let mut surface = RecordingSurface::new();
    token.draw(&mut surface, None, style(&config)).unwrap();
    assert!(surface.images().is_empty());
    assert_eq!(surface.stroke_rects(), vec![(0.0, 0.0, 64.0, 64.0)]);

    token.set_image(ImageHandle::detached("tok", 64.0, 64.0));
    let mut surface = RecordingSurface::new();
    token.draw(&mut surface, None, style(&config)).unwrap();
    assert_eq!(surface.images(), vec!["tok".to_string()]);
}

#[test]
fn draw_screens_fills_and_strokes_every_cell() {
    let config = StageConfig::default();
    let screens = two_screens();
    let mut surface = RecordingSurface::new();
    screens.draw(&mut surface, None, style(&config)).unwrap();
    assert_eq!(surface.fill_rects().len(), 2);
    assert_eq!(surface.stroke_rects().len(), 2);
    assert!(surface.calls.contains(&Call::FillStyle(config.palette.screen_fill.clone())));
}

#[test]
fn draw_uses_preview_when_targeted() {
    let config = StageConfig::default();
    let token = Entity::token(token_record(10.0, 10.0, 1.0), 64.0);
    let mut op = Operation::translate(token.id());
    op.accumulate(Point::new(5.0, -5.0));

    let mut surface = RecordingSurface::new();
    token.draw(&mut surface, Some(&op), style(&config)).unwrap();
    assert_eq!(surface.translations(), vec![(15.0, 5.0)]);
    assert_eq!(token.state.position(), Point::new(10.0, 10.0));
}

#[test]
fn draw_restores_after_surface_failure() {
    let config = StageConfig::default();
    let token = Entity::token(token_record(0.0, 0.0, 1.0), 64.0);
    let mut surface = RecordingSurface { fail_translate: Some("boom".into()), ..RecordingSurface::default() };
    let result = token.draw(&mut surface, None, style(&config));
    assert_eq!(result, Err(RenderError::Canvas("boom".into())));
    assert_eq!(surface.calls, vec![Call::Save, Call::Restore]);
}

#[test]
fn handles_scale_inversely_with_zoom() {
    let config = StageConfig::default();
    let token = Entity::token(token_record(0.0, 0.0, 2.0), 100.0);
    let mut surface = RecordingSurface::new();
    let zoomed = DrawStyle { config: &config, pixel: 0.5 };
    token.draw_handles(&mut surface, None, zoomed).unwrap();

    let side = config.handle_size * 0.5 / 2.0;
    let handles = surface.fill_rects();
    assert_eq!(handles.len(), 4);
    assert!(handles.iter().all(|&(_, _, w, h)| approx_eq(w, side) && approx_eq(h, side)));
    assert_eq!(surface.stroke_rects(), vec![(0.0, 0.0, 100.0, 100.0)]);
}
