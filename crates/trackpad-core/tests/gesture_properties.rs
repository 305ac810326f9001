//! Property-based tests for the gesture interpreter.
//!
//! These exercise the interpreter through its public API with generated touch
//! streams and check the rules that must hold for *every* stream:
//!
//! - a short, still contact is exactly one left click and nothing else;
//! - once a drag starts, every pixel of finger motion reaches the cursor
//!   (scaled), none is lost inside the deadzone;
//! - with two fingers down only scroll or zoom is ever produced, one per sample;
//! - lifting every finger always returns the state to idle.

use proptest::prelude::*;
use trackpad_core::{
    GestureConfig, GestureInterpreter, GestureState, InputAction, MouseButton, TouchPhase,
    TouchSample,
};

fn sample(id: u32, x: f64, y: f64, t: u64, phase: TouchPhase) -> TouchSample {
    TouchSample::new(id, x, y, t, phase)
}

/// Offsets that always stay strictly inside the default 10 px deadzone.
fn still_offsets() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((-6.0f64..6.0, -6.0f64..6.0), 0..8)
}

/// Absolute positions anywhere on a phone-sized trackpad.
fn path() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((0.0f64..400.0, 0.0f64..600.0), 1..20)
}

proptest! {
    /// Property: a contact that never leaves the deadzone and lifts within the
    /// tap threshold produces exactly one `Click(left)`, at the end, and no moves.
    #[test]
    fn prop_still_short_contact_is_exactly_one_click(
        (sx, sy) in (50.0f64..300.0, 50.0f64..500.0),
        offsets in still_offsets(),
        (ex, ey) in (-6.0f64..6.0, -6.0f64..6.0),
        duration in 0u64..199,
    ) {
        let interpreter = GestureInterpreter::default();
        let mut state = GestureState::new();
        let mut actions = Vec::new();

        actions.push(interpreter.interpret(&mut state, &sample(1, sx, sy, 0, TouchPhase::Start)));
        let step = duration / (offsets.len() as u64 + 1);
        for (i, (ox, oy)) in offsets.iter().enumerate() {
            let t = step * (i as u64 + 1);
            actions.push(interpreter.interpret(&mut state, &sample(1, sx + ox, sy + oy, t, TouchPhase::Move)));
        }
        let last = interpreter.interpret(&mut state, &sample(1, sx + ex, sy + ey, duration, TouchPhase::End));

        prop_assert!(actions.iter().all(Option::is_none), "no action before the lift: {actions:?}");
        prop_assert_eq!(last, Some(InputAction::Click(MouseButton::Left)));
        prop_assert!(state.is_idle());
    }

    /// Property: once displacement exceeds the deadzone, the sum of emitted
    /// `MoveBy` deltas equals total displacement × scale.
    #[test]
    fn prop_drag_conserves_motion(
        (sx, sy) in (0.0f64..400.0, 0.0f64..600.0),
        points in path(),
        scale in 0.5f64..4.0,
    ) {
        let config = GestureConfig { move_scale: scale, ..GestureConfig::default() };
        let deadzone = config.deadzone_px;
        let furthest = points
            .iter()
            .map(|(x, y)| (x - sx).hypot(y - sy))
            .fold(0.0f64, f64::max);
        prop_assume!(furthest > deadzone + 1e-6);

        let interpreter = GestureInterpreter::new(config);
        let mut state = GestureState::new();
        let (mut sum_dx, mut sum_dy) = (0.0, 0.0);
        let mut clicked = false;

        interpreter.interpret(&mut state, &sample(1, sx, sy, 0, TouchPhase::Start));
        let count = points.len();
        for (i, (x, y)) in points.iter().enumerate() {
            let phase = if i + 1 == count { TouchPhase::End } else { TouchPhase::Move };
            match interpreter.interpret(&mut state, &sample(1, *x, *y, (i as u64 + 1) * 8, phase)) {
                Some(InputAction::MoveBy { dx, dy }) => {
                    sum_dx += dx;
                    sum_dy += dy;
                }
                Some(InputAction::Click(_)) => clicked = true,
                Some(other) => prop_assert!(false, "unexpected action {other:?}"),
                None => {}
            }
        }

        let (fx, fy) = points[count - 1];
        prop_assert!(!clicked, "a drag must never click");
        prop_assert!((sum_dx - (fx - sx) * scale).abs() < 1e-6, "dx {} vs {}", sum_dx, (fx - sx) * scale);
        prop_assert!((sum_dy - (fy - sy) * scale).abs() < 1e-6, "dy {} vs {}", sum_dy, (fy - sy) * scale);
    }

    /// Property: with two fingers down, each sample yields at most one action
    /// and it is always a scroll or a zoom, never a move or a click.
    #[test]
    fn prop_two_finger_samples_are_scroll_or_zoom(
        moves in prop::collection::vec((0u32..2, 0.0f64..400.0, 0.0f64..600.0), 1..30),
    ) {
        let interpreter = GestureInterpreter::default();
        let mut state = GestureState::new();
        interpreter.interpret(&mut state, &sample(0, 100.0, 300.0, 0, TouchPhase::Start));
        interpreter.interpret(&mut state, &sample(1, 200.0, 300.0, 1, TouchPhase::Start));

        for (i, (id, x, y)) in moves.iter().enumerate() {
            let action = interpreter.interpret(&mut state, &sample(*id, *x, *y, i as u64 + 2, TouchPhase::Move));
            match action {
                None | Some(InputAction::ZoomBy { .. }) => {}
                Some(InputAction::ScrollBy { dx, .. }) => prop_assert_eq!(dx, 0.0),
                Some(other) => prop_assert!(false, "two fingers produced {other:?}"),
            }
            prop_assert_eq!(state.pointer_count(), 2);
        }
    }

    /// Property: whatever happens in between, lifting every finger resets to idle.
    #[test]
    fn prop_lifting_all_fingers_resets(
        events in prop::collection::vec((0u32..3, 0u8..3, 0.0f64..400.0, 0.0f64..600.0), 0..40),
    ) {
        let interpreter = GestureInterpreter::default();
        let mut state = GestureState::new();
        let mut t = 0;
        for (id, phase, x, y) in &events {
            let phase = match phase {
                0 => TouchPhase::Start,
                1 => TouchPhase::Move,
                _ => TouchPhase::End,
            };
            t += 5;
            interpreter.interpret(&mut state, &sample(*id, *x, *y, t, phase));
        }
        for id in 0..3 {
            t += 5;
            interpreter.interpret(&mut state, &sample(id, 0.0, 0.0, t, TouchPhase::End));
        }
        prop_assert!(state.is_idle());
    }
}

#[test]
fn test_end_to_end_drag_scenario() {
    let interpreter = GestureInterpreter::default();
    let mut state = GestureState::new();

    let actions: Vec<_> = [
        sample(1, 100.0, 100.0, 0, TouchPhase::Start),
        sample(1, 140.0, 100.0, 20, TouchPhase::Move),
        sample(1, 140.0, 100.0, 40, TouchPhase::End),
    ]
    .iter()
    .filter_map(|s| interpreter.interpret(&mut state, s))
    .collect();

    assert_eq!(actions, vec![InputAction::MoveBy { dx: 80.0, dy: 0.0 }]);
}

#[test]
fn test_end_to_end_tap_scenario() {
    let interpreter = GestureInterpreter::default();
    let mut state = GestureState::new();

    let actions: Vec<_> = [
        sample(1, 50.0, 50.0, 0, TouchPhase::Start),
        sample(1, 51.0, 50.0, 120, TouchPhase::End),
    ]
    .iter()
    .filter_map(|s| interpreter.interpret(&mut state, s))
    .collect();

    assert_eq!(actions, vec![InputAction::Click(MouseButton::Left)]);
}
