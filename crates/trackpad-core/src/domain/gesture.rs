//! Gesture interpretation: raw touch samples in, host input actions out.
//!
//! # How a gesture is recognised (for beginners)
//!
//! The phone reports every finger separately.  The interpreter keeps a small
//! amount of state per controlling session ([`GestureState`]) and, for every
//! incoming [`TouchSample`], decides whether the user is:
//!
//! | Fingers | Motion                                   | Result            |
//! |---------|------------------------------------------|-------------------|
//! | 1       | stays inside the deadzone, lifted fast   | `Click(left)`     |
//! | 1       | leaves the deadzone                      | `MoveBy` (scaled) |
//! | 2       | inter-finger distance changes a lot      | `ZoomBy`          |
//! | 2       | fingers slide together vertically        | `ScrollBy`        |
//!
//! A tap is told apart from a drag purely by *displacement since touch-down*
//! and *elapsed time*, never by velocity.
//!
//! # Conservation of motion
//!
//! Motion observed while the finger is still inside the deadzone is not lost:
//! it is accumulated and emitted as one `MoveBy` the moment the deadzone is
//! exceeded.  The sum of all emitted `MoveBy` deltas therefore equals the
//! total finger displacement multiplied by [`GestureConfig::move_scale`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::domain::action::{InputAction, MouseButton};
use crate::domain::touch::{PointerId, TouchPhase, TouchSample};

/// Baselines shorter than this are treated as "no baseline yet": dividing by
/// a near-zero distance would produce a meaningless zoom factor.
const MIN_BASELINE_PX: f64 = 1.0;

// ── Configuration ─────────────────────────────────────────────────────────────

/// Tunable thresholds for gesture disambiguation.
///
/// The values are configuration, not invariants: the interpreter guarantees
/// the tap/drag and scroll/zoom *exclusivity* rules for any positive values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Minimum displacement since touch-down, in trackpad pixels, before a
    /// single finger counts as a drag rather than a tap.
    pub deadzone_px: f64,
    /// A single-finger contact lifted within this many milliseconds (and
    /// inside the deadzone) is a tap.
    pub tap_max_ms: u64,
    /// Multiplier applied to finger motion before moving the host cursor.
    /// The phone surface is much smaller than a monitor.
    pub move_scale: f64,
    /// Wheel lines per trackpad pixel of two-finger vertical motion.
    pub scroll_sensitivity: f64,
    /// Change in inter-finger distance, in trackpad pixels, beyond which a
    /// two-finger motion is a pinch rather than a scroll.
    pub zoom_threshold_px: f64,
    /// Fingers beyond this count are ignored entirely.
    pub max_pointers: usize,
}

impl Default for GestureConfig {
    /// | Field              | Default  |
    /// |--------------------|----------|
    /// | deadzone_px        | 10.0     |
    /// | tap_max_ms         | 200      |
    /// | move_scale         | 2.0      |
    /// | scroll_sensitivity | 1/15     |
    /// | zoom_threshold_px  | 30.0     |
    /// | max_pointers       | 2        |
    fn default() -> Self {
        Self {
            deadzone_px: 10.0,
            tap_max_ms: 200,
            move_scale: 2.0,
            scroll_sensitivity: 1.0 / 15.0,
            zoom_threshold_px: 30.0,
            max_pointers: 2,
        }
    }
}

// ── State ─────────────────────────────────────────────────────────────────────

/// What the current contact is believed to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureMode {
    /// No finger is down.
    #[default]
    Idle,
    /// One finger is down and has not left the deadzone: may become a tap.
    DragCandidate,
    /// One finger is down and has left the deadzone: cursor motion.
    Drag,
    /// Two fingers are down and have not moved yet.
    ScrollCandidate,
    /// Two fingers moving together.
    Scroll,
    /// Two fingers pinching.
    Zoom,
}

/// Per-session gesture state.  Mutated only by [`GestureInterpreter::interpret`].
#[derive(Debug, Clone, Default)]
pub struct GestureState {
    active_pointers: BTreeMap<PointerId, TouchSample>,
    mode: GestureMode,
    accumulated_dx: f64,
    accumulated_dy: f64,
    last_event_time: Option<u64>,
    gesture_start: Option<TouchSample>,
    baseline_distance: f64,
}

impl GestureState {
    /// Creates an idle state with no active pointers.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> GestureMode {
        self.mode
    }

    pub fn pointer_count(&self) -> usize {
        self.active_pointers.len()
    }

    pub fn is_idle(&self) -> bool {
        self.mode == GestureMode::Idle && self.active_pointers.is_empty()
    }

    /// Timestamp of the last sample that changed this state.
    pub fn last_event_time(&self) -> Option<u64> {
        self.last_event_time
    }

    /// Displacement seen inside the deadzone that has not been emitted yet.
    pub fn pending_motion(&self) -> (f64, f64) {
        (self.accumulated_dx, self.accumulated_dy)
    }

    /// Returns the state to idle, forgetting every pointer.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Mean position of the active pointers, if any.
    fn centroid(&self) -> Option<(f64, f64)> {
        let count = self.active_pointers.len();
        if count == 0 {
            return None;
        }
        let (sx, sy) = self
            .active_pointers
            .values()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Some((sx / count as f64, sy / count as f64))
    }

    /// Distance between the first two active pointers.
    fn pair_distance(&self) -> Option<f64> {
        let mut pointers = self.active_pointers.values();
        let a = pointers.next()?;
        let b = pointers.next()?;
        Some(a.distance_to(b))
    }

    fn take_pending(&mut self) -> (f64, f64) {
        let pending = (self.accumulated_dx, self.accumulated_dy);
        self.accumulated_dx = 0.0;
        self.accumulated_dy = 0.0;
        pending
    }
}

// ── Interpreter ───────────────────────────────────────────────────────────────

/// Stateless rules engine; all state lives in the [`GestureState`] passed in.
///
/// # Example
///
/// ```rust
/// use trackpad_core::{GestureInterpreter, GestureState, InputAction, MouseButton};
/// use trackpad_core::{TouchPhase, TouchSample};
///
/// let interpreter = GestureInterpreter::default();
/// let mut state = GestureState::new();
///
/// let down = TouchSample::new(1, 50.0, 50.0, 0, TouchPhase::Start);
/// let up = TouchSample::new(1, 51.0, 50.0, 80, TouchPhase::End);
///
/// assert_eq!(interpreter.interpret(&mut state, &down), None);
/// assert_eq!(
///     interpreter.interpret(&mut state, &up),
///     Some(InputAction::Click(MouseButton::Left))
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct GestureInterpreter {
    config: GestureConfig,
}

impl GestureInterpreter {
    pub fn new(config: GestureConfig) -> Self {
        Self { config }
    }

    /// Consumes one sample and returns the action it produces, if any.
    ///
    /// Never fails: stale, duplicate, or unknown-pointer samples simply
    /// produce `None`.
    pub fn interpret(&self, state: &mut GestureState, sample: &TouchSample) -> Option<InputAction> {
        let action = match sample.phase {
            TouchPhase::Start => self.on_start(state, sample),
            TouchPhase::Move => self.on_move(state, sample),
            TouchPhase::End => self.on_end(state, sample),
        };
        trace!(
            pointer = sample.pointer_id,
            phase = ?sample.phase,
            mode = ?state.mode,
            ?action,
            "interpreted touch sample"
        );
        action
    }

    fn on_start(&self, state: &mut GestureState, sample: &TouchSample) -> Option<InputAction> {
        if let Some(last) = state.active_pointers.get_mut(&sample.pointer_id) {
            // Repeated start for a finger we already track: refresh only.
            if sample.timestamp_ms >= last.timestamp_ms {
                *last = *sample;
                state.last_event_time = Some(sample.timestamp_ms);
            }
            return None;
        }
        if state.active_pointers.len() >= self.config.max_pointers {
            return None;
        }

        state.active_pointers.insert(sample.pointer_id, *sample);
        state.last_event_time = Some(sample.timestamp_ms);

        match state.active_pointers.len() {
            1 => {
                state.mode = GestureMode::DragCandidate;
                state.gesture_start = Some(*sample);
                state.accumulated_dx = 0.0;
                state.accumulated_dy = 0.0;
            }
            2 => {
                state.mode = GestureMode::ScrollCandidate;
                state.accumulated_dx = 0.0;
                state.accumulated_dy = 0.0;
                state.baseline_distance = state.pair_distance().unwrap_or(0.0);
            }
            _ => {}
        }
        None
    }

    fn on_move(&self, state: &mut GestureState, sample: &TouchSample) -> Option<InputAction> {
        let last = *state.active_pointers.get(&sample.pointer_id)?;
        if sample.timestamp_ms < last.timestamp_ms {
            return None;
        }

        let centroid_before = state.centroid();
        state.active_pointers.insert(sample.pointer_id, *sample);
        state.last_event_time = Some(sample.timestamp_ms);

        match state.active_pointers.len() {
            1 => self.single_finger_motion(state, sample.x - last.x, sample.y - last.y),
            2 => self.two_finger_motion(state, centroid_before),
            _ => None,
        }
    }

    fn on_end(&self, state: &mut GestureState, sample: &TouchSample) -> Option<InputAction> {
        let last = *state.active_pointers.get(&sample.pointer_id)?;
        if sample.timestamp_ms < last.timestamp_ms {
            return None;
        }

        let action = if state.active_pointers.len() == 1 {
            self.single_finger_release(state, sample, &last)
        } else {
            None
        };

        state.active_pointers.remove(&sample.pointer_id);
        if state.active_pointers.is_empty() {
            state.reset();
        } else {
            state.last_event_time = Some(sample.timestamp_ms);
            if state.active_pointers.len() < 2 {
                state.baseline_distance = 0.0;
            }
        }
        action
    }

    fn single_finger_motion(&self, state: &mut GestureState, dx: f64, dy: f64) -> Option<InputAction> {
        match state.mode {
            GestureMode::DragCandidate => {
                state.accumulated_dx += dx;
                state.accumulated_dy += dy;
                if self.exceeds_deadzone(state) {
                    state.mode = GestureMode::Drag;
                    let (px, py) = state.take_pending();
                    Some(self.scaled_move(px, py))
                } else {
                    None
                }
            }
            GestureMode::Drag if dx != 0.0 || dy != 0.0 => Some(self.scaled_move(dx, dy)),
            _ => None,
        }
    }

    fn single_finger_release(
        &self,
        state: &mut GestureState,
        sample: &TouchSample,
        last: &TouchSample,
    ) -> Option<InputAction> {
        let (dx, dy) = (sample.x - last.x, sample.y - last.y);
        match state.mode {
            GestureMode::Drag if dx != 0.0 || dy != 0.0 => Some(self.scaled_move(dx, dy)),
            GestureMode::DragCandidate => {
                state.accumulated_dx += dx;
                state.accumulated_dy += dy;
                if self.exceeds_deadzone(state) {
                    let (px, py) = state.take_pending();
                    return Some(self.scaled_move(px, py));
                }
                let started = state
                    .gesture_start
                    .map_or(sample.timestamp_ms, |s| s.timestamp_ms);
                let elapsed = sample.timestamp_ms.saturating_sub(started);
                (elapsed < self.config.tap_max_ms).then_some(InputAction::Click(MouseButton::Left))
            }
            _ => None,
        }
    }

    fn two_finger_motion(
        &self,
        state: &mut GestureState,
        centroid_before: Option<(f64, f64)>,
    ) -> Option<InputAction> {
        let distance = state.pair_distance()?;
        let (_, centroid_y) = state.centroid()?;

        if state.baseline_distance < MIN_BASELINE_PX {
            state.baseline_distance = distance;
        } else if (distance - state.baseline_distance).abs() > self.config.zoom_threshold_px {
            // Distance change is checked first: a pinch wins over a scroll.
            let factor = distance / state.baseline_distance;
            state.baseline_distance = distance;
            state.mode = GestureMode::Zoom;
            return Some(InputAction::ZoomBy { factor });
        }

        let avg_dy = centroid_before.map_or(0.0, |(_, before_y)| centroid_y - before_y);
        if avg_dy == 0.0 {
            return None;
        }
        state.mode = GestureMode::Scroll;
        Some(InputAction::ScrollBy {
            dx: 0.0,
            dy: avg_dy * self.config.scroll_sensitivity,
        })
    }

    fn exceeds_deadzone(&self, state: &GestureState) -> bool {
        state.accumulated_dx.hypot(state.accumulated_dy) > self.config.deadzone_px
    }

    fn scaled_move(&self, dx: f64, dy: f64) -> InputAction {
        InputAction::MoveBy {
            dx: dx * self.config.move_scale,
            dy: dy * self.config.move_scale,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn start(id: PointerId, x: f64, y: f64, t: u64) -> TouchSample {
        TouchSample::new(id, x, y, t, TouchPhase::Start)
    }

    fn mv(id: PointerId, x: f64, y: f64, t: u64) -> TouchSample {
        TouchSample::new(id, x, y, t, TouchPhase::Move)
    }

    fn end(id: PointerId, x: f64, y: f64, t: u64) -> TouchSample {
        TouchSample::new(id, x, y, t, TouchPhase::End)
    }

    fn run(samples: &[TouchSample]) -> (Vec<Option<InputAction>>, GestureState) {
        let interpreter = GestureInterpreter::default();
        let mut state = GestureState::new();
        let actions = samples
            .iter()
            .map(|s| interpreter.interpret(&mut state, s))
            .collect();
        (actions, state)
    }

    // ── Single finger ─────────────────────────────────────────────────────────

    #[test]
    fn test_first_start_enters_drag_candidate_and_emits_nothing() {
        // Arrange / Act
        let (actions, state) = run(&[start(1, 10.0, 10.0, 0)]);

        // Assert
        assert_eq!(actions, vec![None]);
        assert_eq!(state.mode(), GestureMode::DragCandidate);
        assert_eq!(state.pointer_count(), 1);
    }

    #[test]
    fn test_quick_tap_inside_deadzone_clicks_left() {
        let (actions, state) = run(&[start(1, 50.0, 50.0, 0), end(1, 51.0, 50.0, 90)]);

        assert_eq!(actions, vec![None, Some(InputAction::Click(MouseButton::Left))]);
        assert!(state.is_idle(), "state must reset once all fingers lift");
    }

    #[test]
    fn test_slow_press_inside_deadzone_does_not_click() {
        let (actions, _) = run(&[start(1, 50.0, 50.0, 0), end(1, 50.0, 50.0, 450)]);
        assert_eq!(actions, vec![None, None]);
    }

    #[test]
    fn test_small_moves_inside_deadzone_are_held_back() {
        let (actions, state) = run(&[
            start(1, 0.0, 0.0, 0),
            mv(1, 3.0, 0.0, 10),
            mv(1, 6.0, 0.0, 20),
        ]);

        assert_eq!(actions, vec![None, None, None]);
        assert_eq!(state.mode(), GestureMode::DragCandidate);
        assert_eq!(state.pending_motion(), (6.0, 0.0));
    }

    #[test]
    fn test_crossing_deadzone_emits_all_accumulated_motion() {
        let (actions, state) = run(&[
            start(1, 0.0, 0.0, 0),
            mv(1, 6.0, 0.0, 10),
            mv(1, 12.0, 0.0, 20),
        ]);

        assert_eq!(actions[2], Some(InputAction::MoveBy { dx: 24.0, dy: 0.0 }));
        assert_eq!(state.mode(), GestureMode::Drag);
        assert_eq!(state.pending_motion(), (0.0, 0.0));
    }

    #[test]
    fn test_drag_scenario_moves_and_never_clicks() {
        // start(100,100) → move(140,100) → end(140,100)
        let (actions, _) = run(&[
            start(1, 100.0, 100.0, 0),
            mv(1, 140.0, 100.0, 16),
            end(1, 140.0, 100.0, 32),
        ]);

        assert_eq!(
            actions,
            vec![None, Some(InputAction::MoveBy { dx: 80.0, dy: 0.0 }), None]
        );
    }

    #[test]
    fn test_drag_release_with_final_motion_emits_last_move() {
        let (actions, _) = run(&[
            start(1, 0.0, 0.0, 0),
            mv(1, 20.0, 0.0, 10),
            end(1, 25.0, 5.0, 20),
        ]);

        assert_eq!(actions[2], Some(InputAction::MoveBy { dx: 10.0, dy: 10.0 }));
    }

    #[test]
    fn test_release_far_from_start_without_moves_is_a_move_not_a_click() {
        let (actions, _) = run(&[start(1, 0.0, 0.0, 0), end(1, 30.0, 0.0, 50)]);
        assert_eq!(actions[1], Some(InputAction::MoveBy { dx: 60.0, dy: 0.0 }));
    }

    #[test]
    fn test_zero_delta_move_in_drag_emits_nothing() {
        let (actions, _) = run(&[
            start(1, 0.0, 0.0, 0),
            mv(1, 20.0, 0.0, 10),
            mv(1, 20.0, 0.0, 20),
        ]);
        assert_eq!(actions[2], None);
    }

    #[test]
    fn test_custom_scale_is_applied() {
        let interpreter = GestureInterpreter::new(GestureConfig {
            move_scale: 3.0,
            ..GestureConfig::default()
        });
        let mut state = GestureState::new();

        interpreter.interpret(&mut state, &start(1, 0.0, 0.0, 0));
        let action = interpreter.interpret(&mut state, &mv(1, 0.0, 20.0, 5));

        assert_eq!(action, Some(InputAction::MoveBy { dx: 0.0, dy: 60.0 }));
    }

    // ── Edge cases ────────────────────────────────────────────────────────────

    #[test]
    fn test_move_for_unknown_pointer_is_ignored() {
        let (actions, state) = run(&[mv(7, 10.0, 10.0, 0), end(7, 10.0, 10.0, 5)]);
        assert_eq!(actions, vec![None, None]);
        assert!(state.is_idle());
    }

    #[test]
    fn test_stale_sample_is_dropped() {
        // Arrange: a move at t=20 arrives, then a late move stamped t=10.
        let (actions, state) = run(&[
            start(1, 0.0, 0.0, 0),
            mv(1, 30.0, 0.0, 20),
            mv(1, 5.0, 0.0, 10),
        ]);

        // Assert: the late sample neither moves the cursor nor rewinds state.
        assert_eq!(actions[2], None);
        assert_eq!(state.mode(), GestureMode::Drag);
        assert_eq!(state.last_event_time(), Some(20));
    }

    #[test]
    fn test_duplicate_sample_is_idempotent() {
        let (actions, _) = run(&[
            start(1, 0.0, 0.0, 0),
            mv(1, 20.0, 0.0, 10),
            mv(1, 20.0, 0.0, 10),
        ]);
        assert_eq!(actions[2], None);
    }

    #[test]
    fn test_repeated_start_refreshes_position_without_action() {
        let (actions, state) = run(&[start(1, 0.0, 0.0, 0), start(1, 4.0, 0.0, 5)]);
        assert_eq!(actions, vec![None, None]);
        assert_eq!(state.pointer_count(), 1);
    }

    #[test]
    fn test_third_finger_is_ignored() {
        let (actions, state) = run(&[
            start(1, 0.0, 0.0, 0),
            start(2, 50.0, 0.0, 1),
            start(3, 100.0, 0.0, 2),
            mv(3, 200.0, 0.0, 3),
        ]);
        assert_eq!(actions, vec![None, None, None, None]);
        assert_eq!(state.pointer_count(), 2);
    }

    // ── Two fingers ───────────────────────────────────────────────────────────

    #[test]
    fn test_second_finger_enters_scroll_candidate() {
        let (_, state) = run(&[start(1, 0.0, 0.0, 0), start(2, 40.0, 0.0, 5)]);
        assert_eq!(state.mode(), GestureMode::ScrollCandidate);
        assert_eq!(state.pending_motion(), (0.0, 0.0));
    }

    #[test]
    fn test_parallel_vertical_motion_scrolls() {
        let (actions, state) = run(&[
            start(1, 0.0, 100.0, 0),
            start(2, 40.0, 100.0, 1),
            mv(1, 0.0, 130.0, 10),
        ]);

        // Centroid moves by 15 px → 15 * (1/15) = 1 line.
        match &actions[2] {
            Some(InputAction::ScrollBy { dx, dy }) => {
                assert_eq!(*dx, 0.0);
                assert!((dy - 1.0).abs() < 1e-9, "dy was {dy}");
            }
            other => panic!("expected ScrollBy, got {other:?}"),
        }
        assert_eq!(state.mode(), GestureMode::Scroll);
    }

    #[test]
    fn test_pinch_out_zooms_in() {
        let (actions, state) = run(&[
            start(1, 100.0, 100.0, 0),
            start(2, 140.0, 100.0, 1),
            mv(2, 200.0, 100.0, 10),
        ]);

        match &actions[2] {
            Some(InputAction::ZoomBy { factor }) => assert!((factor - 2.5).abs() < 1e-9),
            other => panic!("expected ZoomBy, got {other:?}"),
        }
        assert_eq!(state.mode(), GestureMode::Zoom);
    }

    #[test]
    fn test_pinch_in_zooms_out() {
        let (actions, _) = run(&[
            start(1, 0.0, 0.0, 0),
            start(2, 100.0, 0.0, 1),
            mv(2, 50.0, 0.0, 10),
        ]);
        match &actions[2] {
            Some(InputAction::ZoomBy { factor }) => assert!(*factor < 1.0),
            other => panic!("expected ZoomBy, got {other:?}"),
        }
    }

    #[test]
    fn test_pinch_with_vertical_motion_prefers_zoom() {
        // Moving pointer 2 down by 80 px both widens the pair and shifts the
        // centroid; the distance change must win.
        let (actions, _) = run(&[
            start(1, 0.0, 0.0, 0),
            start(2, 0.0, 10.0, 1),
            mv(2, 0.0, 90.0, 10),
        ]);
        assert!(matches!(actions[2], Some(InputAction::ZoomBy { .. })));
    }

    #[test]
    fn test_zoom_rebases_distance_after_each_step() {
        let (actions, _) = run(&[
            start(1, 0.0, 0.0, 0),
            start(2, 100.0, 0.0, 1),
            mv(2, 140.0, 0.0, 10),
            mv(2, 150.0, 0.0, 20),
        ]);
        assert!(matches!(actions[2], Some(InputAction::ZoomBy { .. })));
        // Only 10 px further than the new baseline: below the threshold.
        assert_eq!(actions[3], None);
    }

    #[test]
    fn test_lifting_one_of_two_fingers_keeps_multi_finger_mode() {
        let (actions, state) = run(&[
            start(1, 0.0, 0.0, 0),
            start(2, 40.0, 0.0, 1),
            end(2, 40.0, 0.0, 30),
            mv(1, 50.0, 0.0, 40),
            end(1, 50.0, 0.0, 60),
        ]);

        // No cursor motion and no click while a two-finger gesture winds down.
        assert_eq!(actions, vec![None, None, None, None, None]);
        assert!(state.is_idle());
    }

    #[test]
    fn test_coincident_fingers_do_not_produce_infinite_zoom() {
        let (actions, _) = run(&[
            start(1, 10.0, 10.0, 0),
            start(2, 10.0, 10.0, 1),
            mv(2, 60.0, 10.0, 10),
        ]);
        assert!(
            !matches!(actions[2], Some(InputAction::ZoomBy { .. })),
            "a zero baseline must be re-established, not divided by"
        );
    }

    #[test]
    fn test_config_defaults_follow_documented_table() {
        let cfg = GestureConfig::default();
        assert_eq!(cfg.deadzone_px, 10.0);
        assert_eq!(cfg.tap_max_ms, 200);
        assert_eq!(cfg.move_scale, 2.0);
        assert_eq!(cfg.zoom_threshold_px, 30.0);
        assert_eq!(cfg.max_pointers, 2);
    }

    #[test]
    fn test_config_partial_toml_keeps_other_defaults() {
        let cfg: GestureConfig = toml::from_str("move_scale = 4.0").unwrap();
        assert_eq!(cfg.move_scale, 4.0);
        assert_eq!(cfg.deadzone_px, 10.0);
    }
}
