use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;

use formpilot_injector::CommandSink;
use formpilot_injector::InjectorError;
use formpilot_protocol::Point;
use formpilot_protocol::ViewportBounds;
use rand::Rng;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

use crate::state::StateStore;

/// Safety margin kept from every viewport edge.
const VIEWPORT_MARGIN: f64 = 20.0;
/// Below this distance no motion is emitted; the position is just recorded.
const MIN_MOVE_DISTANCE: f64 = 3.0;
/// Residual error that triggers the single correction pass.
const CORRECTION_THRESHOLD: f64 = 10.0;
const BOW_FACTOR: f64 = 0.03;
const BOW_MAX: f64 = 20.0;
/// Roughly one sampled point per this many pixels of travel.
const STEP_PITCH: f64 = 14.0;
const MAX_STEPS: usize = 48;
/// How long to wait for bounds to show up before refusing to move.
const VIEWPORT_WAIT: Duration = Duration::from_secs(2);
/// Grace for the probe's mousemove stream to catch up after the last delta.
const SETTLE: Duration = Duration::from_millis(60);

#[derive(Debug, Error)]
pub enum MotionError {
    #[error("no viewport bounds after waiting {0:?}")]
    NoViewport(Duration),

    #[error(transparent)]
    Injector(#[from] InjectorError),
}

/// Path aesthetic. `Curved` bows slightly to a random side; `Direct` runs
/// straight at the target for strikes that must not overshoot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MoveProfile {
    #[default]
    Curved,
    Direct,
}

/// Converts absolute screen targets into a stream of relative `MOVE` deltas,
/// clamped to the latest viewport bounds and paced for natural motion.
#[derive(Clone)]
pub struct MotionEngine {
    state: Arc<StateStore>,
    sink: Arc<dyn CommandSink>,
}

impl MotionEngine {
    pub fn new(state: Arc<StateStore>, sink: Arc<dyn CommandSink>) -> Self {
        Self { state, sink }
    }

    /// Drive the pointer to `target`. On return the state-store cursor
    /// equals the clamped target regardless of probe confirmation, so
    /// follow-up actions can chain.
    pub async fn move_to(&self, target: Point, profile: MoveProfile) -> Result<(), MotionError> {
        let bounds = match self.state.viewport() {
            Some(bounds) => bounds,
            None => self
                .state
                .wait_for_viewport(VIEWPORT_WAIT)
                .await
                .ok_or(MotionError::NoViewport(VIEWPORT_WAIT))?,
        };
        let target = bounds.clamp(target, VIEWPORT_MARGIN);

        let Some(start) = self.state.cursor() else {
            // Nothing to plan a relative path from; adopt the target and let
            // the next probe report correct us.
            warn!("cursor unknown, adopting target {target:?} without motion");
            self.state.set_cursor(target);
            return Ok(());
        };
        // The start may be stale; keep it inside the same rectangle.
        let start = bounds.clamp(start, VIEWPORT_MARGIN);

        let distance = start.distance_to(target);
        if distance < MIN_MOVE_DISTANCE {
            self.state.set_cursor(target);
            return Ok(());
        }

        let path = plan_path(start, target, bounds, profile, &mut rand::rng());
        debug!(
            "moving {distance:.0}px from ({:.0},{:.0}) to ({:.0},{:.0}) in {} steps",
            start.x,
            start.y,
            target.x,
            target.y,
            path.len()
        );

        let mut last_x = start.x.round() as i64;
        let mut last_y = start.y.round() as i64;
        for point in &path {
            let px = point.x.round() as i64;
            let py = point.y.round() as i64;
            let (dx, dy) = (px - last_x, py - last_y);
            if dx == 0 && dy == 0 {
                continue;
            }
            self.sink.write_move(dx as i32, dy as i32)?;
            last_x = px;
            last_y = py;
            self.state.set_cursor(Point::new(px as f64, py as f64));
            tokio::time::sleep(Duration::from_millis(step_pause())).await;
        }
        tokio::time::sleep(SETTLE).await;

        // Single refinement against whatever the probe reported meanwhile.
        if let Some(observed) = self.state.cursor() {
            if observed.distance_to(target) > CORRECTION_THRESHOLD {
                if let Some((dx, dy)) = correction_delta(observed, target) {
                    debug!("correcting residual by ({dx},{dy})");
                    self.sink.write_move(dx, dy)?;
                }
            }
        }
        self.state.set_cursor(target);
        Ok(())
    }
}

fn step_pause() -> u64 {
    rand::rng().random_range(4..=14)
}

fn correction_delta(observed: Point, target: Point) -> Option<(i32, i32)> {
    let dx = (target.x.round() - observed.x.round()) as i32;
    let dy = (target.y.round() - observed.y.round()) as i32;
    (dx != 0 || dy != 0).then_some((dx, dy))
}

/// Sample a lightly bowed path from `start` to `target`. Every point is
/// clamped to the bounds minus the margin; the final point is the target
/// itself.
fn plan_path<R: Rng>(
    start: Point,
    target: Point,
    bounds: ViewportBounds,
    profile: MoveProfile,
    rng: &mut R,
) -> Vec<Point> {
    let distance = start.distance_to(target);
    let steps = ((distance / STEP_PITCH).ceil() as usize).clamp(1, MAX_STEPS);
    let bow = match profile {
        MoveProfile::Curved => {
            let side = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
            (distance * BOW_FACTOR).min(BOW_MAX) * side
        }
        MoveProfile::Direct => 0.0,
    };
    let dir_x = (target.x - start.x) / distance;
    let dir_y = (target.y - start.y) / distance;
    let (perp_x, perp_y) = (-dir_y, dir_x);

    let mut points = Vec::with_capacity(steps);
    for i in 1..=steps {
        let t = i as f64 / steps as f64;
        let arc = (t * PI).sin() * bow;
        let point = Point::new(
            start.x + (target.x - start.x) * t + perp_x * arc,
            start.y + (target.y - start.y) * t + perp_y * arc,
        );
        points.push(bounds.clamp(point, VIEWPORT_MARGIN));
    }
    if let Some(last) = points.last_mut() {
        *last = target;
    }
    points
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::test_support::RecordingSink;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn engine() -> (Arc<StateStore>, Arc<RecordingSink>, MotionEngine) {
        let state = Arc::new(StateStore::new());
        let sink = Arc::new(RecordingSink::new());
        let motion = MotionEngine::new(Arc::clone(&state), sink.clone() as Arc<dyn CommandSink>);
        (state, sink, motion)
    }

    fn default_bounds() -> ViewportBounds {
        ViewportBounds::new(0.0, 40.0, 1280.0, 840.0)
    }

    #[test]
    fn planned_paths_stay_inside_the_margin() {
        let bounds = default_bounds();
        let mut rng = StdRng::seed_from_u64(11);
        // A path hugging the top edge would bow outside without clamping.
        let path = plan_path(
            Point::new(30.0, 61.0),
            Point::new(1250.0, 61.0),
            bounds,
            MoveProfile::Curved,
            &mut rng,
        );
        for point in &path {
            assert!((20.0..=1260.0).contains(&point.x), "x {point:?}");
            assert!((60.0..=820.0).contains(&point.y), "y {point:?}");
        }
        assert_eq!(*path.last().unwrap(), Point::new(1250.0, 61.0));
    }

    #[test]
    fn short_hops_collapse_to_a_single_step() {
        let bounds = default_bounds();
        let mut rng = StdRng::seed_from_u64(3);
        let path = plan_path(
            Point::new(500.0, 500.0),
            Point::new(510.0, 505.0),
            bounds,
            MoveProfile::Curved,
            &mut rng,
        );
        assert_eq!(path, vec![Point::new(510.0, 505.0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn tiny_distance_emits_nothing() {
        let (state, sink, motion) = engine();
        state.set_viewport(default_bounds());
        state.set_cursor(Point::new(500.0, 500.0));
        motion
            .move_to(Point::new(501.0, 501.0), MoveProfile::Curved)
            .await
            .unwrap();
        assert!(sink.lines().is_empty());
        assert_eq!(state.cursor(), Some(Point::new(501.0, 501.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn deltas_sum_to_the_displacement() {
        let (state, sink, motion) = engine();
        state.set_viewport(default_bounds());
        state.set_cursor(Point::new(100.0, 100.0));
        motion
            .move_to(Point::new(700.0, 400.0), MoveProfile::Curved)
            .await
            .unwrap();

        let moves = sink.moves();
        assert!(moves.len() > 1);
        let (sum_x, sum_y) = moves
            .iter()
            .fold((0, 0), |(x, y), (dx, dy)| (x + dx, y + dy));
        assert_eq!((sum_x, sum_y), (600, 300));
        assert_eq!(state.cursor(), Some(Point::new(700.0, 400.0)));

        // Replaying the deltas never leaves the viewport rectangle.
        let (mut x, mut y) = (100i32, 100i32);
        for (dx, dy) in &moves {
            x += dx;
            y += dy;
            assert!((19..=1261).contains(&x), "x drifted to {x}");
            assert!((59..=821).contains(&y), "y drifted to {y}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn off_viewport_targets_are_clamped() {
        let (state, sink, motion) = engine();
        state.set_viewport(default_bounds());
        state.set_cursor(Point::new(640.0, 400.0));
        motion
            .move_to(Point::new(5000.0, -200.0), MoveProfile::Curved)
            .await
            .unwrap();
        assert_eq!(state.cursor(), Some(Point::new(1260.0, 60.0)));
        let (sum_x, sum_y) = sink
            .moves()
            .iter()
            .fold((0, 0), |(x, y), (dx, dy)| (x + dx, y + dy));
        assert_eq!((sum_x, sum_y), (620, -340));
    }

    #[tokio::test(start_paused = true)]
    async fn refuses_without_viewport_bounds() {
        let (state, sink, motion) = engine();
        state.set_cursor(Point::new(100.0, 100.0));
        let err = motion
            .move_to(Point::new(700.0, 400.0), MoveProfile::Curved)
            .await
            .unwrap_err();
        assert!(matches!(err, MotionError::NoViewport(_)));
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn correction_skips_sub_pixel_residue() {
        assert_eq!(
            correction_delta(Point::new(700.2, 400.4), Point::new(700.0, 400.0)),
            None
        );
        assert_eq!(
            correction_delta(Point::new(690.0, 400.0), Point::new(700.0, 412.0)),
            Some((10, 12))
        );
    }
}
