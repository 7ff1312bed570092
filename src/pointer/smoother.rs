//! Adaptive cursor smoothing, advanced once per display frame.
//!
//! The detector writes `target` whenever a sample is accepted; the render
//! loop eases `current` toward it.  The blend rate depends on how far the
//! cursor still has to travel (fast when far, nearly still when close) and
//! is normalized to a 60 Hz baseline so the motion looks the same at any
//! refresh rate.

use super::landmarks::ScreenPoint;

// ── Config ─────────────────────────────────────────────────

/// Smoothing rate table.
#[derive(Debug, Clone)]
pub struct SmootherConfig {
    /// (distance threshold px, per-frame rate), largest threshold first.
    /// The first bucket whose threshold the distance exceeds wins.
    pub buckets: Vec<(f64, f64)>,
    /// Rate used when no bucket matches.
    pub floor_rate: f64,
    /// Frame rate the per-frame rates are tuned for.
    pub reference_hz: f64,
    /// Upper clamp on elapsed time per step (seconds).
    pub max_dt_s: f64,
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self {
            buckets: vec![(50.0, 0.35), (20.0, 0.20), (5.0, 0.12)],
            floor_rate: 0.05,
            reference_hz: 60.0,
            max_dt_s: 0.05,
        }
    }
}

impl SmootherConfig {
    /// Per-frame rate for a given remaining distance.
    pub fn rate_for(&self, distance: f64) -> f64 {
        self.buckets
            .iter()
            .find(|(threshold, _)| distance > *threshold)
            .map(|(_, rate)| *rate)
            .unwrap_or(self.floor_rate)
    }

    pub fn config_sexp(&self) -> String {
        let buckets: Vec<String> = self
            .buckets
            .iter()
            .map(|(t, r)| format!("({:.1} . {:.2})", t, r))
            .collect();
        format!(
            "(:buckets ({}) :floor-rate {:.2} :reference-hz {:.0} :max-dt-s {:.3})",
            buckets.join(" "),
            self.floor_rate,
            self.reference_hz,
            self.max_dt_s,
        )
    }
}

// ── Cursor state ───────────────────────────────────────────

/// Rendered and target cursor positions (screen pixels).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorState {
    pub current: ScreenPoint,
    pub target: ScreenPoint,
}

/// Eases `current` toward `target`.
#[derive(Debug, Clone)]
pub struct AdaptiveSmoother {
    pub config: SmootherConfig,
    cursor: CursorState,
}

impl AdaptiveSmoother {
    /// Create a smoother resting at `center`.
    pub fn new(config: SmootherConfig, center: ScreenPoint) -> Self {
        Self {
            config,
            cursor: CursorState {
                current: center,
                target: center,
            },
        }
    }

    pub fn cursor(&self) -> CursorState {
        self.cursor
    }

    pub fn current(&self) -> ScreenPoint {
        self.cursor.current
    }

    pub fn target(&self) -> ScreenPoint {
        self.cursor.target
    }

    /// Overwrite the target (detector side).
    pub fn set_target(&mut self, target: ScreenPoint) {
        self.cursor.target = target;
    }

    /// Snap both positions to `center`.
    pub fn reset(&mut self, center: ScreenPoint) {
        self.cursor = CursorState {
            current: center,
            target: center,
        };
    }

    /// Blend factor for one step of `dt_s` seconds at the given distance.
    pub fn blend_factor(&self, distance: f64, dt_s: f64) -> f64 {
        let dt = dt_s.clamp(0.0, self.config.max_dt_s);
        let rate = self.config.rate_for(distance);
        1.0 - (1.0 - rate).powf(dt * self.config.reference_hz)
    }

    /// Advance one render frame.  Returns the new current position.
    pub fn advance(&mut self, dt_s: f64) -> ScreenPoint {
        let CursorState { current, target } = self.cursor;
        let distance = current.distance(&target);
        let factor = self.blend_factor(distance, dt_s);
        self.cursor.current = ScreenPoint::new(
            current.x + (target.x - current.x) * factor,
            current.y + (target.y - current.y) * factor,
        );
        self.cursor.current
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DT_60: f64 = 1.0 / 60.0;

    fn smoother_at(x: f64, y: f64) -> AdaptiveSmoother {
        AdaptiveSmoother::new(SmootherConfig::default(), ScreenPoint::new(x, y))
    }

    #[test]
    fn test_rate_buckets() {
        let cfg = SmootherConfig::default();
        assert_eq!(cfg.rate_for(100.0), 0.35);
        assert_eq!(cfg.rate_for(50.0), 0.20);
        assert_eq!(cfg.rate_for(30.0), 0.20);
        assert_eq!(cfg.rate_for(10.0), 0.12);
        assert_eq!(cfg.rate_for(5.0), 0.05);
        assert_eq!(cfg.rate_for(0.0), 0.05);
    }

    #[test]
    fn test_single_step_at_reference_rate() {
        let mut s = smoother_at(0.0, 0.0);
        s.set_target(ScreenPoint::new(100.0, 0.0));
        let p = s.advance(DT_60);
        // One 60 Hz frame at distance > 50 moves exactly 35%
        assert!((p.x - 35.0).abs() < 1e-9, "got {}", p.x);
        assert_eq!(p.y, 0.0);
    }

    #[test]
    fn test_converges_within_bounded_steps() {
        let mut s = smoother_at(0.0, 0.0);
        let target = ScreenPoint::new(900.0, -400.0);
        s.set_target(target);
        let mut steps = 0;
        while s.current().distance(&target) > 1.0 {
            s.advance(DT_60);
            steps += 1;
            assert!(steps < 200, "did not converge");
        }
    }

    #[test]
    fn test_frame_rate_independence() {
        let mut one = smoother_at(0.0, 0.0);
        let mut two = smoother_at(0.0, 0.0);
        one.set_target(ScreenPoint::new(100.0, 0.0));
        two.set_target(ScreenPoint::new(100.0, 0.0));

        one.advance(1.0 / 30.0);
        two.advance(DT_60);
        two.advance(DT_60);

        assert!(
            (one.current().x - two.current().x).abs() < 0.5,
            "30 Hz step {} vs two 60 Hz steps {}",
            one.current().x,
            two.current().x,
        );
    }

    #[test]
    fn test_dt_clamped() {
        let mut stalled = smoother_at(0.0, 0.0);
        let mut capped = smoother_at(0.0, 0.0);
        stalled.set_target(ScreenPoint::new(100.0, 0.0));
        capped.set_target(ScreenPoint::new(100.0, 0.0));

        stalled.advance(2.0);
        capped.advance(0.05);
        assert!((stalled.current().x - capped.current().x).abs() < 1e-9);
    }

    #[test]
    fn test_negative_dt_is_noop() {
        let mut s = smoother_at(10.0, 10.0);
        s.set_target(ScreenPoint::new(500.0, 500.0));
        s.advance(-0.1);
        assert_eq!(s.current(), ScreenPoint::new(10.0, 10.0));
    }

    #[test]
    fn test_reset_snaps_both() {
        let mut s = smoother_at(0.0, 0.0);
        s.set_target(ScreenPoint::new(300.0, 300.0));
        s.advance(DT_60);
        s.reset(ScreenPoint::new(960.0, 540.0));
        assert_eq!(s.current(), ScreenPoint::new(960.0, 540.0));
        assert_eq!(s.target(), ScreenPoint::new(960.0, 540.0));
    }

    #[test]
    fn test_config_sexp() {
        let sexp = SmootherConfig::default().config_sexp();
        assert!(sexp.contains("(50.0 . 0.35)"));
        assert!(sexp.contains(":floor-rate 0.05"));
        assert!(sexp.contains(":reference-hz 60"));
    }

    proptest! {
        #[test]
        fn prop_never_overshoots(
            tx in -3000.0f64..3000.0,
            ty in -3000.0f64..3000.0,
            dt in (1.0f64 / 240.0)..0.1,
        ) {
            let mut s = smoother_at(0.0, 0.0);
            let target = ScreenPoint::new(tx, ty);
            s.set_target(target);
            let mut prev = s.current().distance(&target);
            for _ in 0..1000 {
                s.advance(dt);
                let d = s.current().distance(&target);
                prop_assert!(d <= prev + 1e-9);
                // stays on the segment between start and target
                if tx != 0.0 {
                    prop_assert!(s.current().x.abs() <= tx.abs() + 1e-9);
                }
                prev = d;
            }
            prop_assert!(prev <= 1.0);
        }
    }
}
