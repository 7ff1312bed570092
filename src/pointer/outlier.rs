//! Outlier rejection for screen-projected pointer samples.
//!
//! A single-frame jump larger than `max_jump_px` is treated as a detector
//! misfire and dropped.  The dropped sample is kept as a pending candidate:
//! if the next sample lands near it the jump was real and is accepted, so
//! genuine fast motion is delayed by at most one frame.

use tracing::debug;

use super::landmarks::ScreenPoint;

/// Configuration for outlier rejection.
#[derive(Debug, Clone)]
pub struct OutlierConfig {
    /// Largest accepted jump (pixels) between consecutive accepted samples.
    pub max_jump_px: f64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self { max_jump_px: 200.0 }
    }
}

impl OutlierConfig {
    pub fn config_sexp(&self) -> String {
        format!("(:max-jump-px {:.1})", self.max_jump_px)
    }
}

/// Outcome of filtering one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterVerdict {
    /// Sample becomes the new smoothing target.
    Accepted(ScreenPoint),
    /// Sample dropped as an implausible jump.
    Rejected,
}

/// Tracks the last accepted sample and any pending jump candidate.
#[derive(Debug, Clone, Default)]
pub struct OutlierFilter {
    pub config: OutlierConfig,
    last_accepted: Option<ScreenPoint>,
    pending: Option<ScreenPoint>,
}

impl OutlierFilter {
    pub fn new(config: OutlierConfig) -> Self {
        Self {
            config,
            last_accepted: None,
            pending: None,
        }
    }

    /// Filter one raw sample.
    pub fn filter(&mut self, sample: ScreenPoint) -> FilterVerdict {
        let max = self.config.max_jump_px;

        let plausible = match self.last_accepted {
            None => true,
            Some(last) => sample.distance(&last) <= max,
        };
        let confirms_pending = self
            .pending
            .map(|p| sample.distance(&p) <= max)
            .unwrap_or(false);

        if plausible || confirms_pending {
            self.last_accepted = Some(sample);
            self.pending = None;
            return FilterVerdict::Accepted(sample);
        }

        debug!(
            "Outlier rejected: ({:.0}, {:.0}) jumps more than {:.0}px",
            sample.x, sample.y, max,
        );
        self.pending = Some(sample);
        FilterVerdict::Rejected
    }

    pub fn last_accepted(&self) -> Option<ScreenPoint> {
        self.last_accepted
    }

    /// Forget all history; the next sample is always accepted.
    pub fn reset(&mut self) {
        self.last_accepted = None;
        self.pending = None;
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64) -> ScreenPoint {
        ScreenPoint::new(x, y)
    }

    #[test]
    fn test_first_sample_always_accepted() {
        let mut filter = OutlierFilter::default();
        assert_eq!(filter.filter(pt(1500.0, 900.0)), FilterVerdict::Accepted(pt(1500.0, 900.0)));
    }

    #[test]
    fn test_large_jump_rejected() {
        let mut filter = OutlierFilter::default();
        filter.filter(pt(100.0, 100.0));
        assert_eq!(filter.filter(pt(400.0, 100.0)), FilterVerdict::Rejected);
        assert_eq!(filter.last_accepted(), Some(pt(100.0, 100.0)));
    }

    #[test]
    fn test_moderate_jump_accepted() {
        let mut filter = OutlierFilter::default();
        filter.filter(pt(100.0, 100.0));
        assert_eq!(filter.filter(pt(250.0, 100.0)), FilterVerdict::Accepted(pt(250.0, 100.0)));
    }

    #[test]
    fn test_exact_threshold_accepted() {
        let mut filter = OutlierFilter::default();
        filter.filter(pt(0.0, 0.0));
        assert!(matches!(filter.filter(pt(200.0, 0.0)), FilterVerdict::Accepted(_)));
    }

    #[test]
    fn test_sustained_jump_accepted_next_frame() {
        let mut filter = OutlierFilter::default();
        filter.filter(pt(100.0, 100.0));
        assert_eq!(filter.filter(pt(800.0, 100.0)), FilterVerdict::Rejected);
        // Hand really moved: second sample near the candidate confirms it
        assert_eq!(filter.filter(pt(810.0, 105.0)), FilterVerdict::Accepted(pt(810.0, 105.0)));
        assert_eq!(filter.last_accepted(), Some(pt(810.0, 105.0)));
    }

    #[test]
    fn test_single_spike_absorbed() {
        let mut filter = OutlierFilter::default();
        filter.filter(pt(100.0, 100.0));
        assert_eq!(filter.filter(pt(900.0, 700.0)), FilterVerdict::Rejected);
        // Back where it was: accepted immediately, spike forgotten
        assert!(matches!(filter.filter(pt(105.0, 100.0)), FilterVerdict::Accepted(_)));
        assert_eq!(filter.filter(pt(900.0, 700.0)), FilterVerdict::Rejected);
    }

    #[test]
    fn test_reset_forgets_history() {
        let mut filter = OutlierFilter::default();
        filter.filter(pt(100.0, 100.0));
        filter.reset();
        assert!(filter.last_accepted().is_none());
        assert!(matches!(filter.filter(pt(1000.0, 1000.0)), FilterVerdict::Accepted(_)));
    }

    #[test]
    fn test_config_sexp() {
        let filter = OutlierFilter::default();
        assert_eq!(filter.config.config_sexp(), "(:max-jump-px 200.0)");
    }
}
