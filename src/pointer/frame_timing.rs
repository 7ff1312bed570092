//! Detector cadence instrumentation.
//!
//! Records the interval between detector callbacks and maintains rolling
//! statistics for the session diagnostics (detector frame rate, slow
//! callbacks, fraction of frames with a hand in view).

/// Rolling detector timing statistics over a window of samples.
#[derive(Debug)]
pub struct DetectorTiming {
    /// Interval between consecutive detector callbacks (ms).
    pub intervals: Vec<f64>,
    /// Maximum number of samples to keep.
    pub window_size: usize,
    /// Timestamp of the previous callback (ms).
    last_callback_ms: Option<f64>,
    /// Total callbacks recorded.
    pub total_callbacks: u64,
    /// Callbacks that carried a hand.
    pub hand_callbacks: u64,
    /// Callbacks that arrived later than the budget after the previous one.
    pub slow_callbacks: u64,
    /// Interval budget in milliseconds (e.g. 66.7 for 15 Hz).
    pub budget_ms: f64,
}

impl Default for DetectorTiming {
    fn default() -> Self {
        Self::new(120, 66.7)
    }
}

impl DetectorTiming {
    pub fn new(window_size: usize, budget_ms: f64) -> Self {
        Self {
            intervals: Vec::with_capacity(window_size),
            window_size,
            last_callback_ms: None,
            total_callbacks: 0,
            hand_callbacks: 0,
            slow_callbacks: 0,
            budget_ms,
        }
    }

    /// Record one detector callback.
    pub fn record_callback(&mut self, now_ms: f64, hand_present: bool) {
        if let Some(last) = self.last_callback_ms {
            let interval = (now_ms - last).max(0.0);
            Self::push_sample(&mut self.intervals, interval, self.window_size);
            if interval > self.budget_ms {
                self.slow_callbacks += 1;
            }
        }
        self.last_callback_ms = Some(now_ms);

        self.total_callbacks += 1;
        if hand_present {
            self.hand_callbacks += 1;
        }
    }

    fn push_sample(samples: &mut Vec<f64>, value: f64, window_size: usize) {
        samples.push(value);
        if samples.len() > window_size {
            samples.remove(0);
        }
    }

    /// Compute percentile from a sorted slice.
    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }
        let idx = ((sorted.len() as f64 - 1.0) * p / 100.0).round() as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    /// Detector frame rate from the median interval.
    pub fn fps(&self) -> f64 {
        self.stats().fps
    }

    /// Get timing statistics as percentiles.
    pub fn stats(&self) -> DetectorTimingStats {
        let mut intervals = self.intervals.clone();
        intervals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let p50 = Self::percentile(&intervals, 50.0);
        DetectorTimingStats {
            interval_p50: p50,
            interval_p95: Self::percentile(&intervals, 95.0),
            interval_p99: Self::percentile(&intervals, 99.0),
            fps: if p50 > 0.0 { 1000.0 / p50 } else { 0.0 },
            hand_pct: if self.total_callbacks > 0 {
                (self.hand_callbacks as f64 / self.total_callbacks as f64) * 100.0
            } else {
                0.0
            },
            total_callbacks: self.total_callbacks,
            slow_callbacks: self.slow_callbacks,
        }
    }

    /// Format stats as an s-expression.
    pub fn stats_sexp(&self) -> String {
        let s = self.stats();
        format!(
            "(:interval-p50 {:.1} :interval-p95 {:.1} :interval-p99 {:.1} :fps {:.1} :hand-pct {:.1} :total-callbacks {} :slow-callbacks {})",
            s.interval_p50,
            s.interval_p95,
            s.interval_p99,
            s.fps,
            s.hand_pct,
            s.total_callbacks,
            s.slow_callbacks,
        )
    }
}

/// Computed detector timing statistics.
#[derive(Debug, Clone)]
pub struct DetectorTimingStats {
    pub interval_p50: f64,
    pub interval_p95: f64,
    pub interval_p99: f64,
    pub fps: f64,
    pub hand_pct: f64,
    pub total_callbacks: u64,
    pub slow_callbacks: u64,
}
