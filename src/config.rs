//! Pointer engine configuration.
//!
//! Every component owns a config struct whose `Default` holds the tuned
//! constants.  `PointerConfig` gathers them and can be overridden from an
//! s-expression plist, e.g.
//!
//! ```text
//! (:max-jump-px 200 :pinch-threshold 0.05 :click-cooldown-ms 350)
//! ```
//!
//! Unknown keys are ignored; missing keys keep their defaults.

use std::path::Path;

use anyhow::Context;
use lexpr::Value;
use tracing::{debug, warn};

use crate::pointer::dispatch::DispatchConfig;
use crate::pointer::gesture::GestureConfig;
use crate::pointer::outlier::OutlierConfig;
use crate::pointer::smoother::SmootherConfig;

/// Aggregate engine configuration.
#[derive(Debug, Clone)]
pub struct PointerConfig {
    pub outlier: OutlierConfig,
    pub smoother: SmootherConfig,
    pub gesture: GestureConfig,
    pub dispatch: DispatchConfig,
    /// Detector intervals kept for frame-rate statistics.
    pub timing_window: usize,
    /// Detector interval above which a callback counts as slow (ms).
    pub detector_budget_ms: f64,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            outlier: OutlierConfig::default(),
            smoother: SmootherConfig::default(),
            gesture: GestureConfig::default(),
            dispatch: DispatchConfig::default(),
            timing_window: 120,
            detector_budget_ms: 66.7,
        }
    }
}

impl PointerConfig {
    /// Parse a config plist on top of the defaults.
    pub fn from_sexp(raw: &str) -> anyhow::Result<Self> {
        let value = lexpr::from_str(raw).context("malformed config s-expression")?;
        let mut config = Self::default();
        config.apply(&value);
        Ok(config)
    }

    /// Read and parse a config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_sexp(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Apply every recognized key in a plist.
    pub fn apply(&mut self, value: &Value) {
        if let Some(v) = get_float(value, "max-jump-px") {
            self.outlier.max_jump_px = v;
        }

        if let Some(v) = get_float(value, "floor-rate") {
            self.smoother.floor_rate = v;
        }
        if let Some(v) = get_float(value, "reference-hz") {
            self.smoother.reference_hz = v;
        }
        if let Some(v) = get_float(value, "max-dt-s") {
            self.smoother.max_dt_s = v;
        }
        if let Some(list) = get_value(value, "buckets") {
            match parse_buckets(list) {
                Some(buckets) => self.smoother.buckets = buckets,
                None => warn!("config: ignoring malformed :buckets"),
            }
        }

        if let Some(v) = get_float(value, "pinch-threshold") {
            self.gesture.pinch_threshold = v as f32;
        }
        if let Some(v) = get_float(value, "extension-margin") {
            self.gesture.extension_margin = v as f32;
        }

        if let Some(v) = get_float(value, "click-cooldown-ms") {
            self.dispatch.click_cooldown_ms = v;
        }
        if let Some(v) = get_float(value, "feedback-ms") {
            self.dispatch.feedback_ms = v;
        }
        if let Some(v) = get_float(value, "scroll-noise-px") {
            self.dispatch.scroll_noise_px = v;
        }
        if let Some(v) = get_float(value, "scroll-gain") {
            self.dispatch.scroll_gain = v;
        }
        if let Some(v) = get_float(value, "anchor-decay") {
            self.dispatch.anchor_decay = v;
        }
        if let Some(v) = get_int(value, "control-element") {
            self.dispatch.control_element = u64::try_from(v).ok();
        }

        if let Some(v) = get_int(value, "timing-window") {
            self.timing_window = v.max(1) as usize;
        }
        if let Some(v) = get_float(value, "detector-budget-ms") {
            self.detector_budget_ms = v;
        }

        debug!("config applied: {}", self.config_sexp());
    }

    /// Generate s-expression for the full configuration.
    pub fn config_sexp(&self) -> String {
        format!(
            "(:outlier {} :smoother {} :gesture {} :dispatch {} :timing-window {} :detector-budget-ms {:.1})",
            self.outlier.config_sexp(),
            self.smoother.config_sexp(),
            self.gesture.config_sexp(),
            self.dispatch.config_sexp(),
            self.timing_window,
            self.detector_budget_ms,
        )
    }
}

// ── Plist helpers ──────────────────────────────────────────

/// Find the value following `:key` in a plist.
/// Handles both `Value::Keyword("key")` and `Value::Symbol(":key")` forms.
fn get_value<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let prefixed = format!(":{}", key);
    let mut current = value;
    while let Value::Cons(pair) = current {
        let is_key = match pair.car() {
            Value::Keyword(k) => k.as_ref() == key,
            Value::Symbol(s) => s.as_ref() == prefixed,
            _ => false,
        };
        if is_key {
            return match pair.cdr() {
                Value::Cons(next) => Some(next.car()),
                _ => None,
            };
        }
        current = pair.cdr();
    }
    None
}

/// Extract a keyword value from a plist as a string.
fn get_keyword(value: &Value, key: &str) -> Option<String> {
    let val = get_value(value, key)?;
    match val {
        Value::Keyword(v) => Some(v.to_string()),
        Value::Symbol(v) => {
            let s = v.to_string();
            Some(s.strip_prefix(':').unwrap_or(&s).to_string())
        }
        Value::String(v) => Some(v.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "t" } else { "nil" }.to_string()),
        Value::Null => Some("nil".to_string()),
        _ => Some(val.to_string()),
    }
}

/// Extract an integer value from a plist.
fn get_int(value: &Value, key: &str) -> Option<i64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

/// Extract a floating-point value from a plist.
fn get_float(value: &Value, key: &str) -> Option<f64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

/// Parse `((50 . 0.35) (20 . 0.2) ...)` into a bucket table, largest
/// threshold first.
fn parse_buckets(list: &Value) -> Option<Vec<(f64, f64)>> {
    let mut buckets = Vec::new();
    for item in list.list_iter()? {
        let pair = item.as_cons()?;
        let threshold = pair.car().as_f64()?;
        let rate = match pair.cdr() {
            Value::Cons(rest) => rest.car().as_f64()?,
            other => other.as_f64()?,
        };
        buckets.push((threshold, rate));
    }
    buckets.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    Some(buckets)
}
