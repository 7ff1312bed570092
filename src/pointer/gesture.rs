//! Gesture classification from a single landmark frame.
//!
//! Stateless geometric rules, evaluated in precedence order: pinch first,
//! then finger extension.  Debouncing is the dispatcher's job.
//!
//! Finger extension is a vertical-offset test (tip above its knuckle), so
//! it assumes an upright hand.  A sideways or inverted hand can read as
//! `Fist` when it is open, or the reverse.

use super::landmarks::{HandLandmark, LandmarkFrame};

// ── Gesture labels ─────────────────────────────────────────

/// Per-frame gesture classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GestureLabel {
    /// No hand in frame.
    #[default]
    None,
    /// Hand present, more than the index finger extended.
    Open,
    /// Only the index finger extended.
    Point,
    /// No fingers extended.
    Fist,
    /// Thumb and index fingertips pinched together.
    Click,
}

impl GestureLabel {
    /// String representation for diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Open => "open",
            Self::Point => "point",
            Self::Fist => "fist",
            Self::Click => "click",
        }
    }
}

// ── Config ─────────────────────────────────────────────────

/// Classification thresholds, in normalized landmark units.
#[derive(Debug, Clone)]
pub struct GestureConfig {
    /// Thumb-tip to index-tip distance below which a pinch is reported.
    pub pinch_threshold: f32,
    /// How far a fingertip must sit above its knuckle to count as extended.
    pub extension_margin: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            pinch_threshold: 0.05,
            extension_margin: 0.03,
        }
    }
}

impl GestureConfig {
    pub fn config_sexp(&self) -> String {
        format!(
            "(:pinch-threshold {:.3} :extension-margin {:.3})",
            self.pinch_threshold, self.extension_margin,
        )
    }
}

// ── Classifier ─────────────────────────────────────────────

/// Which of index, middle, ring, pinky are extended.
pub fn extended_fingers(frame: &LandmarkFrame, margin: f32) -> [bool; 4] {
    HandLandmark::finger_pairs().map(|(tip, knuckle)| {
        frame.get(tip).y < frame.get(knuckle).y - margin
    })
}

/// Classify one frame.  Never returns `GestureLabel::None`; that label is
/// reserved for frames with no hand.
pub fn classify(frame: &LandmarkFrame, config: &GestureConfig) -> GestureLabel {
    let pinch = frame
        .get(HandLandmark::ThumbTip)
        .distance(frame.get(HandLandmark::IndexTip));
    if pinch < config.pinch_threshold {
        return GestureLabel::Click;
    }

    let [index, middle, ring, pinky] = extended_fingers(frame, config.extension_margin);

    if !index && !middle && !ring && !pinky {
        return GestureLabel::Fist;
    }

    if index && !middle && !ring && !pinky {
        return GestureLabel::Point;
    }

    GestureLabel::Open
}

/// Classify an optional frame; no hand reads as `None`.
pub fn classify_frame(frame: Option<&LandmarkFrame>, config: &GestureConfig) -> GestureLabel {
    frame
        .map(|f| classify(f, config))
        .unwrap_or(GestureLabel::None)
}

// ── Test helpers ───────────────────────────────────────────

#[cfg(test)]
fn curl(points: &mut [super::landmarks::Landmark], tip: HandLandmark, knuckle: HandLandmark) {
    let k = points[knuckle.index()];
    points[tip.index()] = super::landmarks::Landmark::new(k.x, k.y + 0.05, k.z);
}

// ── Tests ──────────────────────────────────────────────────
