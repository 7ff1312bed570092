//! Hand landmark data structures and ingest.
//!
//! Models the 21-point hand topology reported by the external detector,
//! projects the index fingertip into screen space, and validates raw
//! detector output before it enters the pipeline.  Performs no smoothing.

use tracing::debug;

// ── Landmark definitions ───────────────────────────────────

/// The 21 hand landmarks, in detector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandLandmark {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexMcp,
    IndexPip,
    IndexDip,
    IndexTip,
    MiddleMcp,
    MiddlePip,
    MiddleDip,
    MiddleTip,
    RingMcp,
    RingPip,
    RingDip,
    RingTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// Total number of landmarks per hand.
pub const LANDMARK_COUNT: usize = 21;

impl HandLandmark {
    /// Convert landmark enum to array index (0-20).
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// String representation for diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wrist => "wrist",
            Self::ThumbCmc => "thumb-cmc",
            Self::ThumbMcp => "thumb-mcp",
            Self::ThumbIp => "thumb-ip",
            Self::ThumbTip => "thumb-tip",
            Self::IndexMcp => "index-mcp",
            Self::IndexPip => "index-pip",
            Self::IndexDip => "index-dip",
            Self::IndexTip => "index-tip",
            Self::MiddleMcp => "middle-mcp",
            Self::MiddlePip => "middle-pip",
            Self::MiddleDip => "middle-dip",
            Self::MiddleTip => "middle-tip",
            Self::RingMcp => "ring-mcp",
            Self::RingPip => "ring-pip",
            Self::RingDip => "ring-dip",
            Self::RingTip => "ring-tip",
            Self::PinkyMcp => "pinky-mcp",
            Self::PinkyPip => "pinky-pip",
            Self::PinkyDip => "pinky-dip",
            Self::PinkyTip => "pinky-tip",
        }
    }

    /// (tip, knuckle) pairs for the four non-thumb fingers, index first.
    pub fn finger_pairs() -> [(HandLandmark, HandLandmark); 4] {
        [
            (Self::IndexTip, Self::IndexPip),
            (Self::MiddleTip, Self::MiddlePip),
            (Self::RingTip, Self::RingPip),
            (Self::PinkyTip, Self::PinkyPip),
        ]
    }
}

// ── Points ─────────────────────────────────────────────────

/// One normalized landmark: x, y in [0,1] (origin top-left), z relative depth.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance in normalized landmark space.
    pub fn distance(&self, other: &Landmark) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// A position in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &ScreenPoint) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Viewport size in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
        }
    }
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.width / 2.0, self.height / 2.0)
    }

    /// Parse a "WxH" size string.
    pub fn parse(s: &str) -> Option<Self> {
        let (w, h) = s.split_once('x')?;
        let w = w.trim().parse::<f64>().ok()?;
        let h = h.trim().parse::<f64>().ok()?;
        if w > 0.0 && h > 0.0 {
            Some(Self::new(w, h))
        } else {
            None
        }
    }

    /// Project a normalized landmark into screen pixels, mirrored horizontally.
    pub fn project(&self, landmark: &Landmark) -> ScreenPoint {
        ScreenPoint::new(
            (1.0 - landmark.x as f64) * self.width,
            landmark.y as f64 * self.height,
        )
    }
}

// ── Frame ──────────────────────────────────────────────────

/// One detector result for a single hand.  Always holds exactly 21 points.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    points: [Landmark; LANDMARK_COUNT],
}

impl LandmarkFrame {
    /// Build a frame from detector output.  Returns None unless there are
    /// exactly 21 points, all with finite coordinates.
    pub fn from_points(points: &[Landmark]) -> Option<Self> {
        let points: [Landmark; LANDMARK_COUNT] = points.try_into().ok()?;
        if !points.iter().all(Landmark::is_finite) {
            return None;
        }
        Some(Self { points })
    }

    pub fn get(&self, landmark: HandLandmark) -> &Landmark {
        &self.points[landmark.index()]
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    /// Screen-space pointer position (index fingertip).
    pub fn raw_point(&self, viewport: &Viewport) -> ScreenPoint {
        viewport.project(self.get(HandLandmark::IndexTip))
    }
}

/// Validate one detector callback's output.
///
/// Wrong landmark counts and non-finite coordinates are dropped and read
/// as "no hand" for that frame.  A NaN would otherwise stick in the
/// smoother forever.
pub fn ingest(points: Option<&[Landmark]>) -> Option<LandmarkFrame> {
    let points = points?;
    if points.len() != LANDMARK_COUNT {
        debug!(
            "Landmark ingest: expected {} landmarks, got {}",
            LANDMARK_COUNT,
            points.len(),
        );
        return None;
    }
    if let Some(i) = points.iter().position(|l| !l.is_finite()) {
        debug!("Landmark ingest: non-finite coordinates at landmark {}", i);
        return None;
    }
    LandmarkFrame::from_points(points)
}

/// Build an upright open hand for tests: fingertips above their knuckles,
/// thumb tip well away from the index tip.
#[cfg(test)]
pub(crate) fn test_open_hand() -> Vec<Landmark> {
    let mut points = vec![Landmark::new(0.5, 0.8, 0.0); LANDMARK_COUNT];
    let fingers = [
        (HandLandmark::IndexTip, HandLandmark::IndexPip, 0.45),
        (HandLandmark::MiddleTip, HandLandmark::MiddlePip, 0.50),
        (HandLandmark::RingTip, HandLandmark::RingPip, 0.55),
        (HandLandmark::PinkyTip, HandLandmark::PinkyPip, 0.60),
    ];
    for (tip, pip, x) in fingers {
        points[pip.index()] = Landmark::new(x, 0.6, 0.0);
        points[tip.index()] = Landmark::new(x, 0.4, 0.0);
    }
    points[HandLandmark::ThumbTip.index()] = Landmark::new(0.30, 0.65, 0.0);
    points
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_count() {
        assert_eq!(HandLandmark::Wrist.index(), 0);
        assert_eq!(HandLandmark::IndexTip.index(), 8);
        assert_eq!(HandLandmark::PinkyTip.index(), 20);
        assert_eq!(LANDMARK_COUNT, 21);
    }

    #[test]
    fn test_landmark_as_str() {
        assert_eq!(HandLandmark::ThumbTip.as_str(), "thumb-tip");
        assert_eq!(HandLandmark::IndexPip.as_str(), "index-pip");
        assert_eq!(HandLandmark::PinkyTip.as_str(), "pinky-tip");
    }

    #[test]
    fn test_projection_mirrors_x() {
        let viewport = Viewport::new(1000.0, 500.0);
        let p = viewport.project(&Landmark::new(0.25, 0.5, 0.0));
        assert!((p.x - 750.0).abs() < 1e-6);
        assert!((p.y - 250.0).abs() < 1e-6);
    }

    #[test]
    fn test_raw_point_uses_index_tip() {
        let mut points = vec![Landmark::default(); LANDMARK_COUNT];
        points[HandLandmark::IndexTip.index()] = Landmark::new(0.0, 1.0, 0.0);
        let frame = LandmarkFrame::from_points(&points).unwrap();
        let p = frame.raw_point(&Viewport::new(800.0, 600.0));
        assert!((p.x - 800.0).abs() < 1e-6);
        assert!((p.y - 600.0).abs() < 1e-6);
    }

    #[test]
    fn test_ingest_wrong_count_is_no_hand() {
        let points = vec![Landmark::default(); 10];
        assert!(ingest(Some(&points)).is_none());
        assert!(ingest(None).is_none());
    }

    #[test]
    fn test_ingest_non_finite_is_no_hand() {
        let mut points = test_open_hand();
        points[HandLandmark::IndexTip.index()] = Landmark::new(f32::NAN, 0.4, 0.0);
        assert!(ingest(Some(&points)).is_none());

        let mut points = test_open_hand();
        points[HandLandmark::Wrist.index()].z = f32::INFINITY;
        assert!(ingest(Some(&points)).is_none());
        assert!(LandmarkFrame::from_points(&points).is_none());

        let nan = vec![Landmark::new(f32::NAN, f32::NAN, f32::NAN); LANDMARK_COUNT];
        assert!(ingest(Some(&nan)).is_none());
    }

    #[test]
    fn test_ingest_valid_frame() {
        let points = test_open_hand();
        let frame = ingest(Some(&points)).expect("21 points should ingest");
        assert_eq!(frame.points().len(), LANDMARK_COUNT);
    }

    #[test]
    fn test_viewport_parse() {
        assert_eq!(Viewport::parse("1280x720"), Some(Viewport::new(1280.0, 720.0)));
        assert!(Viewport::parse("1280").is_none());
        assert!(Viewport::parse("0x720").is_none());
        assert!(Viewport::parse("axb").is_none());
    }

    #[test]
    fn test_landmark_distance() {
        let a = Landmark::new(0.0, 0.0, 0.0);
        let b = Landmark::new(0.3, 0.4, 0.0);
        assert!((a.distance(&b) - 0.5).abs() < 1e-6);
    }
}
