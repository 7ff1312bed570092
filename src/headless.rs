//! Headless driver: runs a pointer session against scripted collaborators.
//!
//! Used for demos and CI smoke runs.  A synthetic camera feeds a scripted
//! detector whose hand circles the screen, pinches, drags a fist, leaves
//! the frame and comes back pointing.  The detector loop and the render loop
//! are two independent calloop timers on one thread, the same shape the
//! engine sees in a browser or compositor host.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use calloop::timer::{TimeoutAction, Timer};
use calloop::EventLoop;
use tracing::{debug, info, warn};

use crate::config::PointerConfig;
use crate::pointer::session::{
    Activation, ActivationGate, CameraFrame, CameraSource, HandDetector, SessionController,
    SessionError,
};
use crate::pointer::{ElementId, HandLandmark, Landmark, PointerEvent, ScreenPoint, UiSurface, Viewport};

/// Global flag set by SIGTERM/SIGINT handlers.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Element id of the feature's own toggle button.
pub const CONTROL_ELEMENT: ElementId = 1_000;

/// Length of one pass through the hand script (seconds).
const SCRIPT_CYCLE_S: f64 = 8.0;

// ── Options ────────────────────────────────────────────────

/// Headless run configuration.
#[derive(Debug, Clone)]
pub struct HeadlessOptions {
    /// How long to run before disabling the session.
    pub duration: Duration,
    /// Detector callback rate.
    pub detector_hz: f64,
    /// Display refresh rate.
    pub render_hz: f64,
    pub viewport: Viewport,
    /// Activations the usage gate allows.
    pub quota: u32,
    /// Simulate a camera permission denial.
    pub deny_camera: bool,
    pub config: PointerConfig,
}

impl Default for HeadlessOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(10),
            detector_hz: 24.0,
            render_hz: 60.0,
            viewport: Viewport::default(),
            quota: 3,
            deny_camera: false,
            config: PointerConfig::default(),
        }
    }
}

/// Summary of a headless run.
#[derive(Debug, Clone)]
pub struct HeadlessReport {
    pub activation: Activation,
    pub clicks: u64,
    pub scroll_total: f64,
    pub scroll_requests: u64,
    pub status: String,
}

// ── Scripted collaborators ─────────────────────────────────

/// Synthetic camera producing a frame every time it is polled.
pub struct ScriptedCamera {
    origin: Instant,
    width: u32,
    height: u32,
    sequence: u64,
    running: bool,
    deny: bool,
}

impl ScriptedCamera {
    pub fn new(origin: Instant, width: u32, height: u32, deny: bool) -> Self {
        Self {
            origin,
            width,
            height,
            sequence: 0,
            running: false,
            deny,
        }
    }
}

impl CameraSource for ScriptedCamera {
    fn start(&mut self) -> Result<(), SessionError> {
        if self.deny {
            return Err(SessionError::PermissionDenied);
        }
        self.running = true;
        info!("Scripted camera started ({}x{})", self.width, self.height);
        Ok(())
    }

    fn poll_frame(&mut self) -> Option<CameraFrame> {
        if !self.running {
            return None;
        }
        self.sequence += 1;
        Some(CameraFrame {
            sequence: self.sequence,
            timestamp_ms: self.origin.elapsed().as_secs_f64() * 1000.0,
            width: self.width,
            height: self.height,
            pixels: Vec::new(),
        })
    }

    fn stop(&mut self) {
        if self.running {
            info!("Scripted camera stopped after {} frames", self.sequence);
        }
        self.running = false;
    }
}

/// Hand pose used by the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptPose {
    Open,
    Point,
    Fist,
    Pinch,
}

/// Build a 21-point upright hand whose index fingertip (or, for a fist, the
/// index knuckle area) sits near normalized (x, y).
pub fn synth_hand(pose: ScriptPose, x: f32, y: f32) -> Vec<Landmark> {
    let mut points = vec![Landmark::new(x, y + 0.25, 0.0); 21];

    let fingers = [
        (HandLandmark::IndexTip, HandLandmark::IndexPip, HandLandmark::IndexMcp, 0.00),
        (HandLandmark::MiddleTip, HandLandmark::MiddlePip, HandLandmark::MiddleMcp, 0.03),
        (HandLandmark::RingTip, HandLandmark::RingPip, HandLandmark::RingMcp, 0.06),
        (HandLandmark::PinkyTip, HandLandmark::PinkyPip, HandLandmark::PinkyMcp, 0.09),
    ];
    for (i, (tip, pip, mcp, dx)) in fingers.into_iter().enumerate() {
        let extended = match pose {
            ScriptPose::Open | ScriptPose::Pinch => true,
            ScriptPose::Point => i == 0,
            ScriptPose::Fist => false,
        };
        points[mcp.index()] = Landmark::new(x + dx, y + 0.18, 0.0);
        points[pip.index()] = Landmark::new(x + dx, y + 0.12, 0.0);
        points[tip.index()] = if extended {
            Landmark::new(x + dx, y, 0.0)
        } else {
            Landmark::new(x + dx, y + 0.17, 0.0)
        };
    }

    points[HandLandmark::ThumbTip.index()] = match pose {
        ScriptPose::Pinch => Landmark::new(x + 0.01, y + 0.01, 0.0),
        _ => Landmark::new(x - 0.12, y + 0.10, 0.0),
    };
    points
}

/// Detector following a fixed choreography keyed on frame timestamps.
#[derive(Debug, Default)]
pub struct ScriptedDetector {
    loaded: bool,
    detections: u64,
}

impl ScriptedDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Landmarks for a point in the script, or None while the hand is away.
    pub fn script_at(t_ms: f64, sequence: u64) -> Option<Vec<Landmark>> {
        let t = (t_ms / 1000.0) % SCRIPT_CYCLE_S;
        match t {
            // Circle with an open hand; every 37th frame is a misdetection
            t if t < 3.0 => {
                if sequence % 37 == 36 {
                    return Some(synth_hand(ScriptPose::Open, 0.02, 0.02));
                }
                let angle = t / 3.0 * std::f64::consts::TAU;
                let x = 0.5 + 0.2 * angle.cos();
                let y = 0.4 + 0.15 * angle.sin();
                Some(synth_hand(ScriptPose::Open, x as f32, y as f32))
            }
            // Pinch in place
            t if t < 4.0 => Some(synth_hand(ScriptPose::Pinch, 0.7, 0.4)),
            // Fist dragged downward
            t if t < 6.0 => {
                let y = 0.2 + (t - 4.0) / 2.0 * 0.3;
                Some(synth_hand(ScriptPose::Fist, 0.5, y as f32))
            }
            // Hand out of frame
            t if t < 7.0 => None,
            _ => Some(synth_hand(ScriptPose::Point, 0.3, 0.3)),
        }
    }
}

impl HandDetector for ScriptedDetector {
    fn load(&mut self) -> Result<(), SessionError> {
        self.loaded = true;
        info!("Scripted detector loaded");
        Ok(())
    }

    fn detect(&mut self, frame: &CameraFrame) -> Option<Vec<Landmark>> {
        if !self.loaded {
            return None;
        }
        self.detections += 1;
        Self::script_at(frame.timestamp_ms, frame.sequence)
    }

    fn close(&mut self) {
        if self.loaded {
            info!("Scripted detector closed after {} frames", self.detections);
        }
        self.loaded = false;
    }
}

/// Usage gate with a fixed number of activations.
#[derive(Debug)]
pub struct CountingGate {
    pub remaining: u32,
    pub used: u32,
}

impl CountingGate {
    pub fn new(remaining: u32) -> Self {
        Self { remaining, used: 0 }
    }
}

impl ActivationGate for CountingGate {
    fn is_allowed(&self) -> bool {
        self.remaining > 0
    }

    fn record_activation(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
        self.used += 1;
        debug!("Usage gate: {} activation(s) left", self.remaining);
    }
}

/// Page laid out as a 4x4 grid of elements with a toggle button stacked
/// in the top-right corner.  Logs every side effect.
#[derive(Debug)]
pub struct LoggingSurface {
    viewport: Viewport,
    pub clicks: u64,
    pub scroll_offset: f64,
    pub scroll_requests: u64,
    pub highlighted: Vec<ElementId>,
}

impl LoggingSurface {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            clicks: 0,
            scroll_offset: 0.0,
            scroll_requests: 0,
            highlighted: Vec::new(),
        }
    }

    fn in_control(&self, p: ScreenPoint) -> bool {
        p.x >= self.viewport.width - 120.0 && p.y <= 60.0
    }
}

impl UiSurface for LoggingSurface {
    fn elements_at(&self, p: ScreenPoint) -> Vec<ElementId> {
        if p.x < 0.0 || p.y < 0.0 || p.x >= self.viewport.width || p.y >= self.viewport.height {
            return Vec::new();
        }
        let col = (p.x / (self.viewport.width / 4.0)) as ElementId;
        let row = (p.y / (self.viewport.height / 4.0)) as ElementId;
        let cell = row * 4 + col + 1;
        if self.in_control(p) {
            vec![CONTROL_ELEMENT, cell]
        } else {
            vec![cell]
        }
    }

    fn activate(&mut self, element: ElementId) {
        self.clicks += 1;
        info!("UI: activated element {}", element);
    }

    fn set_feedback(&mut self, element: ElementId, active: bool) {
        if active {
            self.highlighted.push(element);
        } else {
            self.highlighted.retain(|e| *e != element);
        }
    }

    fn scroll_by(&mut self, dy: f64) {
        self.scroll_offset = (self.scroll_offset + dy).max(0.0);
        self.scroll_requests += 1;
    }
}

// ── Driver ─────────────────────────────────────────────────

/// Event loop data.
struct HeadlessState {
    session: SessionController,
    ui: LoggingSurface,
    origin: Instant,
    running: bool,
}

impl HeadlessState {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

fn log_events(events: &[PointerEvent]) {
    for evt in events {
        match evt {
            PointerEvent::Clicked { element, x, y } => {
                info!("Click on element {} at ({:.0}, {:.0})", element, x, y)
            }
            PointerEvent::ScrollStarted { anchor_y } => {
                info!("Scroll started at y={:.0}", anchor_y)
            }
            PointerEvent::ScrollEnded => info!("Scroll ended"),
            other => debug!("{:?}", other),
        }
    }
}

/// Install signal handlers for graceful shutdown (SIGTERM, SIGINT).
pub fn install_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGTERM, signal_handler as libc::sighandler_t);
        libc::signal(libc::SIGINT, signal_handler as libc::sighandler_t);
    }
}

extern "C" fn signal_handler(_sig: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

fn period(hz: f64) -> Duration {
    Duration::from_secs_f64(1.0 / hz.max(1.0))
}

/// Run one headless session to completion.
pub fn run(options: HeadlessOptions) -> anyhow::Result<HeadlessReport> {
    let mut event_loop = EventLoop::<HeadlessState>::try_new()?;
    let origin = Instant::now();
    let viewport = options.viewport;

    let mut config = options.config.clone();
    if config.dispatch.control_element.is_none() {
        config.dispatch.control_element = Some(CONTROL_ELEMENT);
    }

    let session = SessionController::new(
        config,
        viewport,
        Box::new(ScriptedCamera::new(
            origin,
            viewport.width as u32,
            viewport.height as u32,
            options.deny_camera,
        )),
        Box::new(ScriptedDetector::new()),
        Box::new(CountingGate::new(options.quota)),
    );
    let mut state = HeadlessState {
        session,
        ui: LoggingSurface::new(viewport),
        origin,
        running: true,
    };

    let activation = match state.session.enable(0.0) {
        Ok(Activation::Started) => Activation::Started,
        Ok(other) => {
            info!("Headless: session not started ({:?})", other);
            return Ok(report(&state, other));
        }
        Err(e) => {
            warn!("Headless: activation failed: {}", e);
            return Err(e.into());
        }
    };

    let handle = event_loop.handle();

    let detector_period = period(options.detector_hz);
    handle
        .insert_source(Timer::from_duration(detector_period), move |_, _, state| {
            if !state.session.render_scheduled() {
                return TimeoutAction::Drop;
            }
            let now = state.now_ms();
            let events = state.session.pump_camera(now, &mut state.ui);
            log_events(&events);
            TimeoutAction::ToDuration(detector_period)
        })
        .map_err(|e| anyhow::anyhow!("detector timer: {}", e.error))?;

    let render_period = period(options.render_hz);
    handle
        .insert_source(Timer::from_duration(render_period), move |_, _, state| {
            let now = state.now_ms();
            if state.session.on_render_frame(now, &mut state.ui) {
                TimeoutAction::ToDuration(render_period)
            } else {
                debug!("Render loop cancelled");
                TimeoutAction::Drop
            }
        })
        .map_err(|e| anyhow::anyhow!("render timer: {}", e.error))?;

    handle
        .insert_source(Timer::from_duration(options.duration), |_, _, state| {
            info!("Headless exit timer fired");
            state.session.disable(&mut state.ui);
            state.running = false;
            TimeoutAction::Drop
        })
        .map_err(|e| anyhow::anyhow!("exit timer: {}", e.error))?;

    info!(
        "Headless pointer session running: detector {:.0} Hz, render {:.0} Hz, {}x{}",
        options.detector_hz, options.render_hz, viewport.width, viewport.height
    );

    let mut last_status_log = Instant::now();
    let status_interval = Duration::from_secs(2);

    while state.running {
        if SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
            info!("Shutdown signal received, disabling session");
            state.session.disable(&mut state.ui);
            state.running = false;
            break;
        }

        if last_status_log.elapsed() >= status_interval {
            info!(
                "Headless status: gesture {}, hand {}, detector {:.1} fps",
                state.session.gesture().as_str(),
                state.session.hand_present(),
                state.session.detector_fps(),
            );
            last_status_log = Instant::now();
        }

        event_loop.dispatch(Some(Duration::from_millis(50)), &mut state)?;
    }

    Ok(report(&state, activation))
}

fn report(state: &HeadlessState, activation: Activation) -> HeadlessReport {
    HeadlessReport {
        activation,
        clicks: state.ui.clicks,
        scroll_total: state.ui.scroll_offset,
        scroll_requests: state.ui.scroll_requests,
        status: state.session.status_sexp(),
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::gesture::{classify, GestureConfig};
    use crate::pointer::{GestureLabel, LandmarkFrame, SessionState};

    fn label(points: &[Landmark]) -> GestureLabel {
        classify(&LandmarkFrame::from_points(points).unwrap(), &GestureConfig::default())
    }

    #[test]
    fn test_synth_poses_classify() {
        assert_eq!(label(&synth_hand(ScriptPose::Open, 0.5, 0.4)), GestureLabel::Open);
        assert_eq!(label(&synth_hand(ScriptPose::Point, 0.5, 0.4)), GestureLabel::Point);
        assert_eq!(label(&synth_hand(ScriptPose::Fist, 0.5, 0.4)), GestureLabel::Fist);
        assert_eq!(label(&synth_hand(ScriptPose::Pinch, 0.5, 0.4)), GestureLabel::Click);
    }

    #[test]
    fn test_script_phases() {
        assert_eq!(label(&ScriptedDetector::script_at(1000.0, 1).unwrap()), GestureLabel::Open);
        assert_eq!(label(&ScriptedDetector::script_at(3500.0, 1).unwrap()), GestureLabel::Click);
        assert_eq!(label(&ScriptedDetector::script_at(5000.0, 1).unwrap()), GestureLabel::Fist);
        assert!(ScriptedDetector::script_at(6500.0, 1).is_none());
        assert_eq!(label(&ScriptedDetector::script_at(7500.0, 1).unwrap()), GestureLabel::Point);
        // wraps around
        assert!(ScriptedDetector::script_at(14_500.0, 1).is_none());
    }

    #[test]
    fn test_surface_control_stacked_on_top() {
        let ui = LoggingSurface::new(Viewport::new(800.0, 400.0));
        assert_eq!(ui.elements_at(ScreenPoint::new(790.0, 10.0)), vec![CONTROL_ELEMENT, 4]);
        assert_eq!(ui.elements_at(ScreenPoint::new(10.0, 390.0)), vec![13]);
        assert!(ui.elements_at(ScreenPoint::new(900.0, 10.0)).is_empty());
    }

    #[test]
    fn test_counting_gate() {
        let mut gate = CountingGate::new(1);
        assert!(gate.is_allowed());
        gate.record_activation();
        assert!(!gate.is_allowed());
        assert_eq!(gate.used, 1);
    }

    #[test]
    fn test_camera_stop_before_start_is_safe() {
        let mut cam = ScriptedCamera::new(Instant::now(), 640, 480, false);
        cam.stop();
        assert!(cam.poll_frame().is_none());
        cam.start().unwrap();
        assert_eq!(cam.poll_frame().map(|f| f.sequence), Some(1));
        cam.stop();
        cam.stop();
        assert!(cam.poll_frame().is_none());
    }

    #[test]
    fn test_run_denied_without_quota() {
        let report = run(HeadlessOptions {
            quota: 0,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(report.activation, Activation::Denied);
        assert!(report.status.contains(":state :disabled"));
    }

    #[test]
    fn test_run_camera_denied_is_error() {
        let result = run(HeadlessOptions {
            deny_camera: true,
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_short_run_ends_disabled() {
        let report = run(HeadlessOptions {
            duration: Duration::from_millis(300),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(report.activation, Activation::Started);
        assert!(report.status.contains(&format!(":state :{}", SessionState::Disabled.as_str())));
        assert!(report.status.contains(":activations 1"));
    }
}
