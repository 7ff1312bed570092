//! Pointer session lifecycle: activation gate, camera and detector
//! ownership, and the two loop entry points.
//!
//! Lifecycle: DISABLED -> INITIALIZING -> ACTIVE -> DISABLED
//!
//! - `enable` checks the activation gate, starts the camera and loads the
//!   detector.  Any failure drops straight back to DISABLED and is kept as
//!   `last_failure` for the UI to show.
//! - The first camera frame moves the session to ACTIVE and is reported to
//!   the gate as a successful activation.
//! - `disable` stops both loops before releasing the detector and camera,
//!   and drops every piece of in-flight pointer state.
//!
//! Both loops run on one thread.  The detector loop (`pump_camera` /
//! `on_detector_result`) is the only writer of the smoothing target, the
//! gesture and the click/scroll state; the render loop (`on_render_frame`)
//! is the only writer of the rendered cursor position.

use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::config::PointerConfig;

use super::dispatch::{InteractionDispatcher, PointerEvent, ScrollSession, UiSurface};
use super::frame_timing::DetectorTiming;
use super::gesture::{classify_frame, GestureConfig, GestureLabel};
use super::landmarks::{ingest, Landmark, ScreenPoint, Viewport};
use super::outlier::{FilterVerdict, OutlierFilter};
use super::smoother::{AdaptiveSmoother, CursorState};

// ── Errors and outcomes ────────────────────────────────────

/// Lifecycle failures surfaced to the caller.  Per-frame anomalies never
/// show up here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),
    #[error("hand detector failed to load: {0}")]
    DetectorLoad(String),
}

/// Result of an activation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Camera and detector are up; waiting for the first frame.
    Started,
    /// The usage gate refused activation.  Not an error.
    Denied,
    /// The session was already initializing or active.
    AlreadyRunning,
    /// A toggle turned the session off.
    Stopped,
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disabled,
    Initializing,
    Active,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Initializing => "initializing",
            Self::Active => "active",
        }
    }
}

// ── Collaborators ──────────────────────────────────────────

/// One captured video frame.  Opaque to the pointer engine.
#[derive(Debug, Clone, Default)]
pub struct CameraFrame {
    pub sequence: u64,
    pub timestamp_ms: f64,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Video capture device.
pub trait CameraSource {
    /// Acquire the device.  Fails on permission denial or absence.
    fn start(&mut self) -> Result<(), SessionError>;
    /// Next frame, if one is ready.
    fn poll_frame(&mut self) -> Option<CameraFrame>;
    /// Release the device.  Idempotent; safe before `start` completes.
    fn stop(&mut self);
}

/// Hand-landmark detector: zero or one landmark set per frame.
pub trait HandDetector {
    fn load(&mut self) -> Result<(), SessionError>;
    fn detect(&mut self, frame: &CameraFrame) -> Option<Vec<Landmark>>;
    fn close(&mut self);
}

/// Usage quota consulted before each activation.
pub trait ActivationGate {
    fn is_allowed(&self) -> bool;
    fn record_activation(&mut self);
}

// ── Pipeline ───────────────────────────────────────────────

/// All per-session pointer state.  Dropped wholesale on disable.
#[derive(Debug)]
pub struct PointerPipeline {
    outlier: OutlierFilter,
    smoother: AdaptiveSmoother,
    dispatcher: InteractionDispatcher,
    timing: DetectorTiming,
    gesture_config: GestureConfig,
    gesture: GestureLabel,
    hand_present: bool,
    last_render_ms: Option<f64>,
}

impl PointerPipeline {
    fn new(config: &PointerConfig, viewport: &Viewport) -> Self {
        Self {
            outlier: OutlierFilter::new(config.outlier.clone()),
            smoother: AdaptiveSmoother::new(config.smoother.clone(), viewport.center()),
            dispatcher: InteractionDispatcher::new(config.dispatch.clone()),
            timing: DetectorTiming::new(config.timing_window, config.detector_budget_ms),
            gesture_config: config.gesture.clone(),
            gesture: GestureLabel::None,
            hand_present: false,
            last_render_ms: None,
        }
    }
}

// ── Controller ─────────────────────────────────────────────

/// Owns one pointer session and its collaborators.
pub struct SessionController {
    config: PointerConfig,
    state: SessionState,
    viewport: Viewport,
    camera: Box<dyn CameraSource>,
    detector: Box<dyn HandDetector>,
    gate: Box<dyn ActivationGate>,
    pipeline: Option<PointerPipeline>,
    last_failure: Option<SessionError>,
    activations: u64,
}

impl SessionController {
    pub fn new(
        config: PointerConfig,
        viewport: Viewport,
        camera: Box<dyn CameraSource>,
        detector: Box<dyn HandDetector>,
        gate: Box<dyn ActivationGate>,
    ) -> Self {
        Self {
            config,
            state: SessionState::Disabled,
            viewport,
            camera,
            detector,
            gate,
            pipeline: None,
            last_failure: None,
            activations: 0,
        }
    }

    /// Request activation.
    pub fn enable(&mut self, now_ms: f64) -> Result<Activation, SessionError> {
        if self.state != SessionState::Disabled {
            return Ok(Activation::AlreadyRunning);
        }

        if !self.gate.is_allowed() {
            info!("Pointer session: activation denied by usage gate");
            return Ok(Activation::Denied);
        }

        self.state = SessionState::Initializing;
        self.last_failure = None;
        info!("Pointer session: initializing at {:.0}ms", now_ms);

        if let Err(e) = self.camera.start() {
            return Err(self.fail(e));
        }
        if let Err(e) = self.detector.load() {
            return Err(self.fail(e));
        }

        self.pipeline = Some(PointerPipeline::new(&self.config, &self.viewport));
        Ok(Activation::Started)
    }

    /// Return to DISABLED after an initialization failure.
    fn fail(&mut self, error: SessionError) -> SessionError {
        warn!("Pointer session: activation failed: {}", error);
        self.detector.close();
        self.camera.stop();
        self.pipeline = None;
        self.state = SessionState::Disabled;
        self.last_failure = Some(error.clone());
        error
    }

    /// Turn the session off.  Safe to call in any state.
    pub fn disable(&mut self, ui: &mut dyn UiSurface) {
        if self.state == SessionState::Disabled {
            return;
        }

        // Stop both loops first so nothing runs against released resources.
        self.state = SessionState::Disabled;
        if let Some(mut pipeline) = self.pipeline.take() {
            pipeline.dispatcher.reset(ui);
        }
        self.detector.close();
        self.camera.stop();
        info!("Pointer session: disabled");
    }

    /// Enable when off, disable otherwise.
    pub fn toggle(&mut self, now_ms: f64, ui: &mut dyn UiSurface) -> Result<Activation, SessionError> {
        if self.state == SessionState::Disabled {
            self.enable(now_ms)
        } else {
            self.disable(ui);
            Ok(Activation::Stopped)
        }
    }

    /// Detector loop: pull one camera frame through the detector.
    pub fn pump_camera(&mut self, now_ms: f64, ui: &mut dyn UiSurface) -> Vec<PointerEvent> {
        if self.state == SessionState::Disabled {
            return Vec::new();
        }

        let frame = match self.camera.poll_frame() {
            Some(f) => f,
            None => return Vec::new(),
        };

        if self.state == SessionState::Initializing {
            self.state = SessionState::Active;
            self.activations += 1;
            self.gate.record_activation();
            info!(
                "Pointer session: active (first frame {}x{})",
                frame.width, frame.height
            );
        }

        let landmarks = self.detector.detect(&frame);
        self.on_detector_result(landmarks.as_deref(), now_ms, ui)
    }

    /// Detector loop: consume one detector result.
    ///
    /// A no-op unless the session is ACTIVE, so callbacks landing after
    /// `disable` change nothing.
    pub fn on_detector_result(
        &mut self,
        landmarks: Option<&[Landmark]>,
        now_ms: f64,
        ui: &mut dyn UiSurface,
    ) -> Vec<PointerEvent> {
        if self.state != SessionState::Active {
            trace!("Detector result ignored in state {}", self.state.as_str());
            return Vec::new();
        }
        let pipeline = match self.pipeline.as_mut() {
            Some(p) => p,
            None => return Vec::new(),
        };

        let frame = ingest(landmarks);
        pipeline.timing.record_callback(now_ms, frame.is_some());
        pipeline.hand_present = frame.is_some();

        if let Some(ref f) = frame {
            let raw = f.raw_point(&self.viewport);
            if let FilterVerdict::Accepted(p) = pipeline.outlier.filter(raw) {
                pipeline.smoother.set_target(p);
            }
        }
        pipeline.gesture = classify_frame(frame.as_ref(), &pipeline.gesture_config);

        let events = pipeline.dispatcher.update(
            pipeline.smoother.current(),
            pipeline.gesture,
            now_ms,
            ui,
        );
        for evt in &events {
            debug!("Pointer event: {}", evt.as_str());
        }
        events
    }

    /// Render loop: advance the cursor one display frame.
    ///
    /// Returns false once the session is disabled; the caller must stop
    /// scheduling render ticks.
    pub fn on_render_frame(&mut self, now_ms: f64, ui: &mut dyn UiSurface) -> bool {
        if self.state == SessionState::Disabled {
            return false;
        }
        let pipeline = match self.pipeline.as_mut() {
            Some(p) => p,
            None => return false,
        };

        let dt_s = pipeline
            .last_render_ms
            .map(|last| (now_ms - last) / 1000.0)
            .unwrap_or(0.0);
        pipeline.last_render_ms = Some(now_ms);

        pipeline.smoother.advance(dt_s);
        pipeline.dispatcher.expire_feedback(now_ms, ui);
        true
    }

    // ── Diagnostics ───────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the render loop should still be scheduled.
    pub fn render_scheduled(&self) -> bool {
        self.state != SessionState::Disabled
    }

    /// Configuration the next activation will use.
    pub fn config(&self) -> &PointerConfig {
        &self.config
    }

    /// Replace the configuration.  A running session keeps the settings it
    /// was enabled with; the change applies from the next `enable`.
    pub fn set_config(&mut self, config: PointerConfig) {
        self.config = config;
    }

    /// Takes effect on the next detector frame.  The outlier filter keeps
    /// its history, so a large jump from the old projection is screened.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn hand_present(&self) -> bool {
        self.pipeline.as_ref().map(|p| p.hand_present).unwrap_or(false)
    }

    pub fn detector_fps(&self) -> f64 {
        self.pipeline.as_ref().map(|p| p.timing.fps()).unwrap_or(0.0)
    }

    pub fn gesture(&self) -> GestureLabel {
        self.pipeline
            .as_ref()
            .map(|p| p.gesture)
            .unwrap_or(GestureLabel::None)
    }

    /// Rendered cursor position, for drawing the cursor visual.
    pub fn cursor(&self) -> Option<ScreenPoint> {
        self.pipeline.as_ref().map(|p| p.smoother.current())
    }

    pub fn cursor_state(&self) -> Option<CursorState> {
        self.pipeline.as_ref().map(|p| p.smoother.cursor())
    }

    pub fn scroll_session(&self) -> Option<ScrollSession> {
        self.pipeline
            .as_ref()
            .and_then(|p| p.dispatcher.scroll_session())
    }

    pub fn last_failure(&self) -> Option<&SessionError> {
        self.last_failure.as_ref()
    }

    /// Successful activations since construction.
    pub fn activations(&self) -> u64 {
        self.activations
    }

    /// Generate s-expression for session status.
    pub fn status_sexp(&self) -> String {
        let cursor = self
            .cursor()
            .map(|c| format!("(:x {:.1} :y {:.1})", c.x, c.y))
            .unwrap_or_else(|| "nil".to_string());
        let failure = self
            .last_failure
            .as_ref()
            .map(|e| format!("\"{}\"", e.to_string().replace('"', "\\\"")))
            .unwrap_or_else(|| "nil".to_string());
        let timing = self
            .pipeline
            .as_ref()
            .map(|p| p.timing.stats_sexp())
            .unwrap_or_else(|| "nil".to_string());
        format!(
            "(:state :{} :hand-present {} :gesture :{} :detector-fps {:.1} :cursor {} :scrolling {} :activations {} :last-failure {} :timing {})",
            self.state.as_str(),
            if self.hand_present() { "t" } else { "nil" },
            self.gesture().as_str(),
            self.detector_fps(),
            cursor,
            if self.scroll_session().is_some() { "t" } else { "nil" },
            self.activations,
            failure,
            timing,
        )
    }
}

// ── Test helpers ───────────────────────────────────────────


// ── Tests ──────────────────────────────────────────────────
