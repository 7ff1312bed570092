//! Hand-gesture pointer engine.
//!
//! Provides:
//! - `landmarks`: 21-point hand frames, ingest validation, screen projection
//! - `outlier`: single-frame jump rejection
//! - `gesture`: per-frame pose classification (open/point/fist/click)
//! - `smoother`: distance-adaptive, frame-rate-independent cursor easing
//! - `dispatch`: de-bounced click-through and fist-drag scrolling
//! - `frame_timing`: detector cadence statistics
//! - `session`: lifecycle, collaborators, and the detector/render loop entry points

pub mod dispatch;
pub mod frame_timing;
pub mod gesture;
pub mod landmarks;
pub mod outlier;
pub mod session;
pub mod smoother;

pub use dispatch::{ElementId, InteractionDispatcher, PointerEvent, UiSurface};
pub use gesture::GestureLabel;
pub use landmarks::{HandLandmark, Landmark, LandmarkFrame, ScreenPoint, Viewport};
pub use session::{
    Activation, ActivationGate, CameraFrame, CameraSource, HandDetector, SessionController,
    SessionError, SessionState,
};
