//! gesture-pointer - drive an on-screen pointer with bare-hand gestures.
//!
//! Turns a stream of camera hand-landmark estimates into a smoothed cursor,
//! per-frame gestures, and de-bounced click / scroll actions.

pub mod config;
pub mod headless;
pub mod pointer;

pub use config::PointerConfig;
