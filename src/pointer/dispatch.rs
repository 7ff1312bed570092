//! Gesture-driven UI interactions: de-bounced click-through and
//! fist-drag inertial scrolling.
//!
//! Runs on the detector loop with the smoothed cursor position.  All UI
//! side effects are best-effort: a missing element or a page that cannot
//! scroll is silently ignored, never retried.

use tracing::{debug, trace};

use super::gesture::GestureLabel;
use super::landmarks::ScreenPoint;

// ── UI boundary ────────────────────────────────────────────

/// Opaque identifier of a UI element.
pub type ElementId = u64;

/// Platform UI primitives the dispatcher drives.  All fire-and-forget.
pub trait UiSurface {
    /// Elements under a screen point, topmost first.
    fn elements_at(&self, point: ScreenPoint) -> Vec<ElementId>;
    /// Invoke the element's default activation.
    fn activate(&mut self, element: ElementId);
    /// Show or clear the transient click-feedback marker.
    fn set_feedback(&mut self, element: ElementId, active: bool);
    /// Request a smooth vertical scroll of the page.
    fn scroll_by(&mut self, dy: f64);
}

// ── Events ─────────────────────────────────────────────────

/// Side effects performed during one dispatcher update.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    /// An element was activated.
    Clicked {
        element: ElementId,
        x: f64,
        y: f64,
    },
    /// A click gesture arrived during the cooldown.
    ClickSuppressed { remaining_ms: f64 },
    /// A fist scroll session began.
    ScrollStarted { anchor_y: f64 },
    /// A scroll request was issued.
    Scrolled { delta: f64, amount: f64, anchor_y: f64 },
    /// The fist scroll session ended.
    ScrollEnded,
}

impl PointerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clicked { .. } => "clicked",
            Self::ClickSuppressed { .. } => "click-suppressed",
            Self::ScrollStarted { .. } => "scroll-started",
            Self::Scrolled { .. } => "scrolled",
            Self::ScrollEnded => "scroll-ended",
        }
    }
}

// ── Config ─────────────────────────────────────────────────

/// Click and scroll tuning.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Minimum time between two clicks (ms).
    pub click_cooldown_ms: f64,
    /// How long the click-feedback marker stays on (ms).
    pub feedback_ms: f64,
    /// Vertical displacement (px) below which no scroll is issued.
    pub scroll_noise_px: f64,
    /// Scroll pixels per pixel of hand displacement.
    pub scroll_gain: f64,
    /// Fraction of the displacement the anchor follows each scroll.
    pub anchor_decay: f64,
    /// This feature's own toggle; never a click target.
    pub control_element: Option<ElementId>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            click_cooldown_ms: 350.0,
            feedback_ms: 300.0,
            scroll_noise_px: 2.0,
            scroll_gain: 2.5,
            anchor_decay: 0.5,
            control_element: None,
        }
    }
}

impl DispatchConfig {
    pub fn config_sexp(&self) -> String {
        format!(
            "(:click-cooldown-ms {:.0} :feedback-ms {:.0} :scroll-noise-px {:.1} :scroll-gain {:.2} :anchor-decay {:.2} :control-element {})",
            self.click_cooldown_ms,
            self.feedback_ms,
            self.scroll_noise_px,
            self.scroll_gain,
            self.anchor_decay,
            self.control_element
                .map(|id| id.to_string())
                .unwrap_or_else(|| "nil".to_string()),
        )
    }
}

// ── Per-session state ──────────────────────────────────────

/// Active fist-scroll session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollSession {
    /// Reference y the next displacement is measured from.
    pub anchor_y: f64,
}

/// Click cooldown tracking.
#[derive(Debug, Clone, Default)]
pub struct ClickDebounce {
    last_fired_at: Option<f64>,
}

impl ClickDebounce {
    /// Milliseconds until the next click may fire (0 when ready).
    pub fn remaining_ms(&self, now_ms: f64, cooldown_ms: f64) -> f64 {
        match self.last_fired_at {
            Some(last) if now_ms - last <= cooldown_ms => cooldown_ms - (now_ms - last),
            _ => 0.0,
        }
    }

    pub fn ready(&self, now_ms: f64, cooldown_ms: f64) -> bool {
        match self.last_fired_at {
            Some(last) => now_ms - last > cooldown_ms,
            None => true,
        }
    }

    pub fn record(&mut self, now_ms: f64) {
        self.last_fired_at = Some(now_ms);
    }

    pub fn last_fired_at(&self) -> Option<f64> {
        self.last_fired_at
    }
}

/// A feedback marker waiting to be cleared.
#[derive(Debug, Clone, Copy)]
struct PendingFeedback {
    element: ElementId,
    expires_at_ms: f64,
}

// ── Dispatcher ─────────────────────────────────────────────

/// Turns (cursor, gesture) pairs into clicks and scrolls.
#[derive(Debug, Default)]
pub struct InteractionDispatcher {
    pub config: DispatchConfig,
    debounce: ClickDebounce,
    scroll: Option<ScrollSession>,
    feedback: Vec<PendingFeedback>,
}

impl InteractionDispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            debounce: ClickDebounce::default(),
            scroll: None,
            feedback: Vec::new(),
        }
    }

    /// Process one detector frame.
    pub fn update(
        &mut self,
        cursor: ScreenPoint,
        gesture: GestureLabel,
        now_ms: f64,
        ui: &mut dyn UiSurface,
    ) -> Vec<PointerEvent> {
        let mut events = Vec::new();

        if gesture != GestureLabel::Fist && self.scroll.take().is_some() {
            debug!("Scroll session ended (gesture {})", gesture.as_str());
            events.push(PointerEvent::ScrollEnded);
        }

        match gesture {
            GestureLabel::Click => {
                if let Some(evt) = self.dispatch_click(cursor, now_ms, ui) {
                    events.push(evt);
                }
            }
            GestureLabel::Fist => {
                if let Some(evt) = self.dispatch_scroll(cursor, ui) {
                    events.push(evt);
                }
            }
            _ => {}
        }

        events
    }

    fn dispatch_click(
        &mut self,
        cursor: ScreenPoint,
        now_ms: f64,
        ui: &mut dyn UiSurface,
    ) -> Option<PointerEvent> {
        let cooldown = self.config.click_cooldown_ms;
        if !self.debounce.ready(now_ms, cooldown) {
            let remaining_ms = self.debounce.remaining_ms(now_ms, cooldown);
            trace!("Click suppressed: {:.0}ms cooldown left", remaining_ms);
            return Some(PointerEvent::ClickSuppressed { remaining_ms });
        }

        let control = self.config.control_element;
        let element = ui
            .elements_at(cursor)
            .into_iter()
            .find(|id| Some(*id) != control)?;

        ui.activate(element);
        ui.set_feedback(element, true);
        let expires_at_ms = now_ms + self.config.feedback_ms;
        match self.feedback.iter_mut().find(|f| f.element == element) {
            Some(pending) => pending.expires_at_ms = expires_at_ms,
            None => self.feedback.push(PendingFeedback {
                element,
                expires_at_ms,
            }),
        }
        self.debounce.record(now_ms);

        debug!(
            "Click: element {} at ({:.0}, {:.0})",
            element, cursor.x, cursor.y
        );
        Some(PointerEvent::Clicked {
            element,
            x: cursor.x,
            y: cursor.y,
        })
    }

    fn dispatch_scroll(&mut self, cursor: ScreenPoint, ui: &mut dyn UiSurface) -> Option<PointerEvent> {
        if self.scroll.is_none() {
            self.scroll = Some(ScrollSession { anchor_y: cursor.y });
            debug!("Scroll session started at y={:.0}", cursor.y);
            return Some(PointerEvent::ScrollStarted { anchor_y: cursor.y });
        }

        let DispatchConfig {
            scroll_noise_px,
            scroll_gain,
            anchor_decay,
            ..
        } = self.config;
        let session = self.scroll.as_mut()?;

        let delta = cursor.y - session.anchor_y;
        if delta.abs() <= scroll_noise_px {
            return None;
        }

        let amount = delta * scroll_gain;
        ui.scroll_by(amount);
        session.anchor_y += delta * anchor_decay;

        trace!(
            "Scroll: delta={:.1} amount={:.1} anchor={:.1}",
            delta, amount, session.anchor_y
        );
        Some(PointerEvent::Scrolled {
            delta,
            amount,
            anchor_y: session.anchor_y,
        })
    }

    /// Clear feedback markers whose time is up.  Called from the render loop.
    pub fn expire_feedback(&mut self, now_ms: f64, ui: &mut dyn UiSurface) {
        self.feedback.retain(|f| {
            if now_ms >= f.expires_at_ms {
                ui.set_feedback(f.element, false);
                false
            } else {
                true
            }
        });
    }

    pub fn scroll_session(&self) -> Option<ScrollSession> {
        self.scroll
    }

    pub fn debounce(&self) -> &ClickDebounce {
        &self.debounce
    }

    pub fn pending_feedback(&self) -> usize {
        self.feedback.len()
    }

    /// Drop all in-flight state, clearing any feedback still on screen.
    pub fn reset(&mut self, ui: &mut dyn UiSurface) {
        for f in self.feedback.drain(..) {
            ui.set_feedback(f.element, false);
        }
        self.scroll = None;
        self.debounce = ClickDebounce::default();
    }
}

// ── Test helpers ───────────────────────────────────────────

/// Records every UI call.  Elements are horizontal bands of 100px.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingSurface {
    pub activated: Vec<ElementId>,
    pub feedback: Vec<(ElementId, bool)>,
    pub scrolls: Vec<f64>,
    /// Element stacked on top of everything (e.g. the feature's toggle).
    pub overlay: Option<ElementId>,
}

#[cfg(test)]
impl UiSurface for RecordingSurface {
    fn elements_at(&self, point: ScreenPoint) -> Vec<ElementId> {
        if point.x < 0.0 || point.y < 0.0 {
            return Vec::new();
        }
        let mut ids: Vec<ElementId> = self.overlay.into_iter().collect();
        ids.push((point.y / 100.0) as ElementId + 1);
        ids
    }

    fn activate(&mut self, element: ElementId) {
        self.activated.push(element);
    }

    fn set_feedback(&mut self, element: ElementId, active: bool) {
        self.feedback.push((element, active));
    }

    fn scroll_by(&mut self, dy: f64) {
        self.scrolls.push(dy);
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f64, y: f64) -> ScreenPoint {
        ScreenPoint::new(x, y)
    }

    #[test]
    fn test_click_debounce() {
        let mut d = InteractionDispatcher::default();
        let mut ui = RecordingSurface::default();

        d.update(at(50.0, 150.0), GestureLabel::Click, 0.0, &mut ui);
        assert_eq!(ui.activated, vec![2]);

        let events = d.update(at(50.0, 150.0), GestureLabel::Click, 200.0, &mut ui);
        assert!(matches!(events[..], [PointerEvent::ClickSuppressed { .. }]));
        assert_eq!(ui.activated.len(), 1);

        d.update(at(50.0, 150.0), GestureLabel::Click, 400.0, &mut ui);
        assert_eq!(ui.activated, vec![2, 2]);
    }

    #[test]
    fn test_click_at_cooldown_boundary_suppressed() {
        let mut d = InteractionDispatcher::default();
        let mut ui = RecordingSurface::default();
        d.update(at(10.0, 10.0), GestureLabel::Click, 0.0, &mut ui);
        d.update(at(10.0, 10.0), GestureLabel::Click, 350.0, &mut ui);
        assert_eq!(ui.activated.len(), 1);
    }

    #[test]
    fn test_click_skips_control_element() {
        let mut d = InteractionDispatcher::new(DispatchConfig {
            control_element: Some(99),
            ..Default::default()
        });
        let mut ui = RecordingSurface {
            overlay: Some(99),
            ..Default::default()
        };
        let events = d.update(at(10.0, 320.0), GestureLabel::Click, 0.0, &mut ui);
        assert_eq!(ui.activated, vec![4]);
        assert!(matches!(events[..], [PointerEvent::Clicked { element: 4, .. }]));
    }

    #[test]
    fn test_click_no_element_is_noop() {
        let mut d = InteractionDispatcher::default();
        let mut ui = RecordingSurface::default();
        let events = d.update(at(-20.0, -20.0), GestureLabel::Click, 0.0, &mut ui);
        assert!(events.is_empty());
        assert!(ui.activated.is_empty());
        assert!(d.debounce().last_fired_at().is_none());
    }

    #[test]
    fn test_feedback_expires() {
        let mut d = InteractionDispatcher::default();
        let mut ui = RecordingSurface::default();
        d.update(at(10.0, 10.0), GestureLabel::Click, 1000.0, &mut ui);
        assert_eq!(ui.feedback, vec![(1, true)]);

        d.expire_feedback(1299.0, &mut ui);
        assert_eq!(d.pending_feedback(), 1);

        d.expire_feedback(1300.0, &mut ui);
        assert_eq!(d.pending_feedback(), 0);
        assert_eq!(ui.feedback, vec![(1, true), (1, false)]);
    }

    #[test]
    fn test_scroll_anchor_decay() {
        let mut d = InteractionDispatcher::default();
        let mut ui = RecordingSurface::default();

        let events = d.update(at(0.0, 500.0), GestureLabel::Fist, 0.0, &mut ui);
        assert_eq!(events, vec![PointerEvent::ScrollStarted { anchor_y: 500.0 }]);
        assert!(ui.scrolls.is_empty());

        let events = d.update(at(0.0, 520.0), GestureLabel::Fist, 33.0, &mut ui);
        assert_eq!(
            events,
            vec![PointerEvent::Scrolled { delta: 20.0, amount: 50.0, anchor_y: 510.0 }]
        );
        assert_eq!(ui.scrolls, vec![50.0]);
        assert_eq!(d.scroll_session(), Some(ScrollSession { anchor_y: 510.0 }));
    }

    #[test]
    fn test_scroll_noise_floor() {
        let mut d = InteractionDispatcher::default();
        let mut ui = RecordingSurface::default();
        d.update(at(0.0, 500.0), GestureLabel::Fist, 0.0, &mut ui);
        let events = d.update(at(0.0, 502.0), GestureLabel::Fist, 33.0, &mut ui);
        assert!(events.is_empty());
        assert!(ui.scrolls.is_empty());
        assert_eq!(d.scroll_session(), Some(ScrollSession { anchor_y: 500.0 }));
    }

    #[test]
    fn test_scroll_teardown_and_fresh_anchor() {
        let mut d = InteractionDispatcher::default();
        let mut ui = RecordingSurface::default();
        d.update(at(0.0, 500.0), GestureLabel::Fist, 0.0, &mut ui);
        d.update(at(0.0, 600.0), GestureLabel::Fist, 33.0, &mut ui);

        let events = d.update(at(0.0, 600.0), GestureLabel::Open, 66.0, &mut ui);
        assert_eq!(events, vec![PointerEvent::ScrollEnded]);
        assert!(d.scroll_session().is_none());

        // Re-entering fist anchors at the current position, no scroll
        let events = d.update(at(0.0, 700.0), GestureLabel::Fist, 99.0, &mut ui);
        assert_eq!(events, vec![PointerEvent::ScrollStarted { anchor_y: 700.0 }]);
        assert_eq!(ui.scrolls.len(), 1);
    }

    #[test]
    fn test_no_hand_ends_scroll() {
        let mut d = InteractionDispatcher::default();
        let mut ui = RecordingSurface::default();
        d.update(at(0.0, 500.0), GestureLabel::Fist, 0.0, &mut ui);
        let events = d.update(at(0.0, 500.0), GestureLabel::None, 33.0, &mut ui);
        assert_eq!(events, vec![PointerEvent::ScrollEnded]);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut d = InteractionDispatcher::default();
        let mut ui = RecordingSurface::default();
        d.update(at(10.0, 10.0), GestureLabel::Click, 0.0, &mut ui);
        d.update(at(10.0, 10.0), GestureLabel::Fist, 10.0, &mut ui);

        d.reset(&mut ui);
        assert!(d.scroll_session().is_none());
        assert!(d.debounce().last_fired_at().is_none());
        assert_eq!(d.pending_feedback(), 0);
        assert_eq!(ui.feedback.last(), Some(&(1, false)));

        // Cooldown forgotten: clicking right away fires
        d.update(at(10.0, 10.0), GestureLabel::Click, 20.0, &mut ui);
        assert_eq!(ui.activated.len(), 2);
    }

    #[test]
    fn test_event_as_str() {
        assert_eq!(PointerEvent::ScrollEnded.as_str(), "scroll-ended");
        assert_eq!(PointerEvent::ClickSuppressed { remaining_ms: 1.0 }.as_str(), "click-suppressed");
    }

    #[test]
    fn test_config_sexp() {
        let sexp = DispatchConfig::default().config_sexp();
        assert!(sexp.contains(":click-cooldown-ms 350"));
        assert!(sexp.contains(":scroll-gain 2.50"));
        assert!(sexp.contains(":control-element nil"));
    }
}
