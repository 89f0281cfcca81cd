//! Edge emulation on top of a level-only interrupt controller.
//!
//! The controller can watch one level at a time. Each firing therefore
//! classifies the level it sees, picks the event to report and re-arms the
//! controller for the opposite level, so the next physical transition fires
//! again:
//!
//! ```text
//!            line low: report EdgeFall / LevelLow
//! ┌──────────────┐ ──────────────────────────────────> ┌──────────────┐
//! │ armed OnLow  │                                      │ armed OnHigh │
//! └──────────────┘ <────────────────────────────────── └──────────────┘
//!            line high: report EdgeRise / LevelHigh
//! ```
//!
//! A debounce filter sits on top of the oscillator. It only ever suppresses
//! the report, never the re-arm, so the oscillator keeps tracking the line.

use crate::event::{EventKind, EventMask, Level, TriggerCondition};

/// Record of the last event a watch accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebounceHistory {
    /// Timestamp of the last accepted event, in wrapping milliseconds.
    pub last_ms: u32,
    /// Kind of the last accepted event, `None` before the first one.
    pub last_kind: Option<EventKind>,
}

impl DebounceHistory {
    /// History of a freshly registered watch.
    pub const fn new() -> Self {
        Self {
            last_ms: 0,
            last_kind: None,
        }
    }

    /// Whether an event of `kind` at `now_ms` is a bounce of the last accepted one.
    ///
    /// Only a repeat of the same kind inside the window is a bounce. The window
    /// is measured from the last accepted event, and the elapsed time is taken
    /// modulo 2^32 so a clock wrap between the two events is harmless.
    #[inline]
    pub fn is_bounce(&self, kind: EventKind, now_ms: u32, debounce_ms: u32) -> bool {
        debounce_ms > 0
            && self.last_kind == Some(kind)
            && now_ms.wrapping_sub(self.last_ms) < debounce_ms
    }

    /// Records `kind` as accepted at `now_ms`.
    #[inline]
    pub fn accept(&mut self, kind: EventKind, now_ms: u32) {
        self.last_ms = now_ms;
        self.last_kind = Some(kind);
    }
}

/// What a single firing decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiringOutcome {
    /// Report this event.
    Emit(EventKind),
    /// The derived event was a bounce and is not reported.
    Debounced(EventKind),
    /// No selected event matches the current level.
    Ignored,
}

/// Result of one pass through the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiringStep {
    /// The condition to arm next. Always the opposite of the observed level.
    pub next: TriggerCondition,
    /// The reporting decision.
    pub outcome: FiringOutcome,
}

impl FiringStep {
    /// The event to enqueue, if any.
    #[inline]
    pub fn emitted(&self) -> Option<EventKind> {
        match self.outcome {
            FiringOutcome::Emit(kind) => Some(kind),
            _ => None,
        }
    }
}

/// Runs one firing of the state machine.
///
/// `history` is updated only when the outcome is [`FiringOutcome::Emit`].
pub fn step(
    level: Level,
    events: EventMask,
    history: &mut DebounceHistory,
    now_ms: u32,
    debounce_ms: u32,
) -> FiringStep {
    let next = TriggerCondition::opposite_of(level);

    let Some(kind) = events.preferred_for(level) else {
        return FiringStep {
            next,
            outcome: FiringOutcome::Ignored,
        };
    };

    if history.is_bounce(kind, now_ms, debounce_ms) {
        return FiringStep {
            next,
            outcome: FiringOutcome::Debounced(kind),
        };
    }

    history.accept(kind, now_ms);
    FiringStep {
        next,
        outcome: FiringOutcome::Emit(kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_level_reports_fall_and_arms_high() {
        let mut history = DebounceHistory::new();
        let step = step(Level::Low, EventMask::ALL, &mut history, 5, 0);
        assert_eq!(step.outcome, FiringOutcome::Emit(EventKind::EdgeFall));
        assert_eq!(step.next, TriggerCondition::OnHigh);
        assert_eq!(history.last_kind, Some(EventKind::EdgeFall));
        assert_eq!(history.last_ms, 5);
    }

    #[test]
    fn test_rise_preferred_over_high_level() {
        let mut history = DebounceHistory::new();
        let mask = EventKind::EdgeRise | EventKind::LevelHigh;

        let low = step(Level::Low, mask, &mut history, 0, 0);
        assert_eq!(low.outcome, FiringOutcome::Ignored);
        assert_eq!(low.next, TriggerCondition::OnHigh);

        let high = step(Level::High, mask, &mut history, 1, 0);
        assert_eq!(high.emitted(), Some(EventKind::EdgeRise));
        assert_eq!(high.next, TriggerCondition::OnLow);
    }

    #[test]
    fn test_unwanted_level_keeps_history() {
        let mut history = DebounceHistory::new();
        history.accept(EventKind::EdgeRise, 100);
        let step = step(Level::Low, EventMask::only(EventKind::EdgeRise), &mut history, 200, 50);
        assert_eq!(step.outcome, FiringOutcome::Ignored);
        assert_eq!(history.last_ms, 100);
    }

    #[test]
    fn test_debounce_measured_from_accepted_event() {
        let mut history = DebounceHistory::new();
        let mask = EventMask::only(EventKind::LevelHigh);

        assert_eq!(step(Level::High, mask, &mut history, 1000, 50).emitted(), Some(EventKind::LevelHigh));

        let bounce = step(Level::High, mask, &mut history, 1010, 50);
        assert_eq!(bounce.outcome, FiringOutcome::Debounced(EventKind::LevelHigh));
        assert_eq!(bounce.next, TriggerCondition::OnLow);

        // A later bounce does not move the window.
        let bounce = step(Level::High, mask, &mut history, 1049, 50);
        assert_eq!(bounce.outcome, FiringOutcome::Debounced(EventKind::LevelHigh));
        assert_eq!(history.last_ms, 1000);

        let accepted = step(Level::High, mask, &mut history, 1060, 50);
        assert_eq!(accepted.emitted(), Some(EventKind::LevelHigh));
        assert_eq!(history.last_ms, 1060);
    }

    #[test]
    fn test_debounce_ignores_other_kinds() {
        let mut history = DebounceHistory::new();
        assert!(step(Level::High, EventMask::ALL, &mut history, 0, 50).emitted().is_some());
        // A fall 5ms after a rise is a different kind and always goes through.
        let fall = step(Level::Low, EventMask::ALL, &mut history, 5, 50);
        assert_eq!(fall.emitted(), Some(EventKind::EdgeFall));
        let rise = step(Level::High, EventMask::ALL, &mut history, 8, 50);
        assert_eq!(rise.emitted(), Some(EventKind::EdgeRise));
    }

    #[test]
    fn test_debounce_across_clock_wrap() {
        let mut history = DebounceHistory::new();
        let mask = EventMask::only(EventKind::EdgeFall);
        assert!(step(Level::Low, mask, &mut history, u32::MAX - 9, 50).emitted().is_some());
        // 20ms later, after the wrap.
        let bounce = step(Level::Low, mask, &mut history, 10, 50);
        assert_eq!(bounce.outcome, FiringOutcome::Debounced(EventKind::EdgeFall));
        // 60ms later.
        assert!(step(Level::Low, mask, &mut history, 50, 50).emitted().is_some());
    }

    #[test]
    fn test_zero_window_never_debounces() {
        let mut history = DebounceHistory::new();
        let mask = EventMask::only(EventKind::LevelLow);
        for _ in 0..3 {
            assert!(step(Level::Low, mask, &mut history, 7, 0).emitted().is_some());
        }
    }

    #[test]
    fn test_first_event_never_a_bounce() {
        let history = DebounceHistory::new();
        assert!(!history.is_bounce(EventKind::LevelLow, 0, 1000));
    }
}
