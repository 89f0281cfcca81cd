use crate::event::{EventMask, PinId};

/// The configuration of a single watch.
///
/// Electrical setup of the line (direction, pulls, drive level) is not part of
/// this configuration; the caller does it before registering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    /// The line to watch.
    pub pin: PinId,
    /// Events to report.
    pub events: EventMask,
    /// Minimum spacing between two accepted events of the same kind, 0 disables.
    pub debounce_ms: u32,
}

/// The implemention for WatchConfig
impl WatchConfig {
    /// A watch on `pin` reporting `events` without debouncing.
    pub const fn new(pin: PinId, events: EventMask) -> Self {
        Self {
            pin,
            events,
            debounce_ms: 0,
        }
    }

    /// Builds a configuration from the raw values a binding layer passes in.
    ///
    /// Mask bits outside the four defined kinds are discarded.
    pub const fn from_raw(pin: PinId, event_bits: u32, debounce_ms: u32) -> Self {
        Self {
            pin,
            events: EventMask::from_bits_truncate(event_bits),
            debounce_ms,
        }
    }

    /// Sets the debounce window in milliseconds.
    pub const fn with_debounce_ms(mut self, debounce_ms: u32) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    /// Whether same-kind events closer than the window are suppressed.
    #[inline]
    pub const fn is_debounced(&self) -> bool {
        self.debounce_ms > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    #[test]
    fn test_config_builder() {
        let config = WatchConfig::new(4, EventMask::EDGES).with_debounce_ms(50);
        assert_eq!(config.pin, 4);
        assert!(config.events.contains(EventKind::EdgeRise));
        assert!(config.is_debounced());
        assert!(!WatchConfig::new(4, EventMask::EDGES).is_debounced());
    }

    #[test]
    fn test_config_from_raw_masks_bits() {
        let config = WatchConfig::from_raw(2, 0x3C, 10);
        assert_eq!(config.events.bits(), 0xC);
        assert_eq!(config.debounce_ms, 10);
    }
}
