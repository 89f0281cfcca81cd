//! Watch slot with lifecycle tracking, a critical-section guarded record and statistics.

use core::cell::Cell;
use core::sync::atomic::{AtomicU32, Ordering};

use critical_section::{CriticalSection, Mutex};

use crate::config::WatchConfig;
use crate::edge::DebounceHistory;
use crate::event::{EventMask, PinId};
use crate::lifecycle::SlotLifecycle;

/// Externally visible handle of a watch: slot index + 1.
///
/// Zero is never a valid id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatchId(pub u32);

impl WatchId {
    /// The id of the watch living in slot `index`.
    #[inline]
    pub const fn from_slot(index: usize) -> Self {
        Self(index as u32 + 1)
    }

    /// The slot index this id maps to, or `None` for id 0.
    #[inline]
    pub const fn slot_index(self) -> Option<usize> {
        match self.0.checked_sub(1) {
            Some(index) => Some(index as usize),
            None => None,
        }
    }

    /// Raw id value.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Context handed to the platform when a firing routine is installed.
///
/// The platform passes it back unchanged to
/// [`WatchManager::handle_firing`](crate::WatchManager::handle_firing).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiringToken {
    slot: usize,
    generation: u32,
}

impl FiringToken {
    pub(crate) const fn new(slot: usize, generation: u32) -> Self {
        Self { slot, generation }
    }

    /// The slot index the routine is bound to.
    #[inline]
    pub const fn slot(&self) -> usize {
        self.slot
    }

    /// The registration generation the routine was installed for.
    #[inline]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// The watch id the routine reports events under.
    #[inline]
    pub const fn watch_id(&self) -> WatchId {
        WatchId::from_slot(self.slot)
    }
}

/// Statistics for the firings of one watch.
///
/// Counters are plain relaxed atomics so the firing routine can bump them
/// without a lock.
#[derive(Debug, Default)]
pub struct WatchStats {
    /// Total number of firings that passed the guard.
    pub firings: AtomicU32,
    /// Events pushed to the queue.
    pub accepted: AtomicU32,
    /// Events suppressed by the debounce window.
    pub debounced: AtomicU32,
    /// Firings on a level the watch does not report.
    pub ignored: AtomicU32,
    /// Accepted events lost because the queue was full.
    pub dropped: AtomicU32,
}

impl WatchStats {
    /// Creates a new statistics tracker.
    pub const fn new() -> Self {
        Self {
            firings: AtomicU32::new(0),
            accepted: AtomicU32::new(0),
            debounced: AtomicU32::new(0),
            ignored: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    #[inline]
    pub(crate) fn record_firing(&self) {
        self.firings.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_debounced(&self) {
        self.debounced.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_ignored(&self) {
        self.ignored.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Zeroes every counter.
    pub fn reset(&self) {
        self.firings.store(0, Ordering::Relaxed);
        self.accepted.store(0, Ordering::Relaxed);
        self.debounced.store(0, Ordering::Relaxed);
        self.ignored.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of the counters.
    pub fn snapshot(&self) -> WatchStatsSnapshot {
        WatchStatsSnapshot {
            firings: self.firings.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            debounced: self.debounced.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Copy of a watch's [`WatchStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WatchStatsSnapshot {
    pub firings: u32,
    pub accepted: u32,
    pub debounced: u32,
    pub ignored: u32,
    pub dropped: u32,
}

/// The mutable per-watch record.
///
/// A value type: readers take a copy inside a critical section and writers
/// replace it whole, so nobody observes a partially written record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WatchRecord {
    pub pin: PinId,
    pub events: EventMask,
    pub debounce_ms: u32,
    pub history: DebounceHistory,
}

impl WatchRecord {
    /// The record of an unused slot.
    pub const EMPTY: Self = Self {
        pin: 0,
        events: EventMask::NONE,
        debounce_ms: 0,
        history: DebounceHistory::new(),
    };

    /// A fresh record for `config`, with empty debounce history.
    pub const fn from_config(config: &WatchConfig) -> Self {
        Self {
            pin: config.pin,
            events: config.events,
            debounce_ms: config.debounce_ms,
            history: DebounceHistory::new(),
        }
    }

    /// The configuration this record was built from.
    pub const fn config(&self) -> WatchConfig {
        WatchConfig {
            pin: self.pin,
            events: self.events,
            debounce_ms: self.debounce_ms,
        }
    }
}

/// One entry of the slot table.
pub struct WatchSlot {
    lifecycle: SlotLifecycle,
    record: Mutex<Cell<WatchRecord>>,
    stats: WatchStats,
}

impl WatchSlot {
    /// Creates an unused slot.
    pub const fn new() -> Self {
        Self {
            lifecycle: SlotLifecycle::new(),
            record: Mutex::new(Cell::new(WatchRecord::EMPTY)),
            stats: WatchStats::new(),
        }
    }

    /// Gets a reference to the lifecycle tracker.
    #[inline]
    pub fn lifecycle(&self) -> &SlotLifecycle {
        &self.lifecycle
    }

    /// Gets a reference to the statistics.
    #[inline]
    pub fn stats(&self) -> &WatchStats {
        &self.stats
    }

    /// Copies the record out.
    pub fn record(&self) -> WatchRecord {
        critical_section::with(|cs| self.record.borrow(cs).get())
    }

    /// Copies the record out within an already entered critical section.
    #[inline]
    pub fn record_in(&self, cs: CriticalSection<'_>) -> WatchRecord {
        self.record.borrow(cs).get()
    }

    /// Replaces the record within an already entered critical section.
    #[inline]
    pub fn store_in(&self, cs: CriticalSection<'_>, record: WatchRecord) {
        self.record.borrow(cs).set(record);
    }

    /// Fills the slot for a new registration and zeroes its statistics.
    pub fn populate(&self, config: &WatchConfig) {
        let record = WatchRecord::from_config(config);
        critical_section::with(|cs| self.store_in(cs, record));
        self.stats.reset();
    }

    /// Zeroes the slot record.
    pub fn clear(&self) {
        critical_section::with(|cs| self.store_in(cs, WatchRecord::EMPTY));
    }

    /// Checks if the slot is in Armed state.
    #[inline]
    pub fn is_armed(&self) -> bool {
        self.lifecycle.armed_generation().is_some()
    }
}

impl Default for WatchSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for WatchSlot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let stats = self.stats.snapshot();
        f.debug_struct("WatchSlot")
            .field("lifecycle", &self.lifecycle)
            .field("record", &self.record())
            .field(
                "stats",
                &format_args!(
                    "firings={}, accepted={}, debounced={}, dropped={}",
                    stats.firings, stats.accepted, stats.debounced, stats.dropped
                ),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    #[test]
    fn test_watch_id_maps_to_slot() {
        assert_eq!(WatchId::from_slot(0), WatchId(1));
        assert_eq!(WatchId(1).slot_index(), Some(0));
        assert_eq!(WatchId(16).slot_index(), Some(15));
        assert_eq!(WatchId(0).slot_index(), None);
    }

    #[test]
    fn test_token_reports_watch_id() {
        let token = FiringToken::new(3, 7);
        assert_eq!(token.watch_id(), WatchId(4));
        assert_eq!(token.generation(), 7);
    }

    #[test]
    fn test_slot_populate_and_clear() {
        let slot = WatchSlot::new();
        let config = WatchConfig::new(12, EventMask::only(EventKind::EdgeFall)).with_debounce_ms(20);

        slot.stats().record_firing();
        slot.populate(&config);
        assert_eq!(slot.record().config(), config);
        assert_eq!(slot.record().history, DebounceHistory::new());
        assert_eq!(slot.stats().snapshot(), WatchStatsSnapshot::default());

        slot.clear();
        assert_eq!(slot.record(), WatchRecord::EMPTY);
    }

    #[test]
    fn test_stats_counters() {
        let stats = WatchStats::new();
        stats.record_firing();
        stats.record_firing();
        stats.record_accepted();
        stats.record_debounced();
        stats.record_dropped();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.firings, 2);
        assert_eq!(snapshot.accepted, 1);
        assert_eq!(snapshot.debounced, 1);
        assert_eq!(snapshot.dropped, 1);
        assert_eq!(snapshot.ignored, 0);

        stats.reset();
        assert_eq!(stats.snapshot(), WatchStatsSnapshot::default());
    }
}
