//! Emulated GPIO event kinds and the masks callers use to select them.
//!
//! The four kinds form a closed set. Their discriminants match the bit values
//! exposed to scripting bindings (`LEVEL_LOW=1, LEVEL_HIGH=2, EDGE_FALL=4,
//! EDGE_RISE=8`), so a raw mask from a binding layer converts losslessly.

use core::fmt;
use core::ops::BitOr;

use crate::slot::WatchId;

/// Identifier of a physical input line.
pub type PinId = u32;

/// Instantaneous level of an input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Line reads 0.
    Low,
    /// Line reads nonzero.
    High,
}

impl Level {
    /// Converts a raw level reading (0 = low, anything else = high).
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        if raw == 0 { Level::Low } else { Level::High }
    }
}

/// The single level the interrupt controller is armed to fire on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerCondition {
    /// Fire while the line is high.
    OnHigh,
    /// Fire while the line is low.
    OnLow,
    /// Do not fire.
    Disabled,
}

impl TriggerCondition {
    /// Trigger that waits for the line to leave `level`.
    #[inline]
    pub const fn opposite_of(level: Level) -> Self {
        match level {
            Level::Low => TriggerCondition::OnHigh,
            Level::High => TriggerCondition::OnLow,
        }
    }
}

/// One emulated event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    /// Line observed low.
    LevelLow = 1,
    /// Line observed high.
    LevelHigh = 2,
    /// Line went from high to low.
    EdgeFall = 4,
    /// Line went from low to high.
    EdgeRise = 8,
}

impl EventKind {
    /// All kinds, in bit order.
    pub const ALL: [EventKind; 4] = [
        EventKind::LevelLow,
        EventKind::LevelHigh,
        EventKind::EdgeFall,
        EventKind::EdgeRise,
    ];

    /// The bit this kind occupies in an [`EventMask`].
    #[inline]
    pub const fn bit(self) -> u8 {
        self as u8
    }

    /// Converts a single raw bit back into a kind.
    pub const fn from_bit(bit: u8) -> Option<Self> {
        match bit {
            1 => Some(EventKind::LevelLow),
            2 => Some(EventKind::LevelHigh),
            4 => Some(EventKind::EdgeFall),
            8 => Some(EventKind::EdgeRise),
            _ => None,
        }
    }

    /// Checks whether this kind is selected in `mask`.
    #[inline]
    pub const fn is_set_in(self, mask: EventMask) -> bool {
        mask.0 & self.bit() != 0
    }

    /// Whether this kind describes a transition rather than a steady level.
    #[inline]
    pub const fn is_edge(self) -> bool {
        matches!(self, EventKind::EdgeFall | EventKind::EdgeRise)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::LevelLow => "LEVEL_LOW",
            EventKind::LevelHigh => "LEVEL_HIGH",
            EventKind::EdgeFall => "EDGE_FALL",
            EventKind::EdgeRise => "EDGE_RISE",
        };
        f.write_str(name)
    }
}

/// Set of [`EventKind`]s a watch reports.
///
/// Only the four defined bits can ever be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventMask(u8);

impl EventMask {
    /// Bits that name a valid [`EventKind`].
    pub const VALID_BITS: u8 = 0xF;

    /// No events.
    pub const NONE: Self = Self(0);
    /// Both edges.
    pub const EDGES: Self = Self(EventKind::EdgeFall as u8 | EventKind::EdgeRise as u8);
    /// Both levels.
    pub const LEVELS: Self = Self(EventKind::LevelLow as u8 | EventKind::LevelHigh as u8);
    /// Every kind.
    pub const ALL: Self = Self(Self::VALID_BITS);

    /// Mask with only `kind` selected.
    #[inline]
    pub const fn only(kind: EventKind) -> Self {
        Self(kind.bit())
    }

    /// Builds a mask from raw bits, discarding anything outside [`Self::VALID_BITS`].
    #[inline]
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self((bits & Self::VALID_BITS as u32) as u8)
    }

    /// Raw bits of the mask.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns `true` if no kind is selected.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if `kind` is selected.
    #[inline]
    pub const fn contains(self, kind: EventKind) -> bool {
        kind.is_set_in(self)
    }

    /// Returns a copy with `kind` added.
    #[inline]
    pub const fn with(self, kind: EventKind) -> Self {
        Self(self.0 | kind.bit())
    }

    /// Picks the kind to report for a line currently at `level`.
    ///
    /// Edges win over levels when both are selected: a low line reports
    /// `EdgeFall` before `LevelLow`, a high line `EdgeRise` before `LevelHigh`.
    /// Returns `None` when neither kind for that level is selected.
    pub const fn preferred_for(self, level: Level) -> Option<EventKind> {
        let (edge, steady) = match level {
            Level::Low => (EventKind::EdgeFall, EventKind::LevelLow),
            Level::High => (EventKind::EdgeRise, EventKind::LevelHigh),
        };
        if self.contains(edge) {
            Some(edge)
        } else if self.contains(steady) {
            Some(steady)
        } else {
            None
        }
    }

    /// Iterates over the selected kinds in bit order.
    pub fn iter(self) -> impl Iterator<Item = EventKind> {
        EventKind::ALL.into_iter().filter(move |kind| self.contains(*kind))
    }
}

impl From<EventKind> for EventMask {
    fn from(kind: EventKind) -> Self {
        Self::only(kind)
    }
}

impl BitOr for EventMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOr<EventKind> for EventMask {
    type Output = Self;

    fn bitor(self, rhs: EventKind) -> Self {
        self.with(rhs)
    }
}

impl BitOr for EventKind {
    type Output = EventMask;

    fn bitor(self, rhs: Self) -> EventMask {
        EventMask::only(self).with(rhs)
    }
}

/// A single emulated occurrence, as handed from interrupt context to the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchEvent {
    /// The watch that produced the event.
    pub id: WatchId,
    /// What was observed.
    pub kind: EventKind,
}

impl WatchEvent {
    /// Creates a new event record.
    pub const fn new(id: WatchId, kind: EventKind) -> Self {
        Self { id, kind }
    }
}
