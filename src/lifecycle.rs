//! Watch slot lifecycle with an atomic state machine and generation tracking.
//!
//! The firing routine runs in interrupt context and may preempt registration
//! and unregistration at any point. All decisions about whether a slot is live
//! are therefore made on a single `AtomicU32` with CAS transitions, so a
//! firing never sees a state that was half-updated.
//!
//! Layout: `[state(8 bits) | generation(24 bits)]`

use core::sync::atomic::{AtomicU32, Ordering};

/// Watch slot lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SlotState {
    /// Slot is unused and may be allocated.
    Free = 0,
    /// Slot is owned by a registration or unregistration in progress.
    /// Firings ignore it.
    Reserved = 1,
    /// Slot is live; firings carrying the current generation are processed.
    Armed = 2,
}

/// Combined state and generation in a single atomic value.
///
/// The generation is bumped on every reservation. A firing token records the
/// generation it was issued for, so a token left over from an earlier
/// registration of the same slot never matches the current one.
pub struct SlotLifecycle(AtomicU32);

impl SlotLifecycle {
    const STATE_SHIFT: u32 = 24;
    const GENERATION_MASK: u32 = (1 << Self::STATE_SHIFT) - 1;
    const STATE_FREE: u32 = 0;
    const STATE_RESERVED: u32 = 1;
    const STATE_ARMED: u32 = 2;

    /// Creates a free slot lifecycle at generation 0.
    pub const fn new() -> Self {
        Self(AtomicU32::new(Self::STATE_FREE << Self::STATE_SHIFT))
    }

    #[inline]
    const fn pack(state: u32, generation: u32) -> u32 {
        (state << Self::STATE_SHIFT) | (generation & Self::GENERATION_MASK)
    }

    /// Gets the current state.
    #[inline]
    pub fn state(&self) -> SlotState {
        match self.0.load(Ordering::Acquire) >> Self::STATE_SHIFT {
            0 => SlotState::Free,
            1 => SlotState::Reserved,
            _ => SlotState::Armed,
        }
    }

    /// Gets the current generation.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.0.load(Ordering::Acquire) & Self::GENERATION_MASK
    }

    /// Atomically claims a free slot (Free -> Reserved).
    ///
    /// Returns the new generation, or `None` if the slot is not free.
    pub fn try_reserve(&self) -> Option<u32> {
        let current = self.0.load(Ordering::Acquire);
        if current >> Self::STATE_SHIFT != Self::STATE_FREE {
            return None;
        }

        let generation = (current.wrapping_add(1)) & Self::GENERATION_MASK;
        self.0
            .compare_exchange(
                current,
                Self::pack(Self::STATE_RESERVED, generation),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok()
            .map(|_| generation)
    }

    /// Makes a reserved slot live (Reserved -> Armed).
    ///
    /// Fails if the slot was re-initialised since `generation` was reserved.
    pub fn arm(&self, generation: u32) -> bool {
        self.0
            .compare_exchange(
                Self::pack(Self::STATE_RESERVED, generation),
                Self::pack(Self::STATE_ARMED, generation),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Takes a live slot out of service (Armed -> Reserved).
    ///
    /// Exactly one caller wins for a given generation, which makes concurrent
    /// unregistrations of the same watch safe.
    pub fn disarm(&self, generation: u32) -> bool {
        self.0
            .compare_exchange(
                Self::pack(Self::STATE_ARMED, generation),
                Self::pack(Self::STATE_RESERVED, generation),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Returns the slot to the free pool, keeping its generation.
    pub fn release(&self) {
        let generation = self.generation();
        self.0
            .store(Self::pack(Self::STATE_FREE, generation), Ordering::Release);
    }

    /// Generation of the live registration, if the slot is armed.
    #[inline]
    pub fn armed_generation(&self) -> Option<u32> {
        let current = self.0.load(Ordering::Acquire);
        if current >> Self::STATE_SHIFT == Self::STATE_ARMED {
            Some(current & Self::GENERATION_MASK)
        } else {
            None
        }
    }

    /// Whether the slot is armed for exactly `generation`.
    ///
    /// This is the guard the firing routine checks first.
    #[inline]
    pub fn is_armed(&self, generation: u32) -> bool {
        self.0.load(Ordering::Acquire) == Self::pack(Self::STATE_ARMED, generation)
    }
}

impl Default for SlotLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for SlotLifecycle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SlotLifecycle")
            .field("state", &self.state())
            .field("generation", &self.generation())
            .finish()
    }
}
