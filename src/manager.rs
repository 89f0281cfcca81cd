//! Watch manager.
//!
//! This module provides the [`WatchManager`] which owns the slot table and the
//! shared event queue, registers and unregisters watches against the platform,
//! and runs the firing routine in interrupt context.
//!
//! # Ordering
//!
//! Registration fills the slot record and arms the slot before the firing
//! routine is installed, and enables delivery as its very last step.
//! Unregistration takes the slot out of service before touching hardware.
//! A firing therefore never sees a half-built or half-torn-down slot: it either
//! fails the lifecycle guard and returns, or it works on a complete record.

use core::sync::atomic::{AtomicBool, Ordering};

use arrayvec::ArrayVec;
use axerrno::AxResult;
use spin::Once;

use crate::config::WatchConfig;
use crate::edge::{self, FiringOutcome};
use crate::event::{TriggerCondition, WatchEvent};
use crate::platform::{DispatchInstall, InterruptPlatform};
use crate::queue::EventQueue;
use crate::registry::{SlotTable, MAX_WATCHES};
use crate::slot::{FiringToken, WatchId, WatchStatsSnapshot};

/// Edge-emulating GPIO watch manager.
///
/// One instance normally lives for the whole program, typically in a `static`
/// so the platform's interrupt trampoline can reach
/// [`handle_firing`](Self::handle_firing).
///
/// # Usage
///
/// ```rust,ignore
/// static WATCHES: WatchManager<Board> = WatchManager::new(Board::new());
///
/// // Line direction and pulls are configured by the application first.
/// let id = WATCHES.register(WatchConfig::new(4, EventMask::EDGES).with_debounce_ms(20))?;
///
/// loop {
///     while let Some(event) = WATCHES.poll_event() {
///         handle(event.id, event.kind);
///     }
/// }
/// ```
pub struct WatchManager<P: InterruptPlatform> {
    /// The interrupt controller, line reader and clock.
    platform: P,

    /// Per-watch state.
    slots: SlotTable,

    /// Shared event queue, created by the first registration.
    events: Once<EventQueue>,

    /// Whether the platform's dispatch facility has been installed.
    dispatch_installed: AtomicBool,
}

impl<P: InterruptPlatform> WatchManager<P> {
    /// Creates a manager with every slot free.
    pub const fn new(platform: P) -> Self {
        Self {
            platform,
            slots: SlotTable::new(),
            events: Once::new(),
            dispatch_installed: AtomicBool::new(false),
        }
    }

    /// Gets a reference to the platform.
    #[inline]
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Frees every slot.
    ///
    /// The event queue and the dispatch facility are left as they are.
    /// Routines installed before the reset keep their tokens, but those tokens
    /// no longer match any slot, so their firings are ignored.
    pub fn init(&self) {
        let live = self.slots.reset();
        if live > 0 {
            warn!("Watch table reset with {} live watches", live);
        }
        debug!("Watch table initialised ({} slots)", MAX_WATCHES);
    }

    /// Registers a watch.
    ///
    /// The line must already be configured as an input by the caller.
    ///
    /// Returns the watch id, which is the slot index + 1.
    ///
    /// # Errors
    ///
    /// - `NoMemory` if all slots are in use.
    /// - Whatever the platform returns if the dispatch facility cannot be
    ///   installed, or if arming the trigger, installing the firing routine or
    ///   enabling delivery fails.
    ///
    /// A failed registration leaves the slot free and no routine installed.
    pub fn register(&self, config: WatchConfig) -> AxResult<WatchId> {
        let (index, generation) = self.slots.allocate().inspect_err(|_| {
            warn!("No free watch slot for pin {}", config.pin);
        })?;

        if let Err(err) = self.bring_up(index, generation, &config) {
            warn!(
                "Registering pin {} in slot {} failed: {:?}",
                config.pin, index, err
            );
            self.slots.release(index);
            return Err(err);
        }

        let id = WatchId::from_slot(index);
        debug!(
            "Registered watch {:?}: pin={}, events={:#x}, debounce={}ms",
            id,
            config.pin,
            config.events.bits(),
            config.debounce_ms
        );
        Ok(id)
    }

    /// Brings a reserved slot into service.
    ///
    /// On error the caller releases the slot; anything installed on the
    /// platform past the trigger setup is removed here.
    fn bring_up(&self, index: usize, generation: u32, config: &WatchConfig) -> AxResult {
        let queue = self.events.call_once(EventQueue::new);
        self.ensure_dispatch()?;

        let pin = config.pin;
        let level = self.platform.level(pin);
        self.platform
            .set_trigger(pin, TriggerCondition::opposite_of(level))?;

        let slot = self
            .slots
            .get(index)
            .ok_or_else(|| axerrno::ax_err_type!(InvalidInput, "slot index out of range"))?;
        slot.populate(config);
        if !slot.lifecycle().arm(generation) {
            return axerrno::ax_err!(BadState, "slot was reset during registration");
        }

        self.platform
            .install_firing(pin, FiringToken::new(index, generation))?;

        let stale = queue.flush();
        if stale > 0 {
            debug!("Discarded {} stale events", stale);
        }

        if let Err(err) = self.platform.enable_delivery(pin) {
            self.platform.remove_firing(pin);
            return Err(err);
        }
        Ok(())
    }

    /// Installs the dispatch facility on first use.
    fn ensure_dispatch(&self) -> AxResult {
        if self.dispatch_installed.load(Ordering::Acquire) {
            return Ok(());
        }

        match self.platform.install_dispatch()? {
            DispatchInstall::Installed => debug!("GPIO interrupt dispatch installed"),
            DispatchInstall::AlreadyInstalled => {
                trace!("GPIO interrupt dispatch already installed")
            }
        }
        self.dispatch_installed.store(true, Ordering::Release);
        Ok(())
    }

    /// Unregisters a watch.
    ///
    /// Returns `true` if a live watch was torn down, `false` if `id` was never
    /// issued, is out of range, or was already unregistered.
    pub fn unregister(&self, id: WatchId) -> bool {
        let Ok(index) = self.slots.slot_of(id) else {
            trace!("Unregister of inactive watch {:?} ignored", id);
            return false;
        };
        let Some(slot) = self.slots.get(index) else {
            return false;
        };
        let Some(generation) = slot.lifecycle().armed_generation() else {
            return false;
        };

        // From here on firings for this slot fail the guard.
        if !slot.lifecycle().disarm(generation) {
            return false;
        }

        let pin = slot.record().pin;
        self.platform.disable_delivery(pin);
        if let Err(err) = self.platform.set_trigger(pin, TriggerCondition::Disabled) {
            warn!("Disarming trigger of pin {} failed: {:?}", pin, err);
        }
        self.platform.remove_firing(pin);
        self.slots.release(index);

        debug!("Unregistered watch {:?} (pin {})", id, pin);
        true
    }

    /// Pops the oldest pending event.
    ///
    /// Returns `None` if no watch was ever registered or the queue is empty.
    pub fn poll_event(&self) -> Option<WatchEvent> {
        let event = self.events.get()?.pop()?;
        trace!("Polled {} from watch {:?}", event.kind, event.id);
        Some(event)
    }

    /// Pops every pending event into `f`, oldest first.
    ///
    /// Returns the number of events handled.
    pub fn drain_events<F>(&self, mut f: F) -> usize
    where
        F: FnMut(WatchEvent),
    {
        let mut count = 0;
        while let Some(event) = self.poll_event() {
            f(event);
            count += 1;
        }
        count
    }

    /// Gets the number of pending events.
    pub fn pending_events(&self) -> usize {
        self.events.get().map_or(0, EventQueue::len)
    }

    /// The firing routine. Call from the platform's interrupt trampoline.
    ///
    /// Never blocks, allocates or logs. Queue overflow and debounce
    /// suppression are silent and only show up in [`stats`](Self::stats).
    pub fn handle_firing(&self, token: FiringToken) {
        let Some(slot) = self.slots.get(token.slot()) else {
            return;
        };
        if !slot.lifecycle().is_armed(token.generation()) {
            return;
        }

        let now = self.platform.now_ms();

        // Snapshot and commit in one critical section, re-checking the guard
        // inside it so an unregister cannot interleave with the update.
        let decided = critical_section::with(|cs| {
            if !slot.lifecycle().is_armed(token.generation()) {
                return None;
            }
            let mut record = slot.record_in(cs);
            let level = self.platform.level(record.pin);
            let step = edge::step(
                level,
                record.events,
                &mut record.history,
                now,
                record.debounce_ms,
            );
            slot.store_in(cs, record);
            Some((record.pin, step))
        });
        let Some((pin, step)) = decided else {
            return;
        };

        slot.stats().record_firing();
        let _ = self.platform.set_trigger(pin, step.next);

        match step.outcome {
            FiringOutcome::Emit(kind) => {
                let event = WatchEvent::new(token.watch_id(), kind);
                let pushed = self
                    .events
                    .get()
                    .is_some_and(|queue| queue.push(event));
                if pushed {
                    slot.stats().record_accepted();
                } else {
                    slot.stats().record_dropped();
                }
            }
            FiringOutcome::Debounced(_) => slot.stats().record_debounced(),
            FiringOutcome::Ignored => slot.stats().record_ignored(),
        }
    }

    /// Checks if `id` names a live watch.
    pub fn is_registered(&self, id: WatchId) -> bool {
        self.slots.slot_of(id).is_ok()
    }

    /// Gets the configuration of a live watch.
    pub fn watch_config(&self, id: WatchId) -> Option<WatchConfig> {
        let index = self.slots.slot_of(id).ok()?;
        Some(self.slots.get(index)?.record().config())
    }

    /// Gets the firing statistics of a live watch.
    pub fn stats(&self, id: WatchId) -> Option<WatchStatsSnapshot> {
        let index = self.slots.slot_of(id).ok()?;
        Some(self.slots.get(index)?.stats().snapshot())
    }

    /// Lists all live watches in slot order.
    pub fn active_watches(&self) -> ArrayVec<WatchId, MAX_WATCHES> {
        self.slots.active()
    }

    /// Gets the number of live watches.
    pub fn active_count(&self) -> usize {
        self.slots.active_count()
    }
}
