//! Interface to the platform's GPIO interrupt hardware.
//!
//! The watch manager owns interrupt *behaviour* only. Everything electrical
//! (direction, pulls, drive level) and the interrupt dispatch facility itself
//! belong to the platform, which exposes them through [`InterruptPlatform`].
//!
//! # Wiring the firing routine
//!
//! When the manager calls [`InterruptPlatform::install_firing`], the platform
//! stores the [`FiringToken`] for that pin. Its interrupt trampoline hands the
//! token back:
//!
//! ```rust,ignore
//! static WATCHES: WatchManager<EspGpio> = WatchManager::new(EspGpio);
//!
//! extern "C" fn gpio_trampoline(arg: *mut c_void) {
//!     let token = unsafe { *(arg as *const FiringToken) };
//!     WATCHES.handle_firing(token);
//! }
//! ```

use axerrno::AxResult;

use crate::event::{Level, PinId, TriggerCondition};
use crate::slot::FiringToken;

/// Outcome of installing the interrupt dispatch facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchInstall {
    /// The facility was installed by this call.
    Installed,
    /// Someone had installed it already. Treated as success.
    AlreadyInstalled,
}

/// Level-triggered GPIO interrupt controller plus a millisecond clock.
///
/// [`level`](Self::level), [`set_trigger`](Self::set_trigger) and
/// [`now_ms`](Self::now_ms) are called from interrupt context and must not
/// block or allocate.
pub trait InterruptPlatform: Send + Sync {
    /// Installs the interrupt dispatch facility.
    ///
    /// Must be idempotent. Any error is reported as a registration failure.
    fn install_dispatch(&self) -> AxResult<DispatchInstall>;

    /// Reads the instantaneous level of `pin`.
    fn level(&self, pin: PinId) -> Level;

    /// Arms `pin` to fire on `condition`.
    fn set_trigger(&self, pin: PinId, condition: TriggerCondition) -> AxResult;

    /// Routes firings of `pin` to [`WatchManager::handle_firing`] with `token`.
    ///
    /// [`WatchManager::handle_firing`]: crate::WatchManager::handle_firing
    fn install_firing(&self, pin: PinId, token: FiringToken) -> AxResult;

    /// Removes the routine installed for `pin`.
    fn remove_firing(&self, pin: PinId);

    /// Enables interrupt delivery for `pin`.
    fn enable_delivery(&self, pin: PinId) -> AxResult;

    /// Disables interrupt delivery for `pin`.
    fn disable_delivery(&self, pin: PinId);

    /// Monotonic milliseconds, wrapping at `u32::MAX`.
    fn now_ms(&self) -> u32;
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted platform for unit tests.

    use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use axerrno::{ax_err, AxResult};
    use spin::Mutex;

    use super::*;

    pub const PINS: usize = 64;

    pub struct MockPlatform {
        levels: [AtomicBool; PINS],
        triggers: Mutex<[Option<TriggerCondition>; PINS]>,
        tokens: Mutex<[Option<FiringToken>; PINS]>,
        enabled: [AtomicBool; PINS],
        pub now: AtomicU32,
        pub fail_enable: AtomicBool,
    }

    impl MockPlatform {
        pub const fn new() -> Self {
            Self {
                levels: [const { AtomicBool::new(false) }; PINS],
                triggers: Mutex::new([None; PINS]),
                tokens: Mutex::new([None; PINS]),
                enabled: [const { AtomicBool::new(false) }; PINS],
                now: AtomicU32::new(0),
                fail_enable: AtomicBool::new(false),
            }
        }

        pub fn set_level(&self, pin: PinId, level: Level) {
            self.levels[pin as usize].store(level == Level::High, Ordering::SeqCst);
        }

        pub fn set_now(&self, ms: u32) {
            self.now.store(ms, Ordering::SeqCst);
        }

        pub fn trigger(&self, pin: PinId) -> Option<TriggerCondition> {
            self.triggers.lock()[pin as usize]
        }

        pub fn token(&self, pin: PinId) -> Option<FiringToken> {
            self.tokens.lock()[pin as usize]
        }

        pub fn delivery_enabled(&self, pin: PinId) -> bool {
            self.enabled[pin as usize].load(Ordering::SeqCst)
        }
    }

    impl InterruptPlatform for MockPlatform {
        fn install_dispatch(&self) -> AxResult<DispatchInstall> {
            Ok(DispatchInstall::AlreadyInstalled)
        }

        fn level(&self, pin: PinId) -> Level {
            if self.levels[pin as usize].load(Ordering::SeqCst) {
                Level::High
            } else {
                Level::Low
            }
        }

        fn set_trigger(&self, pin: PinId, condition: TriggerCondition) -> AxResult {
            self.triggers.lock()[pin as usize] = Some(condition);
            Ok(())
        }

        fn install_firing(&self, pin: PinId, token: FiringToken) -> AxResult {
            self.tokens.lock()[pin as usize] = Some(token);
            Ok(())
        }

        fn remove_firing(&self, pin: PinId) {
            self.tokens.lock()[pin as usize] = None;
        }

        fn enable_delivery(&self, pin: PinId) -> AxResult {
            if self.fail_enable.load(Ordering::SeqCst) {
                return ax_err!(BadState, "delivery refused");
            }
            self.enabled[pin as usize].store(true, Ordering::SeqCst);
            Ok(())
        }

        fn disable_delivery(&self, pin: PinId) {
            self.enabled[pin as usize].store(false, Ordering::SeqCst);
        }

        fn now_ms(&self) -> u32 {
            self.now.load(Ordering::SeqCst)
        }
    }
}
