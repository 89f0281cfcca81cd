#![no_std]

//! # AxGpio IRQ
//!
//! Edge-triggered GPIO notification for interrupt controllers that can only be
//! trusted with level triggers. Callers ask for rising edges, falling edges,
//! sustained-high or sustained-low conditions on an input line, optionally
//! debounced, and drain the resulting events by polling.
//!
//! The crate is `no_std` and never allocates.
//!
//! ## Architecture
//!
//! - [`SlotTable`]: Fixed-capacity arena of [`MAX_WATCHES`] watch slots, slot index + 1 is the [`WatchId`]
//! - [`SlotLifecycle`]: Atomic state machine (Free/Reserved/Armed) with a generation counter
//! - [`edge`]: The firing state machine: classify the level, debounce, re-arm the opposite level
//! - [`EventQueue`]: Interrupt-safe bounded FIFO of [`EVENT_QUEUE_CAPACITY`] events
//! - [`WatchManager`]: Registration, unregistration, polling and the interrupt-context entry point
//! - [`InterruptPlatform`]: What the crate needs from the hardware
//!
//! ## Event kinds
//!
//! | Kind         | Bit | Reported when                     |
//! |--------------|-----|-----------------------------------|
//! | `LevelLow`   | 1   | line is low, `EdgeFall` not asked |
//! | `LevelHigh`  | 2   | line is high, `EdgeRise` not asked|
//! | `EdgeFall`   | 4   | line is low                       |
//! | `EdgeRise`   | 8   | line is high                      |
//!
//! ## Examples
//!
//! ```rust,ignore
//! use axgpio_irq::{EventKind, EventMask, WatchConfig, WatchManager};
//!
//! static WATCHES: WatchManager<Board> = WatchManager::new(Board::new());
//!
//! WATCHES.init();
//!
//! // The application configures pin 4 as a pulled-up input beforehand.
//! let button = WATCHES.register(
//!     WatchConfig::new(4, EventKind::EdgeFall | EventKind::EdgeRise).with_debounce_ms(30),
//! )?;
//!
//! loop {
//!     while let Some(event) = WATCHES.poll_event() {
//!         if event.id == button && event.kind == EventKind::EdgeFall {
//!             // pressed
//!         }
//!     }
//! }
//!
//! WATCHES.unregister(button);
//! ```

#[macro_use]
extern crate log;

mod config;
pub mod edge;
mod event;
mod lifecycle;
mod manager;
mod platform;
mod queue;
mod registry;
mod slot;

pub use config::WatchConfig;
pub use edge::{DebounceHistory, FiringOutcome, FiringStep};
pub use event::{EventKind, EventMask, Level, PinId, TriggerCondition, WatchEvent};
pub use lifecycle::{SlotLifecycle, SlotState};
pub use manager::WatchManager;
pub use platform::{DispatchInstall, InterruptPlatform};
pub use queue::{EventQueue, EVENT_QUEUE_CAPACITY};
pub use registry::{SlotTable, MAX_WATCHES};
pub use slot::{FiringToken, WatchId, WatchRecord, WatchSlot, WatchStats, WatchStatsSnapshot};
