//! Bounded FIFO carrying watch events from interrupt context to the poller.
//!
//! Both ends take a short critical section around a fixed-capacity
//! `heapless::Deque`. On a single core that only masks interrupts for a few
//! instructions, so the producer never waits on the consumer and nothing
//! allocates.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Deque;

use crate::event::WatchEvent;

/// Number of events the queue can hold.
pub const EVENT_QUEUE_CAPACITY: usize = 32;

/// Interrupt-safe bounded event queue.
///
/// Events from every watch share this queue and keep their exact arrival
/// order. There is no priority and no coalescing.
pub struct EventQueue {
    events: Mutex<RefCell<Deque<WatchEvent, EVENT_QUEUE_CAPACITY>>>,
}

impl EventQueue {
    /// Creates an empty queue.
    pub const fn new() -> Self {
        Self {
            events: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    /// Appends an event. Callable from interrupt context.
    ///
    /// Returns `false` and discards the event if the queue is full.
    #[inline]
    pub fn push(&self, event: WatchEvent) -> bool {
        critical_section::with(|cs| self.events.borrow_ref_mut(cs).push_back(event).is_ok())
    }

    /// Removes and returns the oldest event, or `None` if the queue is empty.
    #[inline]
    pub fn pop(&self) -> Option<WatchEvent> {
        critical_section::with(|cs| self.events.borrow_ref_mut(cs).pop_front())
    }

    /// Discards every queued event, returning how many were discarded.
    pub fn flush(&self) -> usize {
        critical_section::with(|cs| {
            let mut events = self.events.borrow_ref_mut(cs);
            let count = events.len();
            events.clear();
            count
        })
    }

    /// Gets the number of queued events.
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.events.borrow_ref(cs).len())
    }

    /// Checks if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks if the next push would be dropped.
    pub fn is_full(&self) -> bool {
        critical_section::with(|cs| self.events.borrow_ref(cs).is_full())
    }

    /// Gets the maximum capacity of the queue.
    pub const fn capacity(&self) -> usize {
        EVENT_QUEUE_CAPACITY
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
