//! Single-slot, last-write-wins mailbox.
//!
//! The producer fills the slot in place and marks it ready; the consumer copies
//! it out and marks it empty. A second publish before the consumer runs
//! overwrites the first: the earlier value is lost, never queued.
//!
//! On a single core where the consumer is an interrupt handler and the
//! producer is the main loop, the consumer always runs to completion before
//! the producer resumes, so a publish never finds the slot being read. Where
//! that can happen anyway, the publish is skipped and reported as
//! [`Publish::Busy`].

use core::cell::UnsafeCell;

use portable_atomic::{AtomicU8, Ordering};

const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const READY: u8 = 2;
const READING: u8 = 3;

/// Outcome of [`Mailbox::publish_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Publish {
    /// The slot holds the new value and is ready for the consumer.
    Published,
    /// The slot was being read or written elsewhere; nothing changed.
    Busy,
}

/// Single-slot mailbox holding at most one pending value.
pub struct Mailbox<T> {
    slot: UnsafeCell<T>,
    state: AtomicU8,
}

// SAFETY: the slot is only accessed by the side that moved `state` into
// WRITING or READING, and those transitions are exclusive compare-exchanges.
unsafe impl<T: Send> Sync for Mailbox<T> {}

impl<T> Mailbox<T> {
    /// Creates an empty mailbox whose slot starts as `initial`.
    pub const fn new(initial: T) -> Self {
        Self {
            slot: UnsafeCell::new(initial),
            state: AtomicU8::new(EMPTY),
        }
    }

    /// Fills the slot in place with `fill` and marks it ready.
    ///
    /// `fill` sees whatever the slot last held, published or not.
    pub fn publish_with(&self, fill: impl FnOnce(&mut T)) -> Publish {
        let mut state = self.state.load(Ordering::Relaxed);
        loop {
            if state == WRITING || state == READING {
                return Publish::Busy;
            }
            match self
                .state
                .compare_exchange_weak(state, WRITING, Ordering::Acquire, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => state = actual,
            }
        }

        // SAFETY: this side moved `state` to WRITING; no one else touches the
        // slot until it leaves WRITING.
        fill(unsafe { &mut *self.slot.get() });

        self.state.store(READY, Ordering::Release);
        Publish::Published
    }

    /// Hands the ready value to `read` and empties the mailbox.
    ///
    /// Returns false, without calling `read`, when nothing is ready.
    pub fn take_with(&self, read: impl FnOnce(&T)) -> bool {
        if self
            .state
            .compare_exchange(READY, READING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }

        // SAFETY: this side moved `state` to READING; producers back off
        // until it leaves READING.
        read(unsafe { &*self.slot.get() });

        self.state.store(EMPTY, Ordering::Release);
        true
    }

    /// Returns true if a published value is waiting.
    pub fn is_ready(&self) -> bool {
        self.state.load(Ordering::Relaxed) == READY
    }
}
