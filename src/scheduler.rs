//! # Scheduler
//!
//! The core engine: a bounded pool of timer slots threaded into a
//! deadline-ordered pending queue, driven by
//! [`tick_check`](Scheduler::tick_check) from the host's control loop.
//!
//! ## Check algorithm
//!
//! On each `tick_check(now, cx)`:
//! 1. **Observe the clock**: if `now` is numerically below the last
//!    observed value the counter wrapped — every pending deadline one
//!    epoch out re-enters the current class (see `clock.rs`).
//! 2. **Walk the due prefix**: the queue is sorted by `(epoch, deadline)`,
//!    so due records are always a prefix. Each due head is detached and
//!    its entry's [`expire`](TimerEntry::expire) runs.
//! 3. **Apply the decision**: [`Decision::Stop`] releases the slot back to
//!    the free list; [`Decision::Rearm`] re-bases the record on the
//!    *current* tick (not the original base) and re-inserts it in sorted
//!    position — possibly anywhere in the order, not just the tail.
//! 4. **Stop early** at the first not-yet-due head, or when the optional
//!    expiry budget is spent; leftovers are picked up on the next call.
//!
//! ## Re-entrancy
//!
//! `tick_check` holds the scheduler exclusively, so a handler can never
//! call back into the same scheduler mid-walk — the hazard becomes
//! unrepresentable rather than merely forbidden. Handlers that want to
//! schedule or cancel records record that intent in their `Context`; the
//! host applies it once `tick_check` returns.
//!
//! ## Bounded work
//!
//! Whether a check may process every due record or only a capped number is
//! an explicit construction choice: [`Scheduler::new`] drains all due
//! records, [`Scheduler::with_expiry_budget`] caps handler invocations per
//! call to bound worst-case loop latency. A zero-delay entry that always
//! re-arms will starve an unbounded check; give such workloads a budget.

use core::num::NonZeroUsize;

use crate::clock::{Deadline, Instant, Ticks};
use crate::error::{Error, Full};
use crate::pool::Pool;

// ---------------------------------------------------------------------------
// Identity and handler contract
// ---------------------------------------------------------------------------

/// Identity of an armed timer.
///
/// Assigned monotonically and unique among live records; the 16-bit space
/// wraps over the program's lifetime, which is deliberately unguarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerId(u16);

impl TimerId {
    /// The raw identity value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }
}

/// What an expired record's handler wants done with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Decision {
    /// Re-insert with a fresh deadline computed from the current tick.
    Rearm,
    /// Release the slot; the id is invalid afterwards.
    Stop,
}

/// An armed timer's payload: its handler and whatever per-timer state the
/// handler needs.
///
/// `Context` is the caller-chosen system state threaded through every
/// expiry of one `tick_check` call. Handlers must not block.
pub trait TimerEntry {
    type Context;

    /// Runs when the record's deadline has passed. The return value decides
    /// whether the record is re-armed or released.
    fn expire(&mut self, id: TimerId, now: Instant, cx: &mut Self::Context) -> Decision;
}

/// Plain function pointers work as entries for handlers without per-timer
/// state.
impl<C> TimerEntry for fn(TimerId, Instant, &mut C) -> Decision {
    type Context = C;

    fn expire(&mut self, id: TimerId, now: Instant, cx: &mut C) -> Decision {
        (*self)(id, now, cx)
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// One armed timer record.
struct TimerSlot<E> {
    id: TimerId,
    /// Tick at (re)arm time.
    base: Instant,
    /// Requested period.
    delay: Ticks,
    deadline: Deadline,
    entry: E,
}

/// Bounded-capacity, deadline-ordered timer scheduler.
///
/// Owns the slot pool and the pending queue as one unit; a record is always
/// in exactly one of the free list or the queue. Capacity is `N` slots,
/// fixed at compile time.
pub struct Scheduler<E, const N: usize> {
    pool: Pool<TimerSlot<E>, N>,
    /// Head of the pending queue, earliest deadline first.
    head: Option<usize>,
    next_id: u16,
    /// Most recent clock value seen by any operation; a numerically smaller
    /// successor means the counter wrapped.
    last_now: Instant,
    /// Handler invocations allowed per check; `None` drains every due record.
    expiry_budget: Option<NonZeroUsize>,
}

impl<E: TimerEntry, const N: usize> Scheduler<E, N> {
    /// A scheduler whose checks drain every due record.
    pub fn new() -> Self {
        Self {
            pool: Pool::new(),
            head: None,
            next_id: 0,
            last_now: Instant::ZERO,
            expiry_budget: None,
        }
    }

    /// A scheduler whose checks process at most `budget` expirations each,
    /// leaving the rest for the next call.
    pub fn with_expiry_budget(budget: NonZeroUsize) -> Self {
        Self {
            expiry_budget: Some(budget),
            ..Self::new()
        }
    }

    /// Arms a timer due `delay` ticks after `now`.
    ///
    /// Computes the deadline with wrap-aware arithmetic (a carry marks the
    /// record as belonging to the next clock epoch) and inserts it in
    /// sorted position. Fails only when every slot is armed; the entry is
    /// handed back untouched in that case.
    pub fn schedule(&mut self, now: Instant, delay: Ticks, entry: E) -> Result<TimerId, Full<E>> {
        self.observe(now);

        let id = TimerId(self.next_id);
        let record = TimerSlot {
            id,
            base: now,
            delay,
            deadline: Deadline::after(now, delay),
            entry,
        };
        let idx = match self.pool.acquire(record) {
            Ok(idx) => idx,
            Err(record) => return Err(Full(record.entry)),
        };
        self.next_id = self.next_id.wrapping_add(1);
        self.link_sorted(idx);
        trace!("timer {=u16} armed at {=u32} for {=u32} ticks", id.raw(), now.ticks(), delay);
        Ok(id)
    }

    /// Removes and frees the record carrying `id`.
    pub fn cancel(&mut self, id: TimerId) -> Result<(), Error> {
        let idx = self.find(id).ok_or(Error::NotFound)?;
        self.unlink(idx);
        self.pool.release(idx);
        trace!("timer {=u16} canceled", id.raw());
        Ok(())
    }

    /// Ticks until `id` expires, zero once due, measured against the
    /// caller's clock reading.
    pub fn time_left(&self, now: Instant, id: TimerId) -> Result<Ticks, Error> {
        let idx = self.find(id).ok_or(Error::NotFound)?;
        Ok(self.pool.entry(idx).deadline.remaining(now))
    }

    /// Runs every due record's handler. Call once per period from the
    /// host's control loop. Returns the number of expirations processed.
    ///
    /// Due records are a prefix of the sorted queue; the walk stops at the
    /// first head still in the future, or once the expiry budget (if any)
    /// is spent. A record is detached while its handler runs — in neither
    /// list — and either released or re-armed from the current tick
    /// according to the handler's [`Decision`].
    pub fn tick_check(&mut self, now: Instant, cx: &mut E::Context) -> usize {
        self.observe(now);

        let mut fired = 0usize;
        while let Some(idx) = self.head {
            if !self.pool.entry(idx).deadline.is_due(now) {
                break;
            }

            self.head = self.pool.next_of(idx);
            self.pool.set_next(idx, None);

            let record = self.pool.entry_mut(idx);
            let id = record.id;
            let decision = record.entry.expire(id, now, cx);

            match decision {
                Decision::Stop => {
                    self.pool.release(idx);
                    trace!("timer {=u16} stopped", id.raw());
                }
                Decision::Rearm => {
                    let record = self.pool.entry_mut(idx);
                    record.base = now;
                    record.deadline = Deadline::after(now, record.delay);
                    self.link_sorted(idx);
                    trace!("timer {=u16} re-armed at {=u32}", id.raw(), now.ticks());
                }
            }

            fired += 1;
            if let Some(budget) = self.expiry_budget {
                if fired >= budget.get() {
                    break;
                }
            }
        }
        fired
    }

    /// Currently armed records.
    #[inline]
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Total slots, armed and free.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    // -- internals ----------------------------------------------------------

    /// Folds a fresh clock reading into the wrap bookkeeping.
    fn observe(&mut self, now: Instant) {
        if now < self.last_now {
            trace!("clock wrapped, now {=u32}", now.ticks());
            self.retire_epochs();
        }
        self.last_now = now;
    }

    /// The counter wrapped: every future-epoch deadline re-enters the
    /// current class. Dropping the flags turns the queue into two sorted
    /// runs (the old current-epoch prefix and the old future-epoch suffix),
    /// so a merge restores the ordering invariant.
    fn retire_epochs(&mut self) {
        // Split off the future-epoch suffix; the queue is sorted, so it is
        // always a suffix.
        let mut prev: Option<usize> = None;
        let mut cur = self.head;
        while let Some(c) = cur {
            if self.pool.entry(c).deadline.is_future() {
                break;
            }
            prev = Some(c);
            cur = self.pool.next_of(c);
        }
        let suffix = match cur {
            Some(first_future) => first_future,
            None => return,
        };
        match prev {
            Some(p) => self.pool.set_next(p, None),
            None => self.head = None,
        }

        let mut c = Some(suffix);
        while let Some(i) = c {
            self.pool.entry_mut(i).deadline.retire_epoch();
            c = self.pool.next_of(i);
        }

        // Merge the runs; the old prefix wins ties, keeping records that
        // were nearer the head ahead.
        let mut a = self.head;
        let mut b = Some(suffix);
        self.head = None;
        let mut tail: Option<usize> = None;
        loop {
            let next = match (a, b) {
                (None, None) => break,
                (Some(x), None) => {
                    a = self.pool.next_of(x);
                    x
                }
                (None, Some(y)) => {
                    b = self.pool.next_of(y);
                    y
                }
                (Some(x), Some(y)) => {
                    if self.pool.entry(x).deadline <= self.pool.entry(y).deadline {
                        a = self.pool.next_of(x);
                        x
                    } else {
                        b = self.pool.next_of(y);
                        y
                    }
                }
            };
            self.pool.set_next(next, None);
            match tail {
                None => self.head = Some(next),
                Some(t) => self.pool.set_next(t, Some(next)),
            }
            tail = Some(next);
        }
    }

    /// Sorted insert: scan from the head past every record not strictly
    /// later, so equal deadlines keep FIFO order.
    fn link_sorted(&mut self, idx: usize) {
        let key = self.pool.entry(idx).deadline;
        let mut prev: Option<usize> = None;
        let mut cur = self.head;
        while let Some(c) = cur {
            if self.pool.entry(c).deadline > key {
                break;
            }
            prev = Some(c);
            cur = self.pool.next_of(c);
        }
        self.pool.set_next(idx, cur);
        match prev {
            None => self.head = Some(idx),
            Some(p) => self.pool.set_next(p, Some(idx)),
        }
    }

    /// Splices `idx` out of the pending queue. The caller just found it
    /// there; not finding it now means the queue is corrupt.
    fn unlink(&mut self, idx: usize) {
        let mut prev: Option<usize> = None;
        let mut cur = self.head;
        while let Some(c) = cur {
            if c == idx {
                break;
            }
            prev = Some(c);
            cur = self.pool.next_of(c);
        }
        assert!(cur == Some(idx), "pending record vanished mid-operation");
        let next = self.pool.next_of(idx);
        match prev {
            None => self.head = next,
            Some(p) => self.pool.set_next(p, next),
        }
        self.pool.set_next(idx, None);
    }

    fn find(&self, id: TimerId) -> Option<usize> {
        let mut cur = self.head;
        while let Some(c) = cur {
            if self.pool.entry(c).id == id {
                return Some(c);
            }
            cur = self.pool.next_of(c);
        }
        None
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let mut count = 0;
        let mut prev: Option<Deadline> = None;
        let mut cur = self.head;
        while let Some(c) = cur {
            let d = self.pool.entry(c).deadline;
            if let Some(p) = prev {
                assert!(p <= d, "pending queue out of order");
            }
            prev = Some(d);
            count += 1;
            assert!(count <= N, "pending list cycle");
            cur = self.pool.next_of(c);
        }
        assert_eq!(count, self.pool.len(), "pool/queue accounting mismatch");
    }
}

impl<E: TimerEntry, const N: usize> Default for Scheduler<E, N> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Property tests (host-only)
// ---------------------------------------------------------------------------
