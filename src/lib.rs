//! # ticktock — cooperative tick-driven timers and input debouncing
//!
//! A bounded-capacity event scheduler for resource-constrained controllers
//! that are polled from a single control loop, plus a click/hold input
//! debouncer built on top of it as an ordinary client.
//!
//! ## Overview
//!
//! The host reads a free-running hardware tick counter and calls
//! [`Scheduler::tick_check`] once per loop iteration. Armed timers live in a
//! fixed pool of slots threaded into a deadline-ordered pending queue; due
//! records are a prefix of that queue, so a check walks from the head and
//! stops at the first record still in the future. Each expired record's
//! handler decides its own fate: re-arm from the current tick, or stop and
//! return the slot to the free list.
//!
//! The tick counter is an unsigned value that wraps to zero. Every deadline
//! carries an overflow-epoch flag (set when `base + delay` wrapped past the
//! counter width) and the queue orders by `(epoch, deadline)`, so a timer
//! whose expiry lies beyond the next wrap is never mistaken for due. When an
//! operation observes the clock running backwards, the wrap has happened and
//! pending deadlines one epoch out re-enter the current class.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                 Host control loop                      │
//! │        clock read · tick_check() · pin sampling        │
//! ├──────────────┬─────────────────────────────────────────┤
//! │  Scheduler   │          Debounce Engine                │
//! │  scheduler.rs│          debounce.rs                    │
//! │  ─ schedule()│          ─ enable()/disable()           │
//! │  ─ cancel()  │          ─ poll() → 4-state FSM         │
//! │  ─ tick_check│          (one periodic timer, re-armed  │
//! │  ─ time_left │           forever, drives all inputs)   │
//! ├──────────────┴─────────────────────────────────────────┤
//! │        Slot Pool + Pending Queue (pool.rs)             │
//! │    fixed arena · intrusive free list · index links     │
//! ├────────────────────────────────────────────────────────┤
//! │        Tick arithmetic (clock.rs)                      │
//! │    Instant · Deadline · overflow-epoch ordering        │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Memory model
//!
//! - **No heap**: all state is held inline in fixed arrays
//! - **No `alloc`**: pure `core` only
//! - **Const-generic capacity**: `Scheduler<E, N>` owns `N` timer slots,
//!   `DebounceEngine<H, N>` owns `N` debouncer records
//! - **Single threaded**: all mutation happens synchronously inside the
//!   host's loop; nothing suspends, blocks, or yields
//!
//! ## Example
//!
//! ```
//! use ticktock::{Decision, Instant, Scheduler, TimerEntry, TimerId};
//!
//! #[derive(Debug)]
//! struct Blink {
//!     remaining: u8,
//! }
//!
//! impl TimerEntry for Blink {
//!     type Context = u32;
//!
//!     fn expire(&mut self, _id: TimerId, _now: Instant, toggles: &mut u32) -> Decision {
//!         *toggles += 1;
//!         self.remaining -= 1;
//!         if self.remaining == 0 {
//!             Decision::Stop
//!         } else {
//!             Decision::Rearm
//!         }
//!     }
//! }
//!
//! let mut sched: Scheduler<Blink, 4> = Scheduler::new();
//! let mut toggles = 0u32;
//!
//! sched.schedule(Instant::from_ticks(0), 10, Blink { remaining: 2 }).unwrap();
//!
//! assert_eq!(sched.tick_check(Instant::from_ticks(9), &mut toggles), 0);
//! assert_eq!(sched.tick_check(Instant::from_ticks(10), &mut toggles), 1);
//! // Re-armed from tick 10, so it fires again at 20 and then stops.
//! assert_eq!(sched.tick_check(Instant::from_ticks(20), &mut toggles), 1);
//! assert_eq!(toggles, 2);
//! assert!(sched.is_empty());
//! ```

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod clock;
pub mod config;
pub mod debounce;
pub mod error;
pub mod pool;
pub mod scheduler;

pub use clock::{Clock, Deadline, Instant, Ticks};
pub use debounce::{
    DebounceConfig, DebounceEngine, DebounceHandler, DebounceId, DebounceState, Input, InputSource,
};
pub use error::{Error, Full};
pub use pool::Pool;
pub use scheduler::{Decision, Scheduler, TimerEntry, TimerId};

/// Scheduler sized for the reference configuration.
pub type SystemScheduler<E> = Scheduler<E, { config::MAX_TIMERS }>;

/// Fine-resolution timer bank: few slots, meant to run with an expiry
/// budget of one so a check never processes more than a single record.
pub type MicroScheduler<E> = Scheduler<E, { config::MAX_MICROTIMERS }>;

/// Debounce engine sized for the reference configuration.
pub type SystemDebounce<H> = DebounceEngine<H, { config::MAX_DEBOUNCERS }>;
