//! # Configuration
//!
//! Compile-time constants for the reference system. All limits are fixed at
//! compile time — no dynamic allocation. Capacities are const-generic
//! parameters on [`Scheduler`](crate::Scheduler) and
//! [`DebounceEngine`](crate::DebounceEngine); the constants here size the
//! crate-level type aliases and seed the default
//! [`DebounceConfig`](crate::DebounceConfig).

use core::num::NonZeroUsize;

use crate::clock::Ticks;

/// Maximum number of simultaneously armed timers in the main bank.
/// Bounds the slot array; sorted insertion is O(n) in this value, so keep
/// it small.
pub const MAX_TIMERS: usize = 20;

/// Slots in the fine-resolution timer bank.
pub const MAX_MICROTIMERS: usize = 5;

/// Expirations processed per `tick_check` call when the main bank runs
/// with a bounded expiry budget. Caps worst-case latency of one check;
/// leftover due records are picked up on the next call.
pub const MAX_EXPIRIES_PER_CHECK: NonZeroUsize = match NonZeroUsize::new(5) {
    Some(n) => n,
    None => unreachable!(),
};

/// Maximum number of registered debouncers.
pub const MAX_DEBOUNCERS: usize = 10;

/// Period of the debounce poll timer, in scheduler ticks. Every live
/// debouncer is sampled once per period.
pub const DEBOUNCE_RESOLUTION: Ticks = 10;

/// Consecutive active samples required to qualify a click.
pub const DEBOUNCE_CLICK_TICKS: Ticks = 10;

/// Consecutive active samples required to enter (and repeat-fire in) the
/// hold state. Must exceed the click threshold to be meaningful.
pub const DEBOUNCE_HOLD_TICKS: Ticks = 100;
