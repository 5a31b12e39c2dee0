//! # Debounce engine
//!
//! A fixed-capacity table of input debouncers, each running a 4-state
//! click/hold machine, all sampled by one periodic scheduler timer. The
//! engine is an ordinary scheduler client: it registers its poll timer
//! through the public [`Scheduler`] contract at construction and touches
//! no scheduler internals.
//!
//! ## State machine
//!
//! Per sample with the input active (counter incremented first):
//!
//! | state | condition | next | event |
//! |-------|-----------|------|-------|
//! | `Idle`  | always                | `Wait`  | no  |
//! | `Wait`  | count ≥ click ticks   | `Click` | yes |
//! | `Wait`  | else                  | `Wait`  | no  |
//! | `Click` | count ≥ hold ticks    | `Hold` (counter reset) | yes |
//! | `Click` | else                  | `Click` | no  |
//! | `Hold`  | count ≥ hold ticks    | `Hold` (counter reset) | yes, repeating |
//! | `Hold`  | else                  | `Hold`  | no  |
//!
//! An inactive sample resets the counter and forces `Idle` from any state,
//! firing nothing. A fired event calls the record's handler with
//! `(id, new_state, context)`; the handler's return channel is reserved
//! and not inspected today.

use crate::clock::{Instant, Ticks};
use crate::error::{Error, Full};
use crate::pool::Pool;
use crate::scheduler::{Scheduler, TimerEntry, TimerId};

// ---------------------------------------------------------------------------
// Inputs and identities
// ---------------------------------------------------------------------------

/// A logical input reference, resolved by the host's [`InputSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Input(pub u16);

/// Identity of a registered debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DebounceId(u16);

impl DebounceId {
    /// The raw identity value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }
}

/// Qualification state of one debounced input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DebounceState {
    /// Input inactive, nothing qualifying.
    Idle,
    /// Input active, accumulating toward the click threshold.
    Wait,
    /// Click qualified; accumulating toward the hold threshold.
    Click,
    /// Held; repeat-fires every hold period while the input stays active.
    Hold,
}

// ---------------------------------------------------------------------------
// Host-facing traits
// ---------------------------------------------------------------------------

/// Samples the boolean level of a logical input. Called once per live
/// debouncer per poll period.
pub trait InputSource {
    fn is_active(&mut self, input: Input) -> bool;
}

/// Receives click/hold events for one debouncer.
pub trait DebounceHandler {
    type Context;

    /// Called on every fired event with the state just entered.
    fn event(&mut self, id: DebounceId, state: DebounceState, cx: &mut Self::Context);
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Poll cadence and qualification thresholds, in scheduler ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceConfig {
    /// Period of the shared poll timer.
    pub resolution: Ticks,
    /// Consecutive active samples that qualify a click.
    pub click_ticks: Ticks,
    /// Consecutive active samples that enter and repeat the hold state.
    pub hold_ticks: Ticks,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            resolution: crate::config::DEBOUNCE_RESOLUTION,
            click_ticks: crate::config::DEBOUNCE_CLICK_TICKS,
            hold_ticks: crate::config::DEBOUNCE_HOLD_TICKS,
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One registered debouncer. Thresholds are captured from the engine
/// config at registration and never change afterwards.
struct Debouncer<H> {
    id: DebounceId,
    input: Input,
    state: DebounceState,
    /// Consecutive active samples seen.
    count: Ticks,
    click_ticks: Ticks,
    hold_ticks: Ticks,
    handler: H,
}

impl<H> Debouncer<H> {
    /// Advances the machine by one sample. Returns whether an event fires.
    fn step(&mut self, active: bool) -> bool {
        if !active {
            self.count = 0;
            self.state = DebounceState::Idle;
            return false;
        }

        self.count += 1;

        match self.state {
            DebounceState::Idle => {
                self.state = DebounceState::Wait;
                false
            }
            DebounceState::Wait => {
                if self.count >= self.click_ticks {
                    self.state = DebounceState::Click;
                    true
                } else {
                    false
                }
            }
            DebounceState::Click => {
                if self.count >= self.hold_ticks {
                    self.state = DebounceState::Hold;
                    self.count = 0;
                    true
                } else {
                    false
                }
            }
            DebounceState::Hold => {
                if self.count >= self.hold_ticks {
                    self.count = 0;
                    true
                } else {
                    false
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Fixed-capacity debouncer table driven by one periodic scheduler timer.
pub struct DebounceEngine<H, const N: usize> {
    pool: Pool<Debouncer<H>, N>,
    /// Most recently enabled first; order carries no meaning.
    head: Option<usize>,
    next_id: u16,
    config: DebounceConfig,
    poll_timer: TimerId,
}

impl<H: DebounceHandler, const N: usize> DebounceEngine<H, N> {
    /// Builds the engine and registers its periodic poll timer with the
    /// scheduler — which must therefore already exist, and must have a
    /// free slot. The poll timer's entry is caller-supplied; its `expire`
    /// is expected to call [`poll`](Self::poll) and return
    /// [`Decision::Rearm`](crate::Decision::Rearm) unconditionally — it is
    /// the one timer in the system meant to run forever.
    ///
    /// # Panics
    ///
    /// Zero thresholds are a contract violation: a resolution of zero
    /// re-arms the poll timer into an already-due deadline, and zero
    /// click/hold ticks would fire on no samples at all.
    pub fn new<E: TimerEntry, const M: usize>(
        scheduler: &mut Scheduler<E, M>,
        now: Instant,
        config: DebounceConfig,
        poll_entry: E,
    ) -> Result<Self, Full<E>> {
        assert!(config.resolution > 0, "debounce resolution must be nonzero");
        assert!(config.click_ticks > 0, "click threshold must be nonzero");
        assert!(config.hold_ticks > 0, "hold threshold must be nonzero");

        let poll_timer = scheduler.schedule(now, config.resolution, poll_entry)?;
        trace!("debounce poll timer {=u16} registered", poll_timer.raw());
        Ok(Self {
            pool: Pool::new(),
            head: None,
            next_id: 0,
            config,
            poll_timer,
        })
    }

    /// Id of the shared poll timer, for hosts that need to cancel all
    /// polling at once.
    #[inline]
    pub fn poll_timer(&self) -> TimerId {
        self.poll_timer
    }

    /// Registers a debouncer on `input`, capturing the engine's thresholds
    /// into the record. Fails only when the table is full; the handler is
    /// handed back untouched in that case.
    pub fn enable(&mut self, input: Input, handler: H) -> Result<DebounceId, Full<H>> {
        let id = DebounceId(self.next_id);
        let record = Debouncer {
            id,
            input,
            state: DebounceState::Idle,
            count: 0,
            click_ticks: self.config.click_ticks,
            hold_ticks: self.config.hold_ticks,
            handler,
        };
        let idx = match self.pool.acquire(record) {
            Ok(idx) => idx,
            Err(record) => return Err(Full(record.handler)),
        };
        self.next_id = self.next_id.wrapping_add(1);
        self.pool.set_next(idx, self.head);
        self.head = Some(idx);
        trace!("debouncer {=u16} enabled on input {=u16}", id.raw(), input.0);
        Ok(id)
    }

    /// Removes the debouncer synchronously: the record is unlinked and its
    /// slot freed immediately, and the id is invalid afterwards.
    pub fn disable(&mut self, id: DebounceId) -> Result<(), Error> {
        let mut prev: Option<usize> = None;
        let mut cur = self.head;
        while let Some(c) = cur {
            if self.pool.entry(c).id == id {
                let next = self.pool.next_of(c);
                match prev {
                    None => self.head = next,
                    Some(p) => self.pool.set_next(p, next),
                }
                self.pool.set_next(c, None);
                self.pool.release(c);
                trace!("debouncer {=u16} disabled", id.raw());
                return Ok(());
            }
            prev = Some(c);
            cur = self.pool.next_of(c);
        }
        Err(Error::NotFound)
    }

    /// Current machine state of a live debouncer.
    pub fn state_of(&self, id: DebounceId) -> Result<DebounceState, Error> {
        let mut cur = self.head;
        while let Some(c) = cur {
            let record = self.pool.entry(c);
            if record.id == id {
                return Ok(record.state);
            }
            cur = self.pool.next_of(c);
        }
        Err(Error::NotFound)
    }

    /// Samples every live debouncer once and steps its machine, firing
    /// handlers for qualified transitions. Call from the poll timer's
    /// `expire`.
    pub fn poll<S: InputSource>(&mut self, inputs: &mut S, cx: &mut H::Context) {
        let mut cur = self.head;
        while let Some(c) = cur {
            cur = self.pool.next_of(c);
            let record = self.pool.entry_mut(c);
            let active = inputs.is_active(record.input);
            if record.step(active) {
                let (id, state) = (record.id, record.state);
                trace!("debouncer {=u16} fired in state {}", id.raw(), state);
                record.handler.event(id, state, cx);
            }
        }
    }

    /// Registered debouncers.
    #[inline]
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Table capacity.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Decision;
    use crate::Instant;

    /// Appends every event as `(id, state)`.
    #[derive(Debug, Clone, Copy)]
    struct LogEvents;

    type Events = Vec<(u16, DebounceState)>;

    impl DebounceHandler for LogEvents {
        type Context = Events;

        fn event(&mut self, id: DebounceId, state: DebounceState, events: &mut Events) {
            events.push((id.raw(), state));
        }
    }

    /// Fixed bank of input levels, settable from the test body.
    struct Pins {
        level: [bool; 4],
    }

    impl InputSource for Pins {
        fn is_active(&mut self, input: Input) -> bool {
            self.level[input.0 as usize]
        }
    }

    /// The poll timer's entry for the end-to-end tests.
    #[derive(Debug)]
    struct Poll;

    struct World {
        engine: DebounceEngine<LogEvents, 4>,
        pins: Pins,
        events: Events,
    }

    impl TimerEntry for Poll {
        type Context = World;

        fn expire(&mut self, _id: TimerId, _now: Instant, world: &mut World) -> Decision {
            let World { engine, pins, events } = world;
            engine.poll(pins, events);
            Decision::Rearm
        }
    }

    fn at(t: u32) -> Instant {
        Instant::from_ticks(t)
    }

    fn engine(
        click_ticks: Ticks,
        hold_ticks: Ticks,
    ) -> (Scheduler<Poll, 4>, DebounceEngine<LogEvents, 4>) {
        let mut sched = Scheduler::new();
        let config = DebounceConfig { resolution: 2, click_ticks, hold_ticks };
        let engine = DebounceEngine::new(&mut sched, at(0), config, Poll).unwrap();
        (sched, engine)
    }

    #[test]
    fn test_click_then_hold_then_repeat() {
        // Reference trace: click at 3 consecutive samples, hold at 5, input
        // held active for 10 samples and then released.
        let (_sched, mut engine) = engine(3, 5);
        let id = engine.enable(Input(0), LogEvents).unwrap();
        let mut pins = Pins { level: [true, false, false, false] };
        let mut events = Events::new();

        for _ in 0..10 {
            engine.poll(&mut pins, &mut events);
        }
        assert_eq!(
            events,
            vec![
                (id.raw(), DebounceState::Click), // sample 3
                (id.raw(), DebounceState::Hold),  // sample 5, counter reset
                (id.raw(), DebounceState::Hold),  // sample 10, repeat fire
            ]
        );
        assert_eq!(engine.state_of(id), Ok(DebounceState::Hold));

        // Release: state collapses to Idle, nothing fires.
        pins.level[0] = false;
        engine.poll(&mut pins, &mut events);
        assert_eq!(events.len(), 3);
        assert_eq!(engine.state_of(id), Ok(DebounceState::Idle));
    }

    #[test]
    fn test_bounce_resets_qualification() {
        let (_sched, mut engine) = engine(3, 100);
        let id = engine.enable(Input(0), LogEvents).unwrap();
        let mut pins = Pins { level: [true, false, false, false] };
        let mut events = Events::new();

        // Two active samples, then a bounce low.
        engine.poll(&mut pins, &mut events);
        engine.poll(&mut pins, &mut events);
        pins.level[0] = false;
        engine.poll(&mut pins, &mut events);
        assert!(events.is_empty());
        assert_eq!(engine.state_of(id), Ok(DebounceState::Idle));

        // The count starts over: three fresh samples to qualify.
        pins.level[0] = true;
        engine.poll(&mut pins, &mut events);
        engine.poll(&mut pins, &mut events);
        assert!(events.is_empty());
        engine.poll(&mut pins, &mut events);
        assert_eq!(events, vec![(id.raw(), DebounceState::Click)]);
    }

    #[test]
    fn test_inputs_are_independent() {
        let (_sched, mut engine) = engine(2, 100);
        let pressed = engine.enable(Input(1), LogEvents).unwrap();
        let _silent = engine.enable(Input(2), LogEvents).unwrap();
        let mut pins = Pins { level: [false, true, false, false] };
        let mut events = Events::new();

        engine.poll(&mut pins, &mut events);
        engine.poll(&mut pins, &mut events);
        assert_eq!(events, vec![(pressed.raw(), DebounceState::Click)]);
    }

    #[test]
    fn test_enable_beyond_capacity() {
        let mut sched: Scheduler<Poll, 4> = Scheduler::new();
        let config = DebounceConfig { resolution: 2, click_ticks: 2, hold_ticks: 4 };
        let mut engine: DebounceEngine<LogEvents, 2> =
            DebounceEngine::new(&mut sched, at(0), config, Poll).unwrap();

        engine.enable(Input(0), LogEvents).unwrap();
        engine.enable(Input(1), LogEvents).unwrap();
        assert!(matches!(engine.enable(Input(2), LogEvents), Err(Full(LogEvents))));
        assert_eq!(engine.len(), 2);
    }

    #[test]
    fn test_disable_frees_the_slot() {
        let mut sched: Scheduler<Poll, 4> = Scheduler::new();
        let config = DebounceConfig { resolution: 2, click_ticks: 2, hold_ticks: 4 };
        let mut engine: DebounceEngine<LogEvents, 2> =
            DebounceEngine::new(&mut sched, at(0), config, Poll).unwrap();

        let a = engine.enable(Input(0), LogEvents).unwrap();
        let b = engine.enable(Input(1), LogEvents).unwrap();

        assert_eq!(engine.disable(a), Ok(()));
        assert_eq!(engine.disable(a), Err(Error::NotFound));
        assert_eq!(engine.state_of(a), Err(Error::NotFound));

        // The freed slot is reusable at once.
        let c = engine.enable(Input(2), LogEvents).unwrap();
        assert_eq!(engine.len(), 2);

        // The disabled id fires no further events.
        let mut pins = Pins { level: [true, true, true, false] };
        let mut events = Events::new();
        engine.poll(&mut pins, &mut events);
        engine.poll(&mut pins, &mut events);
        let ids: Vec<u16> = events.iter().map(|&(id, _)| id).collect();
        assert!(!ids.contains(&a.raw()));
        assert!(ids.contains(&b.raw()));
        assert!(ids.contains(&c.raw()));
    }

    #[test]
    #[should_panic(expected = "resolution")]
    fn test_zero_resolution_is_a_contract_violation() {
        let mut sched: Scheduler<Poll, 4> = Scheduler::new();
        let config = DebounceConfig { resolution: 0, click_ticks: 2, hold_ticks: 4 };
        let _ = DebounceEngine::<LogEvents, 2>::new(&mut sched, at(0), config, Poll);
    }

    #[test]
    fn test_periodic_polling_through_the_scheduler() {
        let mut sched: Scheduler<Poll, 4> = Scheduler::new();
        let config = DebounceConfig { resolution: 2, click_ticks: 3, hold_ticks: 5 };
        let engine = DebounceEngine::new(&mut sched, at(0), config, Poll).unwrap();
        let mut world = World {
            engine,
            pins: Pins { level: [false, true, false, false] },
            events: Events::new(),
        };
        let id = world.engine.enable(Input(1), LogEvents).unwrap();

        // Ten poll periods at resolution 2: the scheduler drives the same
        // reference trace end to end.
        for t in 1..=20 {
            sched.tick_check(at(t), &mut world);
        }
        assert_eq!(
            world.events,
            vec![
                (id.raw(), DebounceState::Click),
                (id.raw(), DebounceState::Hold),
                (id.raw(), DebounceState::Hold),
            ]
        );

        // The poll timer re-arms forever; it is still pending.
        assert_eq!(sched.len(), 1);
        assert_eq!(sched.time_left(at(20), world.engine.poll_timer()), Ok(2));
    }

    #[test]
    fn test_cancel_poll_timer_stops_all_polling() {
        let mut sched: Scheduler<Poll, 4> = Scheduler::new();
        let config = DebounceConfig { resolution: 2, click_ticks: 2, hold_ticks: 4 };
        let engine = DebounceEngine::new(&mut sched, at(0), config, Poll).unwrap();
        let mut world = World {
            engine,
            pins: Pins { level: [true, false, false, false] },
            events: Events::new(),
        };
        world.engine.enable(Input(0), LogEvents).unwrap();

        assert_eq!(sched.cancel(world.engine.poll_timer()), Ok(()));
        for t in 1..=40 {
            sched.tick_check(at(t), &mut world);
        }
        assert!(world.events.is_empty());
        assert!(sched.is_empty());
    }

    #[test]
    fn test_default_config_uses_reference_values() {
        let config = DebounceConfig::default();
        assert_eq!(config.resolution, crate::config::DEBOUNCE_RESOLUTION);
        assert_eq!(config.click_ticks, crate::config::DEBOUNCE_CLICK_TICKS);
        assert_eq!(config.hold_ticks, crate::config::DEBOUNCE_HOLD_TICKS);

        let mut sched: crate::SystemScheduler<Poll> = Scheduler::new();
        let engine: crate::SystemDebounce<LogEvents> =
            DebounceEngine::new(&mut sched, at(0), config, Poll).unwrap();
        assert_eq!(engine.capacity(), crate::config::MAX_DEBOUNCERS);
        assert_eq!(sched.time_left(at(0), engine.poll_timer()), Ok(config.resolution));
    }
}
