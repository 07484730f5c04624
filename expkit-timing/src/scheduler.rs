use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;

use tracing::trace;

use crate::clock::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

/// Schedules delayed events of type `T`.
///
/// A zero delay never dispatches inside `schedule`; it fires on the next
/// dispatch like any other timer.
pub trait TimerService<T> {
    fn schedule(&mut self, delay_ms: u64, timer: T) -> TimerHandle;
    /// Returns false when the timer already fired or was cancelled.
    fn cancel(&mut self, handle: TimerHandle) -> bool;
    fn now_ns(&self) -> u64;
}

/// An event taken off the queue
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<E> {
    pub handle: TimerHandle,
    pub scheduled_ns: u64,
    pub event: E,
}

/// Single-threaded timer queue ordered by fire time, FIFO among equal times
pub struct Scheduler<E, C: Clock> {
    clock: C,
    queue: BTreeMap<(u64, u64), E>,
    pending: HashMap<u64, u64>,
    next_seq: u64,
    stats: DispatchStats,
}

impl<E, C: Clock> Scheduler<E, C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            queue: BTreeMap::new(),
            pending: HashMap::new(),
            next_seq: 0,
            stats: DispatchStats::default(),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Queues `event` to fire `delay_ms` from now. Deadlines past the end of
    /// the clock's range saturate at `u64::MAX` ns.
    pub fn push(&mut self, delay_ms: u64, event: E) -> TimerHandle {
        let fire_at = delay_ms
            .saturating_mul(1_000_000)
            .saturating_add(self.clock.now_ns());
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.insert((fire_at, seq), event);
        self.pending.insert(seq, fire_at);
        trace!(handle = seq, fire_at_ns = fire_at, "timer scheduled");
        TimerHandle(seq)
    }

    pub fn remove(&mut self, handle: TimerHandle) -> bool {
        match self.pending.remove(&handle.0) {
            Some(fire_at) => {
                self.queue.remove(&(fire_at, handle.0));
                trace!(handle = handle.0, "timer cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.contains_key(&handle.0)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn next_deadline_ns(&self) -> Option<u64> {
        self.queue.keys().next().map(|(fire_at, _)| *fire_at)
    }

    /// Takes the earliest event if its fire time has passed.
    pub fn pop_due(&mut self) -> Option<Fired<E>> {
        let now = self.clock.now_ns();
        let (&(fire_at, seq), _) = self.queue.iter().next()?;
        if fire_at > now {
            return None;
        }
        let event = self.queue.remove(&(fire_at, seq))?;
        self.pending.remove(&seq);
        self.stats.record(Duration::from_nanos(now - fire_at));
        Some(Fired {
            handle: TimerHandle(seq),
            scheduled_ns: fire_at,
            event,
        })
    }

    /// Sleeps until the earliest event is due and takes it. `None` when idle.
    pub fn wait_next(&mut self) -> Option<Fired<E>> {
        loop {
            let deadline = self.next_deadline_ns()?;
            self.clock.sleep_until(deadline);
            if let Some(fired) = self.pop_due() {
                return Some(fired);
            }
        }
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }
}

impl<E, T, C> TimerService<T> for Scheduler<E, C>
where
    T: Into<E>,
    C: Clock,
{
    fn schedule(&mut self, delay_ms: u64, timer: T) -> TimerHandle {
        self.push(delay_ms, timer.into())
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.remove(handle)
    }

    fn now_ns(&self) -> u64 {
        self.clock.now_ns()
    }
}

/// Lateness of dispatched timers relative to their scheduled fire time
#[derive(Debug, Clone)]
pub struct DispatchStats {
    samples: VecDeque<Duration>,
    max_samples: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencySummary {
    pub samples: usize,
    pub mean_ns: f64,
    pub jitter_ns: f64,
    pub min_ns: f64,
    pub max_ns: f64,
}

impl Default for DispatchStats {
    fn default() -> Self {
        Self {
            samples: VecDeque::with_capacity(1000),
            max_samples: 1000,
        }
    }
}

impl DispatchStats {
    pub fn record(&mut self, lateness: Duration) {
        if self.samples.len() >= self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(lateness);
    }

    pub fn summary(&self) -> LatencySummary {
        if self.samples.is_empty() {
            return LatencySummary::default();
        }
        let times: Vec<f64> = self.samples.iter().map(|d| d.as_nanos() as f64).collect();
        let n = times.len() as f64;
        let mean = times.iter().sum::<f64>() / n;
        let var = times.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        LatencySummary {
            samples: times.len(),
            mean_ns: mean,
            jitter_ns: var.sqrt(),
            min_ns: times.iter().copied().fold(f64::INFINITY, f64::min),
            max_ns: times.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}
