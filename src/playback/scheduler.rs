//! Timer seam between the controller and the host's clock
//!
//! The controller never sleeps. It asks a [`Scheduler`] to deliver a
//! [`Wakeup`] after a delay, and the host passes that wakeup back through
//! `PlaybackController::fire` when it falls due.
//!
//! Two implementations are provided:
//! - [`ManualScheduler`] - virtual clock moved by hand; used in tests and by
//!   hosts that already have their own frame loop
//! - [`RealtimeScheduler`] - wall clock; the host sleeps until
//!   [`RealtimeScheduler::time_until_next`] and then drains due wakeups

use std::time::{Duration, Instant};

/// Handle for cancelling a scheduled wakeup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

/// Identifies which session and which scheduling round a wakeup belongs to.
///
/// A wakeup whose session or generation no longer matches the controller's is
/// stale and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Wakeup {
    pub session: u64,
    pub generation: u64,
}

pub trait Scheduler {
    /// Current time in milliseconds on this scheduler's clock.
    fn now_ms(&self) -> u64;

    /// Deliver `wakeup` after `delay_ms`.
    fn schedule(&mut self, delay_ms: u64, wakeup: Wakeup) -> TimerHandle;

    /// Drop a pending wakeup. Cancelling an already fired or unknown handle is a no-op.
    fn cancel(&mut self, handle: TimerHandle);
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    deadline: u64,
    id: u64,
    wakeup: Wakeup,
}

/// Pending wakeups ordered by deadline, then by scheduling order.
#[derive(Debug, Default)]
struct TimerQueue {
    next_id: u64,
    entries: Vec<Entry>,
}

impl TimerQueue {
    fn push(&mut self, deadline: u64, wakeup: Wakeup) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(Entry {
            deadline,
            id,
            wakeup,
        });
        TimerHandle(id)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.entries.retain(|entry| entry.id != handle.0);
    }

    fn earliest(&self) -> Option<(usize, &Entry)> {
        self.entries
            .iter()
            .enumerate()
            .min_by_key(|(_, entry)| (entry.deadline, entry.id))
    }

    fn next_deadline(&self) -> Option<u64> {
        self.earliest().map(|(_, entry)| entry.deadline)
    }

    fn pop_due(&mut self, now: u64) -> Option<Wakeup> {
        let (index, entry) = self.earliest()?;
        if entry.deadline > now {
            return None;
        }
        Some(self.entries.remove(index).wakeup)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Scheduler driven by an explicit virtual clock.
///
/// # Example
/// ```rust
/// use hymnal::playback::{ManualScheduler, Scheduler, Wakeup};
///
/// let mut scheduler = ManualScheduler::new();
/// let wakeup = Wakeup { session: 1, generation: 1 };
/// scheduler.schedule(500, wakeup);
///
/// scheduler.set_now(499);
/// assert_eq!(scheduler.pop_due(), None);
/// scheduler.set_now(500);
/// assert_eq!(scheduler.pop_due(), Some(wakeup));
/// ```
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now: u64,
    queue: TimerQueue,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock. Time never runs backwards; earlier values are ignored.
    pub fn set_now(&mut self, now_ms: u64) {
        self.now = self.now.max(now_ms);
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.queue.next_deadline()
    }

    /// Remove and return the earliest wakeup that is due at the current time.
    pub fn pop_due(&mut self) -> Option<Wakeup> {
        self.queue.pop_due(self.now)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl Scheduler for ManualScheduler {
    fn now_ms(&self) -> u64 {
        self.now
    }

    fn schedule(&mut self, delay_ms: u64, wakeup: Wakeup) -> TimerHandle {
        self.queue.push(self.now + delay_ms, wakeup)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.queue.cancel(handle);
    }
}

/// Scheduler backed by the system's monotonic clock.
#[derive(Debug)]
pub struct RealtimeScheduler {
    origin: Instant,
    queue: TimerQueue,
}

impl RealtimeScheduler {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            queue: TimerQueue::default(),
        }
    }

    /// How long the host may sleep before the next wakeup is due.
    /// `None` when nothing is scheduled.
    pub fn time_until_next(&self) -> Option<Duration> {
        let deadline = self.queue.next_deadline()?;
        Some(Duration::from_millis(deadline.saturating_sub(self.now_ms())))
    }

    pub fn pop_due(&mut self) -> Option<Wakeup> {
        let now = self.now_ms();
        self.queue.pop_due(now)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl Default for RealtimeScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for RealtimeScheduler {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn schedule(&mut self, delay_ms: u64, wakeup: Wakeup) -> TimerHandle {
        let deadline = self.now_ms() + delay_ms;
        self.queue.push(deadline, wakeup)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.queue.cancel(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wakeup(generation: u64) -> Wakeup {
        Wakeup {
            session: 0,
            generation,
        }
    }

    #[test]
    fn test_fires_in_deadline_then_schedule_order() {
        let mut scheduler = ManualScheduler::new();
        scheduler.schedule(300, wakeup(1));
        scheduler.schedule(100, wakeup(2));
        scheduler.schedule(100, wakeup(3));
        scheduler.set_now(1000);
        let fired: Vec<_> = std::iter::from_fn(|| scheduler.pop_due()).collect();
        assert_eq!(fired, vec![wakeup(2), wakeup(3), wakeup(1)]);
    }

    #[test]
    fn test_cancel_removes_wakeup() {
        let mut scheduler = ManualScheduler::new();
        let handle = scheduler.schedule(100, wakeup(1));
        scheduler.schedule(200, wakeup(2));
        scheduler.cancel(handle);
        scheduler.cancel(handle);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.next_deadline(), Some(200));
    }

    #[test]
    fn test_clock_never_runs_backwards() {
        let mut scheduler = ManualScheduler::new();
        scheduler.set_now(500);
        scheduler.set_now(100);
        assert_eq!(scheduler.now_ms(), 500);
        scheduler.schedule(10, wakeup(1));
        assert_eq!(scheduler.next_deadline(), Some(510));
    }

    #[test]
    fn test_realtime_zero_delay_is_due() {
        let mut scheduler = RealtimeScheduler::new();
        scheduler.schedule(0, wakeup(7));
        assert_eq!(scheduler.time_until_next(), Some(Duration::ZERO));
        assert_eq!(scheduler.pop_due(), Some(wakeup(7)));
        assert_eq!(scheduler.time_until_next(), None);
    }
}
