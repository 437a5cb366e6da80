//! Virtual-time primitives driving a session: the per-scenario countdown
//! and a scheduler for delayed session effects.
//!
//! Nothing here reads a wall clock. Callers advance time explicitly, which
//! keeps sessions deterministic under test and lets a paused session freeze
//! both the countdown and every pending task.

/// Decision countdown. Loses `decay` units every `tick_ms` while running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    initial: u32,
    decay: u32,
    tick_ms: u64,
    remaining: u32,
    until_tick: u64,
    running: bool,
}

impl Countdown {
    #[must_use]
    pub fn new(initial: u32, decay: u32, tick_ms: u64) -> Self {
        let tick_ms = tick_ms.max(1);
        Self {
            initial,
            decay: decay.max(1),
            tick_ms,
            remaining: initial,
            until_tick: tick_ms,
            running: false,
        }
    }

    /// Refill and rewind to the start of a tick. Leaves it stopped.
    pub fn reset(&mut self) {
        self.remaining = self.initial;
        self.until_tick = self.tick_ms;
        self.running = false;
    }

    pub fn start(&mut self) {
        if self.remaining > 0 {
            self.running = true;
        }
    }

    /// Stop without losing progress through the current tick.
    pub fn stop(&mut self) {
        self.running = false;
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub const fn initial(&self) -> u32 {
        self.initial
    }

    /// Milliseconds until the next tick, if running.
    #[must_use]
    pub const fn ms_until_tick(&self) -> Option<u64> {
        if self.running {
            Some(self.until_tick)
        } else {
            None
        }
    }

    /// Let `ms` pass. Callers must not step past the next tick; use
    /// [`Countdown::ms_until_tick`] to bound the step.
    pub fn elapse(&mut self, ms: u64) {
        if self.running {
            self.until_tick = self.until_tick.saturating_sub(ms);
        }
    }

    /// Fire a due tick. Returns `true` when this tick expired the countdown,
    /// which also stops it.
    pub fn tick(&mut self) -> bool {
        if !self.running || self.until_tick > 0 {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(self.decay);
        self.until_tick = self.tick_ms;
        if self.remaining == 0 {
            self.running = false;
            return true;
        }
        false
    }
}

/// Handle for a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

#[derive(Debug, Clone)]
struct Entry<T> {
    id: TaskId,
    due_ms: u64,
    task: T,
}

/// Delayed tasks ordered by due time, then by scheduling order.
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    now_ms: u64,
    next_id: u64,
    entries: Vec<Entry<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            now_ms: 0,
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<T> Scheduler<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn schedule(&mut self, delay_ms: u64, task: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            due_ms: self.now_ms.saturating_add(delay_ms),
            task,
        });
        id
    }

    pub fn cancel(&mut self, id: TaskId) -> Option<T> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(index).task)
    }

    /// Remove every task matching `pred`, returned in firing order.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> Vec<T> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if pred(&entry.task) {
                removed.push(entry);
            } else {
                kept.push(entry);
            }
        }
        self.entries = kept;
        removed.sort_by_key(|entry| (entry.due_ms, entry.id));
        removed.into_iter().map(|entry| entry.task).collect()
    }

    /// Drop everything, returning the tasks in firing order.
    pub fn drain(&mut self) -> Vec<T> {
        self.cancel_where(|_| true)
    }

    #[must_use]
    pub fn any(&self, pred: impl Fn(&T) -> bool) -> bool {
        self.entries.iter().any(|entry| pred(&entry.task))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Milliseconds until the earliest task is due.
    #[must_use]
    pub fn ms_until_next(&self) -> Option<u64> {
        self.entries
            .iter()
            .map(|entry| entry.due_ms.saturating_sub(self.now_ms))
            .min()
    }

    pub fn elapse(&mut self, ms: u64) {
        self.now_ms = self.now_ms.saturating_add(ms);
    }

    /// Pop the earliest task that is due now.
    pub fn pop_due(&mut self) -> Option<T> {
        let index = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.due_ms <= self.now_ms)
            .min_by_key(|(_, entry)| (entry.due_ms, entry.id))
            .map(|(index, _)| index)?;
        Some(self.entries.remove(index).task)
    }
}
