//! Input event sources and the per-screen listener guard.
//!
//! A [`Listener`] is the only way to read events. It subscribes on creation
//! and unsubscribes on drop, so every trial's listener is torn down before
//! the next one is installed even when the trial exits early.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::time::Duration;

use crate::timer::{ManualClock, Timer};

/// Result of waiting on an event source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wait<E> {
    Event(E),
    Elapsed,
    /// The producer is gone; no further events will arrive.
    Closed,
}

pub trait EventSource {
    type Event;

    /// Start delivering events. Returns anything queued while no listener
    /// was installed.
    fn subscribe(&mut self) -> Vec<Self::Event>;

    fn unsubscribe(&mut self);

    /// Block for up to `timeout` (forever when `None`).
    fn next_event(&mut self, timeout: Option<Duration>) -> Wait<Self::Event>;
}

/// Scoped subscription to an [`EventSource`].
pub struct Listener<'a, S: EventSource> {
    source: &'a mut S,
    stale: Vec<S::Event>,
}

impl<'a, S: EventSource> Listener<'a, S> {
    pub fn open(source: &'a mut S) -> Self {
        let stale = source.subscribe();
        if !stale.is_empty() {
            tracing::trace!(count = stale.len(), "discarding events queued before subscribe");
        }
        Self { source, stale }
    }

    /// Events that were queued before this listener existed.
    pub fn stale(&self) -> &[S::Event] {
        &self.stale
    }

    pub fn next_event(&mut self, timeout: Option<Duration>) -> Wait<S::Event> {
        self.source.next_event(timeout)
    }
}

impl<S: EventSource> Drop for Listener<'_, S> {
    fn drop(&mut self) {
        self.source.unsubscribe();
    }
}

/// Events forwarded over an mpsc channel by the window thread.
pub struct ChannelSource<E> {
    receiver: mpsc::Receiver<E>,
    subscribed: bool,
}

impl<E> ChannelSource<E> {
    pub fn new(receiver: mpsc::Receiver<E>) -> Self {
        Self {
            receiver,
            subscribed: false,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }
}

impl<E> EventSource for ChannelSource<E> {
    type Event = E;

    fn subscribe(&mut self) -> Vec<E> {
        debug_assert!(!self.subscribed, "overlapping listeners");
        self.subscribed = true;
        self.receiver.try_iter().collect()
    }

    fn unsubscribe(&mut self) {
        self.subscribed = false;
    }

    fn next_event(&mut self, timeout: Option<Duration>) -> Wait<E> {
        match timeout {
            None => match self.receiver.recv() {
                Ok(event) => Wait::Event(event),
                Err(mpsc::RecvError) => Wait::Closed,
            },
            Some(timeout) => match self.receiver.recv_timeout(timeout) {
                Ok(event) => Wait::Event(event),
                Err(mpsc::RecvTimeoutError::Timeout) => Wait::Elapsed,
                Err(mpsc::RecvTimeoutError::Disconnected) => Wait::Closed,
            },
        }
    }
}

/// Deterministic source for tests and dry runs.
///
/// Each subscription consumes the next script: presses given as offsets from
/// the moment the listener opened. Presses a listener never reads are dropped
/// with it. Reading advances the shared [`ManualClock`].
pub struct ScriptedSource<E> {
    clock: ManualClock,
    scripts: VecDeque<Vec<(Duration, E)>>,
    current: Option<(Duration, VecDeque<(Duration, E)>)>,
    active: usize,
    peak: usize,
    subscriptions: usize,
}

impl<E> ScriptedSource<E> {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            scripts: VecDeque::new(),
            current: None,
            active: 0,
            peak: 0,
            subscriptions: 0,
        }
    }

    /// Script for the next listener.
    pub fn then(mut self, presses: Vec<(Duration, E)>) -> Self {
        self.push(presses);
        self
    }

    /// Next listener sees nothing until it times out.
    pub fn then_idle(self) -> Self {
        self.then(Vec::new())
    }

    pub fn push(&mut self, mut presses: Vec<(Duration, E)>) {
        presses.sort_by_key(|(at, _)| *at);
        self.scripts.push_back(presses);
    }

    pub fn remaining_scripts(&self) -> usize {
        self.scripts.len()
    }

    pub fn active_listeners(&self) -> usize {
        self.active
    }

    /// Highest number of simultaneously open listeners seen.
    pub fn peak_listeners(&self) -> usize {
        self.peak
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions
    }
}

impl<E> EventSource for ScriptedSource<E> {
    type Event = E;

    fn subscribe(&mut self) -> Vec<E> {
        self.active += 1;
        self.peak = self.peak.max(self.active);
        self.subscriptions += 1;
        let script = self.scripts.pop_front().unwrap_or_default();
        self.current = Some((self.clock.now(), script.into()));
        Vec::new()
    }

    fn unsubscribe(&mut self) {
        self.active = self.active.saturating_sub(1);
        self.current = None;
    }

    fn next_event(&mut self, timeout: Option<Duration>) -> Wait<E> {
        let now = self.clock.now();
        let Some((opened, pending)) = self.current.as_mut() else {
            return match timeout {
                Some(t) => {
                    self.clock.advance(t);
                    Wait::Elapsed
                }
                None => Wait::Closed,
            };
        };
        let due = pending.front().map(|(offset, _)| *opened + *offset);
        match (due, timeout) {
            (Some(at), Some(t)) if at < now + t => {
                self.clock.advance_to(at);
                pending.pop_front().map_or(Wait::Elapsed, |(_, e)| Wait::Event(e))
            }
            (Some(at), None) => {
                self.clock.advance_to(at);
                pending.pop_front().map_or(Wait::Closed, |(_, e)| Wait::Event(e))
            }
            (_, Some(t)) => {
                self.clock.advance(t);
                Wait::Elapsed
            }
            (None, None) => Wait::Closed,
        }
    }
}
