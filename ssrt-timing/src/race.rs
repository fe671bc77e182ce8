//! First-of {response, deadline} resolution with side alarms.
//!
//! A [`Race`] waits on a [`Listener`] until an accepted event arrives or the
//! deadline passes. Alarms scheduled on the race fire at most once each and
//! only while the race is still pending; they never settle it.

use std::time::Duration;

use crate::source::{EventSource, Listener, Wait};
use crate::timer::Timer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaceOutcome<T> {
    /// An event was accepted at `at` (clock time).
    Responded { value: T, at: Duration },
    TimedOut,
    /// The event source closed before either side won.
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaceStep<T> {
    /// Alarm `id` came due while the race was pending.
    Alarm(usize),
    Settled(RaceOutcome<T>),
}

#[derive(Debug, Clone, Copy)]
struct Alarm {
    id: usize,
    at: Duration,
    fired: bool,
}

pub struct Race<'t, C: Timer> {
    timer: &'t C,
    deadline: Duration,
    alarms: Vec<Alarm>,
    settled: bool,
}

impl<'t, C: Timer> Race<'t, C> {
    /// `deadline` is absolute clock time.
    pub fn new(timer: &'t C, deadline: Duration) -> Self {
        Self {
            timer,
            deadline,
            alarms: Vec::new(),
            settled: false,
        }
    }

    pub fn with_alarm(mut self, id: usize, at: Duration) -> Self {
        self.alarms.push(Alarm {
            id,
            at,
            fired: false,
        });
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    fn next_wake(&self) -> Duration {
        self.alarms
            .iter()
            .filter(|a| !a.fired)
            .map(|a| a.at)
            .fold(self.deadline, Duration::min)
    }

    /// Drive the race until an alarm fires or it settles.
    ///
    /// `accept` maps raw events to a result; events it rejects are ignored.
    /// Polling a settled race reports `TimedOut`.
    pub fn poll<S, T, F>(&mut self, listener: &mut Listener<'_, S>, mut accept: F) -> RaceStep<T>
    where
        S: EventSource,
        F: FnMut(S::Event) -> Option<T>,
    {
        if self.settled {
            return RaceStep::Settled(RaceOutcome::TimedOut);
        }
        loop {
            let now = self.timer.now();
            if let Some(alarm) = self
                .alarms
                .iter_mut()
                .filter(|a| !a.fired && a.at <= now)
                .min_by_key(|a| a.at)
            {
                alarm.fired = true;
                tracing::trace!(alarm = alarm.id, at_ms = now.as_millis() as u64, "alarm fired");
                return RaceStep::Alarm(alarm.id);
            }
            if now >= self.deadline {
                return self.settle(RaceOutcome::TimedOut);
            }
            let wait = self.next_wake().saturating_sub(now);
            match listener.next_event(Some(wait)) {
                Wait::Event(event) => {
                    if let Some(value) = accept(event) {
                        let at = self.timer.now();
                        return self.settle(RaceOutcome::Responded { value, at });
                    }
                }
                Wait::Elapsed => {}
                Wait::Closed => return self.settle(RaceOutcome::Closed),
            }
        }
    }

    fn settle<T>(&mut self, outcome: RaceOutcome<T>) -> RaceStep<T> {
        self.settled = true;
        RaceStep::Settled(outcome)
    }
}

/// Wait on `listener` for an accepted event with no deadline.
pub fn await_accepted<S, T, F>(listener: &mut Listener<'_, S>, mut accept: F) -> Option<T>
where
    S: EventSource,
    F: FnMut(S::Event) -> Option<T>,
{
    loop {
        match listener.next_event(None) {
            Wait::Event(event) => {
                if let Some(value) = accept(event) {
                    return Some(value);
                }
            }
            Wait::Elapsed => {}
            Wait::Closed => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ScriptedSource;
    use crate::timer::ManualClock;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn settle<S: EventSource<Event = char>>(
        race: &mut Race<'_, ManualClock>,
        listener: &mut Listener<'_, S>,
    ) -> (Vec<usize>, RaceOutcome<char>) {
        let mut alarms = Vec::new();
        loop {
            match race.poll(listener, |c| c.is_alphabetic().then_some(c)) {
                RaceStep::Alarm(id) => alarms.push(id),
                RaceStep::Settled(outcome) => return (alarms, outcome),
            }
        }
    }

    #[test]
    fn response_before_deadline_wins() {
        let clock = ManualClock::new();
        let mut source = ScriptedSource::new(clock.clone()).then(vec![(ms(650), 's')]);
        let mut listener = Listener::open(&mut source);
        let mut race = Race::new(&clock, ms(700));
        let (alarms, outcome) = settle(&mut race, &mut listener);
        assert!(alarms.is_empty());
        assert_eq!(outcome, RaceOutcome::Responded { value: 's', at: ms(650) });
        assert!(race.is_settled());
    }

    #[test]
    fn deadline_wins_without_response() {
        let clock = ManualClock::new();
        let mut source = ScriptedSource::new(clock.clone()).then(vec![(ms(900), 's')]);
        let mut listener = Listener::open(&mut source);
        let mut race = Race::new(&clock, ms(700));
        let (_, outcome) = settle(&mut race, &mut listener);
        assert_eq!(outcome, RaceOutcome::TimedOut);
        assert_eq!(clock.now(), ms(700));
    }

    #[test]
    fn rejected_events_do_not_settle() {
        let clock = ManualClock::new();
        let mut source = ScriptedSource::new(clock.clone()).then(vec![(ms(100), '1'), (ms(200), 'k')]);
        let mut listener = Listener::open(&mut source);
        let mut race = Race::new(&clock, ms(700));
        let (_, outcome) = settle(&mut race, &mut listener);
        assert_eq!(outcome, RaceOutcome::Responded { value: 'k', at: ms(200) });
    }

    #[test]
    fn alarm_fires_once_while_pending() {
        let clock = ManualClock::new();
        let mut source = ScriptedSource::new(clock.clone()).then(vec![(ms(600), 'k')]);
        let mut listener = Listener::open(&mut source);
        let mut race = Race::new(&clock, ms(1_500)).with_alarm(7, ms(500));
        let (alarms, outcome) = settle(&mut race, &mut listener);
        assert_eq!(alarms, vec![7]);
        assert_eq!(outcome, RaceOutcome::Responded { value: 'k', at: ms(600) });
    }

    #[test]
    fn alarm_after_settlement_never_fires() {
        let clock = ManualClock::new();
        let mut source = ScriptedSource::new(clock.clone()).then(vec![(ms(300), 'k')]);
        let mut listener = Listener::open(&mut source);
        let mut race = Race::new(&clock, ms(1_500)).with_alarm(1, ms(500));
        let (alarms, _) = settle(&mut race, &mut listener);
        assert!(alarms.is_empty());
        clock.advance(ms(1_000));
        assert_eq!(race.poll(&mut listener, |c| Some(c)), RaceStep::Settled(RaceOutcome::TimedOut));
    }

    #[test]
    fn closed_source_settles_as_closed() {
        let clock = ManualClock::new();
        let mut source = ScriptedSource::<char>::new(clock.clone());
        let mut listener = Listener::open(&mut source);
        assert_eq!(await_accepted(&mut listener, |c| Some(c)), None);
    }
}
