use chrono::{Datelike, NaiveDateTime};

use crate::alarm::model::{Alarm, AlarmTime, weekday_index};

/// The parts of the wall clock the matcher looks at.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ClockReading {
    pub time: AlarmTime,
    pub weekday: u8,
    pub day_of_month: u32,
}

impl ClockReading {
    pub fn at(now: &NaiveDateTime) -> Self {
        Self {
            time: AlarmTime::from_datetime(now),
            weekday: weekday_index(now),
            day_of_month: now.day(),
        }
    }
}

/// Dedupe token: alarm id + matched minute + day of month.
pub fn trigger_key(alarm: &Alarm, reading: &ClockReading) -> String {
    format!("{}-{}-{}", alarm.id, reading.time, reading.day_of_month)
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SchedulerState {
    Idle,
    Firing(Alarm),
}

#[derive(Debug, Clone, Default)]
pub struct TickOutcome {
    pub fired: Option<Alarm>,
    pub matched: usize,
    pub deferred: usize,
}

pub struct AlarmScheduler {
    state: SchedulerState,
    last_trigger_key: Option<String>,
    consumed_minute: Option<ClockReading>,
    consumed_keys: Vec<String>,
}

impl Default for AlarmScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl AlarmScheduler {
    pub fn new() -> Self {
        Self {
            state: SchedulerState::Idle,
            last_trigger_key: None,
            consumed_minute: None,
            consumed_keys: Vec::new(),
        }
    }

    /// Compares `now` against every active alarm.
    ///
    /// At most one alarm enters Firing per tick, first in list order. Matches
    /// that lose to an alarm fired in this same tick are consumed for the
    /// minute. Matches blocked by an alarm still firing from earlier stay
    /// eligible and fire on a later tick of their minute once it is resolved.
    /// Missed minutes are never caught up.
    pub fn tick(&mut self, now: NaiveDateTime, alarms: &[Alarm]) -> TickOutcome {
        let reading = ClockReading::at(&now);
        let was_firing = self.is_firing();
        if self.consumed_minute != Some(reading) {
            self.consumed_minute = Some(reading);
            self.consumed_keys.clear();
        }

        let mut outcome = TickOutcome::default();
        for alarm in alarms {
            if !alarm.is_active || alarm.time != reading.time || !alarm.day_matches(reading.weekday)
            {
                continue;
            }
            outcome.matched += 1;

            let key = trigger_key(alarm, &reading);
            if self.last_trigger_key.as_deref() == Some(key.as_str())
                || self.consumed_keys.contains(&key)
            {
                continue;
            }
            if was_firing {
                outcome.deferred += 1;
                continue;
            }
            self.consumed_keys.push(key.clone());

            if self.is_firing() {
                outcome.deferred += 1;
                continue;
            }

            self.state = SchedulerState::Firing(alarm.clone());
            self.last_trigger_key = Some(key);
            outcome.fired = Some(alarm.clone());
        }
        outcome
    }

    pub fn is_firing(&self) -> bool {
        matches!(self.state, SchedulerState::Firing(_))
    }

    pub fn firing(&self) -> Option<&Alarm> {
        match &self.state {
            SchedulerState::Firing(alarm) => Some(alarm),
            SchedulerState::Idle => None,
        }
    }

    pub fn last_trigger_key(&self) -> Option<&str> {
        self.last_trigger_key.as_deref()
    }

    /// Firing -> Idle. Returns the alarm that was firing, if any.
    pub fn resolve(&mut self) -> Option<Alarm> {
        match std::mem::replace(&mut self.state, SchedulerState::Idle) {
            SchedulerState::Firing(alarm) => Some(alarm),
            SchedulerState::Idle => None,
        }
    }
}
