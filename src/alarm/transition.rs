use chrono::NaiveDateTime;

use crate::alarm::model::{Alarm, AlarmTime, DaySet, NewAlarm};

pub const SNOOZE_MINUTES: i64 = 5;
pub const SNOOZE_LABEL_PREFIX: &str = "Snooze: ";
pub const SNOOZE_ID_PREFIX: &str = "snooze";

/// How the user resolved a firing alarm.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Resolution {
    Stop,
    Snooze,
}

/// Store mutations a resolution implies for the alarm that was firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionPlan {
    pub deactivate: Option<String>,
    pub insert: Option<NewAlarm>,
}

pub fn snooze_time(now: &NaiveDateTime) -> AlarmTime {
    AlarmTime::from_datetime(now).plus_minutes(SNOOZE_MINUTES)
}

pub fn snooze_alarm(original: &Alarm, now: &NaiveDateTime) -> NewAlarm {
    NewAlarm::new(
        snooze_time(now),
        format!("{SNOOZE_LABEL_PREFIX}{}", original.label),
        DaySet::once(),
    )
    .with_smart_prompt(original.smart_prompt.clone())
}

/// Stop retires a one-shot alarm; a repeating alarm keeps its schedule.
/// Snooze never touches the original and adds a one-shot follow-up instead.
pub fn plan(resolution: Resolution, firing: &Alarm, now: &NaiveDateTime) -> ResolutionPlan {
    match resolution {
        Resolution::Stop => ResolutionPlan {
            deactivate: firing.is_one_shot().then(|| firing.id.clone()),
            insert: None,
        },
        Resolution::Snooze => ResolutionPlan {
            deactivate: None,
            insert: Some(snooze_alarm(firing, now)),
        },
    }
}
