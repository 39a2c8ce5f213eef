use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize, Serializer};

pub const MINUTES_PER_DAY: i64 = 24 * 60;
pub const WEEKDAY_SHORT_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Wall-clock time of day with minute precision, rendered as zero-padded `HH:mm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AlarmTime {
    hour: u8,
    minute: u8,
}

impl AlarmTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 {
            bail!("hour {hour} out of range, expected 00-23");
        }
        if minute > 59 {
            bail!("minute {minute} out of range, expected 00-59");
        }
        Ok(Self {
            hour: hour as u8,
            minute: minute as u8,
        })
    }

    /// Strict `HH:mm` parser: exactly two digits, a colon, two digits.
    pub fn parse(input: &str) -> Result<Self> {
        let bytes = input.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            bail!("invalid time '{input}', expected HH:mm");
        }
        let digits = [bytes[0], bytes[1], bytes[3], bytes[4]];
        if !digits.iter().all(u8::is_ascii_digit) {
            bail!("invalid time '{input}', expected HH:mm");
        }
        let hour = u32::from(digits[0] - b'0') * 10 + u32::from(digits[1] - b'0');
        let minute = u32::from(digits[2] - b'0') * 10 + u32::from(digits[3] - b'0');
        Self::new(hour, minute).map_err(|err| anyhow::anyhow!("invalid time '{input}': {err}"))
    }

    pub fn from_datetime(now: &NaiveDateTime) -> Self {
        Self {
            hour: now.hour() as u8,
            minute: now.minute() as u8,
        }
    }

    fn minutes_since_midnight(self) -> i64 {
        i64::from(self.hour) * 60 + i64::from(self.minute)
    }

    /// Adds `minutes` and wraps across midnight in either direction.
    pub fn plus_minutes(self, minutes: i64) -> Self {
        let total = (self.minutes_since_midnight() + minutes).rem_euclid(MINUTES_PER_DAY);
        Self {
            hour: (total / 60) as u8,
            minute: (total % 60) as u8,
        }
    }
}

impl fmt::Display for AlarmTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for AlarmTime {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for AlarmTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Weekday index in the 0=Sunday..6=Saturday convention.
pub fn weekday_index(now: &NaiveDateTime) -> u8 {
    now.weekday().num_days_from_sunday() as u8
}

/// Set of repeat weekdays. Empty means the alarm is one-shot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DaySet(Vec<u8>);

impl DaySet {
    pub fn new<I>(days: I) -> Result<Self>
    where
        I: IntoIterator<Item = u8>,
    {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for day in days {
            if day > 6 {
                bail!("weekday {day} out of range, expected 0 (Sunday) to 6 (Saturday)");
            }
            if !seen.insert(day) {
                bail!("weekday {day} listed more than once");
            }
            out.push(day);
        }
        out.sort_unstable();
        Ok(Self(out))
    }

    pub fn once() -> Self {
        Self(Vec::new())
    }

    pub fn weekdays() -> Self {
        Self(vec![1, 2, 3, 4, 5])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, weekday: u8) -> bool {
        self.0.contains(&weekday)
    }

    pub fn summary(&self) -> String {
        match self.0.as_slice() {
            [] => "Once".to_string(),
            [0, 1, 2, 3, 4, 5, 6] => "Everyday".to_string(),
            [1, 2, 3, 4, 5] => "Weekdays".to_string(),
            [0, 6] => "Weekends".to_string(),
            days => days
                .iter()
                .map(|day| WEEKDAY_SHORT_NAMES[usize::from(*day)])
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

impl Serialize for DaySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alarm {
    pub id: String,
    pub time: AlarmTime,
    pub label: String,
    pub is_active: bool,
    pub days: DaySet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart_prompt: Option<String>,
}

impl Alarm {
    pub fn is_one_shot(&self) -> bool {
        self.days.is_empty()
    }

    pub fn day_matches(&self, weekday: u8) -> bool {
        self.days.is_empty() || self.days.contains(weekday)
    }
}

/// An alarm before the store has assigned it an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAlarm {
    pub time: AlarmTime,
    pub label: String,
    pub is_active: bool,
    pub days: DaySet,
    pub smart_prompt: Option<String>,
}

impl NewAlarm {
    pub fn new(time: AlarmTime, label: impl Into<String>, days: DaySet) -> Self {
        Self {
            time,
            label: label.into(),
            is_active: true,
            days,
            smart_prompt: None,
        }
    }

    pub fn with_smart_prompt(mut self, prompt: Option<String>) -> Self {
        self.smart_prompt = normalize_prompt(prompt);
        self
    }

    pub fn into_alarm(self, id: String) -> Alarm {
        Alarm {
            id,
            time: self.time,
            label: self.label,
            is_active: self.is_active,
            days: self.days,
            smart_prompt: self.smart_prompt,
        }
    }
}

/// Blank personas are stored as absent so they never trigger a fetch.
pub fn normalize_prompt(prompt: Option<String>) -> Option<String> {
    prompt.and_then(|text| {
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

pub fn parse_alarm_slot_text(content: &str) -> Result<Vec<Alarm>> {
    let raw = serde_json::from_str::<Vec<AlarmFile>>(content).map_err(|err| {
        let line = err.line();
        let column = err.column();
        anyhow::anyhow!("invalid JSON at line {line}, column {column}: {err}")
    })?;

    let mut ids = HashSet::new();
    let mut alarms = Vec::with_capacity(raw.len());
    for alarm in raw {
        if !ids.insert(alarm.id.clone()) {
            bail!("duplicate alarm id found: {}", alarm.id);
        }
        let time = AlarmTime::parse(&alarm.time)
            .map_err(|err| anyhow::anyhow!("alarm '{}' has {err}", alarm.id))?;
        let days = DaySet::new(alarm.days)
            .map_err(|err| anyhow::anyhow!("alarm '{}': {err}", alarm.id))?;
        alarms.push(Alarm {
            id: alarm.id,
            time,
            label: alarm.label,
            is_active: alarm.is_active,
            days,
            smart_prompt: normalize_prompt(alarm.smart_prompt),
        });
    }
    Ok(alarms)
}

pub fn serialize_alarm_slot(alarms: &[Alarm]) -> Result<String> {
    Ok(serde_json::to_string_pretty(alarms)?)
}

/// Parses a create request as submitted by an input surface.
pub fn parse_new_alarm_json(content: &str) -> Result<NewAlarm> {
    let raw = serde_json::from_str::<NewAlarmFile>(content)
        .map_err(|err| anyhow::anyhow!("invalid alarm request: {err}"))?;
    Ok(NewAlarm {
        time: AlarmTime::parse(&raw.time)?,
        label: raw.label,
        is_active: raw.is_active,
        days: DaySet::new(raw.days)?,
        smart_prompt: normalize_prompt(raw.smart_prompt),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlarmFile {
    id: String,
    time: String,
    #[serde(default)]
    label: String,
    #[serde(default = "default_active")]
    is_active: bool,
    #[serde(default)]
    days: Vec<u8>,
    #[serde(default)]
    smart_prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewAlarmFile {
    time: String,
    #[serde(default)]
    label: String,
    #[serde(default = "default_active")]
    is_active: bool,
    #[serde(default)]
    days: Vec<u8>,
    #[serde(default)]
    smart_prompt: Option<String>,
}

fn default_active() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn parses_valid_alarm_slot() {
        let json = r#"
[
  {
    "id": "1760590800000",
    "time": "07:00",
    "label": "Work",
    "isActive": true,
    "days": [5, 1, 2, 3, 4]
  },
  {
    "id": "1760590800001",
    "time": "06:30",
    "label": "Flight",
    "isActive": false,
    "days": [],
    "smartPrompt": "a pirate captain"
  }
]
"#;

        let alarms = parse_alarm_slot_text(json).expect("valid slot");
        assert_eq!(alarms.len(), 2);
        assert_eq!(alarms[0].time.to_string(), "07:00");
        assert_eq!(alarms[0].days, DaySet::weekdays());
        assert!(alarms[0].smart_prompt.is_none());
        assert!(alarms[1].is_one_shot());
        assert!(!alarms[1].is_active);
        assert_eq!(alarms[1].smart_prompt.as_deref(), Some("a pirate captain"));
    }

    #[test]
    fn rejects_out_of_range_time() {
        let json = r#"[{ "id": "a", "time": "24:00", "label": "", "isActive": true, "days": [] }]"#;
        let err = parse_alarm_slot_text(json).expect_err("24:00 should fail");
        assert!(err.to_string().contains("invalid time"));
    }

    #[test]
    fn rejects_unpadded_time() {
        assert!(AlarmTime::parse("7:00").is_err());
        assert!(AlarmTime::parse("07:0").is_err());
        assert!(AlarmTime::parse("07-00").is_err());
        assert!(AlarmTime::parse("07:60").is_err());
        assert!(AlarmTime::parse("07:00:00").is_err());
    }

    #[test]
    fn rejects_duplicate_and_out_of_range_days() {
        let err = DaySet::new([1, 1]).expect_err("duplicate");
        assert!(err.to_string().contains("more than once"));
        let err = DaySet::new([7]).expect_err("out of range");
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let json = r#"
[
  { "id": "dup", "time": "07:00", "label": "a", "isActive": true, "days": [] },
  { "id": "dup", "time": "08:00", "label": "b", "isActive": true, "days": [] }
]
"#;
        let err = parse_alarm_slot_text(json).expect_err("duplicate ids should fail");
        assert!(err.to_string().contains("duplicate alarm id"));
    }

    #[test]
    fn serialized_slot_uses_stored_field_names() {
        let alarm = NewAlarm::new(
            AlarmTime::parse("07:05").expect("time"),
            "Gym",
            DaySet::new([1, 3]).expect("days"),
        )
        .with_smart_prompt(Some("  drill sergeant ".to_string()))
        .into_alarm("42".to_string());

        let text = serialize_alarm_slot(&[alarm]).expect("serialize");
        let value: serde_json::Value = serde_json::from_str(&text).expect("json");
        let entry = &value[0];
        assert_eq!(entry["id"], "42");
        assert_eq!(entry["time"], "07:05");
        assert_eq!(entry["isActive"], true);
        assert_eq!(entry["days"], serde_json::json!([1, 3]));
        assert_eq!(entry["smartPrompt"], "drill sergeant");
    }

    #[test]
    fn absent_prompt_is_omitted_from_slot() {
        let alarm = NewAlarm::new(AlarmTime::new(6, 0).expect("time"), "x", DaySet::once())
            .with_smart_prompt(Some("   ".to_string()))
            .into_alarm("1".to_string());
        let text = serialize_alarm_slot(&[alarm]).expect("serialize");
        assert!(!text.contains("smartPrompt"));
    }

    #[test]
    fn plus_minutes_wraps_midnight() {
        let late = AlarmTime::parse("23:58").expect("time");
        assert_eq!(late.plus_minutes(5).to_string(), "00:03");
        let early = AlarmTime::parse("00:02").expect("time");
        assert_eq!(early.plus_minutes(-5).to_string(), "23:57");
        assert_eq!(early.plus_minutes(MINUTES_PER_DAY).to_string(), "00:02");
    }

    #[test]
    fn weekday_index_starts_on_sunday() {
        let sunday = NaiveDate::from_ymd_opt(2026, 10, 11)
            .expect("date")
            .and_hms_opt(9, 0, 0)
            .expect("time");
        assert_eq!(weekday_index(&sunday), 0);
        let saturday = NaiveDate::from_ymd_opt(2026, 10, 17)
            .expect("date")
            .and_hms_opt(9, 0, 0)
            .expect("time");
        assert_eq!(weekday_index(&saturday), 6);
    }

    #[test]
    fn day_summary_names_common_sets() {
        assert_eq!(DaySet::once().summary(), "Once");
        assert_eq!(DaySet::weekdays().summary(), "Weekdays");
        assert_eq!(DaySet::new([6, 0]).expect("days").summary(), "Weekends");
        assert_eq!(DaySet::new(0..7).expect("days").summary(), "Everyday");
        assert_eq!(DaySet::new([3, 1]).expect("days").summary(), "Mon, Wed");
    }

    #[test]
    fn new_alarm_request_defaults_to_active() {
        let request = parse_new_alarm_json(r#"{ "time": "07:00", "label": "Morning Alarm" }"#)
            .expect("valid request");
        assert!(request.is_active);
        assert!(request.days.is_empty());
        assert!(parse_new_alarm_json(r#"{ "time": "7am" }"#).is_err());
    }
}
