use std::fs;
use std::io;
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::alarm::model::{Alarm, NewAlarm, parse_alarm_slot_text, serialize_alarm_slot};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unable to read alarm slot {location}: {source}")]
    Read {
        location: String,
        #[source]
        source: io::Error,
    },
    #[error("unable to write alarm slot {location}: {source}")]
    Write {
        location: String,
        #[source]
        source: io::Error,
    },
    #[error("unable to serialize alarms: {0}")]
    Serialize(String),
    #[error("alarm slot lock poisoned")]
    Poisoned,
}

/// A single persistent key-value entry holding the serialized alarm list.
pub trait AlarmSlot {
    fn read(&self) -> Result<Option<String>, StoreError>;
    fn write(&self, payload: &str) -> Result<(), StoreError>;
    fn describe(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct JsonFileSlot {
    path: PathBuf,
}

impl JsonFileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AlarmSlot for JsonFileSlot {
    fn read(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                location: self.describe(),
                source,
            }),
        }
    }

    fn write(&self, payload: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                location: self.describe(),
                source,
            })?;
        }
        fs::write(&self.path, format!("{payload}\n")).map_err(|source| StoreError::Write {
            location: self.describe(),
            source,
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Shared in-process slot; clones observe the same entry.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    entry: Arc<Mutex<Option<String>>>,
}

#[cfg(test)]
impl MemorySlot {
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            entry: Arc::new(Mutex::new(Some(content.into()))),
        }
    }

    pub fn content(&self) -> Option<String> {
        self.entry.lock().ok().and_then(|guard| guard.clone())
    }
}

#[cfg(test)]
impl AlarmSlot for MemorySlot {
    fn read(&self) -> Result<Option<String>, StoreError> {
        let guard = self.entry.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(guard.clone())
    }

    fn write(&self, payload: &str) -> Result<(), StoreError> {
        let mut guard = self.entry.lock().map_err(|_| StoreError::Poisoned)?;
        *guard = Some(payload.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Clock-derived id generator; never hands out the same value twice in a session.
#[derive(Debug, Default)]
struct IdSource {
    last_ms: i64,
}

impl IdSource {
    fn next(&mut self) -> i64 {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or(0);
        self.last_ms = now_ms.max(self.last_ms + 1);
        self.last_ms
    }
}

/// Ordered alarm list mirrored to an [`AlarmSlot`].
///
/// The in-memory list is authoritative. Every mutation rewrites the whole list;
/// a failed write is reported to the caller but not rolled back, and the next
/// successful mutation brings the slot back in line.
pub struct AlarmStore<S: AlarmSlot> {
    slot: S,
    alarms: Vec<Alarm>,
    ids: IdSource,
}

impl<S: AlarmSlot> AlarmStore<S> {
    /// Loads the persisted list. Missing, unreadable or malformed state yields an empty store.
    pub fn load(slot: S) -> Self {
        let alarms = match slot.read() {
            Ok(Some(content)) => match parse_alarm_slot_text(&content) {
                Ok(alarms) => alarms,
                Err(err) => {
                    warn!(slot = %slot.describe(), "ignoring malformed alarm slot: {err:#}");
                    Vec::new()
                }
            },
            Ok(None) => {
                debug!(slot = %slot.describe(), "no stored alarms yet");
                Vec::new()
            }
            Err(err) => {
                warn!("{err}");
                Vec::new()
            }
        };
        info!(slot = %slot.describe(), count = alarms.len(), "loaded alarms");
        Self {
            slot,
            alarms,
            ids: IdSource::default(),
        }
    }

    pub fn alarms(&self) -> &[Alarm] {
        &self.alarms
    }

    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.alarms.iter().filter(|alarm| alarm.is_active).count()
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    pub fn add(&mut self, alarm: NewAlarm) -> Result<Alarm, StoreError> {
        let id = self.ids.next().to_string();
        self.insert(alarm.into_alarm(id))
    }

    /// Like [`AlarmStore::add`] but the id carries a prefix, e.g. `snooze-1760590800000`.
    pub fn add_with_prefix(&mut self, alarm: NewAlarm, prefix: &str) -> Result<Alarm, StoreError> {
        let id = format!("{prefix}-{}", self.ids.next());
        self.insert(alarm.into_alarm(id))
    }

    fn insert(&mut self, alarm: Alarm) -> Result<Alarm, StoreError> {
        self.alarms.push(alarm.clone());
        self.persist()?;
        Ok(alarm)
    }

    /// Flips `is_active`. Returns the new state, or `None` when the id is unknown.
    pub fn toggle(&mut self, id: &str) -> Result<Option<bool>, StoreError> {
        let Some(alarm) = self.alarms.iter_mut().find(|alarm| alarm.id == id) else {
            return Ok(None);
        };
        alarm.is_active = !alarm.is_active;
        let state = alarm.is_active;
        self.persist()?;
        Ok(Some(state))
    }

    /// Sets `is_active` explicitly; writes only when the value changes.
    pub fn set_active(&mut self, id: &str, active: bool) -> Result<bool, StoreError> {
        let Some(alarm) = self.alarms.iter_mut().find(|alarm| alarm.id == id) else {
            return Ok(false);
        };
        if alarm.is_active == active {
            return Ok(true);
        }
        alarm.is_active = active;
        self.persist()?;
        Ok(true)
    }

    pub fn delete(&mut self, id: &str) -> Result<Option<Alarm>, StoreError> {
        let Some(index) = self.alarms.iter().position(|alarm| alarm.id == id) else {
            return Ok(None);
        };
        let removed = self.alarms.remove(index);
        self.persist()?;
        Ok(Some(removed))
    }

    fn persist(&self) -> Result<(), StoreError> {
        let payload = serialize_alarm_slot(&self.alarms)
            .map_err(|err| StoreError::Serialize(err.to_string()))?;
        self.slot.write(&payload)
    }
}
