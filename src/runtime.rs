use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{Local, NaiveDateTime, Timelike};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::alarm::model::{Alarm, NewAlarm};
use crate::alarm::scheduler::AlarmScheduler;
use crate::alarm::store::{AlarmSlot, AlarmStore};
use crate::alarm::transition::{self, Resolution, SNOOZE_ID_PREFIX};
use crate::tone::AlarmTone;
use crate::wake_message::{FALLBACK_ERROR, WakeMessageSource, spawn_fetch};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn same_minute(a: &NaiveDateTime, b: &NaiveDateTime) -> bool {
    a.date() == b.date() && a.hour() == b.hour() && a.minute() == b.minute()
}

/// Everything that can change runtime state. Processed strictly in arrival order.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    Tick(NaiveDateTime),
    Create(NewAlarm),
    Toggle(String),
    Delete(String),
    Stop(NaiveDateTime),
    Snooze(NaiveDateTime),
    WakeMessage { generation: u64, text: String },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "text", rename_all = "camelCase")]
pub enum WakeMessageState {
    /// The firing alarm has no persona.
    None,
    Loading,
    Ready(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FiringView {
    pub alarm: Alarm,
    pub generation: u64,
    pub fired_at: NaiveDateTime,
    pub message: WakeMessageState,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSnapshot {
    pub alarms: Vec<Alarm>,
    pub active_count: usize,
    pub firing: Option<FiringView>,
    pub tone_playing: bool,
    pub last_tick: Option<NaiveDateTime>,
}

struct Firing {
    generation: u64,
    fired_at: NaiveDateTime,
    message: WakeMessageState,
}

/// Single owner of alarm state, the scheduler and the tone.
///
/// Other threads (ticker, HTTP API, wake-message workers) only hold a
/// [`Sender`] and read the published [`RuntimeSnapshot`].
pub struct AlarmRuntime<S: AlarmSlot, T: AlarmTone> {
    store: AlarmStore<S>,
    scheduler: AlarmScheduler,
    tone: T,
    wake: Arc<dyn WakeMessageSource>,
    events_tx: Sender<RuntimeEvent>,
    events_rx: Receiver<RuntimeEvent>,
    generation: u64,
    firing: Option<Firing>,
    last_tick: Option<NaiveDateTime>,
    clock: fn() -> NaiveDateTime,
    snapshot: Arc<Mutex<RuntimeSnapshot>>,
}

impl<S: AlarmSlot, T: AlarmTone> AlarmRuntime<S, T> {
    pub fn new(store: AlarmStore<S>, tone: T, wake: Arc<dyn WakeMessageSource>) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        let runtime = Self {
            store,
            scheduler: AlarmScheduler::new(),
            tone,
            wake,
            events_tx,
            events_rx,
            generation: 0,
            firing: None,
            last_tick: None,
            clock: local_now,
            snapshot: Arc::new(Mutex::new(RuntimeSnapshot::default())),
        };
        runtime.publish();
        runtime
    }

    /// Replaces the wall clock used to reject ticks that sat in the queue.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn sender(&self) -> Sender<RuntimeEvent> {
        self.events_tx.clone()
    }

    pub fn snapshot_handle(&self) -> Arc<Mutex<RuntimeSnapshot>> {
        Arc::clone(&self.snapshot)
    }

    pub fn submit(&self, event: RuntimeEvent) {
        // The receiver lives in `self`, so this cannot fail.
        let _ = self.events_tx.send(event);
    }

    pub fn alarms(&self) -> &[Alarm] {
        self.store.alarms()
    }

    pub fn active_count(&self) -> usize {
        self.store.active_count()
    }

    pub fn firing(&self) -> Option<&Alarm> {
        self.scheduler.firing()
    }

    pub fn wake_message(&self) -> Option<&WakeMessageState> {
        self.firing.as_ref().map(|firing| &firing.message)
    }

    pub fn tone(&self) -> &T {
        &self.tone
    }

    /// Processes everything already queued. Returns `false` once shutdown was requested.
    pub fn drain_pending(&mut self) -> bool {
        while let Ok(event) = self.events_rx.try_recv() {
            if !self.handle(event) {
                return false;
            }
        }
        true
    }

    /// Waits up to `timeout` for one event. `None` on timeout.
    pub fn process_next(&mut self, timeout: Duration) -> Option<bool> {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => Some(self.handle(event)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(false),
        }
    }

    pub fn handle(&mut self, event: RuntimeEvent) -> bool {
        match event {
            RuntimeEvent::Tick(now) => self.on_tick(now),
            RuntimeEvent::Create(alarm) => self.on_create(alarm),
            RuntimeEvent::Toggle(id) => self.on_toggle(&id),
            RuntimeEvent::Delete(id) => self.on_delete(&id),
            RuntimeEvent::Stop(now) => self.resolve(Resolution::Stop, now),
            RuntimeEvent::Snooze(now) => self.resolve(Resolution::Snooze, now),
            RuntimeEvent::WakeMessage { generation, text } => {
                self.on_wake_message(generation, text)
            }
            RuntimeEvent::Shutdown => {
                self.tone.stop();
                info!("alarm runtime shutting down");
                self.publish();
                return false;
            }
        }
        self.publish();
        true
    }

    fn on_tick(&mut self, now: NaiveDateTime) {
        // Ticks queued while the consumer stalled must not fire late.
        let current = (self.clock)();
        if !same_minute(&now, &current) {
            debug!(%now, %current, "dropping stale tick");
            return;
        }
        self.last_tick = Some(now);
        let outcome = self.scheduler.tick(now, self.store.alarms());
        if outcome.deferred > 0 {
            debug!(
                matched = outcome.matched,
                deferred = outcome.deferred,
                "matching alarms skipped while another alarm is firing"
            );
        }
        let Some(alarm) = outcome.fired else {
            return;
        };

        self.generation += 1;
        let generation = self.generation;
        info!(id = %alarm.id, time = %alarm.time, label = %alarm.label, "alarm firing");
        debug!(key = ?self.scheduler.last_trigger_key(), generation, "trigger recorded");
        self.tone.start();

        let message = match alarm.smart_prompt.clone() {
            Some(prompt) => self.fetch_wake_message(generation, prompt, alarm.time.to_string()),
            None => WakeMessageState::None,
        };
        self.firing = Some(Firing {
            generation,
            fired_at: now,
            message,
        });
    }

    fn fetch_wake_message(&self, generation: u64, prompt: String, time: String) -> WakeMessageState {
        let events = self.events_tx.clone();
        let spawned = spawn_fetch(Arc::clone(&self.wake), prompt, time, move |text| {
            let _ = events.send(RuntimeEvent::WakeMessage { generation, text });
        });
        match spawned {
            Ok(()) => WakeMessageState::Loading,
            Err(err) => {
                warn!("unable to start wake-message worker: {err}");
                WakeMessageState::Ready(FALLBACK_ERROR.to_string())
            }
        }
    }

    fn on_wake_message(&mut self, generation: u64, text: String) {
        match self.firing.as_mut() {
            Some(firing)
                if firing.generation == generation && firing.message == WakeMessageState::Loading =>
            {
                debug!(generation, "wake message ready");
                firing.message = WakeMessageState::Ready(text);
            }
            _ => debug!(generation, "discarding stale wake message"),
        }
    }

    fn resolve(&mut self, resolution: Resolution, now: NaiveDateTime) {
        let Some(alarm) = self.scheduler.resolve() else {
            debug!(?resolution, "nothing firing");
            return;
        };
        self.tone.stop();
        self.firing = None;

        let plan = transition::plan(resolution, &alarm, &now);
        if let Some(id) = plan.deactivate
            && let Err(err) = self.store.set_active(&id, false)
        {
            warn!("failed to persist alarms: {err}");
        }
        match plan.insert {
            Some(snoozed) => match self.store.add_with_prefix(snoozed, SNOOZE_ID_PREFIX) {
                Ok(created) => {
                    info!(id = %alarm.id, snooze_id = %created.id, time = %created.time, "alarm snoozed")
                }
                Err(err) => warn!("failed to persist alarms: {err}"),
            },
            None => info!(id = %alarm.id, one_shot = alarm.is_one_shot(), "alarm stopped"),
        }
    }

    fn on_create(&mut self, alarm: NewAlarm) {
        let before = self.store.len();
        match self.store.add(alarm) {
            Ok(created) => info!(id = %created.id, time = %created.time, days = %created.days.summary(), "alarm created"),
            Err(err) if self.store.len() > before => warn!("alarm created but not saved: {err}"),
            Err(err) => warn!("alarm not created: {err}"),
        }
    }

    fn on_toggle(&mut self, id: &str) {
        match self.store.toggle(id) {
            Ok(Some(active)) => info!(id, active, "alarm toggled"),
            Ok(None) => debug!(id, "toggle ignored, unknown alarm"),
            Err(err) => warn!("failed to persist alarms: {err}"),
        }
    }

    fn on_delete(&mut self, id: &str) {
        match self.store.delete(id) {
            Ok(Some(_)) => info!(id, "alarm deleted"),
            Ok(None) => debug!(id, "delete ignored, unknown alarm"),
            Err(err) => warn!("failed to persist alarms: {err}"),
        }
    }

    fn publish(&self) {
        let firing = self
            .scheduler
            .firing()
            .zip(self.firing.as_ref())
            .map(|(alarm, state)| FiringView {
                alarm: alarm.clone(),
                generation: state.generation,
                fired_at: state.fired_at,
                message: state.message.clone(),
            });
        let snapshot = RuntimeSnapshot {
            alarms: self.store.alarms().to_vec(),
            active_count: self.store.active_count(),
            firing,
            tone_playing: self.tone.is_playing(),
            last_tick: self.last_tick,
        };
        if let Ok(mut guard) = self.snapshot.lock() {
            *guard = snapshot;
        }
    }
}

/// Sends [`RuntimeEvent::Tick`] with local wall-clock time every period.
pub struct Ticker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn start(events: Sender<RuntimeEvent>, period: Duration) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("alarm-ticker".to_string())
            .spawn(move || {
                while !stop_flag.load(Ordering::Relaxed) {
                    if events.send(RuntimeEvent::Tick(local_now())).is_err() {
                        break;
                    }
                    thread::sleep(period);
                }
            })?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use chrono::NaiveDate;

    use super::*;
    use crate::alarm::model::{AlarmTime, DaySet};
    use crate::alarm::store::MemorySlot;
    use crate::wake_message::{FALLBACK_EMPTY, WakeMessageError};

    #[derive(Clone, Default)]
    struct RecordingTone {
        calls: Arc<Mutex<Vec<&'static str>>>,
        playing: bool,
    }

    impl RecordingTone {
        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().expect("calls").clone()
        }
    }

    impl AlarmTone for RecordingTone {
        fn start(&mut self) {
            self.playing = true;
            self.calls.lock().expect("calls").push("start");
        }

        fn stop(&mut self) {
            self.playing = false;
            self.calls.lock().expect("calls").push("stop");
        }

        fn is_playing(&self) -> bool {
            self.playing
        }
    }

    struct Echo;

    impl WakeMessageSource for Echo {
        fn request(&self, prompt: &str, time: &str) -> Result<String, WakeMessageError> {
            Ok(format!("{prompt} says it is {time}"))
        }
    }

    struct Blank;

    impl WakeMessageSource for Blank {
        fn request(&self, _prompt: &str, _time: &str) -> Result<String, WakeMessageError> {
            Ok(String::new())
        }
    }

    struct Unreachable;

    impl WakeMessageSource for Unreachable {
        fn request(&self, _prompt: &str, _time: &str) -> Result<String, WakeMessageError> {
            Err(WakeMessageError::Transport("connection refused".to_string()))
        }
    }

    fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, day)
            .expect("date")
            .and_hms_opt(h, m, s)
            .expect("time")
    }

    thread_local! {
        static NOW: Cell<NaiveDateTime> = Cell::new(at(1, 0, 0, 0));
    }

    fn test_clock() -> NaiveDateTime {
        NOW.with(Cell::get)
    }

    fn set_now(now: NaiveDateTime) {
        NOW.with(|cell| cell.set(now));
    }

    fn tick(runtime: &mut AlarmRuntime<MemorySlot, RecordingTone>, now: NaiveDateTime) {
        set_now(now);
        runtime.handle(RuntimeEvent::Tick(now));
    }

    fn runtime_with(
        wake: Arc<dyn WakeMessageSource>,
        alarms: &[NewAlarm],
    ) -> (AlarmRuntime<MemorySlot, RecordingTone>, MemorySlot, RecordingTone) {
        let slot = MemorySlot::default();
        let tone = RecordingTone::default();
        let mut store = AlarmStore::load(slot.clone());
        for alarm in alarms {
            store.add(alarm.clone()).expect("seed alarm");
        }
        let runtime = AlarmRuntime::new(store, tone.clone(), wake).with_clock(test_clock);
        (runtime, slot, tone)
    }

    fn new_alarm(time: &str, label: &str, days: DaySet) -> NewAlarm {
        NewAlarm::new(AlarmTime::parse(time).expect("time"), label, days)
    }

    fn wait_for_message(runtime: &mut AlarmRuntime<MemorySlot, RecordingTone>) -> String {
        for _ in 0..50 {
            if let Some(WakeMessageState::Ready(text)) = runtime.wake_message() {
                return text.clone();
            }
            runtime.process_next(Duration::from_millis(100));
        }
        panic!("wake message never arrived");
    }

    #[test]
    fn weekday_alarm_fires_and_stop_keeps_it_scheduled() {
        let (mut runtime, slot, tone) =
            runtime_with(Arc::new(Echo), &[new_alarm("07:00", "Work", DaySet::weekdays())]);

        tick(&mut runtime, at(12, 6, 59, 59));
        assert!(runtime.firing().is_none());

        tick(&mut runtime, at(12, 7, 0, 0));
        assert_eq!(runtime.firing().map(|a| a.label.as_str()), Some("Work"));
        assert_eq!(runtime.wake_message(), Some(&WakeMessageState::None));
        assert!(tone.calls().contains(&"start"));

        let snapshot = runtime.snapshot_handle();
        assert!(snapshot.lock().expect("snapshot").tone_playing);

        runtime.handle(RuntimeEvent::Stop(at(12, 7, 0, 20)));
        assert!(runtime.firing().is_none());
        assert!(!runtime.tone().is_playing());
        assert_eq!(runtime.alarms().len(), 1);
        assert!(runtime.alarms()[0].is_active);
        assert!(snapshot.lock().expect("snapshot").firing.is_none());

        tick(&mut runtime, at(12, 7, 0, 30));
        assert!(runtime.firing().is_none());
        assert!(slot.content().is_some());
    }

    #[test]
    fn snooze_appends_one_shot_five_minutes_later() {
        let (mut runtime, slot, _tone) =
            runtime_with(Arc::new(Echo), &[new_alarm("06:30", "Flight", DaySet::once())]);
        let original = runtime.alarms()[0].clone();

        tick(&mut runtime, at(12, 6, 30, 0));
        assert!(runtime.firing().is_some());
        runtime.handle(RuntimeEvent::Snooze(at(12, 6, 31, 0)));

        assert!(runtime.firing().is_none());
        assert_eq!(runtime.alarms().len(), 2);
        assert_eq!(runtime.alarms()[0], original);
        let snoozed = runtime.alarms()[1].clone();
        assert_eq!(snoozed.time.to_string(), "06:36");
        assert_eq!(snoozed.label, "Snooze: Flight");
        assert!(snoozed.days.is_empty());
        assert!(snoozed.is_active);
        assert!(snoozed.id.starts_with("snooze-"));

        let reloaded = AlarmStore::load(slot);
        assert_eq!(reloaded.len(), 2);

        tick(&mut runtime, at(12, 6, 36, 0));
        assert_eq!(runtime.firing().map(|a| a.id.clone()), Some(snoozed.id.clone()));
    }

    #[test]
    fn stopping_one_shot_deactivates_it() {
        let (mut runtime, _slot, _tone) =
            runtime_with(Arc::new(Echo), &[new_alarm("21:15", "Meds", DaySet::once())]);

        tick(&mut runtime, at(16, 21, 15, 3));
        runtime.handle(RuntimeEvent::Stop(at(16, 21, 15, 9)));
        assert!(!runtime.alarms()[0].is_active);

        tick(&mut runtime, at(17, 21, 15, 0));
        assert!(runtime.firing().is_none());
    }

    #[test]
    fn persona_alarm_shows_generated_message() {
        let alarm = new_alarm("07:00", "Sail", DaySet::once())
            .with_smart_prompt(Some("a pirate captain".to_string()));
        let (mut runtime, _slot, _tone) = runtime_with(Arc::new(Echo), &[alarm]);

        tick(&mut runtime, at(12, 7, 0, 0));
        assert_eq!(runtime.wake_message(), Some(&WakeMessageState::Loading));
        assert_eq!(wait_for_message(&mut runtime), "a pirate captain says it is 07:00");
    }

    #[test]
    fn empty_reply_uses_default_line() {
        let alarm =
            new_alarm("07:00", "Sail", DaySet::once()).with_smart_prompt(Some("calm".to_string()));
        let (mut runtime, _slot, _tone) = runtime_with(Arc::new(Blank), &[alarm]);
        tick(&mut runtime, at(12, 7, 0, 0));
        assert_eq!(wait_for_message(&mut runtime), FALLBACK_EMPTY);
    }

    #[test]
    fn failed_fetch_shows_fallback_and_controls_still_work() {
        let alarm = new_alarm("07:00", "Gym", DaySet::weekdays())
            .with_smart_prompt(Some("drill sergeant".to_string()));
        let (mut runtime, _slot, tone) = runtime_with(Arc::new(Unreachable), &[alarm]);

        tick(&mut runtime, at(12, 7, 0, 0));
        assert_eq!(wait_for_message(&mut runtime), FALLBACK_ERROR);
        assert!(runtime.tone().is_playing());

        runtime.handle(RuntimeEvent::Snooze(at(12, 7, 1, 0)));
        assert!(runtime.firing().is_none());
        assert_eq!(runtime.alarms().len(), 2);
        assert_eq!(tone.calls(), vec!["start", "stop"]);
    }

    #[test]
    fn stale_wake_message_is_discarded() {
        let alarms = [
            new_alarm("07:00", "First", DaySet::once()).with_smart_prompt(Some("a".to_string())),
            new_alarm("07:05", "Second", DaySet::once()).with_smart_prompt(Some("b".to_string())),
        ];
        let (mut runtime, _slot, _tone) = runtime_with(Arc::new(Echo), &alarms);

        tick(&mut runtime, at(12, 7, 0, 0));
        runtime.handle(RuntimeEvent::Stop(at(12, 7, 0, 5)));
        tick(&mut runtime, at(12, 7, 5, 0));
        assert_eq!(runtime.firing().map(|a| a.label.as_str()), Some("Second"));

        runtime.handle(RuntimeEvent::WakeMessage {
            generation: 1,
            text: "late reply for the first alarm".to_string(),
        });
        assert_eq!(runtime.wake_message(), Some(&WakeMessageState::Loading));

        runtime.handle(RuntimeEvent::WakeMessage {
            generation: 2,
            text: "fresh".to_string(),
        });
        assert_eq!(
            runtime.wake_message(),
            Some(&WakeMessageState::Ready("fresh".to_string()))
        );
    }

    #[test]
    fn stop_and_snooze_without_firing_are_ignored() {
        let (mut runtime, slot, tone) =
            runtime_with(Arc::new(Echo), &[new_alarm("07:00", "Work", DaySet::once())]);
        let before = slot.content();

        runtime.handle(RuntimeEvent::Stop(at(12, 8, 0, 0)));
        runtime.handle(RuntimeEvent::Snooze(at(12, 8, 0, 0)));
        assert_eq!(runtime.alarms().len(), 1);
        assert!(runtime.alarms()[0].is_active);
        assert_eq!(slot.content(), before);
        assert!(tone.calls().is_empty());
    }

    #[test]
    fn queued_commands_apply_in_arrival_order() {
        let (mut runtime, _slot, _tone) = runtime_with(Arc::new(Echo), &[]);
        let sender = runtime.sender();

        sender
            .send(RuntimeEvent::Create(new_alarm("08:00", "Coffee", DaySet::once())))
            .expect("send");
        assert!(runtime.drain_pending());
        let id = runtime.alarms()[0].id.clone();

        sender.send(RuntimeEvent::Toggle(id.clone())).expect("send");
        sender.send(RuntimeEvent::Toggle(id.clone())).expect("send");
        sender.send(RuntimeEvent::Toggle(id.clone())).expect("send");
        assert!(runtime.drain_pending());
        assert!(!runtime.alarms()[0].is_active);
        assert_eq!(runtime.active_count(), 0);

        sender.send(RuntimeEvent::Delete(id)).expect("send");
        sender.send(RuntimeEvent::Shutdown).expect("send");
        sender
            .send(RuntimeEvent::Create(new_alarm("09:00", "Late", DaySet::once())))
            .expect("send");
        assert!(!runtime.drain_pending());
        assert!(runtime.alarms().is_empty());
    }

    #[test]
    fn deleting_inactive_alarm_keeps_other_alarm_firing() {
        let (mut runtime, _slot, _tone) = runtime_with(
            Arc::new(Echo),
            &[
                new_alarm("07:00", "Work", DaySet::weekdays()),
                new_alarm("09:00", "Later", DaySet::once()),
            ],
        );
        let later = runtime.alarms()[1].id.clone();
        tick(&mut runtime, at(12, 7, 0, 0));
        runtime.handle(RuntimeEvent::Delete(later));
        assert_eq!(runtime.alarms().len(), 1);
        assert_eq!(runtime.firing().map(|a| a.label.as_str()), Some("Work"));
    }

    #[test]
    fn tick_drained_after_its_minute_passed_does_not_fire() {
        let (mut runtime, _slot, tone) =
            runtime_with(Arc::new(Echo), &[new_alarm("07:00", "Work", DaySet::weekdays())]);

        runtime.submit(RuntimeEvent::Tick(at(12, 7, 0, 0)));
        set_now(at(12, 7, 40, 0));
        assert!(runtime.drain_pending());
        assert!(runtime.firing().is_none());
        assert!(tone.calls().is_empty());
        assert!(runtime.snapshot_handle().lock().expect("snapshot").last_tick.is_none());

        runtime.submit(RuntimeEvent::Tick(at(12, 7, 0, 59)));
        set_now(at(12, 7, 0, 59));
        assert!(runtime.drain_pending());
        assert_eq!(runtime.firing().map(|a| a.label.as_str()), Some("Work"));
    }

    #[test]
    fn ticker_sends_ticks_until_dropped() {
        let (tx, rx) = mpsc::channel();
        let ticker = Ticker::start(tx, Duration::from_millis(10)).expect("ticker");
        let first = rx.recv_timeout(Duration::from_secs(2)).expect("tick");
        assert!(matches!(first, RuntimeEvent::Tick(_)));
        drop(ticker);
        while rx.try_recv().is_ok() {}
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }
}
