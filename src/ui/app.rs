use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::{DateTime, Local};
use eframe::egui::{self, Align, Color32, Layout, RichText, ScrollArea, TextEdit, TopBottomPanel, Ui};

use crate::alarm::model::{AlarmTime, DaySet, NewAlarm, WEEKDAY_SHORT_NAMES};
use crate::alarm::store::AlarmSlot;
use crate::runtime::{AlarmRuntime, RuntimeEvent, Ticker, WakeMessageState, local_now};
use crate::tone::AlarmTone;

const REPAINT_INTERVAL: Duration = Duration::from_millis(250);
const DEFAULT_FORM_TIME: &str = "07:00";
const DEFAULT_FORM_LABEL: &str = "Morning Alarm";
const NO_PERSONA_LINE: &str = "Time to wake up!";

const ACCENT: Color32 = Color32::from_rgb(59, 130, 246);
const MUTED: Color32 = Color32::from_rgb(100, 116, 139);
const DANGER: Color32 = Color32::from_rgb(248, 113, 113);

pub fn run_gui<S, T>(runtime: AlarmRuntime<S, T>, ticker: Ticker, api_url: Option<String>) -> Result<()>
where
    S: AlarmSlot + 'static,
    T: AlarmTone + 'static,
{
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Lumina")
            .with_inner_size([520.0, 760.0])
            .with_min_inner_size([420.0, 560.0]),
        ..Default::default()
    };

    let app = LuminaApp::new(runtime, ticker, api_url);

    eframe::run_native(
        "Lumina",
        native_options,
        Box::new(move |cc| {
            configure_theme(&cc.egui_ctx);
            Ok(Box::new(app))
        }),
    )
    .map_err(|err| anyhow::anyhow!("failed to launch Lumina GUI: {err}"))?;

    Ok(())
}

fn configure_theme(ctx: &egui::Context) {
    let mut visuals = egui::Visuals::dark();
    visuals.override_text_color = Some(Color32::from_rgb(226, 232, 240));
    visuals.panel_fill = Color32::from_rgb(2, 6, 23);
    visuals.window_fill = Color32::from_rgb(15, 23, 42);
    visuals.widgets.inactive.bg_fill = Color32::from_rgb(30, 41, 59);
    visuals.widgets.hovered.bg_fill = Color32::from_rgb(51, 65, 85);
    visuals.widgets.active.bg_fill = Color32::from_rgb(37, 99, 235);
    visuals.selection.bg_fill = ACCENT;
    ctx.set_visuals(visuals);
}

/// Editable state of the "New Alarm" form.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AlarmForm {
    time: String,
    label: String,
    /// Indexed 0=Sunday..6=Saturday.
    days: [bool; 7],
    persona: String,
}

impl Default for AlarmForm {
    fn default() -> Self {
        Self {
            time: DEFAULT_FORM_TIME.to_string(),
            label: DEFAULT_FORM_LABEL.to_string(),
            days: [false, true, true, true, true, true, false],
            persona: String::new(),
        }
    }
}

impl AlarmForm {
    fn to_new_alarm(&self) -> Result<NewAlarm> {
        let time = AlarmTime::parse(self.time.trim())?;
        let days = DaySet::new(
            self.days
                .iter()
                .enumerate()
                .filter(|(_, selected)| **selected)
                .map(|(index, _)| index as u8),
        )?;
        Ok(NewAlarm::new(time, self.label.trim(), days)
            .with_smart_prompt(Some(self.persona.clone())))
    }
}

#[derive(Debug, Clone)]
struct AlarmRow {
    id: String,
    time: String,
    label: String,
    repeat: String,
    has_persona: bool,
    is_active: bool,
}

struct LuminaApp<S: AlarmSlot, T: AlarmTone> {
    runtime: AlarmRuntime<S, T>,
    _ticker: Ticker,
    api_url: Option<String>,
    form: AlarmForm,
    status_message: Option<(String, Instant)>,
}

impl<S: AlarmSlot, T: AlarmTone> LuminaApp<S, T> {
    fn new(runtime: AlarmRuntime<S, T>, ticker: Ticker, api_url: Option<String>) -> Self {
        Self {
            runtime,
            _ticker: ticker,
            api_url,
            form: AlarmForm::default(),
            status_message: None,
        }
    }

    fn set_status(&mut self, text: impl Into<String>, ttl: Duration) {
        self.status_message = Some((text.into(), Instant::now() + ttl));
    }

    fn show_header(&mut self, ui: &mut Ui, now: DateTime<Local>) {
        ui.vertical_centered(|ui| {
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                ui.label(
                    RichText::new(now.format("%H:%M").to_string())
                        .size(64.0)
                        .strong(),
                );
                ui.label(
                    RichText::new(now.format("%S").to_string())
                        .size(28.0)
                        .color(MUTED),
                );
            });
            ui.label(
                RichText::new(now.format("%A, %B %-d").to_string())
                    .size(18.0)
                    .color(MUTED),
            );
            if let Some((msg, _)) = &self.status_message {
                ui.label(RichText::new(msg).color(ACCENT).strong());
            }
            ui.add_space(4.0);
        });
    }

    fn show_alarm_list(&mut self, ui: &mut Ui) {
        let rows: Vec<AlarmRow> = self
            .runtime
            .alarms()
            .iter()
            .map(|alarm| AlarmRow {
                id: alarm.id.clone(),
                time: alarm.time.to_string(),
                label: alarm.label.clone(),
                repeat: alarm.days.summary(),
                has_persona: alarm.smart_prompt.is_some(),
                is_active: alarm.is_active,
            })
            .collect();

        ui.horizontal(|ui| {
            ui.heading(RichText::new("Alarms").strong());
            ui.label(
                RichText::new(format!("{} active", self.runtime.active_count())).color(MUTED),
            );
        });
        ui.add_space(4.0);

        if rows.is_empty() {
            ui.label(RichText::new("No alarms set.").color(MUTED));
            return;
        }

        let mut toggled: Option<String> = None;
        let mut removed: Option<String> = None;
        ScrollArea::vertical()
            .id_salt("alarms_scroll")
            .show(ui, |ui| {
                egui::Grid::new("alarms_grid")
                    .striped(true)
                    .num_columns(5)
                    .show(ui, |ui| {
                        for row in &rows {
                            let color = if row.is_active { Color32::WHITE } else { MUTED };
                            ui.label(RichText::new(&row.time).size(24.0).monospace().color(color));
                            ui.vertical(|ui| {
                                ui.label(RichText::new(&row.label).color(color));
                                ui.label(RichText::new(&row.repeat).small().color(MUTED));
                            });
                            ui.label(if row.has_persona { "AI" } else { "" });
                            let mut active = row.is_active;
                            if ui.checkbox(&mut active, "").changed() {
                                toggled = Some(row.id.clone());
                            }
                            if ui
                                .add(
                                    egui::Button::new(RichText::new("Delete").color(DANGER))
                                        .fill(Color32::from_rgb(51, 20, 24)),
                                )
                                .clicked()
                            {
                                removed = Some(row.id.clone());
                            }
                            ui.end_row();
                        }
                    });
            });

        if let Some(id) = toggled {
            self.runtime.submit(RuntimeEvent::Toggle(id));
        }
        if let Some(id) = removed {
            self.runtime.submit(RuntimeEvent::Delete(id));
            self.set_status("Alarm deleted.", Duration::from_secs(2));
        }
    }

    fn show_form(&mut self, ui: &mut Ui) {
        ui.heading(RichText::new("New Alarm").strong());
        ui.add_space(6.0);
        ui.horizontal(|ui| {
            ui.label("Time");
            ui.add(
                TextEdit::singleline(&mut self.form.time)
                    .hint_text("HH:mm")
                    .desired_width(80.0),
            );
        });
        ui.horizontal_wrapped(|ui| {
            for (index, name) in WEEKDAY_SHORT_NAMES.iter().enumerate() {
                ui.toggle_value(&mut self.form.days[index], *name);
            }
        });
        ui.label("Label");
        ui.add(TextEdit::singleline(&mut self.form.label).desired_width(f32::INFINITY));
        ui.label("Wake-up persona (optional)");
        ui.add(
            TextEdit::multiline(&mut self.form.persona)
                .hint_text("e.g. a pirate captain who loves coffee")
                .desired_rows(2)
                .desired_width(f32::INFINITY),
        );
        ui.add_space(6.0);
        ui.horizontal(|ui| {
            if ui
                .add(egui::Button::new(RichText::new("Save Alarm").strong()).fill(ACCENT))
                .clicked()
            {
                match self.form.to_new_alarm() {
                    Ok(alarm) => {
                        self.runtime.submit(RuntimeEvent::Create(alarm));
                        self.form = AlarmForm::default();
                        self.set_status("Alarm saved.", Duration::from_secs(2));
                    }
                    Err(err) => self.set_status(format!("{err:#}"), Duration::from_secs(4)),
                }
            }
            if ui.button("Reset").clicked() {
                self.form = AlarmForm::default();
            }
        });
    }

    /// Full-screen alert. Takes over the window until Stop or Snooze.
    fn show_firing_overlay(&mut self, ui: &mut Ui) {
        let Some(alarm) = self.runtime.firing().cloned() else {
            return;
        };
        let message = self.runtime.wake_message().cloned();

        ui.with_layout(Layout::top_down(Align::Center), |ui| {
            ui.add_space(ui.available_height() * 0.15);
            ui.label(
                RichText::new(alarm.time.to_string())
                    .size(72.0)
                    .strong(),
            );
            ui.label(RichText::new(&alarm.label).size(26.0).color(ACCENT));
            if !self.runtime.tone().is_playing() {
                ui.label(RichText::new("No audio output").small().color(DANGER));
            }
            ui.add_space(16.0);
            match message {
                Some(WakeMessageState::Loading) => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(RichText::new("Generating wake-up message...").color(MUTED));
                    });
                }
                Some(WakeMessageState::Ready(text)) => {
                    ui.label(RichText::new(format!("\"{text}\"")).size(18.0).italics());
                }
                Some(WakeMessageState::None) | None => {
                    ui.label(RichText::new(NO_PERSONA_LINE).color(MUTED));
                }
            }
            ui.add_space(32.0);
            ui.horizontal(|ui| {
                let snooze = ui.add(
                    egui::Button::new(RichText::new("Snooze 5m").size(20.0))
                        .min_size(egui::vec2(160.0, 48.0)),
                );
                let stop = ui.add(
                    egui::Button::new(RichText::new("Stop").size(20.0).strong())
                        .fill(ACCENT)
                        .min_size(egui::vec2(160.0, 48.0)),
                );
                let now = local_now();
                if snooze.clicked() {
                    self.runtime.submit(RuntimeEvent::Snooze(now));
                } else if stop.clicked() {
                    self.runtime.submit(RuntimeEvent::Stop(now));
                }
            });
        });
    }
}

impl<S: AlarmSlot, T: AlarmTone> eframe::App for LuminaApp<S, T> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some((_, expires_at)) = &self.status_message
            && Instant::now() >= *expires_at
        {
            self.status_message = None;
        }

        self.runtime.drain_pending();

        let now = Local::now();
        if self.runtime.firing().is_some() {
            egui::CentralPanel::default().show(ctx, |ui| self.show_firing_overlay(ui));
        } else {
            TopBottomPanel::top("header")
                .resizable(false)
                .show(ctx, |ui| self.show_header(ui, now));

            if let Some(url) = &self.api_url {
                TopBottomPanel::bottom("footer")
                    .resizable(false)
                    .show(ctx, |ui| {
                        ui.label(RichText::new(format!("API {url}/v1/state")).small().color(MUTED));
                    });
            }

            egui::SidePanel::right("form_panel")
                .resizable(true)
                .min_width(220.0)
                .default_width(240.0)
                .show(ctx, |ui| self.show_form(ui));

            egui::CentralPanel::default().show(ctx, |ui| self.show_alarm_list(ui));
        }

        // Apply clicks from this frame before the next repaint.
        self.runtime.drain_pending();
        ctx.request_repaint_after(REPAINT_INTERVAL);
    }
}

impl<S: AlarmSlot, T: AlarmTone> Drop for LuminaApp<S, T> {
    fn drop(&mut self) {
        // Window closed: silence any ringing alarm before the output is released.
        self.runtime.handle(RuntimeEvent::Shutdown);
    }
}
