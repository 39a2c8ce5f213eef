mod alarm;
mod api;
mod config;
mod logging;
mod runtime;
mod tone;
mod ui;
mod wake_message;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use crate::alarm::store::{AlarmStore, JsonFileSlot};
use crate::api::{ApiContext, ApiServer, ApiServerConfig};
use crate::config::{
    ApiSettings, AppConfig, DEFAULT_ALARM_FILE, DEFAULT_API_BIND, DEFAULT_API_PORT, RunMode,
    resolve_api_key,
};
use crate::runtime::{AlarmRuntime, TICK_PERIOD, Ticker};
use crate::tone::{AlarmTone, SilentTone, SquareTone};
use crate::wake_message::{DEFAULT_MODEL, GeminiClient};

#[derive(Parser, Debug)]
#[command(
    name = "lumina",
    version,
    about = "Desktop alarm clock with repeat days, snooze and AI wake-up messages"
)]
struct Cli {
    /// JSON file holding the alarm list.
    #[arg(long, default_value = DEFAULT_ALARM_FILE)]
    alarms: PathBuf,

    #[arg(long, default_value = DEFAULT_API_BIND)]
    api_bind: String,

    #[arg(long, default_value_t = DEFAULT_API_PORT)]
    api_port: u16,

    /// Do not start the local HTTP API.
    #[arg(long)]
    no_api: bool,

    /// Run the scheduler and API without a window.
    #[arg(long, conflicts_with = "list")]
    headless: bool,

    /// Print stored alarms and exit.
    #[arg(long)]
    list: bool,

    /// Keep the alarm tone silent.
    #[arg(long)]
    no_sound: bool,

    /// Credential for wake-up messages (falls back to API_KEY).
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, default_value = DEFAULT_MODEL)]
    wake_model: String,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> AppConfig {
        let mode = if self.list {
            RunMode::List
        } else if self.headless {
            RunMode::Headless
        } else {
            RunMode::Gui
        };
        AppConfig {
            alarm_file: self.alarms,
            mode,
            api: (!self.no_api).then_some(ApiSettings {
                bind_addr: self.api_bind,
                port: self.api_port,
            }),
            sound: !self.no_sound,
            api_key: resolve_api_key(self.api_key, |name| std::env::var(name).ok()),
            wake_model: self.wake_model,
            verbose: self.verbose,
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = Cli::parse().into_config();
    config.validate()?;
    logging::init_tracing(config.verbose)?;

    let store = AlarmStore::load(JsonFileSlot::new(&config.alarm_file));
    if config.mode == RunMode::List {
        print_alarms(&store);
        return Ok(());
    }

    let tone: Box<dyn AlarmTone> = if config.sound {
        Box::new(SquareTone::new())
    } else {
        Box::new(SilentTone::default())
    };
    let wake = GeminiClient::new(config.api_key.clone(), config.wake_model.clone());
    if !wake.has_credential() {
        info!("no API key set, persona alarms will show a fixed wake-up line");
    }
    let mut runtime = AlarmRuntime::new(store, tone, Arc::new(wake));

    let api_server = match &config.api {
        Some(api) => Some(
            ApiServer::start(
                ApiServerConfig {
                    bind_addr: api.bind_addr.clone(),
                    port: api.port,
                },
                ApiContext {
                    snapshot: runtime.snapshot_handle(),
                    events: runtime.sender(),
                },
            )
            .with_context(|| {
                format!(
                    "failed to start local API at {}:{}",
                    api.bind_addr, api.port
                )
            })?,
        ),
        None => None,
    };
    let ticker = Ticker::start(runtime.sender(), TICK_PERIOD).context("failed to start ticker")?;

    let result = match config.mode {
        RunMode::Headless => {
            info!(alarms = %config.alarm_file.display(), "running headless");
            while runtime.process_next(TICK_PERIOD) != Some(false) {}
            drop(ticker);
            Ok(())
        }
        _ => {
            let api_url = api_server
                .as_ref()
                .and_then(ApiServer::local_addr)
                .map(|addr| format!("http://{addr}"));
            ui::app::run_gui(runtime, ticker, api_url)
        }
    };

    drop(api_server);
    result
}

fn print_alarms(store: &AlarmStore<JsonFileSlot>) {
    if store.is_empty() {
        println!("No alarms in {}", store.slot().path().display());
        return;
    }
    for alarm in store.alarms() {
        let state = if alarm.is_active { "on " } else { "off" };
        let persona = alarm
            .smart_prompt
            .as_deref()
            .map(|prompt| format!("  persona: {prompt}"))
            .unwrap_or_default();
        println!(
            "{}  {state}  {:<24} {}{persona}",
            alarm.time,
            alarm.label,
            alarm.days.summary()
        );
    }
    println!("{} alarm(s), {} active", store.len(), store.active_count());
}
