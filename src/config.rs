use std::path::PathBuf;

use anyhow::{Result, bail};

use crate::wake_message::DEFAULT_MODEL;

pub const DEFAULT_ALARM_FILE: &str = "alarms.json";
pub const DEFAULT_API_BIND: &str = "127.0.0.1";
pub const DEFAULT_API_PORT: u16 = 8099;
/// Secondary credential variable, read when `GEMINI_API_KEY` is unset.
pub const FALLBACK_KEY_ENV: &str = "API_KEY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    Gui,
    Headless,
    List,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub bind_addr: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub alarm_file: PathBuf,
    pub mode: RunMode,
    pub api: Option<ApiSettings>,
    pub sound: bool,
    pub api_key: Option<String>,
    pub wake_model: String,
    pub verbose: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            alarm_file: PathBuf::from(DEFAULT_ALARM_FILE),
            mode: RunMode::Gui,
            api: Some(ApiSettings {
                bind_addr: DEFAULT_API_BIND.to_string(),
                port: DEFAULT_API_PORT,
            }),
            sound: true,
            api_key: None,
            wake_model: DEFAULT_MODEL.to_string(),
            verbose: false,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(api) = &self.api {
            if api.port == 0 {
                bail!("--api-port must be greater than zero");
            }
            if api.bind_addr.trim().is_empty() {
                bail!("--api-bind must not be empty");
            }
        }
        if self.wake_model.trim().is_empty() {
            bail!("--wake-model must not be empty");
        }
        if self.alarm_file.as_os_str().is_empty() {
            bail!("--alarms must name a file");
        }
        Ok(())
    }
}

/// First non-blank value wins: explicit flag (or `GEMINI_API_KEY`), then `API_KEY`.
pub fn resolve_api_key<F>(explicit: Option<String>, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    explicit
        .filter(|key| !key.trim().is_empty())
        .or_else(|| lookup(FALLBACK_KEY_ENV).filter(|key| !key.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().expect("defaults validate");
        assert_eq!(
            config.api,
            Some(ApiSettings {
                bind_addr: "127.0.0.1".to_string(),
                port: 8099,
            })
        );
        assert_eq!(config.wake_model, "gemini-2.5-flash");
    }

    #[test]
    fn zero_port_is_rejected() {
        let config = AppConfig {
            api: Some(ApiSettings {
                bind_addr: DEFAULT_API_BIND.to_string(),
                port: 0,
            }),
            ..AppConfig::default()
        };
        let err = config.validate().expect_err("port 0");
        assert!(err.to_string().contains("--api-port"));

        let no_api = AppConfig {
            api: None,
            ..AppConfig::default()
        };
        no_api.validate().expect("api disabled skips port checks");
    }

    #[test]
    fn api_key_falls_back_to_secondary_variable() {
        let env = |name: &str| (name == FALLBACK_KEY_ENV).then(|| "from-env".to_string());
        assert_eq!(
            resolve_api_key(Some("flag".to_string()), env),
            Some("flag".to_string())
        );
        assert_eq!(resolve_api_key(None, env), Some("from-env".to_string()));
        assert_eq!(resolve_api_key(Some(" ".to_string()), env), Some("from-env".to_string()));
        assert_eq!(resolve_api_key(None, |_| None), None);
    }
}
