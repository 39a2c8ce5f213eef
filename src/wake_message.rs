use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const TEMPERATURE: f64 = 0.8;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

pub const FALLBACK_NO_CREDENTIAL: &str = "Rise and shine! (AI features unavailable without API Key)";
pub const FALLBACK_EMPTY: &str = "Good morning! Time to wake up.";
pub const FALLBACK_ERROR: &str = "Good morning! It's time to start your day.";

const SYSTEM_INSTRUCTION: &str = "You are a creative alarm clock assistant. \
Your goal is to wake the user up with a short, engaging message based on their request. \
Keep it under 50 words. Be expressive.";

#[derive(Debug, Error)]
pub enum WakeMessageError {
    #[error("no API key configured")]
    MissingCredential,
    #[error("wake-message service answered HTTP {0}")]
    Status(u16),
    #[error("wake-message request failed: {0}")]
    Transport(String),
    #[error("malformed wake-message response: {0}")]
    Malformed(String),
}

/// Produces the text shown on the firing overlay for alarms with a persona.
pub trait WakeMessageSource: Send + Sync {
    /// Raw request. `Ok` may carry an empty string when the service had nothing to say.
    fn request(&self, prompt: &str, time: &str) -> Result<String, WakeMessageError>;

    /// Never fails: every error maps to one of the fixed fallback lines.
    fn generate(&self, prompt: &str, time: &str) -> String {
        resolve_message(self.request(prompt, time))
    }
}

pub fn resolve_message(result: Result<String, WakeMessageError>) -> String {
    match result {
        Ok(text) if text.trim().is_empty() => FALLBACK_EMPTY.to_string(),
        Ok(text) => text.trim().to_string(),
        Err(WakeMessageError::MissingCredential) => {
            debug!("wake message skipped: no API key");
            FALLBACK_NO_CREDENTIAL.to_string()
        }
        Err(err) => {
            warn!("{err}");
            FALLBACK_ERROR.to_string()
        }
    }
}

pub fn user_content(prompt: &str, time: &str) -> String {
    format!(
        "The current time is {time}. The user's wake-up request is: \"{prompt}\". Generate a wake-up message."
    )
}

pub fn request_body(prompt: &str, time: &str) -> Value {
    json!({
        "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
        "contents": [{ "role": "user", "parts": [{ "text": user_content(prompt, time) }] }],
        "generationConfig": { "temperature": TEMPERATURE },
    })
}

/// Concatenates the text parts of the first candidate. No candidates reads as empty.
pub fn extract_text(response: &Value) -> Result<String, WakeMessageError> {
    if !response.is_object() {
        return Err(WakeMessageError::Malformed(
            "expected a JSON object".to_string(),
        ));
    }
    let Some(parts) = response["candidates"][0]["content"]["parts"].as_array() else {
        return Ok(String::new());
    };
    Ok(parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect::<Vec<_>>()
        .join(""))
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: Option<String>,
    model: String,
    endpoint: String,
    agent: ureq::Agent,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: model.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

impl WakeMessageSource for GeminiClient {
    fn request(&self, prompt: &str, time: &str) -> Result<String, WakeMessageError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(WakeMessageError::MissingCredential);
        };

        let response = self
            .agent
            .post(&self.url())
            .set("x-goog-api-key", key)
            .send_json(request_body(prompt, time));

        let response = match response {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => return Err(WakeMessageError::Status(code)),
            Err(err) => return Err(WakeMessageError::Transport(err.to_string())),
        };

        let value: Value = response
            .into_json()
            .map_err(|err| WakeMessageError::Malformed(err.to_string()))?;
        extract_text(&value)
    }
}

/// Runs [`WakeMessageSource::generate`] on a worker thread and hands the text to `deliver`.
///
/// Returns an error only when the thread could not be spawned.
pub fn spawn_fetch<F>(
    source: Arc<dyn WakeMessageSource>,
    prompt: String,
    time: String,
    deliver: F,
) -> std::io::Result<()>
where
    F: FnOnce(String) + Send + 'static,
{
    thread::Builder::new()
        .name("wake-message".to_string())
        .spawn(move || deliver(source.generate(&prompt, &time)))
        .map(|_| ())
}
