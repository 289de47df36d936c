use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{MedibookError, Result};

/// Top-level configuration for the Medibook voice agent.
///
/// Loaded from `~/.medibook/config.toml` by default, then overlaid with the
/// environment variables the deployment scripts export. Each section
/// corresponds to one collaborator or subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedibookConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub dialogue: DialogueConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
}

impl MedibookConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MedibookConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| MedibookError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Overlay values from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset. Numeric values that fail to parse
    /// are ignored with a warning.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("VOICE_AGENT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("VOICE_AGENT_PORT") {
            override_parsed("VOICE_AGENT_PORT", &port, &mut self.server.port);
        }
        if let Some(url) = get("API_BASE_URL") {
            self.backend.base_url = url;
        }
        if let Some(key) = get("API_KEY").or_else(|| get("BACKEND_API_KEY")) {
            self.backend.api_key = Some(key);
        }
        if let Some(host) = get("OLLAMA_HOST") {
            self.llm.host = host;
        }
        if let Some(model) = get("OLLAMA_MODEL") {
            self.llm.model = model;
        }
        if let Some(rate) = get("AUDIO_SAMPLE_RATE") {
            override_parsed("AUDIO_SAMPLE_RATE", &rate, &mut self.voice.sample_rate);
        }
        if let Some(size) = get("AUDIO_CHUNK_SIZE") {
            override_parsed("AUDIO_CHUNK_SIZE", &size, &mut self.voice.chunk_size);
        }
        if let Some(model) = get("WHISPER_MODEL") {
            self.voice.whisper_model = model;
        }
    }
}

fn override_parsed<T: std::str::FromStr>(key: &str, raw: &str, target: &mut T) {
    match raw.trim().parse::<T>() {
        Ok(value) => *target = value,
        Err(_) => warn!(key, value = raw, "Ignoring unparseable environment override"),
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// HTTP / WebSocket listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5007,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Booking backend (doctor search, availability, scheduling, geocoding, NLU).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    /// Sent as the `x-api-key` header when present.
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub health_timeout_secs: u64,
    pub default_radius_km: f64,
    /// Slot length requested from the availability endpoint.
    pub slot_minutes: u32,
    /// Appointment length used when the model does not give one.
    pub appointment_minutes: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000".to_string(),
            api_key: None,
            request_timeout_secs: 30,
            health_timeout_secs: 5,
            default_radius_km: 10.0,
            slot_minutes: 30,
            appointment_minutes: 30,
        }
    }
}

/// Ollama chat-completion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub host: String,
    pub model: String,
    pub temperature: f32,
    /// Upper bound on generated tokens (`num_predict`).
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            model: "deepseek-r1:1.5b".to_string(),
            temperature: 0.7,
            max_tokens: 500,
            timeout_secs: 120,
        }
    }
}

/// Turn-policy knobs for the dialogue engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    /// User/assistant turns kept in history besides the system prompt.
    pub max_history_turns: usize,
    /// Maximum accepted utterance length in characters.
    pub max_message_length: usize,
    /// Sessions idle longer than this are evicted.
    pub session_idle_minutes: u64,
    /// Drop fetched slots when a different doctor gets selected.
    pub clear_slots_on_doctor_change: bool,
    /// Re-run the implicit doctor search on every tool-less turn once
    /// specialty and location are known. When off, it repeats only if the
    /// user says they already gave the details. Never runs on a turn that
    /// books.
    pub repeat_implicit_search: bool,
    /// Entries listed in search and availability summaries.
    pub max_listed_results: usize,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            max_history_turns: 40,
            max_message_length: 4000,
            session_idle_minutes: 60,
            clear_slots_on_doctor_change: true,
            repeat_implicit_search: false,
            max_listed_results: 10,
        }
    }
}

/// Streaming audio input settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub sample_rate: u32,
    /// Bytes of 16-bit PCM buffered before a transcription attempt.
    pub chunk_size: usize,
    pub language: String,
    pub whisper_model: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            chunk_size: 4096,
            language: "en".to_string(),
            whisper_model: "base".to_string(),
        }
    }
}
