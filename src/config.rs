use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Speech
    pub asr_engine: String,
    pub vosk_model_path: String,
    pub locale: String,
    pub silence_window_ms: u64,
    pub min_utterance_chars: usize,

    // TTS
    pub tts_engine: String,
    pub piper_voice: String,
    pub piper_auto_download: bool,
    pub preferred_system_voice: String,

    // Interview
    pub question_count: usize,
    pub default_role: String,
    pub default_company: String,

    // LLM
    pub groq_api_url: String,
    pub groq_api_key: String,
    pub chat_model: String,
    pub chat_temperature: f32,

    // Meta
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            asr_engine: "vosk".to_string(),
            vosk_model_path: dirs::data_dir()
                .unwrap_or_default()
                .join("voxprep/models/vosk-model-small-en-us")
                .to_string_lossy()
                .to_string(),
            locale: "en-US".to_string(),
            silence_window_ms: 3500,
            min_utterance_chars: 5,
            tts_engine: "piper".to_string(),
            piper_voice: "en_US-hfc_female-medium".to_string(),
            piper_auto_download: true,
            preferred_system_voice: String::new(),
            question_count: 5,
            default_role: "Senior Software Engineer".to_string(),
            default_company: "Google".to_string(),
            groq_api_url: "https://api.groq.com/openai/v1".to_string(),
            groq_api_key: String::new(),
            chat_model: "llama-3.3-70b-versatile".to_string(),
            chat_temperature: 0.7,
            log_level: "INFO".to_string(),
        }
    }
}

impl Config {
    /// Load config from file or create default
    pub fn load() -> Result<Self> {
        let config_path = config_path();

        let mut config: Self = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    // Graceful degradation: log warning and use defaults
                    tracing::warn!("⚠️ Config file corrupted or invalid, using defaults: {}", e);
                    // Backup corrupt file for debugging
                    let backup_path = config_path.with_extension("json.corrupt");
                    let _ = std::fs::rename(&config_path, &backup_path);
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        // Environment overrides the stored key, never the other way around
        if let Ok(key) = std::env::var("GROQ_API_KEY") {
            if !key.is_empty() {
                config.groq_api_key = key;
            }
        }

        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let config_path = config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn silence_window(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.silence_window_ms)
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voxprep")
        .join("config.json")
}
