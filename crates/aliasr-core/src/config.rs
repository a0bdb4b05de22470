use crate::error::ConfigError;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub asr: AsrConfig,

    #[serde(default)]
    pub credentials: Option<CredentialsConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AsrConfig {
    /// Sample rate the recognition backend requires.
    #[serde(default = "default_target_sample_rate")]
    pub target_sample_rate: u32,

    /// Samples per pipeline frame, used as the resampler chunk size.
    #[serde(default = "default_frame_samples")]
    pub frame_samples: u32,

    #[serde(default = "default_token_refresh_margin_secs")]
    pub token_refresh_margin_secs: u64,

    #[serde(default)]
    pub interim_results: bool,

    #[serde(default = "default_true")]
    pub punctuation: bool,

    #[serde(default = "default_true")]
    pub inverse_text_normalization: bool,

    /// Silence length (ms) that ends a sentence. Backend accepts 200..=2000.
    #[serde(default)]
    pub max_sentence_silence_ms: Option<u32>,
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: default_target_sample_rate(),
            frame_samples: default_frame_samples(),
            token_refresh_margin_secs: default_token_refresh_margin_secs(),
            interim_results: false,
            punctuation: default_true(),
            inverse_text_normalization: default_true(),
            max_sentence_silence_ms: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CredentialsConfig {
    pub app_key: String,
    pub access_key_id: String,
    pub access_key_secret: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_target_sample_rate() -> u32 {
    8000
}

fn default_frame_samples() -> u32 {
    320
}

fn default_token_refresh_margin_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}]+)\}").unwrap();
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                errors.push(var_name.to_string());
            }
        }
    }

    if let Some(first_missing) = errors.into_iter().next() {
        return Err(ConfigError::EnvVarNotFound(first_missing));
    }

    Ok(result)
}

impl AppConfig {
    /// Load configuration from a TOML file, with environment variable interpolation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string (for testing).
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let interpolated = interpolate_env_vars(s)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.asr.target_sample_rate == 0 {
            return Err(ConfigError::InvalidValue(
                "target_sample_rate must be non-zero".into(),
            ));
        }
        if self.asr.frame_samples == 0 {
            return Err(ConfigError::InvalidValue(
                "frame_samples must be non-zero".into(),
            ));
        }
        if let Some(ms) = self.asr.max_sentence_silence_ms {
            if !(200..=2000).contains(&ms) {
                return Err(ConfigError::InvalidValue(format!(
                    "max_sentence_silence_ms must be within 200..=2000, got {ms}"
                )));
            }
        }
        Ok(())
    }
}
