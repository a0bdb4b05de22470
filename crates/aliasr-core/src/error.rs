use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token issuance failed: {0}")]
    Issuance(String),
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("backend refused to create session: {0}")]
    SessionCreate(String),

    #[error("session start failed: {0}")]
    SessionStart(String),

    #[error("unsupported channel count: {0}")]
    UnsupportedFormat(u16),

    #[error("audio transport failed: {0}")]
    Transport(String),

    #[error("resampler failed: {0}")]
    Resample(String),

    #[error("media pipeline attach failed: {0}")]
    Attach(String),
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("missing argument: {0}")]
    BadArguments(&'static str),

    #[error("ASR already attached to call {0}")]
    AlreadyAttached(String),

    #[error(transparent)]
    Auth(#[from] TokenError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("notification channel closed")]
    Closed,
}
