use aliasr_core::{BridgeError, RecognitionEvent, TokenError};
use async_trait::async_trait;
use std::time::Instant;
use tokio::sync::mpsc;

/// Bearer credential returned by the backend's token service.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: Instant,
}

/// Exchanges an access-key pair for a bearer token.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue(
        &self,
        access_key_id: &str,
        access_key_secret: &str,
    ) -> Result<IssuedToken, TokenError>;
}

/// Audio encodings the backend accepts. Frames from the pipeline are
/// always linear PCM; the other variants exist for the boundary only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioFormat {
    #[default]
    Pcm,
    Opus,
    Speex,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pcm => "pcm",
            Self::Opus => "opus",
            Self::Speex => "speex",
        }
    }
}

/// Parameters applied to a session before it is started.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub app_key: String,
    pub format: AudioFormat,
    pub sample_rate: u32,
    pub interim_results: bool,
    pub punctuation: bool,
    pub inverse_text_normalization: bool,
    /// Silence length (ms) that ends a sentence, backend range 200..=2000.
    pub max_sentence_silence_ms: Option<u32>,
    pub token: String,
}

/// Channel end the session pushes its asynchronous events into.
pub type EventSink = mpsc::UnboundedSender<RecognitionEvent>;

/// The recognition vendor, consumed as an opaque capability:
/// create a session, feed it audio, receive events on the sink.
#[async_trait]
pub trait RecognitionBackend: Send + Sync {
    async fn create_session(
        &self,
        events: EventSink,
    ) -> Result<Box<dyn RecognitionSession>, BridgeError>;
}

/// One streaming recognition conversation. Must be driven by a single
/// owner; the bridge serializes configure/start/send/stop. Releasing
/// the session maps to dropping it.
#[async_trait]
pub trait RecognitionSession: Send + Sync + std::fmt::Debug {
    fn configure(&mut self, config: SessionConfig);

    /// Blocks until the backend acknowledges the start request or a
    /// timeout elapses.
    async fn start(&mut self) -> Result<(), BridgeError>;

    /// Forwards one chunk of linear PCM. Returns the accepted byte
    /// count; a transport fault is an error, never a retry.
    async fn send_audio(&mut self, samples: &[i16], last: bool) -> Result<usize, BridgeError>;

    async fn stop(&mut self);
}
