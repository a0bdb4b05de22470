use crate::traits::{
    AudioFormat, EventSink, IssuedToken, RecognitionBackend, RecognitionSession, SessionConfig,
    TokenIssuer,
};
use aliasr_core::{BridgeError, RecognitionEvent, TokenError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared observation counters for sessions spawned by one [`NullBackend`].
#[derive(Debug, Default)]
pub struct SessionCounters {
    created: AtomicUsize,
    started: AtomicUsize,
    stopped: AtomicUsize,
    released: AtomicUsize,
    bytes_fed: AtomicUsize,
}

/// Backend double in the spirit of a null engine: accepts any audio,
/// counts what it was fed, and emits scripted events so the full path
/// can run without the vendor SDK. Failure toggles cover the attach
/// and mid-stream fault cases.
pub struct NullBackend {
    counters: Arc<SessionCounters>,
    fail_create: AtomicBool,
    fail_start: AtomicBool,
    fail_send: AtomicBool,
    next_task: AtomicUsize,
}

impl NullBackend {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(SessionCounters::default()),
            fail_create: AtomicBool::new(false),
            fail_start: AtomicBool::new(false),
            fail_send: AtomicBool::new(false),
            next_task: AtomicUsize::new(1),
        }
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::Relaxed);
    }

    pub fn set_fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::Relaxed);
    }

    pub fn set_fail_send(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::Relaxed);
    }

    pub fn sessions_created(&self) -> usize {
        self.counters.created.load(Ordering::Relaxed)
    }

    pub fn sessions_started(&self) -> usize {
        self.counters.started.load(Ordering::Relaxed)
    }

    pub fn sessions_stopped(&self) -> usize {
        self.counters.stopped.load(Ordering::Relaxed)
    }

    pub fn sessions_released(&self) -> usize {
        self.counters.released.load(Ordering::Relaxed)
    }

    pub fn bytes_fed(&self) -> usize {
        self.counters.bytes_fed.load(Ordering::Relaxed)
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecognitionBackend for NullBackend {
    async fn create_session(
        &self,
        events: EventSink,
    ) -> Result<Box<dyn RecognitionSession>, BridgeError> {
        if self.fail_create.load(Ordering::Relaxed) {
            return Err(BridgeError::SessionCreate("null backend refused".into()));
        }
        let task_id = format!("null-task-{}", self.next_task.fetch_add(1, Ordering::Relaxed));
        self.counters.created.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(NullSession {
            task_id,
            events,
            config: None,
            counters: Arc::clone(&self.counters),
            fail_start: self.fail_start.load(Ordering::Relaxed),
            fail_send: self.fail_send.load(Ordering::Relaxed),
            state: SessionState::Created,
            session_bytes: 0,
            sentence_open: false,
        }))
    }
}

#[derive(Debug, PartialEq)]
enum SessionState {
    Created,
    Started,
    Stopped,
}

#[derive(Debug)]
pub struct NullSession {
    task_id: String,
    events: EventSink,
    config: Option<SessionConfig>,
    counters: Arc<SessionCounters>,
    fail_start: bool,
    fail_send: bool,
    state: SessionState,
    session_bytes: usize,
    sentence_open: bool,
}

impl NullSession {
    fn emit(&self, event: RecognitionEvent) {
        // Receiver may be gone during teardown; events are best-effort.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl RecognitionSession for NullSession {
    fn configure(&mut self, config: SessionConfig) {
        tracing::trace!(
            task_id = %self.task_id,
            format = config.format.as_str(),
            sample_rate = config.sample_rate,
            "null session configured"
        );
        self.config = Some(config);
    }

    async fn start(&mut self) -> Result<(), BridgeError> {
        let Some(config) = self.config.as_ref() else {
            return Err(BridgeError::SessionStart("session not configured".into()));
        };
        if self.fail_start {
            return Err(BridgeError::SessionStart("null backend start refused".into()));
        }
        tracing::debug!(
            task_id = %self.task_id,
            app_key = %config.app_key,
            sample_rate = config.sample_rate,
            "null session started"
        );
        self.state = SessionState::Started;
        self.counters.started.fetch_add(1, Ordering::Relaxed);
        self.emit(RecognitionEvent::TranscriptionStarted {
            status_code: 0,
            task_id: self.task_id.clone(),
        });
        Ok(())
    }

    async fn send_audio(&mut self, samples: &[i16], _last: bool) -> Result<usize, BridgeError> {
        if self.state != SessionState::Started {
            return Err(BridgeError::Transport("session not started".into()));
        }
        if self.fail_send {
            return Err(BridgeError::Transport("null backend dropped chunk".into()));
        }
        if !self.sentence_open {
            self.sentence_open = true;
            self.emit(RecognitionEvent::SentenceBegin {
                status_code: 0,
                task_id: self.task_id.clone(),
            });
        }
        let bytes = samples.len() * 2;
        self.session_bytes += bytes;
        self.counters.bytes_fed.fetch_add(bytes, Ordering::Relaxed);
        Ok(bytes)
    }

    async fn stop(&mut self) {
        if self.state != SessionState::Started {
            return;
        }
        self.state = SessionState::Stopped;
        self.counters.stopped.fetch_add(1, Ordering::Relaxed);
        if self.sentence_open {
            self.sentence_open = false;
            self.emit(RecognitionEvent::SentenceEnd {
                task_id: self.task_id.clone(),
                text: format!("[null] {} bytes", self.session_bytes),
                confidence: 1.0,
            });
        }
        self.emit(RecognitionEvent::ChannelClosed {
            task_id: self.task_id.clone(),
            response: "{}".into(),
        });
    }
}

impl Drop for NullSession {
    fn drop(&mut self) {
        self.counters.released.fetch_add(1, Ordering::Relaxed);
    }
}

/// Token issuer double: hands out sequenced tokens with a fixed validity.
pub struct NullIssuer {
    validity: Duration,
    issued: AtomicUsize,
    fail: AtomicBool,
}

impl NullIssuer {
    pub fn new(validity: Duration) -> Self {
        Self {
            validity,
            issued: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::Relaxed)
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl TokenIssuer for NullIssuer {
    async fn issue(
        &self,
        _access_key_id: &str,
        _access_key_secret: &str,
    ) -> Result<IssuedToken, TokenError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(TokenError::Issuance("null issuer refused".into()));
        }
        let n = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(IssuedToken {
            token: format!("null-token-{n}"),
            expires_at: Instant::now() + self.validity,
        })
    }
}

/// Session parameters the verbatim way the bridge assembles them, for tests.
pub fn test_session_config(sample_rate: u32) -> SessionConfig {
    SessionConfig {
        app_key: "test-app".into(),
        format: AudioFormat::Pcm,
        sample_rate,
        interim_results: false,
        punctuation: true,
        inverse_text_normalization: true,
        max_sentence_silence_ms: None,
        token: "test-token".into(),
    }
}
