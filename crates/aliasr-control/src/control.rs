use aliasr_backend::{
    AudioFormat, RecognitionBackend, SessionConfig, TokenCache, TokenIssuer,
};
use aliasr_bridge::{AudioBridge, MediaPipeline, PipelineEvent, TapSpec};
use aliasr_core::{AsrConfig, BridgeError, CallId, ControlError, Credentials};
use aliasr_publish::EventPublisher;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

struct CallSlot {
    bridge: Arc<AudioBridge>,
    pump: tokio::task::JoinHandle<()>,
}

/// The `start`/`stop` command surface: owns the call-id → attached-ASR
/// slot map and wires a fresh [`AudioBridge`] per attach.
pub struct AsrControl {
    backend: Arc<dyn RecognitionBackend>,
    issuer: Arc<dyn TokenIssuer>,
    tokens: Arc<TokenCache>,
    publisher: Arc<EventPublisher>,
    pipeline: Arc<dyn MediaPipeline>,
    settings: AsrConfig,
    slots: Arc<Mutex<HashMap<CallId, CallSlot>>>,
}

impl AsrControl {
    pub fn new(
        backend: Arc<dyn RecognitionBackend>,
        issuer: Arc<dyn TokenIssuer>,
        tokens: Arc<TokenCache>,
        publisher: Arc<EventPublisher>,
        pipeline: Arc<dyn MediaPipeline>,
        settings: AsrConfig,
    ) -> Self {
        Self {
            backend,
            issuer,
            tokens,
            publisher,
            pipeline,
            settings,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Attaches ASR to a call. Fails without side effects on duplicate
    /// attach, missing credentials, or token refusal; the call can
    /// always retry `start`.
    pub async fn start(&self, call_id: &str, creds: Credentials) -> Result<(), ControlError> {
        if creds.app_key.is_empty() {
            return Err(ControlError::BadArguments("app_key"));
        }
        if creds.access_key_id.is_empty() {
            return Err(ControlError::BadArguments("access_key_id"));
        }
        if creds.access_key_secret.is_empty() {
            return Err(ControlError::BadArguments("access_key_secret"));
        }

        // Lock held across the whole attach so concurrent starts for
        // the same call serialize on the slot check.
        let mut slots = self.slots.lock().await;
        if slots.contains_key(call_id) {
            tracing::warn!(call_id, "ASR already running on this call");
            return Err(ControlError::AlreadyAttached(call_id.to_string()));
        }

        let token = self
            .tokens
            .ensure_valid(
                self.issuer.as_ref(),
                &creds.access_key_id,
                &creds.access_key_secret,
            )
            .await?;

        let session_config = SessionConfig {
            app_key: creds.app_key,
            format: AudioFormat::Pcm,
            sample_rate: self.settings.target_sample_rate,
            interim_results: self.settings.interim_results,
            punctuation: self.settings.punctuation,
            inverse_text_normalization: self.settings.inverse_text_normalization,
            max_sentence_silence_ms: self.settings.max_sentence_silence_ms,
            token,
        };

        let bridge = Arc::new(AudioBridge::new(
            call_id.to_string(),
            Arc::clone(&self.backend),
            Arc::clone(&self.publisher),
            session_config,
            self.settings.frame_samples as usize,
        ));

        let tap = self.pipeline.attach(call_id, TapSpec::default())?;
        let pump = self.spawn_pump(Arc::clone(&bridge), tap.events);

        slots.insert(call_id.to_string(), CallSlot { bridge, pump });
        tracing::debug!(call_id, "ASR attached");
        Ok(())
    }

    /// Detaches ASR from a call; a vacant slot is a silent no-op.
    pub async fn stop(&self, call_id: &str) {
        let slot = self.slots.lock().await.remove(call_id);
        let Some(slot) = slot else {
            tracing::debug!(call_id, "stop with no ASR attached, ignoring");
            return;
        };

        slot.bridge.close().await;
        self.pipeline.detach(call_id);
        // Detach ended the event stream, so the pump drains and exits.
        let _ = slot.pump.await;
        tracing::info!(call_id, "ASR stopped");
    }

    pub async fn is_attached(&self, call_id: &str) -> bool {
        self.slots.lock().await.contains_key(call_id)
    }

    /// Forwards pipeline events into the bridge. A fatal open failure
    /// vacates the slot so the operator can re-issue `start`; anything
    /// else is logged and the stream keeps delivering (CLOSE included).
    fn spawn_pump(
        &self,
        bridge: Arc<AudioBridge>,
        mut events: mpsc::UnboundedReceiver<PipelineEvent>,
    ) -> tokio::task::JoinHandle<()> {
        let slots = Arc::clone(&self.slots);
        let pipeline = Arc::clone(&self.pipeline);

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match bridge.handle(event).await {
                    Ok(()) => {}
                    Err(
                        e @ (BridgeError::SessionCreate(_)
                        | BridgeError::SessionStart(_)
                        | BridgeError::Resample(_)),
                    ) => {
                        tracing::error!(call_id = %bridge.call_id(), "ASR attach failed: {e}");
                        slots.lock().await.remove(bridge.call_id());
                        pipeline.detach(bridge.call_id());
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(call_id = %bridge.call_id(), "bridge error: {e}");
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aliasr_backend::{NullBackend, NullIssuer};
    use aliasr_bridge::ManualPipeline;
    use aliasr_publish::ChannelNotifier;
    use std::time::Duration;

    struct Harness {
        control: AsrControl,
        backend: Arc<NullBackend>,
        issuer: Arc<NullIssuer>,
        pipeline: Arc<ManualPipeline>,
    }

    fn harness() -> Harness {
        let backend = Arc::new(NullBackend::new());
        let issuer = Arc::new(NullIssuer::new(Duration::from_secs(3600)));
        let pipeline = Arc::new(ManualPipeline::new());
        let (notifier, _rx) = ChannelNotifier::new();
        let control = AsrControl::new(
            Arc::clone(&backend) as Arc<dyn RecognitionBackend>,
            Arc::clone(&issuer) as Arc<dyn TokenIssuer>,
            Arc::new(TokenCache::new()),
            Arc::new(EventPublisher::new(Arc::new(notifier))),
            Arc::clone(&pipeline) as Arc<dyn MediaPipeline>,
            AsrConfig::default(),
        );
        Harness {
            control,
            backend,
            issuer,
            pipeline,
        }
    }

    fn creds() -> Credentials {
        Credentials {
            app_key: "appkey".into(),
            access_key_id: "keyA".into(),
            access_key_secret: "secC".into(),
        }
    }

    #[tokio::test]
    async fn test_start_sets_slot_and_issues_token() {
        let h = harness();
        h.control.start("call-1", creds()).await.unwrap();
        assert!(h.control.is_attached("call-1").await);
        assert!(h.pipeline.is_attached("call-1"));
        assert_eq!(h.issuer.issued(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_start_fails_without_touching_original() {
        let h = harness();
        h.control.start("call-1", creds()).await.unwrap();
        match h.control.start("call-1", creds()).await {
            Err(ControlError::AlreadyAttached(id)) => assert_eq!(id, "call-1"),
            other => panic!("expected AlreadyAttached, got {other:?}"),
        }
        assert!(h.control.is_attached("call-1").await);
    }

    #[tokio::test]
    async fn test_empty_credentials_rejected() {
        let h = harness();
        let mut bad = creds();
        bad.access_key_secret = String::new();
        match h.control.start("call-1", bad).await {
            Err(ControlError::BadArguments(field)) => assert_eq!(field, "access_key_secret"),
            other => panic!("expected BadArguments, got {other:?}"),
        }
        assert!(!h.control.is_attached("call-1").await);
        assert!(!h.pipeline.is_attached("call-1"));
    }

    #[tokio::test]
    async fn test_token_failure_aborts_attach() {
        let h = harness();
        h.issuer.set_fail(true);
        match h.control.start("call-1", creds()).await {
            Err(ControlError::Auth(_)) => {}
            other => panic!("expected Auth, got {other:?}"),
        }
        assert!(!h.control.is_attached("call-1").await);
        assert!(!h.pipeline.is_attached("call-1"));
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let h = harness();
        h.control.stop("call-unknown").await;
        assert_eq!(h.backend.sessions_created(), 0);
    }

    #[tokio::test]
    async fn test_token_reused_across_calls() {
        let h = harness();
        h.control.start("call-1", creds()).await.unwrap();
        h.control.start("call-2", creds()).await.unwrap();
        assert_eq!(h.issuer.issued(), 1);
    }
}
