use crate::pipeline::PipelineEvent;
use crate::resampler::Resampler;
use aliasr_backend::{RecognitionBackend, RecognitionSession, SessionConfig};
use aliasr_core::{AudioFrame, BridgeError, CallId};
use aliasr_publish::{CallEvents, EventPublisher};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Bridge lifecycle. Closed is terminal; a new attach builds a fresh
/// bridge rather than reviving one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Idle,
    Streaming,
    Closed,
}

struct Inner {
    state: BridgeState,
    session: Option<Box<dyn RecognitionSession>>,
    resampler: Option<Resampler>,
    events: Option<CallEvents>,
    /// Set on the first mid-stream fault; forwarding stops but cleanup
    /// waits for the close transition.
    faulted: bool,
}

/// Per-call state machine between the media pipeline and one streaming
/// recognition session.
///
/// Pipeline callbacks and the stop command can race (hangup during
/// stream setup included), so every transition runs under one per-call
/// lock. A frame delivered after teardown began is a no-op, never a
/// use of a released session.
pub struct AudioBridge {
    call_id: CallId,
    backend: Arc<dyn RecognitionBackend>,
    publisher: Arc<EventPublisher>,
    session_config: SessionConfig,
    frame_samples: usize,
    inner: Mutex<Inner>,
}

impl AudioBridge {
    pub fn new(
        call_id: CallId,
        backend: Arc<dyn RecognitionBackend>,
        publisher: Arc<EventPublisher>,
        session_config: SessionConfig,
        frame_samples: usize,
    ) -> Self {
        Self {
            call_id,
            backend,
            publisher,
            session_config,
            frame_samples,
            inner: Mutex::new(Inner {
                state: BridgeState::Idle,
                session: None,
                resampler: None,
                events: None,
                faulted: false,
            }),
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub async fn state(&self) -> BridgeState {
        self.inner.lock().await.state
    }

    /// Drives one pipeline event through the state machine.
    pub async fn handle(&self, event: PipelineEvent) -> Result<(), BridgeError> {
        let mut inner = self.inner.lock().await;
        match event {
            PipelineEvent::StreamOpen { sample_rate } => self.open(&mut inner, sample_rate).await,
            PipelineEvent::Frame(frame) => self.forward(&mut inner, frame).await,
            PipelineEvent::StreamClose => {
                self.teardown(&mut inner).await;
                Ok(())
            }
        }
    }

    /// Explicit close, used by the stop command. Idempotent with the
    /// pipeline's own StreamClose.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        self.teardown(&mut inner).await;
    }

    async fn open(&self, inner: &mut Inner, input_rate: u32) -> Result<(), BridgeError> {
        if inner.state != BridgeState::Idle {
            tracing::warn!(
                call_id = %self.call_id,
                state = ?inner.state,
                "stream open ignored outside Idle"
            );
            return Ok(());
        }

        let events = self.publisher.open_channel(&self.call_id);
        let mut session = match self.backend.create_session(events.sink()).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(call_id = %self.call_id, "failed to create session: {e}");
                events.release().await;
                inner.state = BridgeState::Closed;
                return Err(e);
            }
        };

        session.configure(self.session_config.clone());

        // Blocking start: waits for the backend acknowledgement.
        if let Err(e) = session.start().await {
            tracing::error!(call_id = %self.call_id, "session start failed: {e}");
            drop(session);
            events.release().await;
            inner.state = BridgeState::Closed;
            return Err(e);
        }

        let target_rate = self.session_config.sample_rate;
        let resampler = if input_rate != target_rate {
            tracing::info!(
                call_id = %self.call_id,
                input_rate,
                target_rate,
                "resampling read stream"
            );
            match Resampler::new(input_rate, target_rate, self.frame_samples) {
                Ok(r) => Some(r),
                Err(e) => {
                    session.stop().await;
                    drop(session);
                    events.release().await;
                    inner.state = BridgeState::Closed;
                    return Err(e);
                }
            }
        } else {
            None
        };

        inner.session = Some(session);
        inner.events = Some(events);
        inner.resampler = resampler;
        inner.state = BridgeState::Streaming;
        tracing::info!(call_id = %self.call_id, input_rate, "ASR streaming started");
        Ok(())
    }

    async fn forward(&self, inner: &mut Inner, frame: AudioFrame) -> Result<(), BridgeError> {
        if inner.state != BridgeState::Streaming || inner.faulted {
            tracing::trace!(call_id = %self.call_id, "frame dropped outside Streaming");
            return Ok(());
        }

        // Mono is a hard requirement of the resampler and the backend.
        if frame.channels != 1 {
            inner.faulted = true;
            tracing::error!(
                call_id = %self.call_id,
                channels = frame.channels,
                "unsupported channel count, stream aborted"
            );
            return Err(BridgeError::UnsupportedFormat(frame.channels));
        }

        let samples = if let Some(resampler) = inner.resampler.as_mut() {
            match resampler.process(&frame.samples) {
                Ok(samples) => samples,
                Err(e) => {
                    inner.faulted = true;
                    return Err(e);
                }
            }
        } else {
            frame.samples
        };

        // Resampler may still be accumulating a full chunk.
        if samples.is_empty() {
            return Ok(());
        }

        if let Some(session) = inner.session.as_mut() {
            if let Err(e) = session.send_audio(&samples, false).await {
                // Session is unusable from here; cleanup happens on the
                // next close transition, never inline.
                inner.faulted = true;
                tracing::warn!(call_id = %self.call_id, "send_audio failed: {e}");
                return Err(e);
            }
        }
        Ok(())
    }

    /// Idempotent teardown: every resource is `take()`n, so a second
    /// run finds nothing left to release.
    async fn teardown(&self, inner: &mut Inner) {
        if let Some(mut session) = inner.session.take() {
            // The resampler's trailing partial chunk goes out as the
            // final send, unless the stream already faulted.
            if !inner.faulted {
                if let Some(mut resampler) = inner.resampler.take() {
                    match resampler.flush() {
                        Ok(tail) if !tail.is_empty() => {
                            if let Err(e) = session.send_audio(&tail, true).await {
                                tracing::warn!(call_id = %self.call_id, "tail send failed: {e}");
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!(call_id = %self.call_id, "tail flush failed: {e}");
                        }
                    }
                }
            }
            session.stop().await;
            tracing::info!(call_id = %self.call_id, "recognition session stopped");
        }
        if let Some(events) = inner.events.take() {
            events.release().await;
        }
        // A faulted stream drops its buffered tail with the resampler.
        inner.resampler.take();

        if inner.state != BridgeState::Closed {
            inner.state = BridgeState::Closed;
            tracing::debug!(call_id = %self.call_id, "bridge closed");
        }
    }
}
