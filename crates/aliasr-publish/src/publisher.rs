use crate::notifier::Notifier;
use aliasr_core::{Notification, RecognitionEvent};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Maps a session's asynchronous recognition events onto log lines and
/// outward notifications, tagged with the owning call's identity.
///
/// Each attached call gets its own event channel and consumer task, so
/// ordering within a call is the channel's FIFO order.
pub struct EventPublisher {
    notifier: Arc<dyn Notifier>,
}

impl EventPublisher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Opens the per-call event channel. The returned handle's sink is
    /// what gets bound into the recognition session; dropping the
    /// handle (or calling [`CallEvents::release`]) ends the consumer
    /// once every sink clone is gone.
    pub fn open_channel(&self, call_id: &str) -> CallEvents {
        let (tx, mut rx) = mpsc::unbounded_channel::<RecognitionEvent>();
        let notifier = Arc::clone(&self.notifier);
        let call_id = call_id.to_string();

        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                dispatch(notifier.as_ref(), &call_id, event).await;
            }
            tracing::debug!(call_id = %call_id, "event channel drained");
        });

        CallEvents { sink: tx, task }
    }
}

async fn dispatch(notifier: &dyn Notifier, call_id: &str, event: RecognitionEvent) {
    let outward = match event {
        RecognitionEvent::TranscriptionStarted {
            status_code,
            task_id,
        } => {
            tracing::info!(call_id, %task_id, status_code, "transcription started");
            None
        }
        RecognitionEvent::ResultChanged {
            status_code,
            task_id,
            text,
        } => {
            tracing::info!(call_id, %task_id, status_code, "interim transcript: {text}");
            None
        }
        RecognitionEvent::TranscriptionCompleted { task_id, text } => {
            tracing::info!(call_id, %task_id, "transcription completed: {text}");
            None
        }
        RecognitionEvent::SentenceBegin {
            status_code,
            task_id,
        } => {
            tracing::info!(call_id, %task_id, status_code, "sentence begin");
            Some(Notification::StartTalking {
                call_id: call_id.to_string(),
                task_id,
            })
        }
        RecognitionEvent::SentenceEnd {
            task_id,
            text,
            confidence,
        } => {
            tracing::info!(call_id, %task_id, confidence, "sentence end: {text}");
            Some(Notification::StopTalking {
                call_id: call_id.to_string(),
                task_id,
                text,
                confidence,
            })
        }
        RecognitionEvent::TaskFailed { task_id, message } => {
            tracing::warn!(call_id, %task_id, "recognition task failed: {message}");
            Some(Notification::TaskFailed {
                call_id: call_id.to_string(),
                task_id,
                message,
            })
        }
        RecognitionEvent::ChannelClosed { task_id, response } => {
            tracing::info!(call_id, %task_id, "channel closed: {response}");
            None
        }
    };

    if let Some(notification) = outward {
        if let Err(e) = notifier.publish(notification).await {
            tracing::error!(call_id, "failed to publish notification: {e}");
        }
    }
}

/// Handle to one call's event channel: the sink handed to the session
/// plus the consumer task draining it.
pub struct CallEvents {
    sink: mpsc::UnboundedSender<RecognitionEvent>,
    task: tokio::task::JoinHandle<()>,
}

impl CallEvents {
    /// Sink end bound into the recognition session.
    pub fn sink(&self) -> mpsc::UnboundedSender<RecognitionEvent> {
        self.sink.clone()
    }

    /// Drops the sink and waits for in-flight events to drain. The
    /// session's own sink clone must already be gone by this point
    /// (teardown drops the session first).
    pub async fn release(self) {
        let CallEvents { sink, task } = self;
        drop(sink);
        let _ = task.await;
    }
}
