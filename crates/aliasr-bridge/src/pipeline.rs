use aliasr_core::{AudioFrame, BridgeError};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Lifecycle and media callbacks a tap on a call's audio stream delivers.
#[derive(Debug)]
pub enum PipelineEvent {
    /// Stream opened; carries the pipeline's actual read sample rate.
    StreamOpen { sample_rate: u32 },
    Frame(AudioFrame),
    StreamClose,
}

/// What the tap asks of the pipeline when attaching.
#[derive(Debug, Clone, Copy)]
pub struct TapSpec {
    /// Tap the read (caller → platform) direction.
    pub read_stream: bool,
    /// Replace-in-place frame delivery.
    pub replace: bool,
    /// Refuse a second tap on the same call.
    pub exclusive: bool,
}

impl Default for TapSpec {
    fn default() -> Self {
        Self {
            read_stream: true,
            replace: true,
            exclusive: true,
        }
    }
}

/// Receiver end of one attached tap.
#[derive(Debug)]
pub struct PipelineTap {
    pub events: mpsc::UnboundedReceiver<PipelineEvent>,
}

/// The telephony platform's media hook, consumed at its boundary.
///
/// Contract: at most one tap per call when `exclusive` is set, and
/// `detach` must end the tap's event stream so consumers can exit.
pub trait MediaPipeline: Send + Sync {
    fn attach(&self, call_id: &str, spec: TapSpec) -> Result<PipelineTap, BridgeError>;
    fn detach(&self, call_id: &str);
}

/// Pipeline driven programmatically: tests and the demo binary push
/// open/frame/close events for a call instead of a real media stack.
pub struct ManualPipeline {
    taps: Mutex<HashMap<String, mpsc::UnboundedSender<PipelineEvent>>>,
}

impl ManualPipeline {
    pub fn new() -> Self {
        Self {
            taps: Mutex::new(HashMap::new()),
        }
    }

    /// Delivers an event to the call's tap. Returns false when no tap
    /// is attached (the platform would simply not call back).
    pub fn push(&self, call_id: &str, event: PipelineEvent) -> bool {
        let taps = self.taps.lock().unwrap();
        match taps.get(call_id) {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Platform-side hangup: the stream closes and the tap goes away.
    pub fn hangup(&self, call_id: &str) {
        let mut taps = self.taps.lock().unwrap();
        if let Some(tx) = taps.remove(call_id) {
            let _ = tx.send(PipelineEvent::StreamClose);
        }
    }

    pub fn is_attached(&self, call_id: &str) -> bool {
        self.taps.lock().unwrap().contains_key(call_id)
    }
}

impl Default for ManualPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaPipeline for ManualPipeline {
    fn attach(&self, call_id: &str, spec: TapSpec) -> Result<PipelineTap, BridgeError> {
        let mut taps = self.taps.lock().unwrap();
        if spec.exclusive && taps.contains_key(call_id) {
            return Err(BridgeError::Attach(format!(
                "call {call_id} already has a tap"
            )));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        taps.insert(call_id.to_string(), tx);
        tracing::debug!(
            call_id,
            read_stream = spec.read_stream,
            replace = spec.replace,
            "tap attached"
        );
        Ok(PipelineTap { events: rx })
    }

    fn detach(&self, call_id: &str) {
        if self.taps.lock().unwrap().remove(call_id).is_some() {
            tracing::debug!(call_id, "tap detached");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_then_push_delivers() {
        let pipeline = ManualPipeline::new();
        let mut tap = pipeline.attach("c1", TapSpec::default()).unwrap();
        assert!(pipeline.push("c1", PipelineEvent::StreamOpen { sample_rate: 8000 }));
        match tap.events.try_recv().unwrap() {
            PipelineEvent::StreamOpen { sample_rate } => assert_eq!(sample_rate, 8000),
            ev => panic!("expected StreamOpen, got {ev:?}"),
        }
    }

    #[test]
    fn test_exclusive_attach_refused_twice() {
        let pipeline = ManualPipeline::new();
        let _tap = pipeline.attach("c1", TapSpec::default()).unwrap();
        match pipeline.attach("c1", TapSpec::default()) {
            Err(BridgeError::Attach(_)) => {}
            other => panic!("expected Attach error, got {other:?}"),
        }
    }

    #[test]
    fn test_detach_ends_event_stream() {
        let pipeline = ManualPipeline::new();
        let mut tap = pipeline.attach("c1", TapSpec::default()).unwrap();
        pipeline.detach("c1");
        assert!(!pipeline.is_attached("c1"));
        assert!(matches!(
            tap.events.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_hangup_sends_close_then_detaches() {
        let pipeline = ManualPipeline::new();
        let mut tap = pipeline.attach("c1", TapSpec::default()).unwrap();
        pipeline.hangup("c1");
        assert!(matches!(
            tap.events.try_recv().unwrap(),
            PipelineEvent::StreamClose
        ));
        assert!(matches!(
            tap.events.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_push_without_tap_returns_false() {
        let pipeline = ManualPipeline::new();
        assert!(!pipeline.push("nobody", PipelineEvent::StreamClose));
    }
}
