/// Platform-assigned channel UUID identifying one call.
pub type CallId = String;

/// One linear-PCM frame as delivered by the media pipeline.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Call-supplied backend credentials, immutable for the attach lifetime.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub app_key: String,
    pub access_key_id: String,
    pub access_key_secret: String,
}

/// Asynchronous event delivered by a streaming recognition session.
#[derive(Debug, Clone)]
pub enum RecognitionEvent {
    TranscriptionStarted {
        status_code: i32,
        task_id: String,
    },
    ResultChanged {
        status_code: i32,
        task_id: String,
        text: String,
    },
    TranscriptionCompleted {
        task_id: String,
        text: String,
    },
    SentenceBegin {
        status_code: i32,
        task_id: String,
    },
    SentenceEnd {
        task_id: String,
        text: String,
        confidence: f64,
    },
    TaskFailed {
        task_id: String,
        message: String,
    },
    ChannelClosed {
        task_id: String,
        response: String,
    },
}

impl RecognitionEvent {
    pub fn task_id(&self) -> &str {
        match self {
            Self::TranscriptionStarted { task_id, .. }
            | Self::ResultChanged { task_id, .. }
            | Self::TranscriptionCompleted { task_id, .. }
            | Self::SentenceBegin { task_id, .. }
            | Self::SentenceEnd { task_id, .. }
            | Self::TaskFailed { task_id, .. }
            | Self::ChannelClosed { task_id, .. } => task_id,
        }
    }
}

/// Outward notification fired for the event kinds downstream automation
/// subscribes to. Diagnostic-only kinds never become notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    StartTalking {
        call_id: CallId,
        task_id: String,
    },
    StopTalking {
        call_id: CallId,
        task_id: String,
        text: String,
        confidence: f64,
    },
    TaskFailed {
        call_id: CallId,
        task_id: String,
        message: String,
    },
}

impl Notification {
    /// Event subclass name carried on the wire.
    pub fn subclass(&self) -> &'static str {
        match self {
            Self::StartTalking { .. } => "aliasr::asr_start_talking",
            Self::StopTalking { .. } => "aliasr::asr_stop_talking",
            Self::TaskFailed { .. } => "aliasr::asr_task_failed",
        }
    }

    pub fn call_id(&self) -> &str {
        match self {
            Self::StartTalking { call_id, .. }
            | Self::StopTalking { call_id, .. }
            | Self::TaskFailed { call_id, .. } => call_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_subclass_names() {
        let n = Notification::StartTalking {
            call_id: "c1".into(),
            task_id: "t1".into(),
        };
        assert_eq!(n.subclass(), "aliasr::asr_start_talking");

        let n = Notification::StopTalking {
            call_id: "c1".into(),
            task_id: "t1".into(),
            text: "hello".into(),
            confidence: 0.9,
        };
        assert_eq!(n.subclass(), "aliasr::asr_stop_talking");

        let n = Notification::TaskFailed {
            call_id: "c1".into(),
            task_id: "t1".into(),
            message: "boom".into(),
        };
        assert_eq!(n.subclass(), "aliasr::asr_task_failed");
    }

    #[test]
    fn test_notification_carries_call_id() {
        let n = Notification::StartTalking {
            call_id: "uuid-1234".into(),
            task_id: "t1".into(),
        };
        assert_eq!(n.call_id(), "uuid-1234");
    }

    #[test]
    fn test_event_task_id_accessor() {
        let ev = RecognitionEvent::SentenceEnd {
            task_id: "task-9".into(),
            text: "text".into(),
            confidence: 0.5,
        };
        assert_eq!(ev.task_id(), "task-9");
    }
}
