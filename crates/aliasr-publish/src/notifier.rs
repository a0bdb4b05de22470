use aliasr_core::{Notification, PublishError};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Platform capability that makes a notification externally observable.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, notification: Notification) -> Result<(), PublishError>;
}

/// Forwards notifications over an mpsc channel to whoever subscribed.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn publish(&self, notification: Notification) -> Result<(), PublishError> {
        self.tx.send(notification).map_err(|_| PublishError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_notifier_delivers() {
        let (notifier, mut rx) = ChannelNotifier::new();
        notifier
            .publish(Notification::StartTalking {
                call_id: "c1".into(),
                task_id: "t1".into(),
            })
            .await
            .unwrap();
        let n = rx.recv().await.unwrap();
        assert_eq!(n.subclass(), "aliasr::asr_start_talking");
    }

    #[tokio::test]
    async fn test_channel_notifier_closed_receiver() {
        let (notifier, rx) = ChannelNotifier::new();
        drop(rx);
        let result = notifier
            .publish(Notification::StartTalking {
                call_id: "c1".into(),
                task_id: "t1".into(),
            })
            .await;
        assert!(matches!(result, Err(PublishError::Closed)));
    }
}
