pub mod notifier;
pub mod publisher;

pub use notifier::{ChannelNotifier, Notifier};
pub use publisher::{CallEvents, EventPublisher};
