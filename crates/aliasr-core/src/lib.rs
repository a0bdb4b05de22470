pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, AsrConfig, CredentialsConfig, GeneralConfig};
pub use error::{BridgeError, ConfigError, ControlError, PublishError, TokenError};
pub use types::{AudioFrame, CallId, Credentials, Notification, RecognitionEvent};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_frame_creation() {
        let frame = AudioFrame {
            samples: vec![0, 100, -100, 32767],
            sample_rate: 8000,
            channels: 1,
        };
        assert_eq!(frame.samples.len(), 4);
        assert_eq!(frame.sample_rate, 8000);
        assert_eq!(frame.channels, 1);
    }

    #[test]
    fn test_credentials_clone_keeps_fields() {
        let creds = Credentials {
            app_key: "app".into(),
            access_key_id: "id".into(),
            access_key_secret: "secret".into(),
        };
        let copy = creds.clone();
        assert_eq!(copy.app_key, "app");
        assert_eq!(copy.access_key_id, "id");
        assert_eq!(copy.access_key_secret, "secret");
    }
}
