pub mod null_backend;
pub mod token;
pub mod traits;

pub use null_backend::{NullBackend, NullIssuer, NullSession};
pub use token::TokenCache;
pub use traits::{
    AudioFormat, EventSink, IssuedToken, RecognitionBackend, RecognitionSession, SessionConfig,
    TokenIssuer,
};
