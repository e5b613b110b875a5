//! Speech recognition session management.

pub mod session;

pub use session::SpeechSession;
