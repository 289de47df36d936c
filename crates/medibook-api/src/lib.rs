//! Medibook API crate - axum HTTP server for text chat and live voice.
//!
//! Exposes the dialogue engine over JSON endpoints and a WebSocket that
//! accepts text commands and raw PCM16 audio.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod websocket;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
