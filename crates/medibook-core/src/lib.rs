pub mod config;
pub mod error;
pub mod types;

pub use config::MedibookConfig;
pub use error::{MedibookError, Result};
pub use types::*;
