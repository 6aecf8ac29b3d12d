pub mod config;
pub mod error;
pub mod logging;
pub mod validation;

pub use config::PhotoCacheConfig;
pub use error::{AppError, Result};
