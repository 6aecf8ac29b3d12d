use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::shared::error::AppError;

/// ログ設定の初期化
///
/// `RUST_LOG` が設定されていればそちらを優先する。
pub fn init_logging(level: &str, json: bool) -> Result<(), AppError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| AppError::ConfigurationError(format!("Invalid log level '{level}': {e}")))?;

    let fmt_layer = if json {
        fmt::layer().json().with_current_span(false).boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| AppError::Internal(format!("Failed to initialize logging: {e}")))
}
