use std::{
    fs::{self, File},
    path::Path,
    sync::OnceLock,
};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub(crate) mod error;

use error::{LoggingError, Result};

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Installs the global tracing subscriber: a stdout layer and a plain-text file layer, both
/// filtered by `filter` (`RUST_LOG` syntax).
///
/// The log file is truncated on every start. Lines carry a timestamp, the level and the message.
pub fn init(path: impl AsRef<Path>, filter: &str) -> Result<()> {
    let path = path.as_ref();

    // `EnvFilter::new` skips invalid directives
    EnvFilter::try_new(filter).map_err(|e| LoggingError::InvalidFilter {
        filter: filter.to_string(),
        e,
    })?;

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| LoggingError::CreateDir {
            dir: dir.to_path_buf(),
            e,
        })?;
    }

    let file = File::create(path).map_err(|e| LoggingError::OpenFile {
        path: path.to_path_buf(),
        e,
    })?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    let _ = FILE_GUARD.set(guard);

    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(writer)
        .with_filter(EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(LoggingError::Init)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_is_rejected() {
        let dir = std::env::temp_dir().join("premarket-perk-logging-test");
        let res = init(dir.join("log.txt"), "info,premarket_perk=notalevel");

        assert!(matches!(res, Err(LoggingError::InvalidFilter { .. })));
    }
}
