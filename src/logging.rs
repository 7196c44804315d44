//! Log output setup.
//!
//! The filter comes from `RUST_LOG`, defaulting to [`DEFAULT_FILTER`]. The
//! terminal belongs to the dashboard while it runs, so interactive sessions
//! log only to a file.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "distwatch=info";

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Append to a file.
    File(PathBuf),
    /// Human-readable output on stderr.
    Stderr,
    /// Discard everything.
    Off,
}

impl LogTarget {
    /// Pick the target for a run: the log file if given, otherwise stderr
    /// unless the terminal UI owns the screen.
    pub fn select(log_file: Option<&Path>, interactive: bool) -> Self {
        match log_file {
            Some(path) => LogTarget::File(path.to_path_buf()),
            None if interactive => LogTarget::Off,
            None => LogTarget::Stderr,
        }
    }
}

/// Appender writing to exactly `path`, never rotated.
///
/// The parent directory is created if missing.
pub fn file_appender(path: &Path) -> Result<RollingFileAppender> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("log file path has no file name: {}", path.display()))?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .with_context(|| format!("opening log file {}", path.display()))
}

/// Install the global subscriber.
pub fn init(target: &LogTarget) -> Result<()> {
    if *target == LogTarget::Off {
        return Ok(());
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let file_layer = match target {
        LogTarget::File(path) => Some(
            fmt::layer()
                .with_writer(file_appender(path)?)
                .with_ansi(false), // No ANSI colors in file
        ),
        _ => None,
    };

    let stderr_layer = match target {
        LogTarget::Stderr => Some(fmt::layer().with_writer(std::io::stderr)),
        _ => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("installing log subscriber")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_select_target() {
        let path = Path::new("distwatch.log");
        assert_eq!(
            LogTarget::select(Some(path), true),
            LogTarget::File(path.to_path_buf())
        );
        assert_eq!(LogTarget::select(None, true), LogTarget::Off);
        assert_eq!(LogTarget::select(None, false), LogTarget::Stderr);
    }

    #[test]
    fn test_off_installs_nothing() {
        assert!(init(&LogTarget::Off).is_ok());
    }

    #[test]
    fn test_file_appender_writes_to_given_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("distwatch.log");

        let mut appender = file_appender(&path).unwrap();
        appender.write_all(b"started\n").unwrap();
        appender.flush().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "started\n");
    }

    #[test]
    fn test_file_appender_needs_file_name() {
        assert!(file_appender(Path::new("/")).is_err());
    }
}
