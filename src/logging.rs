//! Tracing setup. The interactive screen owns stdout and stderr, so log
//! records go to a file; if it cannot be opened logging stays off.
//!
//! Filter priority: `JANUS_LOG`, then `RUST_LOG`, then `warn` (or `debug`
//! with `--verbose`).

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "JANUS_LOG";

pub fn default_level(verbose: bool) -> Level {
    if verbose {
        Level::DEBUG
    } else {
        Level::WARN
    }
}

fn build_env_filter(verbose: bool) -> EnvFilter {
    let janus = std::env::var(LOG_ENV).ok();
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    filter_from(janus.as_deref(), rust_log.as_deref(), verbose)
}

/// First directive string that parses wins; unparsable ones are skipped.
fn filter_from(janus: Option<&str>, rust_log: Option<&str>, verbose: bool) -> EnvFilter {
    [janus, rust_log]
        .into_iter()
        .flatten()
        .find_map(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level(verbose).as_str()))
}

/// Install the global subscriber writing to `path`. Returns `false` when
/// the file could not be opened and nothing was installed.
pub fn init(path: &Path, verbose: bool) -> bool {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let file = match OpenOptions::new().create(true).append(true).open(path) {
        Ok(f) => f,
        Err(_) => return false,
    };

    let fmt_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(build_env_filter(verbose))
        .with(fmt_layer)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_maps_to_debug() {
        assert_eq!(default_level(true), Level::DEBUG);
        assert_eq!(default_level(false), Level::WARN);
    }

    #[test]
    fn filter_priority_and_fallback() {
        let shown = |janus, rust_log, verbose| filter_from(janus, rust_log, verbose).to_string();

        assert_eq!(shown(None, None, false), "warn");
        assert_eq!(shown(None, None, true), "debug");
        assert_eq!(shown(Some("janus_tui=trace"), Some("info"), false), "janus_tui=trace");
        assert_eq!(shown(None, Some("info"), true), "info");
        assert_eq!(shown(Some("janus_tui=loud"), Some("info"), false), "info");
        assert_eq!(shown(Some("janus_tui=loud"), None, true), "debug");
    }

    #[test]
    fn unopenable_log_path_disables_logging() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending.
        assert!(!init(dir.path(), false));
    }
}
