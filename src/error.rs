use std::path::PathBuf;
use thiserror::Error;

/// Conventional exit status after SIGINT / Ctrl+C.
pub const EXIT_INTERRUPTED: u8 = 130;

/// Reasons the program refuses to enter the interactive screen.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Missing language packs under {}/*.txt", .0.display())]
    NoLanguagePacks(PathBuf),
    #[error("Unknown language: {requested}\nAvailable: {}", .available.join(", "))]
    UnknownLanguage {
        requested: String,
        available: Vec<String>,
    },
    #[error("Required scripts are missing:{}", format_missing(.0))]
    MissingScripts(Vec<PathBuf>),
    #[error("{0}")]
    NotInteractive(String),
}

fn format_missing(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("\n  - {}", p.display()))
        .collect()
}

/// Errors that unwind the whole UI rather than a single action.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("interrupted by user")]
    Interrupted,
}

/// True when `err` (or anything it wraps) is a user interrupt.
pub fn is_interrupt(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|e| matches!(e.downcast_ref::<AppError>(), Some(AppError::Interrupted)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn missing_scripts_lists_each_path() {
        let err = StartupError::MissingScripts(vec![
            PathBuf::from("/r/bin/janus-vm.sh"),
            PathBuf::from("/r/bin/janus-bind.sh"),
        ]);
        assert_eq!(
            err.to_string(),
            "Required scripts are missing:\n  - /r/bin/janus-vm.sh\n  - /r/bin/janus-bind.sh"
        );
    }

    #[test]
    fn interrupt_is_found_through_context() {
        let err = anyhow::Error::from(AppError::Interrupted).context("running menu");
        assert!(is_interrupt(&err));
        let other: anyhow::Result<()> = Err(anyhow::anyhow!("io")).context("x");
        assert!(!is_interrupt(&other.unwrap_err()));
    }
}
