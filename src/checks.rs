use std::io::IsTerminal;

use crate::config::Paths;
use crate::error::StartupError;
use crate::i18n::Catalog;

const NO_TTY_KEY: &str = "error_no_tty";
const NO_TTY_FALLBACK: &str = "Interactive TTY required.";

/// Language packs under `<root>/languages`; none at all is fatal.
pub fn load_catalog(paths: &Paths) -> anyhow::Result<Catalog> {
    let dir = paths.languages_dir();
    let catalog = Catalog::load_dir(&dir)?;
    if catalog.is_empty() {
        return Err(StartupError::NoLanguagePacks(dir).into());
    }
    Ok(catalog)
}

/// `--lang` must name a loaded pack. A remembered language that has since
/// disappeared is ignored in favour of the locale default.
pub fn resolve_language(
    catalog: &Catalog,
    requested: Option<&str>,
    saved: Option<&str>,
    locale: &str,
) -> Result<String, StartupError> {
    if let Some(raw) = requested {
        let code = raw.trim().to_lowercase();
        if catalog.contains(&code) {
            return Ok(code);
        }
        return Err(StartupError::UnknownLanguage {
            requested: raw.to_string(),
            available: catalog.codes().iter().map(|c| c.to_string()).collect(),
        });
    }
    if let Some(code) = saved.map(str::to_lowercase) {
        if catalog.contains(&code) {
            return Ok(code);
        }
        tracing::debug!(code = %code, "saved language not available");
    }
    Ok(catalog.pick_default(locale))
}

pub fn run_preflight(
    paths: &Paths,
    catalog: &Catalog,
    language: &str,
    interactive: bool,
) -> Result<(), StartupError> {
    let missing = paths.missing_scripts();
    if !missing.is_empty() {
        return Err(StartupError::MissingScripts(missing));
    }
    if !interactive {
        let text = catalog.resolve(language, NO_TTY_KEY, &[]);
        let text = if text == NO_TTY_KEY {
            NO_TTY_FALLBACK.to_string()
        } else {
            text
        };
        return Err(StartupError::NotInteractive(text));
    }
    Ok(())
}

pub fn stdio_is_terminal() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

pub fn print_preflight(err: &anyhow::Error) {
    eprintln!("[ERROR] {err}");
}
