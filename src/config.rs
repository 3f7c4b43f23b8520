use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ROOT_ENV: &str = "JANUS_ROOT";

pub const CHECK_SCRIPT: &str = "janus-check.sh";
pub const INIT_SCRIPT: &str = "janus-init.sh";
pub const BIND_SCRIPT: &str = "janus-bind.sh";
pub const VM_SCRIPT: &str = "janus-vm.sh";

pub const REQUIRED_SCRIPTS: &[&str] = &[CHECK_SCRIPT, INIT_SCRIPT, BIND_SCRIPT, VM_SCRIPT];

// ── Paths ─────────────────────────────────────────────────────────────────────

/// Filesystem layout of a Janus checkout: `bin/` scripts and `languages/`
/// packs under one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub root: PathBuf,
}

impl Paths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Explicit root, then `$JANUS_ROOT`, then the nearest ancestor of the
    /// executable that holds a `languages/` directory, then the cwd.
    pub fn discover(explicit: Option<&Path>) -> Self {
        if let Some(p) = explicit {
            return Self::new(p);
        }
        if let Some(p) = std::env::var_os(ROOT_ENV).filter(|v| !v.is_empty()) {
            return Self::new(PathBuf::from(p));
        }
        let from_exe = std::env::current_exe()
            .ok()
            .and_then(|exe| find_root_above(&exe));
        Self::new(from_exe.unwrap_or_else(|| PathBuf::from(".")))
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn languages_dir(&self) -> PathBuf {
        self.root.join("languages")
    }

    pub fn script(&self, name: &str) -> PathBuf {
        self.bin_dir().join(name)
    }

    /// Required scripts that do not exist.
    pub fn missing_scripts(&self) -> Vec<PathBuf> {
        REQUIRED_SCRIPTS
            .iter()
            .map(|s| self.script(s))
            .filter(|p| !p.exists())
            .collect()
    }
}

fn find_root_above(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .skip(1)
        .find(|dir| dir.join("languages").is_dir())
        .map(Path::to_path_buf)
}

pub fn janus_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("janus")
}

/// Where the VM script keeps its libvirt definitions.
pub fn vm_definitions_dir() -> PathBuf {
    janus_config_dir().join("vm").join("definitions")
}

pub fn settings_file() -> PathBuf {
    janus_config_dir().join("tui.json")
}

pub fn default_log_file() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::cache_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("janus")
        .join("janus-tui.log")
}

pub fn default_disk_path(vm_name: &str) -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".local")
        .join("share")
        .join("janus")
        .join("vms")
        .join(format!("{vm_name}.qcow2"))
}

/// Stems of `*.xml` files in `dir`, sorted.
pub fn known_vm_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("xml"))
        .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
        .collect();
    names.sort();
    names
}

// ── JSON helpers ──────────────────────────────────────────────────────────────

pub fn load_json<T: for<'de> Deserialize<'de> + Default>(path: &Path) -> T {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

pub fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

// ── Settings ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// `Auto` honours `NO_COLOR` and refuses colour on `dumb`/unset `TERM`.
    pub fn enabled(self, no_color: Option<&str>, term: Option<&str>) -> bool {
        match self {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => {
                if no_color.is_some_and(|v| !v.is_empty()) {
                    return false;
                }
                !matches!(term, None | Some("") | Some("dumb"))
            }
        }
    }

    /// `enabled` against the live `NO_COLOR` and `TERM`.
    pub fn resolve_from_env(self) -> bool {
        let no_color = std::env::var("NO_COLOR").ok();
        let term = std::env::var("TERM").ok();
        self.enabled(no_color.as_deref(), term.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub color: ColorMode,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

pub fn load_settings() -> Settings {
    load_json(&settings_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_scripts_reports_only_absent_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(dir.path());
        std::fs::create_dir_all(paths.bin_dir()).unwrap();
        std::fs::write(paths.script(CHECK_SCRIPT), "#!/bin/bash\n").unwrap();
        std::fs::write(paths.script(VM_SCRIPT), "#!/bin/bash\n").unwrap();

        let missing = paths.missing_scripts();
        assert_eq!(
            missing,
            vec![paths.script(INIT_SCRIPT), paths.script(BIND_SCRIPT)]
        );
    }

    #[test]
    fn explicit_root_wins() {
        let paths = Paths::discover(Some(Path::new("/opt/janus")));
        assert_eq!(paths.languages_dir(), PathBuf::from("/opt/janus/languages"));
    }

    #[test]
    fn root_is_found_above_the_executable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("languages")).unwrap();
        let exe = dir.path().join("target").join("release").join("janus-tui");
        assert_eq!(find_root_above(&exe).as_deref(), Some(dir.path()));
    }

    #[test]
    fn vm_names_are_sorted_xml_stems() {
        let dir = tempfile::tempdir().unwrap();
        for f in ["zeta.xml", "alpha.xml", "notes.txt"] {
            std::fs::write(dir.path().join(f), "").unwrap();
        }
        assert_eq!(known_vm_names(dir.path()), vec!["alpha", "zeta"]);
        assert!(known_vm_names(&dir.path().join("absent")).is_empty());
    }

    #[test]
    fn color_auto_respects_environment() {
        assert!(ColorMode::Auto.enabled(None, Some("xterm-256color")));
        assert!(!ColorMode::Auto.enabled(Some("1"), Some("xterm")));
        assert!(!ColorMode::Auto.enabled(None, Some("dumb")));
        assert!(!ColorMode::Auto.enabled(None, None));
        assert!(ColorMode::Always.enabled(Some("1"), None));
        assert!(!ColorMode::Never.enabled(None, Some("xterm")));
    }

    #[test]
    fn forced_colour_modes_ignore_the_environment() {
        assert!(ColorMode::Always.resolve_from_env());
        assert!(!ColorMode::Never.resolve_from_env());
    }

    #[test]
    fn settings_tolerate_missing_fields_and_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tui.json");
        std::fs::write(&path, r#"{"color":"never"}"#).unwrap();
        let s: Settings = load_json(&path);
        assert_eq!(s.color, ColorMode::Never);
        assert_eq!(s.language, None);

        std::fs::write(&path, "not json").unwrap();
        assert_eq!(load_json::<Settings>(&path), Settings::default());
    }

    #[test]
    fn settings_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tui.json");
        let s = Settings {
            language: Some("es".into()),
            color: ColorMode::Always,
            log_file: None,
        };
        save_json(&path, &s).unwrap();
        assert_eq!(load_json::<Settings>(&path), s);
    }
}
