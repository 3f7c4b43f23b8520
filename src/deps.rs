use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::process::Command;

pub const OS_RELEASE: &str = "/etc/os-release";

/// Host tools the VM and passthrough scripts rely on.
pub const DEPENDENCY_COMMANDS: &[&str] = &["virsh", "qemu-img", "lspci", "virt-manager"];

// ── Package manager detection ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Pacman,
    Zypper,
}

impl PackageManager {
    pub fn name(self) -> &'static str {
        match self {
            PackageManager::Apt => "apt",
            PackageManager::Dnf => "dnf",
            PackageManager::Pacman => "pacman",
            PackageManager::Zypper => "zypper",
        }
    }

    fn binary(self) -> &'static str {
        match self {
            PackageManager::Apt => "apt-get",
            PackageManager::Dnf => "dnf",
            PackageManager::Pacman => "pacman",
            PackageManager::Zypper => "zypper",
        }
    }

    /// Pick from the distro identity first, then whatever is installed.
    pub fn detect(os_release: &BTreeMap<String, String>, has: impl Fn(&str) -> bool) -> Option<Self> {
        let distro = format!(
            "{} {}",
            os_release.get("ID").map(String::as_str).unwrap_or(""),
            os_release.get("ID_LIKE").map(String::as_str).unwrap_or("")
        )
        .to_lowercase();

        let families: &[(&[&str], PackageManager)] = &[
            (&["debian", "ubuntu"], PackageManager::Apt),
            (&["fedora", "rhel", "centos"], PackageManager::Dnf),
            (&["arch", "manjaro"], PackageManager::Pacman),
            (&["suse", "opensuse"], PackageManager::Zypper),
        ];
        for (markers, pm) in families {
            if markers.iter().any(|m| distro.contains(m)) {
                return has(pm.binary()).then_some(*pm);
            }
        }

        [
            PackageManager::Apt,
            PackageManager::Dnf,
            PackageManager::Pacman,
            PackageManager::Zypper,
        ]
        .into_iter()
        .find(|pm| has(pm.binary()))
    }

    /// Distro package that provides `command`.
    pub fn package_for(self, command: &str) -> Option<&'static str> {
        let pkg = match (self, command) {
            (PackageManager::Apt, "virsh") => "libvirt-clients",
            (PackageManager::Apt, "qemu-img") => "qemu-utils",
            (PackageManager::Dnf, "virsh") => "libvirt-client",
            (PackageManager::Dnf, "qemu-img") => "qemu-img",
            (PackageManager::Pacman, "virsh") => "libvirt",
            (PackageManager::Pacman, "qemu-img") => "qemu-img",
            (PackageManager::Zypper, "virsh") => "libvirt-client",
            (PackageManager::Zypper, "qemu-img") => "qemu-tools",
            (_, "lspci") => "pciutils",
            (_, "virt-manager") => "virt-manager",
            _ => return None,
        };
        Some(pkg)
    }

    /// Commands to install `packages`, in order. Each needs root.
    pub fn install_steps(self, packages: &[String]) -> Vec<Vec<String>> {
        let with = |head: &[&str]| -> Vec<String> {
            head.iter()
                .map(|s| s.to_string())
                .chain(packages.iter().cloned())
                .collect()
        };
        match self {
            PackageManager::Apt => vec![
                vec!["apt-get".into(), "update".into()],
                with(&["apt-get", "install", "-y"]),
            ],
            PackageManager::Dnf => vec![with(&["dnf", "install", "-y"])],
            PackageManager::Pacman => vec![with(&["pacman", "-Sy", "--noconfirm"])],
            PackageManager::Zypper => vec![with(&["zypper", "--non-interactive", "install"])],
        }
    }
}

pub fn which(bin: &str) -> bool {
    Command::new("which")
        .arg(bin)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

// ── os-release ────────────────────────────────────────────────────────────────

pub fn parse_os_release(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| l.split_once('='))
        .map(|(k, v)| (k.to_string(), v.trim().trim_matches('"').to_string()))
        .collect()
}

pub fn read_os_release(path: &Path) -> BTreeMap<String, String> {
    std::fs::read(path)
        .map(|bytes| parse_os_release(&String::from_utf8_lossy(&bytes)))
        .unwrap_or_default()
}

// ── Summary ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySummary {
    pub os_release: BTreeMap<String, String>,
    pub manager: Option<PackageManager>,
    pub missing_commands: Vec<String>,
    /// Sorted, de-duplicated packages covering `missing_commands`.
    pub packages: Vec<String>,
}

impl DependencySummary {
    pub fn collect() -> Self {
        Self::from_parts(read_os_release(Path::new(OS_RELEASE)), which)
    }

    pub fn from_parts(os_release: BTreeMap<String, String>, has: impl Fn(&str) -> bool) -> Self {
        let manager = PackageManager::detect(&os_release, &has);
        let missing_commands: Vec<String> = DEPENDENCY_COMMANDS
            .iter()
            .filter(|c| !has(**c))
            .map(|c| c.to_string())
            .collect();
        let packages: Vec<String> = manager
            .map(|pm| {
                missing_commands
                    .iter()
                    .filter_map(|c| pm.package_for(c))
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        tracing::debug!(
            manager = manager.map(PackageManager::name),
            missing = ?missing_commands,
            "dependency summary"
        );
        Self {
            os_release,
            manager,
            missing_commands,
            packages,
        }
    }

    pub fn distro(&self) -> &str {
        self.os_release
            .get("PRETTY_NAME")
            .or_else(|| self.os_release.get("NAME"))
            .map(String::as_str)
            .unwrap_or("unknown")
    }
}
