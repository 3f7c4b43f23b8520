use anyhow::Result;
use std::path::PathBuf;

use crate::config::{
    default_disk_path, known_vm_names, save_json, vm_definitions_dir, Paths, Settings,
    BIND_SCRIPT, CHECK_SCRIPT, INIT_SCRIPT, VM_SCRIPT,
};
use crate::deps::{DependencySummary, PackageManager};
use crate::i18n::Catalog;
use crate::launcher::{Dispatcher, Invocation, Launcher};
use crate::session::Session;
use crate::ui::Tui;

pub const DEFAULT_PCI: &str = "0000:03:00.0";
pub const DEFAULT_GPU_AUDIO_PCI: &str = "0000:03:00.1";
pub const DEFAULT_VM_NAME: &str = "janus-win11";
pub const DEFAULT_MEMORY_MIB: &str = "16384";
pub const DEFAULT_VCPUS: &str = "8";
pub const DEFAULT_DISK_SIZE: &str = "120G";
pub const DEFAULT_BLOCK_DEVICE: &str = "/dev/nvme0n1p3";
pub const DEFAULT_WIN_USER: &str = "janus";

/// Everything a menu entry can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    GuidedSetup,
    Dependencies,
    RunCheck,
    RunInit,
    ChangeLanguage,
    VfioList,
    VfioDryRun,
    VfioApply,
    VfioRollback,
    VmList,
    VmCreateGuided,
    VmCreateQuick,
    VmStart,
    VmStop,
    VmStatus,
}

// ── Command lines ─────────────────────────────────────────────────────────────

/// `bash <root>/bin/<script> <args..>`, run from the checkout root.
pub fn script(paths: &Paths, name: &str, args: &[&str]) -> Invocation {
    let mut argv = vec!["bash".to_string(), paths.script(name).display().to_string()];
    argv.extend(args.iter().map(|a| a.to_string()));
    Invocation::new(argv, &paths.root)
}

pub fn check(paths: &Paths, interactive: bool) -> Invocation {
    let args: &[&str] = if interactive { &[] } else { &["--no-interactive"] };
    script(paths, CHECK_SCRIPT, args)
}

pub fn init(paths: &Paths) -> Invocation {
    script(paths, INIT_SCRIPT, &[])
}

pub fn bind_list(paths: &Paths) -> Invocation {
    script(paths, BIND_SCRIPT, &["--list"])
}

pub fn bind_dry_run(paths: &Paths, pci: &str) -> Invocation {
    script(paths, BIND_SCRIPT, &["--device", pci, "--dry-run", "--yes"])
}

pub fn bind_apply(paths: &Paths, pci: &str) -> Invocation {
    script(paths, BIND_SCRIPT, &["--device", pci, "--apply", "--yes"]).elevated(true)
}

pub fn bind_rollback(paths: &Paths) -> Invocation {
    script(paths, BIND_SCRIPT, &["--rollback", "--yes"]).elevated(true)
}

pub fn vm_list(paths: &Paths) -> Invocation {
    Invocation::new(["virsh", "-c", "qemu:///system", "list", "--all"], &paths.root)
}

pub fn vm_create_guided(paths: &Paths) -> Invocation {
    script(paths, VM_SCRIPT, &["create", "--guided"])
}

pub fn vm_start(paths: &Paths, name: &str) -> Invocation {
    script(paths, VM_SCRIPT, &["start", "--name", name])
}

/// Only a forced stop touches the domain as root.
pub fn vm_stop(paths: &Paths, name: &str, force: bool) -> Invocation {
    let mut args = vec!["stop", "--name", name];
    if force {
        args.push("--force");
    }
    script(paths, VM_SCRIPT, &args).elevated(force)
}

pub fn vm_status(paths: &Paths, name: &str) -> Invocation {
    script(paths, VM_SCRIPT, &["status", "--name", name])
}

/// First known definition, else the stock name.
pub fn default_vm_name(known: &[String]) -> String {
    known
        .first()
        .cloned()
        .unwrap_or_else(|| DEFAULT_VM_NAME.to_string())
}

// ── Quick create ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmMode {
    Base,
    Passthrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    File,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleGpuMode {
    SharedVram,
    CpuOnly,
}

impl SingleGpuMode {
    fn as_arg(self) -> &'static str {
        match self {
            SingleGpuMode::SharedVram => "shared-vram",
            SingleGpuMode::CpuOnly => "cpu-only",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuSetup {
    /// Host keeps its only GPU.
    Single(SingleGpuMode),
    Passthrough { gpu: String, audio: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disk {
    File { path: Option<String>, size: Option<String> },
    Block { device: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unattended {
    pub user: String,
    pub password: Option<String>,
}

/// Answers collected by the quick-create form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickCreate {
    pub name: String,
    pub iso: Option<String>,
    pub memory_mib: String,
    pub vcpus: String,
    pub gpu: GpuSetup,
    pub disk: Disk,
    pub unattended: Option<Unattended>,
    pub apply: bool,
}

impl QuickCreate {
    pub fn mode(&self) -> VmMode {
        match self.gpu {
            GpuSetup::Single(_) => VmMode::Base,
            GpuSetup::Passthrough { .. } => VmMode::Passthrough,
        }
    }

    /// Needs root only when the definition is applied right away.
    pub fn invocation(&self, paths: &Paths) -> Invocation {
        let mode = match self.mode() {
            VmMode::Base => "base",
            VmMode::Passthrough => "passthrough",
        };
        let storage = match self.disk {
            Disk::File { .. } => "file",
            Disk::Block { .. } => "block",
        };
        let mut args: Vec<&str> = vec![
            "create",
            "--name",
            self.name.as_str(),
            "--mode",
            mode,
            "--memory-mib",
            self.memory_mib.as_str(),
            "--vcpus",
            self.vcpus.as_str(),
            "--storage",
            storage,
            "--no-guided",
            "--yes",
        ];
        if let Some(iso) = &self.iso {
            args.extend(["--iso", iso.as_str()]);
        }
        match &self.gpu {
            GpuSetup::Single(m) => args.extend(["--single-gpu-mode", m.as_arg()]),
            GpuSetup::Passthrough { gpu, audio } => {
                args.extend(["--gpu", gpu.as_str(), "--gpu-audio", audio.as_str()])
            }
        }
        match &self.disk {
            Disk::File { path, size } => {
                if let Some(p) = path {
                    args.extend(["--disk-path", p.as_str()]);
                }
                if let Some(s) = size {
                    args.extend(["--disk-size", s.as_str()]);
                }
            }
            Disk::Block { device } => args.extend(["--disk-path", device.as_str()]),
        }
        if let Some(u) = &self.unattended {
            args.extend(["--unattended", "--win-user", u.user.as_str()]);
            if let Some(p) = &u.password {
                args.extend(["--win-password", p.as_str()]);
            }
        }
        if self.apply {
            args.push("--apply");
        }
        script(paths, VM_SCRIPT, &args).elevated(self.apply)
    }
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

// ── Language ──────────────────────────────────────────────────────────────────

pub fn language_options(catalog: &Catalog) -> Vec<(String, String)> {
    catalog
        .codes()
        .into_iter()
        .map(|code| (format!("{} ({code})", catalog.display_name(code)), code.to_string()))
        .collect()
}

/// Make `code` active and remember it for the next start.
pub fn switch_language(
    session: &mut Session,
    catalog: &Catalog,
    settings: &mut Settings,
    code: &str,
) {
    session.language = code.to_string();
    session.set_status(catalog, "status_language_switched", &[("lang", code.to_string())]);
    settings.language = Some(code.to_string());
    tracing::info!(language = code, "language switched");
}

// ── Dependencies ──────────────────────────────────────────────────────────────

pub fn dependency_lines(session: &Session, catalog: &Catalog, summary: &DependencySummary) -> Vec<String> {
    let manager = summary.manager.map(PackageManager::name).unwrap_or("unknown");
    let mut lines = vec![
        session.tf(catalog, "deps_distro", &[("distro", summary.distro().to_string())]),
        session.tf(catalog, "deps_manager", &[("manager", manager.to_string())]),
        String::new(),
    ];
    if summary.missing_commands.is_empty() {
        lines.push(session.t(catalog, "deps_missing_none"));
        return lines;
    }
    lines.push(session.t(catalog, "deps_missing_header"));
    lines.extend(summary.missing_commands.iter().map(|c| format!("- {c}")));
    if !summary.packages.is_empty() {
        lines.push(String::new());
        lines.push(session.t(catalog, "deps_packages_header"));
        lines.extend(summary.packages.iter().map(|p| format!("- {p}")));
    }
    lines
}

// ── Interactive flows ─────────────────────────────────────────────────────────

/// The running program: screen, dispatcher and session state in one place
/// so each action can borrow what it needs.
pub struct App<L: Launcher> {
    pub tui: Tui,
    pub dispatcher: Dispatcher<L>,
    pub session: Session,
    pub catalog: Catalog,
    pub paths: Paths,
    pub settings: Settings,
    settings_path: PathBuf,
}

impl<L: Launcher> App<L> {
    pub fn new(
        tui: Tui,
        dispatcher: Dispatcher<L>,
        session: Session,
        catalog: Catalog,
        paths: Paths,
        settings: Settings,
        settings_path: PathBuf,
    ) -> Self {
        Self {
            tui,
            dispatcher,
            session,
            catalog,
            paths,
            settings,
            settings_path,
        }
    }

    pub fn t(&self, key: &str) -> String {
        self.session.t(&self.catalog, key)
    }

    pub fn perform(&mut self, action: Action) -> Result<()> {
        tracing::debug!(?action, "action selected");
        match action {
            Action::GuidedSetup => self.guided_setup(),
            Action::Dependencies => self.dependencies(),
            Action::RunCheck => self.run(check(&self.paths, true)).map(drop),
            Action::RunInit => self.run(init(&self.paths)).map(drop),
            Action::ChangeLanguage => self.change_language(),
            Action::VfioList => self.run(bind_list(&self.paths)).map(drop),
            Action::VfioDryRun => self.vfio_dry_run(),
            Action::VfioApply => self.vfio_apply(),
            Action::VfioRollback => self.run(bind_rollback(&self.paths)).map(drop),
            Action::VmList => self.run(vm_list(&self.paths)).map(drop),
            Action::VmCreateGuided => self.run(vm_create_guided(&self.paths)).map(drop),
            Action::VmCreateQuick => self.vm_create_quick(),
            Action::VmStart => self.vm_by_name("vm_action_start", vm_start),
            Action::VmStop => self.vm_stop(),
            Action::VmStatus => self.vm_by_name("vm_action_status", vm_status),
        }
    }

    fn run(&mut self, inv: Invocation) -> Result<bool> {
        self.dispatcher
            .execute(&mut self.tui, &mut self.session, &self.catalog, &inv)
    }

    fn ask(&mut self, key: &str, default: &str) -> Result<String> {
        let message = self.t(key);
        self.tui.prompt(&self.session, &self.catalog, &message, default)
    }

    fn ask_yes(&mut self, key: &str, default_yes: bool) -> Result<bool> {
        let message = self.t(key);
        self.tui.confirm(&self.session, &self.catalog, &message, default_yes)
    }

    /// Single-select over localized labels.
    fn choose<T: Clone>(&mut self, title_key: &str, options: &[(&str, T)]) -> Result<Option<T>> {
        let title = self.t(title_key);
        let labelled: Vec<(String, T)> = options
            .iter()
            .map(|(key, value)| (self.t(key), value.clone()))
            .collect();
        self.tui.pick(&self.session, &self.catalog, &title, &labelled)
    }

    fn show(&mut self, title_key: &str, lines: &[String]) -> Result<()> {
        let title = self.t(title_key);
        self.tui.show_text(&self.session, &self.catalog, &title, lines)
    }

    fn guided_setup(&mut self) -> Result<()> {
        let lines = vec![
            self.t("guided_intro"),
            String::new(),
            format!("1. {}", self.t("guided_step_dependencies")),
            format!("2. {}", self.t("guided_step_check")),
            format!("3. {}", self.t("guided_step_init")),
            format!("4. {}", self.t("guided_step_bind_list")),
        ];
        self.show("guided_title", &lines)?;

        self.dependencies()?;
        self.run(check(&self.paths, false))?;
        self.run(init(&self.paths))?;
        if self.ask_yes("guided_step_bind_list", true)? {
            self.run(bind_list(&self.paths))?;
        }
        self.session.set_status(&self.catalog, "guided_done", &[]);
        Ok(())
    }

    fn dependencies(&mut self) -> Result<()> {
        let summary = DependencySummary::collect();
        let lines = dependency_lines(&self.session, &self.catalog, &summary);
        self.show("deps_title", &lines)?;
        if summary.missing_commands.is_empty() {
            return Ok(());
        }

        let manager = match summary.manager {
            Some(m) if !summary.packages.is_empty() => m,
            _ => {
                tracing::debug!("no package manager mapping for missing commands");
                let unsupported = vec![self.t("deps_unsupported")];
                return self.show("deps_title", &unsupported);
            }
        };
        if self.ask_yes("deps_install_question", false)? {
            self.install_dependencies(manager, &summary.packages)?;
        }
        Ok(())
    }

    /// Stops at the first failing step.
    fn install_dependencies(&mut self, manager: PackageManager, packages: &[String]) -> Result<bool> {
        for step in manager.install_steps(packages) {
            let inv = Invocation::new(step, &self.paths.root).elevated(true);
            if !self.run(inv)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn change_language(&mut self) -> Result<()> {
        let options = language_options(&self.catalog);
        let title = self.t("lang_menu_title");
        let Some(code) = self.tui.pick(&self.session, &self.catalog, &title, &options)? else {
            return Ok(());
        };
        switch_language(&mut self.session, &self.catalog, &mut self.settings, &code);
        if let Err(e) = save_json(&self.settings_path, &self.settings) {
            tracing::warn!(error = %e, path = %self.settings_path.display(), "could not save settings");
        }
        Ok(())
    }

    fn vfio_dry_run(&mut self) -> Result<()> {
        let pci = self.ask("vfio_input_pci", DEFAULT_PCI)?;
        if pci.is_empty() {
            return Ok(());
        }
        self.run(bind_dry_run(&self.paths, &pci)).map(drop)
    }

    fn vfio_apply(&mut self) -> Result<()> {
        let pci = self.ask("vfio_input_pci", DEFAULT_PCI)?;
        if pci.is_empty() || !self.ask_yes("vfio_confirm_apply", false)? {
            return Ok(());
        }
        self.run(bind_apply(&self.paths, &pci)).map(drop)
    }

    fn ask_vm_name(&mut self, key: &str) -> Result<Option<String>> {
        let default = default_vm_name(&known_vm_names(&vm_definitions_dir()));
        Ok(non_empty(self.ask(key, &default)?))
    }

    fn vm_by_name(&mut self, key: &str, build: impl Fn(&Paths, &str) -> Invocation) -> Result<()> {
        let Some(name) = self.ask_vm_name(key)? else {
            return Ok(());
        };
        let inv = build(&self.paths, &name);
        self.run(inv).map(drop)
    }

    fn vm_stop(&mut self) -> Result<()> {
        let Some(name) = self.ask_vm_name("vm_action_stop")? else {
            return Ok(());
        };
        let force = self.ask_yes("confirm_force_stop", false)?;
        self.run(vm_stop(&self.paths, &name, force)).map(drop)
    }

    fn vm_create_quick(&mut self) -> Result<()> {
        let name = self.ask("input_vm_name", DEFAULT_VM_NAME)?;
        if name.is_empty() {
            return Ok(());
        }
        let iso = non_empty(self.ask("input_iso_path", "")?);
        let memory_mib = self.ask("input_memory", DEFAULT_MEMORY_MIB)?;
        let vcpus = self.ask("input_vcpus", DEFAULT_VCPUS)?;
        if memory_mib.is_empty() || vcpus.is_empty() {
            return Ok(());
        }

        let modes = [
            ("choose_mode_base", VmMode::Base),
            ("choose_mode_passthrough", VmMode::Passthrough),
        ];
        let Some(mode) = self.choose("choose_mode_title", &modes)? else {
            return Ok(());
        };
        let storages = [
            ("choose_storage_file", StorageKind::File),
            ("choose_storage_block", StorageKind::Block),
        ];
        let Some(storage) = self.choose("choose_storage_title", &storages)? else {
            return Ok(());
        };

        let gpu = match mode {
            VmMode::Base => {
                let singles = [
                    ("choose_single_gpu_shared", SingleGpuMode::SharedVram),
                    ("choose_single_gpu_cpu", SingleGpuMode::CpuOnly),
                ];
                let Some(single) = self.choose("choose_single_gpu_title", &singles)? else {
                    return Ok(());
                };
                GpuSetup::Single(single)
            }
            VmMode::Passthrough => {
                let gpu = self.ask("input_gpu_pci", DEFAULT_PCI)?;
                let audio = self.ask("input_gpu_audio_pci", DEFAULT_GPU_AUDIO_PCI)?;
                if gpu.is_empty() || audio.is_empty() {
                    return Ok(());
                }
                GpuSetup::Passthrough { gpu, audio }
            }
        };

        let disk = match storage {
            StorageKind::File => {
                let default_path = default_disk_path(&name).display().to_string();
                let path = non_empty(self.ask("input_disk_path", &default_path)?);
                let size = non_empty(self.ask("input_disk_size", DEFAULT_DISK_SIZE)?);
                Disk::File { path, size }
            }
            StorageKind::Block => {
                let device = self.ask("input_disk_path", DEFAULT_BLOCK_DEVICE)?;
                if device.is_empty() {
                    return Ok(());
                }
                Disk::Block { device }
            }
        };

        let unattended = if self.ask_yes("confirm_unattended", false)? {
            let user = self.ask("input_win_user", DEFAULT_WIN_USER)?;
            let password = non_empty(self.ask("input_win_pass_optional", "")?);
            non_empty(user).map(|user| Unattended { user, password })
        } else {
            None
        };
        let apply = self.ask_yes("confirm_apply", false)?;

        let form = QuickCreate {
            name,
            iso,
            memory_mib,
            vcpus,
            gpu,
            disk,
            unattended,
            apply,
        };
        self.run(form.invocation(&self.paths)).map(drop)
    }
}
