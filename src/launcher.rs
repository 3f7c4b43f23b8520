use anyhow::Result;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::AppError;
use crate::i18n::Catalog;
use crate::session::Session;

/// Exit code reported when the program could not be started at all.
pub const EXIT_LAUNCH_FAILED: i32 = 127;

// ── Collaborators ─────────────────────────────────────────────────────────────

/// The part of the UI a dispatch needs: giving the terminal away and
/// taking it back, plus line-mode output while it is given away.
pub trait Console {
    fn suspend(&mut self) -> Result<()>;
    fn resume(&mut self) -> Result<()>;
    fn confirm(
        &mut self,
        session: &Session,
        catalog: &Catalog,
        message: &str,
        default_yes: bool,
    ) -> Result<bool>;
    fn say(&mut self, text: &str);
    fn banner(&mut self, text: &str, ok: bool);
    /// Block until the user acknowledges (Enter or EOF).
    fn pause(&mut self, prompt: &str) -> Result<()>;
}

/// Starts external programs.
pub trait Launcher {
    /// Run `argv` in `cwd` with inherited stdio and wait. Returns the exit
    /// code; death by signal N is reported as `128 + N`.
    fn run(&mut self, argv: &[String], cwd: &Path) -> Result<i32>;
    /// Run `argv` with all output discarded; true on exit status 0.
    fn probe(&mut self, argv: &[String]) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn run(&mut self, argv: &[String], cwd: &Path) -> Result<i32> {
        let Some((program, args)) = argv.split_first() else {
            anyhow::bail!("empty command");
        };
        let status = Command::new(program).args(args).current_dir(cwd).status()?;
        Ok(exit_code(status))
    }

    fn probe(&mut self, argv: &[String]) -> bool {
        let Some((program, args)) = argv.split_first() else {
            return false;
        };
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

#[cfg(unix)]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

// ── Suspend / resume ──────────────────────────────────────────────────────────

/// Terminal handed to a child process. Dropping the guard hands it back to
/// the UI, whatever path leaves the scope.
pub struct Suspended<'a, C: Console + ?Sized> {
    console: &'a mut C,
}

impl<'a, C: Console + ?Sized> Suspended<'a, C> {
    pub fn new(console: &'a mut C) -> Result<Self> {
        console.suspend()?;
        Ok(Self { console })
    }
}

impl<C: Console + ?Sized> Deref for Suspended<'_, C> {
    type Target = C;
    fn deref(&self) -> &C {
        self.console
    }
}

impl<C: Console + ?Sized> DerefMut for Suspended<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.console
    }
}

impl<C: Console + ?Sized> Drop for Suspended<'_, C> {
    fn drop(&mut self) {
        if let Err(e) = self.console.resume() {
            tracing::warn!(error = %e, "failed to restore the interactive screen");
        }
    }
}

/// Suspend the UI, run `f` in normal terminal mode, then resume.
pub fn with_suspended<C, T, F>(console: &mut C, f: F) -> Result<T>
where
    C: Console + ?Sized,
    F: FnOnce(&mut C) -> Result<T>,
{
    let mut guard = Suspended::new(console)?;
    f(&mut *guard)
}

// ── Invocation ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub argv: Vec<String>,
    pub cwd: PathBuf,
    pub elevate: bool,
    pub pause: bool,
}

impl Invocation {
    /// Unprivileged, pausing for acknowledgement afterwards.
    pub fn new<I, S>(argv: I, cwd: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            cwd: cwd.into(),
            elevate: false,
            pause: true,
        }
    }

    pub fn elevated(mut self, elevate: bool) -> Self {
        self.elevate = elevate;
        self
    }

    pub fn no_pause(mut self) -> Self {
        self.pause = false;
        self
    }
}

/// POSIX-shell quoting for the command header.
pub fn shell_join(argv: &[String]) -> String {
    argv.iter().map(|a| shell_quote(a)).collect::<Vec<_>>().join(" ")
}

fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\"'\"'"))
    }
}

// ── Dispatcher ────────────────────────────────────────────────────────────────

const RULE_WIDTH: usize = 72;

/// Runs external commands on behalf of the UI, negotiating elevation first
/// when asked to.
pub struct Dispatcher<L: Launcher> {
    pub(crate) launcher: L,
    pub(crate) workdir: PathBuf,
    pub(crate) privileged: bool,
    interrupted: Arc<AtomicBool>,
}

impl<L: Launcher> Dispatcher<L> {
    /// `privileged`: the process already runs with elevated rights.
    /// `interrupted` is raised by the SIGINT handler while a child runs.
    pub fn new(
        launcher: L,
        workdir: impl Into<PathBuf>,
        privileged: bool,
        interrupted: Arc<AtomicBool>,
    ) -> Self {
        Self {
            launcher,
            workdir: workdir.into(),
            privileged,
            interrupted,
        }
    }

    #[cfg(test)]
    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Run `inv` with the terminal handed over to it. Returns whether it
    /// exited 0; failures only update the status line.
    pub fn execute<C: Console + ?Sized>(
        &mut self,
        console: &mut C,
        session: &mut Session,
        catalog: &Catalog,
        inv: &Invocation,
    ) -> Result<bool> {
        if inv.argv.is_empty() {
            return Ok(false);
        }

        let mut argv = inv.argv.clone();
        if inv.elevate && !self.privileged {
            if !self.ensure_elevated(console, session, catalog)? {
                tracing::info!(command = %shell_join(&inv.argv), "elevation refused, command not run");
                session.set_status(catalog, "sudo_cancelled", &[]);
                return Ok(false);
            }
            argv = self.elevation_prefix(argv);
        }

        let shown = shell_join(&argv);
        tracing::info!(command = %shown, cwd = %inv.cwd.display(), "dispatching");

        // Only a SIGINT that arrives while this child runs counts.
        self.interrupted.store(false, Ordering::SeqCst);
        let launcher = &mut self.launcher;
        let interrupted = &self.interrupted;
        let code = with_suspended(console, |c| {
            let rule = "=".repeat(RULE_WIDTH);
            let thin = "-".repeat(RULE_WIDTH);
            c.say(&format!("\n{rule}"));
            c.say(&session.t(catalog, "running_command"));
            c.say(&format!("$ {shown}"));
            c.say(&thin);

            let code = match launcher.run(&argv, &inv.cwd) {
                Ok(code) => code,
                Err(e) => {
                    tracing::warn!(error = %e, command = %shown, "launch failed");
                    c.say(&format!("{}: {e}", argv[0]));
                    EXIT_LAUNCH_FAILED
                }
            };
            if interrupted.load(Ordering::SeqCst) {
                return Ok(code);
            }

            c.say(&thin);
            if code == 0 {
                c.banner(&session.t(catalog, "command_success"), true);
                session.set_status(catalog, "status_done", &[]);
            } else {
                let params = [("code", code.to_string())];
                c.banner(&session.tf(catalog, "command_failed", &params), false);
                session.set_status(catalog, "status_failed", &params);
            }
            if inv.pause {
                c.pause(&session.t(catalog, "prompt_enter_to_continue"))?;
            }
            Ok(code)
        })?;

        if self.interrupted.swap(false, Ordering::SeqCst) {
            tracing::info!(command = %shown, "interrupted");
            return Err(AppError::Interrupted.into());
        }
        tracing::info!(command = %shown, code, "finished");
        Ok(code == 0)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Records every call; exit codes are popped from `codes` (0 when empty).
    /// `sudo_timestamp` answers the silent probe and is set by a successful
    /// `sudo -v`.
    #[derive(Debug, Default)]
    pub struct FakeLauncher {
        pub runs: Vec<Vec<String>>,
        pub probes: Vec<Vec<String>>,
        pub codes: Vec<i32>,
        pub sudo_timestamp: bool,
        pub fail_spawn: bool,
    }

    impl Launcher for FakeLauncher {
        fn run(&mut self, argv: &[String], _cwd: &Path) -> Result<i32> {
            self.runs.push(argv.to_vec());
            if self.fail_spawn {
                anyhow::bail!("No such file or directory");
            }
            let code = if self.codes.is_empty() { 0 } else { self.codes.remove(0) };
            if code == 0 && argv[..] == ["sudo", "-v"] {
                self.sudo_timestamp = true;
            }
            Ok(code)
        }

        fn probe(&mut self, argv: &[String]) -> bool {
            self.probes.push(argv.to_vec());
            self.sudo_timestamp
        }
    }

    #[derive(Debug, Default)]
    pub struct FakeConsole {
        pub suspended: bool,
        pub suspends: usize,
        pub resumes: usize,
        pub confirm_answer: bool,
        pub confirms: Vec<String>,
        pub said: Vec<String>,
        pub banners: Vec<(String, bool)>,
        pub pauses: usize,
    }

    impl Console for FakeConsole {
        fn suspend(&mut self) -> Result<()> {
            assert!(!self.suspended, "suspended twice");
            self.suspended = true;
            self.suspends += 1;
            Ok(())
        }

        fn resume(&mut self) -> Result<()> {
            assert!(self.suspended, "resumed without suspend");
            self.suspended = false;
            self.resumes += 1;
            Ok(())
        }

        fn confirm(
            &mut self,
            _session: &Session,
            _catalog: &Catalog,
            message: &str,
            _default_yes: bool,
        ) -> Result<bool> {
            assert!(!self.suspended, "confirm while the terminal is handed off");
            self.confirms.push(message.to_string());
            Ok(self.confirm_answer)
        }

        fn say(&mut self, text: &str) {
            self.said.push(text.to_string());
        }

        fn banner(&mut self, text: &str, ok: bool) {
            self.banners.push((text.to_string(), ok));
        }

        fn pause(&mut self, _prompt: &str) -> Result<()> {
            self.pauses += 1;
            Ok(())
        }
    }

    pub fn catalog() -> Catalog {
        let mut c = Catalog::default();
        let pairs = [
            ("running_command", "Running command:"),
            ("command_success", "Command completed successfully."),
            ("command_failed", "Command failed with exit code {code}."),
            ("status_done", "Done."),
            ("status_failed", "Failed (exit code {code})."),
            ("sudo_cancelled", "Administrator access cancelled."),
            ("sudo_request", "This action needs sudo. Request it now?"),
            ("prompt_enter_to_continue", "Press Enter to continue..."),
        ];
        c.insert(
            "en",
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        );
        c
    }

    pub fn dispatcher(launcher: FakeLauncher, privileged: bool) -> Dispatcher<FakeLauncher> {
        Dispatcher::new(launcher, "/srv/janus", privileged, Arc::new(AtomicBool::new(false)))
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn success_sets_done_status_and_resumes() {
        let mut d = dispatcher(FakeLauncher::default(), false);
        let mut console = FakeConsole::default();
        let mut session = Session::new("en");
        let inv = Invocation::new(["bash", "bin/janus-check.sh"], "/srv/janus");

        let ok = d.execute(&mut console, &mut session, &catalog(), &inv).unwrap();

        assert!(ok);
        assert_eq!(session.status, "Done.");
        assert_eq!((console.suspends, console.resumes), (1, 1));
        assert!(!console.suspended);
        assert_eq!(console.pauses, 1);
        assert_eq!(console.banners, vec![("Command completed successfully.".to_string(), true)]);
        assert!(console.said.contains(&"$ bash bin/janus-check.sh".to_string()));
    }

    #[test]
    fn non_zero_exit_reports_the_code_and_still_resumes() {
        let launcher = FakeLauncher {
            codes: vec![7],
            ..Default::default()
        };
        let mut d = dispatcher(launcher, false);
        let mut console = FakeConsole::default();
        let mut session = Session::new("en");
        let inv = Invocation::new(["false"], "/srv/janus").no_pause();

        let ok = d.execute(&mut console, &mut session, &catalog(), &inv).unwrap();

        assert!(!ok);
        assert!(session.status.contains('7'));
        assert_eq!(session.status, "Failed (exit code 7).");
        assert_eq!(console.banners[0], ("Command failed with exit code 7.".to_string(), false));
        assert_eq!((console.suspends, console.resumes), (1, 1));
        assert_eq!(console.pauses, 0);
    }

    #[test]
    fn launch_error_is_a_failure_not_an_error() {
        let launcher = FakeLauncher {
            fail_spawn: true,
            ..Default::default()
        };
        let mut d = dispatcher(launcher, false);
        let mut console = FakeConsole::default();
        let mut session = Session::new("en");
        let inv = Invocation::new(["no-such-tool"], "/srv/janus").no_pause();

        let ok = d.execute(&mut console, &mut session, &catalog(), &inv).unwrap();

        assert!(!ok);
        assert_eq!(session.status, "Failed (exit code 127).");
        assert_eq!(console.resumes, 1);
    }

    #[test]
    fn resume_happens_even_when_the_body_fails() {
        struct FailingPause(FakeConsole);
        impl Console for FailingPause {
            fn suspend(&mut self) -> Result<()> {
                self.0.suspend()
            }
            fn resume(&mut self) -> Result<()> {
                self.0.resume()
            }
            fn confirm(&mut self, s: &Session, c: &Catalog, m: &str, d: bool) -> Result<bool> {
                self.0.confirm(s, c, m, d)
            }
            fn say(&mut self, text: &str) {
                self.0.say(text)
            }
            fn banner(&mut self, text: &str, ok: bool) {
                self.0.banner(text, ok)
            }
            fn pause(&mut self, _prompt: &str) -> Result<()> {
                anyhow::bail!("stdin closed")
            }
        }

        let mut d = dispatcher(FakeLauncher::default(), false);
        let mut console = FailingPause(FakeConsole::default());
        let mut session = Session::new("en");
        let inv = Invocation::new(["true"], "/srv/janus");

        assert!(d.execute(&mut console, &mut session, &catalog(), &inv).is_err());
        assert!(!console.0.suspended);
        assert_eq!(console.0.resumes, 1);
    }

    #[test]
    fn interrupt_during_child_unwinds_after_resuming() {
        let flag = Arc::new(AtomicBool::new(false));
        struct Interrupting(Arc<AtomicBool>);
        impl Launcher for Interrupting {
            fn run(&mut self, _argv: &[String], _cwd: &Path) -> Result<i32> {
                self.0.store(true, Ordering::SeqCst);
                Ok(130)
            }
            fn probe(&mut self, _argv: &[String]) -> bool {
                false
            }
        }

        let mut d = Dispatcher::new(Interrupting(flag.clone()), "/srv/janus", false, flag.clone());
        let mut console = FakeConsole::default();
        let mut session = Session::new("en");
        let inv = Invocation::new(["sleep", "100"], "/srv/janus");

        let err = d.execute(&mut console, &mut session, &catalog(), &inv).unwrap_err();

        assert!(crate::error::is_interrupt(&err));
        assert_eq!(console.resumes, 1);
        assert_eq!(console.pauses, 0);
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[test]
    fn empty_argv_is_a_no_op() {
        let mut d = dispatcher(FakeLauncher::default(), false);
        let mut console = FakeConsole::default();
        let mut session = Session::new("en");
        let inv = Invocation::new(Vec::<String>::new(), "/srv/janus");
        assert!(!d.execute(&mut console, &mut session, &catalog(), &inv).unwrap());
        assert_eq!(console.suspends, 0);
    }

    #[test]
    fn shell_join_quotes_like_a_shell() {
        let argv: Vec<String> = ["bash", "my script.sh", "--name", "it's", ""]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(shell_join(&argv), r#"bash 'my script.sh' --name 'it'"'"'s' ''"#);
    }

    #[cfg(unix)]
    #[test]
    fn system_launcher_reports_real_exit_codes() {
        let mut l = SystemLauncher;
        let cwd = std::env::temp_dir();
        let argv = |s: &str| vec!["sh".to_string(), "-c".to_string(), s.to_string()];
        assert_eq!(l.run(&argv("exit 0"), &cwd).unwrap(), 0);
        assert_eq!(l.run(&argv("exit 7"), &cwd).unwrap(), 7);
        assert_eq!(l.run(&argv("kill -9 $$"), &cwd).unwrap(), 137);
        assert!(l.probe(&argv("true")));
        assert!(!l.probe(&argv("false")));
        assert!(l.run(&["/definitely/not/here".to_string()], &cwd).is_err());
    }
}
