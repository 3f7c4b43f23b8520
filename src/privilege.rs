//! Elevation negotiation for commands that need root.
//!
//! Order: already root, silent `sudo -n true`, then ask and refresh the sudo
//! timestamp through the dispatcher. The session remembers a grant only
//! until the probe stops passing.

use anyhow::Result;

use crate::i18n::Catalog;
use crate::launcher::{Console, Dispatcher, Invocation, Launcher};
use crate::session::Session;

pub const SUDO: &str = "sudo";
/// Never prompt for a password mid-command: a stale grant fails fast.
pub const NON_INTERACTIVE: &str = "-n";

pub fn running_as_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

fn probe_command() -> Vec<String> {
    vec![SUDO.into(), NON_INTERACTIVE.into(), "true".into()]
}

fn refresh_command() -> Vec<String> {
    vec![SUDO.into(), "-v".into()]
}

impl<L: Launcher> Dispatcher<L> {
    pub fn ensure_elevated<C: Console + ?Sized>(
        &mut self,
        console: &mut C,
        session: &mut Session,
        catalog: &Catalog,
    ) -> Result<bool> {
        if self.privileged {
            return Ok(true);
        }
        if self.launcher.probe(&probe_command()) {
            tracing::debug!("sudo credentials already cached");
            session.elevated = true;
            return Ok(true);
        }
        if session.elevated {
            tracing::info!("sudo timestamp expired, asking again");
            session.elevated = false;
        }
        if !console.confirm(session, catalog, &session.t(catalog, "sudo_request"), true)? {
            tracing::info!("user declined elevation");
            return Ok(false);
        }

        let refresh = Invocation::new(refresh_command(), self.workdir.clone()).no_pause();
        let granted = self.execute(console, session, catalog, &refresh)?;
        tracing::info!(granted, "sudo refresh finished");
        session.elevated = granted;
        Ok(granted)
    }

    /// `sudo -n <argv>`, or `argv` untouched when already root.
    pub fn elevation_prefix(&self, argv: Vec<String>) -> Vec<String> {
        if self.privileged {
            return argv;
        }
        let mut wrapped = vec![SUDO.to_string(), NON_INTERACTIVE.to_string()];
        wrapped.extend(argv);
        wrapped
    }
}
