//! Menu tree and the navigation stack that walks it.

use anyhow::Result;

use crate::actions::{Action, App};
use crate::launcher::Launcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Main,
    Vfio,
    Vm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Open(Screen),
    Run(Action),
    Back,
}

impl Screen {
    pub fn title_key(self) -> &'static str {
        match self {
            Screen::Main => "main_menu_title",
            Screen::Vfio => "vfio_menu_title",
            Screen::Vm => "vm_menu_title",
        }
    }

    /// Label keys and what they do, in display order. The last entry always
    /// leaves the screen.
    pub fn entries(self) -> &'static [(&'static str, MenuAction)] {
        use MenuAction::*;
        match self {
            Screen::Main => &[
                ("main_menu_guided_setup", Run(Action::GuidedSetup)),
                ("main_menu_dependencies", Run(Action::Dependencies)),
                ("main_menu_run_check", Run(Action::RunCheck)),
                ("main_menu_run_init", Run(Action::RunInit)),
                ("main_menu_vfio_manager", Open(Screen::Vfio)),
                ("main_menu_vm_manager", Open(Screen::Vm)),
                ("main_menu_change_language", Run(Action::ChangeLanguage)),
                ("main_menu_exit", Back),
            ],
            Screen::Vfio => &[
                ("vfio_menu_list_devices", Run(Action::VfioList)),
                ("vfio_menu_dry_run", Run(Action::VfioDryRun)),
                ("vfio_menu_apply", Run(Action::VfioApply)),
                ("vfio_menu_rollback", Run(Action::VfioRollback)),
                ("menu_back_generic", Back),
            ],
            Screen::Vm => &[
                ("vm_menu_list", Run(Action::VmList)),
                ("vm_menu_create_guided", Run(Action::VmCreateGuided)),
                ("vm_menu_create_quick", Run(Action::VmCreateQuick)),
                ("vm_menu_start", Run(Action::VmStart)),
                ("vm_menu_stop", Run(Action::VmStop)),
                ("vm_menu_status", Run(Action::VmStatus)),
                ("menu_back_generic", Back),
            ],
        }
    }
}

/// What the loop does after a menu choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Redraw,
    Perform(Action),
    Quit,
}

/// Stack of open screens; the root is `Main`.
#[derive(Debug, Clone)]
pub struct Navigator {
    stack: Vec<Screen>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self {
            stack: vec![Screen::Main],
        }
    }
}

impl Navigator {
    pub fn current(&self) -> Option<Screen> {
        self.stack.last().copied()
    }

    #[cfg(test)]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// `None` is a cancelled menu and behaves like `Back`.
    pub fn apply(&mut self, choice: Option<MenuAction>) -> Step {
        match choice.unwrap_or(MenuAction::Back) {
            MenuAction::Open(screen) => {
                self.stack.push(screen);
                Step::Redraw
            }
            MenuAction::Run(action) => Step::Perform(action),
            MenuAction::Back => {
                self.stack.pop();
                if self.stack.is_empty() {
                    Step::Quit
                } else {
                    Step::Redraw
                }
            }
        }
    }
}

/// Drive the menus until the root is left. Menus are rebuilt on every pass
/// so a language switch shows up straight away.
pub fn run<L: Launcher>(app: &mut App<L>) -> Result<()> {
    let mut nav = Navigator::default();
    while let Some(screen) = nav.current() {
        let options: Vec<(String, MenuAction)> = screen
            .entries()
            .iter()
            .map(|(key, action)| (app.t(key), *action))
            .collect();
        let title = app.t(screen.title_key());
        let choice = app.tui.pick(&app.session, &app.catalog, &title, &options)?;

        match nav.apply(choice) {
            Step::Perform(action) => app.perform(action)?,
            Step::Redraw => {}
            Step::Quit => {
                tracing::info!("left the main menu");
                break;
            }
        }
    }
    Ok(())
}
