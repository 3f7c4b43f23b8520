use anyhow::Result;
use clap::Parser;
use signal_hook::consts::signal::SIGINT;
use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

mod actions;
mod checks;
mod cli;
mod config;
mod deps;
mod error;
mod i18n;
mod launcher;
mod logging;
mod nav;
mod privilege;
mod session;
mod status;
mod ui;
mod widgets;

use actions::App;
use checks::{load_catalog, print_preflight, resolve_language, run_preflight, stdio_is_terminal};
use cli::Args;
use config::{default_log_file, load_settings, settings_file, ColorMode, Paths};
use error::{is_interrupt, EXIT_INTERRUPTED};
use launcher::{Dispatcher, SystemLauncher};
use session::Session;
use ui::{Palette, Tui};

// ── Main application loop ─────────────────────────────────────────────────────

fn run(args: Args) -> Result<ExitCode> {
    let settings = load_settings();

    let log_path = args
        .log_file
        .clone()
        .or_else(|| settings.log_file.clone())
        .unwrap_or_else(default_log_file);
    let log_written = logging::init(&log_path, args.verbose);
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!(%info, "panic");
        default_hook(info);
    }));
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting");

    let paths = Paths::discover(args.root.as_deref());
    let catalog = load_catalog(&paths)?;

    if args.list_languages {
        for code in catalog.codes() {
            println!("{code}\t{}", catalog.display_name(code));
        }
        return Ok(ExitCode::SUCCESS);
    }

    let locale = std::env::var("LANG").unwrap_or_default();
    let language = resolve_language(
        &catalog,
        args.lang.as_deref(),
        settings.language.as_deref(),
        &locale,
    )?;
    run_preflight(&paths, &catalog, &language, stdio_is_terminal())?;
    tracing::info!(root = %paths.root.display(), language = %language, "preflight passed");

    // Raised while a child owns the terminal; raw mode turns Ctrl+C into a key
    // press the rest of the time.
    let interrupted = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGINT, Arc::clone(&interrupted))?;
    // Raised while waiting for Enter on the restored terminal.
    let exit_on_interrupt = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register_conditional_default(SIGINT, Arc::clone(&exit_on_interrupt))?;

    let color = if args.no_color {
        ColorMode::Never
    } else {
        settings.color
    };
    let palette = Palette::new(color.resolve_from_env());

    let mut session = Session::new(language);
    session.set_status(&catalog, "status_ready", &[]);
    let dispatcher = Dispatcher::new(
        SystemLauncher,
        paths.root.clone(),
        privilege::running_as_root(),
        interrupted,
    );

    let tui = Tui::enter(palette, exit_on_interrupt)?;
    let mut app = App::new(tui, dispatcher, session, catalog, paths, settings, settings_file());

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| nav::run(&mut app)));

    // Always restore terminal
    app.tui.restore().ok();

    match result {
        Ok(Ok(())) => Ok(ExitCode::SUCCESS),
        Ok(Err(e)) if is_interrupt(&e) => {
            tracing::info!("interrupted by user");
            Ok(ExitCode::from(EXIT_INTERRUPTED))
        }
        Ok(Err(e)) => Err(e),
        Err(_) => {
            eprintln!("{}", crash_message(log_written.then_some(log_path.as_path())));
            Ok(ExitCode::FAILURE)
        }
    }
}

fn crash_message(log: Option<&Path>) -> String {
    match log {
        Some(path) => format!("janus-tui crashed. Check {}", path.display()),
        None => "janus-tui crashed.".to_string(),
    }
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "exiting");
            print_preflight(&e);
            ExitCode::FAILURE
        }
    }
}
