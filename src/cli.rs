use clap::Parser;
use std::path::PathBuf;

/// Janus terminal orchestrator
#[derive(Parser, Debug, Default)]
#[command(name = "janus-tui")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Language code (e.g. en, es)
    #[arg(long)]
    pub lang: Option<String>,

    /// List available language packs and exit
    #[arg(long)]
    pub list_languages: bool,

    /// Janus checkout holding bin/ and languages/ (default: $JANUS_ROOT or
    /// the nearest parent of the executable with a languages/ directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Disable colours
    #[arg(long)]
    pub no_color: bool,

    /// Write logs to this file instead of the default state directory
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse() {
        let args = Args::parse_from(["janus-tui", "--lang", "ES", "--no-color", "-v"]);
        assert_eq!(args.lang.as_deref(), Some("ES"));
        assert!(args.no_color);
        assert!(args.verbose);
        assert!(!args.list_languages);
    }

    #[test]
    fn list_languages_flag() {
        let args = Args::parse_from(["janus-tui", "--list-languages"]);
        assert!(args.list_languages);
        assert!(args.lang.is_none());
    }

    #[test]
    fn command_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
