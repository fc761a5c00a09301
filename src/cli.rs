use clap::Parser;
use std::path::PathBuf;

// Build version with target info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Engine: simulated\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Engine-to-presentation state bridge, driven by a simulated engine
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// How long the simulated session runs before the engine requests quit
    #[arg(short = 'd', long = "duration", value_name = "SECS", default_value = "3")]
    pub duration_secs: u64,

    /// Poll interval in milliseconds (overrides the settings file)
    #[arg(short = 'i', long = "interval", value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Enable debug logging to file (default: playbridge.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Print the effective settings as JSON and exit
    #[arg(long = "dump-config")]
    pub dump_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["playbridge"]);
        assert_eq!(args.duration_secs, 3);
        assert_eq!(args.interval_ms, None);
        assert_eq!(args.verbosity, 0);
        assert!(args.log_file.is_none());
        assert!(!args.dump_config);
    }

    #[test]
    fn test_flags() {
        let args = Args::parse_from(["playbridge", "-vv", "-i", "50", "--log", "-d", "1"]);
        assert_eq!(args.verbosity, 2);
        assert_eq!(args.interval_ms, Some(50));
        assert_eq!(args.log_file, Some(None));
        assert_eq!(args.duration_secs, 1);
    }
}
