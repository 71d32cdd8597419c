//! Terminal logging setup.
//!
//! Logs go to stderr so stdout carries only reports and plots. The level comes
//! from `-v` flags, falling back to `BOILER_LOG` (also read from `.env`).

use simplelog::{ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode};

/// Environment variable holding the default log level.
pub const LOG_ENV: &str = "BOILER_LOG";

pub fn parse_level(s: &str) -> Option<LevelFilter> {
    match s.trim().to_ascii_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

/// Level for a count of `-v` flags; zero defers to `env_level`, then `Warn`.
pub fn level_for(verbose: u8, env_level: Option<&str>) -> LevelFilter {
    match verbose {
        0 => env_level.and_then(parse_level).unwrap_or(LevelFilter::Warn),
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the global logger. Later calls are no-ops.
pub fn init(verbose: u8) {
    dotenvy::dotenv().ok();
    let env_level = std::env::var(LOG_ENV).ok();
    let level = level_for(verbose, env_level.as_deref());
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_environment() {
        assert_eq!(level_for(0, None), LevelFilter::Warn);
        assert_eq!(level_for(0, Some("debug")), LevelFilter::Debug);
        assert_eq!(level_for(0, Some("loud")), LevelFilter::Warn);
        assert_eq!(level_for(1, Some("error")), LevelFilter::Info);
        assert_eq!(level_for(5, None), LevelFilter::Trace);
        assert_eq!(parse_level(" INFO "), Some(LevelFilter::Info));
    }
}
