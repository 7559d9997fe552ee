//! log4rs setup: rolling files for application, audit and metrics output,
//! or a plain stderr console for the CLI.

use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::error::Error;
use std::path::{Path, PathBuf};

pub const AUDIT_TARGET: &str = "bookquery::audit";
pub const METRICS_TARGET: &str = "bookquery::metrics";
pub const DEV_TARGET: &str = "bookquery::dev";

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;

/// error|warn|info|debug|trace, anything else is `Info`.
#[must_use]
pub fn parse_level(level: Option<&str>) -> LevelFilter {
    match level.unwrap_or("info").to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

fn rolling(base: &Path, stem: &str, keep: u32) -> Result<RollingFileAppender, Box<dyn Error>> {
    let roller = FixedWindowRoller::builder()
        .build(&format!("{}", base.join(format!("{stem}.{{}}.log")).display()), keep)?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    Ok(RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(base.join(format!("{stem}.log")), Box::new(policy))?)
}

/// Configure file logging for the process.
/// - dir: base directory for logs; if None, current directory.
/// - level: error|warn|info|debug|trace
/// - retention: number of rolled files to keep (default 7)
///
/// A second call after a logger is installed leaves the first one in place.
///
/// # Errors
/// Returns an error if the directory or an appender cannot be created.
pub fn configure_logging(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<usize>,
) -> Result<(), Box<dyn Error>> {
    configure_logging_with_dev(dir, level, retention, false)
}

/// As [`configure_logging`], optionally persisting `devlog!` lines to `dev.log`.
///
/// # Errors
/// Returns an error if the directory or an appender cannot be created.
pub fn configure_logging_with_dev(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<usize>,
    enable_dev: bool,
) -> Result<(), Box<dyn Error>> {
    let base = match dir {
        Some(d) => d.to_path_buf(),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    std::fs::create_dir_all(&base)?;
    let keep = u32::try_from(retention.unwrap_or(7)).unwrap_or(u32::MAX);
    let lvl = parse_level(level);

    let mut builder = Config::builder()
        .appender(Appender::builder().build("app", Box::new(rolling(&base, "app", keep)?)))
        .appender(Appender::builder().build("audit", Box::new(rolling(&base, "audit", keep)?)))
        .appender(Appender::builder().build("metrics", Box::new(rolling(&base, "metrics", keep)?)))
        .logger(Logger::builder().appender("audit").additive(false).build(AUDIT_TARGET, lvl))
        .logger(Logger::builder().appender("metrics").additive(false).build(METRICS_TARGET, lvl));
    builder = if enable_dev {
        builder
            .appender(Appender::builder().build("dev", Box::new(rolling(&base, "dev", keep)?)))
            .logger(
                Logger::builder().appender("dev").additive(false).build(DEV_TARGET, LevelFilter::Trace),
            )
    } else {
        builder.logger(Logger::builder().additive(false).build(DEV_TARGET, LevelFilter::Off))
    };
    let config = builder.build(Root::builder().appender("app").build(lvl))?;
    if log4rs::init_config(config).is_err() {
        log::debug!("logger already initialized; keeping existing configuration");
    }
    Ok(())
}

/// Console logging to stderr, so stdout stays clean for command output.
///
/// # Errors
/// Returns an error if the configuration is rejected.
pub fn init_console(level: Option<&str>) -> Result<(), Box<dyn Error>> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("[{l}] {t} - {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .logger(Logger::builder().additive(false).build(DEV_TARGET, LevelFilter::Off))
        .build(Root::builder().appender("stderr").build(parse_level(level)))?;
    if log4rs::init_config(config).is_err() {
        log::debug!("logger already initialized; keeping existing configuration");
    }
    Ok(())
}

/// Configure file logging from the environment:
/// - `BOOKQUERY_LOG_DIR`
/// - `BOOKQUERY_LOG_LEVEL`
/// - `BOOKQUERY_LOG_RETENTION`
/// - `BOOKQUERY_DEVLOG` (1/true/yes)
///
/// # Errors
/// Returns an error if the log directory cannot be prepared.
pub fn configure_from_env() -> Result<(), Box<dyn Error>> {
    let dir = std::env::var("BOOKQUERY_LOG_DIR").ok().map(PathBuf::from);
    let level = std::env::var("BOOKQUERY_LOG_LEVEL").ok();
    let retention =
        std::env::var("BOOKQUERY_LOG_RETENTION").ok().and_then(|s| s.parse::<usize>().ok());
    let dev = std::env::var("BOOKQUERY_DEVLOG")
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);
    configure_logging_with_dev(dir.as_deref(), level.as_deref(), retention, dev)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parsing_defaults_to_info() {
        assert_eq!(parse_level(None), LevelFilter::Info);
        assert_eq!(parse_level(Some("DEBUG")), LevelFilter::Debug);
        assert_eq!(parse_level(Some("verbose")), LevelFilter::Info);
        assert_eq!(parse_level(Some("off")), LevelFilter::Off);
    }

    #[test]
    fn rolling_appender_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let _app = rolling(dir.path(), "audit", 3).unwrap();
        assert!(dir.path().join("audit.log").exists());
    }
}
