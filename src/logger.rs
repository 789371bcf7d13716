// Stderr logger backend for schedsim
//
// The library logs through the `log` facade only; binaries install this
// backend (or any other) at startup.
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

const P_ERROR: &str = "\x1b[1;31m[ERRO]\x1b[0m ";
const P_WARN: &str = "\x1b[1;33m[WARN]\x1b[0m ";
const P_INFO: &str = "\x1b[32m[INFO]\x1b[0m ";
const P_DEBUG: &str = "\x1b[36m[DEBG]\x1b[0m ";
const P_TRACE: &str = "\x1b[35m[TRAC]\x1b[0m ";

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

fn prefix(level: Level) -> &'static str {
    match level {
        Level::Error => P_ERROR,
        Level::Warn => P_WARN,
        Level::Info => P_INFO,
        Level::Debug => P_DEBUG,
        Level::Trace => P_TRACE,
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{}{}", prefix(record.level()), record.args());
        }
    }

    fn flush(&self) {}
}

/// Install the stderr logger with `level` as the maximum
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

/// Parse a level name such as `"debug"`, case-insensitive
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    name.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_level_names() {
        assert_eq!(parse_level("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_level("WARN"), Some(LevelFilter::Warn));
        assert_eq!(parse_level("off"), Some(LevelFilter::Off));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn prefixes_are_distinct() {
        let levels = [Level::Error, Level::Warn, Level::Info, Level::Debug, Level::Trace];
        for (i, a) in levels.iter().enumerate() {
            for b in &levels[i + 1..] {
                assert_ne!(prefix(*a), prefix(*b));
            }
        }
    }
}
