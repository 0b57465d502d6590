//! A terminal logger for the `log` facade with colored level prefixes.

use colored::{ColoredString, Colorize};
use log::{Level, LevelFilter, Log, Metadata, Record};

struct Logger;

static LOGGER: Logger = Logger;

/// Installs the logger. `verbose` enables debug output.
pub fn init(verbose: bool) -> Result<(), log::SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
    Ok(())
}

fn prefix(level: Level) -> ColoredString {
    match level {
        Level::Error => "[error]".red().bold(),
        Level::Warn => "[warn]".yellow().bold(),
        Level::Info => "[xylem]".green().bold(),
        Level::Debug => "[debug]".blue(),
        Level::Trace => "[trace]".dimmed(),
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match record.level() {
            Level::Error | Level::Warn => eprintln!("{} {}", prefix(record.level()), record.args()),
            _ => println!("{} {}", prefix(record.level()), record.args()),
        }
    }

    fn flush(&self) {}
}
