use colored::*;
use log::{Level, LevelFilter};
use std::io::Write;
use std::process::exit;

/// Applies the formatting to the string based on the level
/// level 1: completion
/// level 2: info
/// level 3: warning
/// level 4: error
/// level 5: fatal error
fn apply_level(string: &str, level: i8) -> ColoredString {
    match level {
        1 => string.bright_green(),
        2 => string.bright_cyan(),
        3 => ("warning: ".to_owned() + string).bright_yellow(),
        4 => ("error: ".to_owned() + string).bright_red(),
        5 => ("fatal error: ".to_owned() + string).red().bold(),
        _ => string.normal(),
    }
}

fn level_of(level: Level) -> i8 {
    match level {
        Level::Error => 4,
        Level::Warn => 3,
        Level::Info => 2,
        Level::Debug | Level::Trace => 0,
    }
}

/// Maps the number of `-v` flags to a level filter.
pub fn level_filter(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// `[ddsmt] <message>`, coloured by level.
pub fn format_line(message: &str, level: Level) -> String {
    format!("[ddsmt] {}", apply_level(message, level_of(level)))
}

/// Installs the `[ddsmt]` logger on stderr. `RUST_LOG` takes precedence
/// over the verbosity given on the command line.
pub fn init(verbosity: u8) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level_filter(verbosity))
        .parse_default_env()
        .format(|buf, record| writeln!(buf, "{}", format_line(&record.args().to_string(), record.level())));
    // a second init in the same process keeps the first logger
    let _ = builder.try_init();
}

/// Prints `[ddsmt] <error>` and exits the program for levels above 3.
///
/// # Arguments
///
/// * `error` - A string slice that holds the error message
/// * `level` - The error level, higher means more severe
pub fn raise_error(error: &str, level: i8) {
    eprintln!("[ddsmt] {}", apply_level(error, level));
    if level > 3 {
        exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter() {
        assert_eq!(level_filter(0), LevelFilter::Warn);
        assert_eq!(level_filter(1), LevelFilter::Info);
        assert_eq!(level_filter(2), LevelFilter::Debug);
        assert_eq!(level_filter(7), LevelFilter::Trace);
    }

    #[test]
    fn test_format_line() {
        colored::control::set_override(false);
        assert_eq!(format_line("reduced", Level::Info), "[ddsmt] reduced");
        assert_eq!(format_line("slow", Level::Warn), "[ddsmt] warning: slow");
        assert_eq!(format_line("10 tests", Level::Trace), "[ddsmt] 10 tests");
    }
}
