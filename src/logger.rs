use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

/// Initializes the logging system.
///
/// Installs a console appender at `Info` level. Call once at the beginning of
/// the application's execution; a second call fails because the global logger
/// is already set.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    init_with_level(LevelFilter::Info)
}

/// Same as [`init`] but with an explicit level, useful for debugging scans.
pub fn init_with_level(level: LevelFilter) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%Y-%m-%d %H:%M:%S)} {l} {t} - {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))?;
    log4rs::init_config(config)?;
    Ok(())
}
