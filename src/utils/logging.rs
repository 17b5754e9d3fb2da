use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;

/// Modules of the embedded HTTP server that log worker start-up and shutdown at info
const SERVER_MODULES: [&str; 3] = ["actix_server", "actix_web", "mio"];

/// Initialize the logger with custom formatting
pub fn init_logger(level: LevelFilter) {
    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .filter(None, level);

    for (module, module_level) in module_filters(level) {
        builder.filter_module(module, module_level);
    }
    builder.init();
}

/// Per-module overrides: server modules never log below Warn unless the global level is quieter
fn module_filters(level: LevelFilter) -> Vec<(&'static str, LevelFilter)> {
    SERVER_MODULES
        .iter()
        .map(|module| (*module, level.min(LevelFilter::Warn)))
        .collect()
}

/// Get log level from string
pub fn get_log_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(get_log_level("DEBUG"), LevelFilter::Debug);
        assert_eq!(get_log_level("off"), LevelFilter::Off);
        assert_eq!(get_log_level("verbose"), LevelFilter::Info);
    }

    #[test]
    fn test_server_modules_capped_at_warn() {
        let filters = module_filters(LevelFilter::Debug);
        assert_eq!(filters.len(), SERVER_MODULES.len());
        assert!(filters.iter().all(|(_, level)| *level == LevelFilter::Warn));
        assert!(filters.iter().any(|(module, _)| *module == "actix_server"));

        let quiet = module_filters(LevelFilter::Error);
        assert!(quiet.iter().all(|(_, level)| *level == LevelFilter::Error));
    }
}
