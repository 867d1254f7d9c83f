use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Map a level name to an `EnvFilter` directive. Accepts the usual
/// uppercase spellings (`WARNING`, `CRITICAL`) as well as tracing's own.
pub fn level_directive(log_level: &str) -> String {
    match log_level.trim().to_uppercase().as_str() {
        "TRACE" => "trace".to_string(),
        "DEBUG" => "debug".to_string(),
        "INFO" | "" => "info".to_string(),
        "WARN" | "WARNING" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.trim().to_string(),
    }
}

/// Initialise the global `tracing` subscriber on stderr.
///
/// `RUST_LOG` wins when set; otherwise `log_level` is used, falling back to
/// `info` if it is not a valid directive.
pub fn setup_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(level_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("info"))
    });

    let layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry().with(filter).with(layer).init();
}
