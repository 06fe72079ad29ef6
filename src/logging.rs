use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;
use std::time::SystemTime;

pub fn setup_logging() {
    Builder::new()
        .filter_level(LevelFilter::Info) // Set default level
        .parse_env("RUST_LOG") // Allow override through env var
        .format(|buf, record| {
            let timestamp = SystemTime::now();
            let level = record.level();

            if atty::is(atty::Stream::Stderr) {
                let level_color = match level {
                    log::Level::Error => "\x1B[31m", // Red
                    log::Level::Warn => "\x1B[33m",  // Yellow
                    log::Level::Info => "\x1B[32m",  // Green
                    log::Level::Debug => "\x1B[36m", // Cyan
                    log::Level::Trace => "\x1B[35m", // Magenta
                };

                // Only include file and line for debug/trace levels
                if level <= log::Level::Debug {
                    writeln!(
                        buf,
                        "{}{:>5}\x1B[0m [{}] {} - {}:{}",
                        level_color,
                        level,
                        humantime::format_rfc3339_millis(timestamp),
                        record.args(),
                        record.file().unwrap_or("unknown"),
                        record.line().unwrap_or(0)
                    )
                } else {
                    writeln!(
                        buf,
                        "{}{:>5}\x1B[0m [{}] {}",
                        level_color,
                        level,
                        humantime::format_rfc3339_millis(timestamp),
                        record.args()
                    )
                }
            } else if level <= log::Level::Debug {
                writeln!(
                    buf,
                    "{:>5} [{}] {} - {}:{}",
                    level,
                    humantime::format_rfc3339_millis(timestamp),
                    record.args(),
                    record.file().unwrap_or("unknown"),
                    record.line().unwrap_or(0)
                )
            } else {
                writeln!(
                    buf,
                    "{:>5} [{}] {}",
                    level,
                    humantime::format_rfc3339_millis(timestamp),
                    record.args()
                )
            }
        })
        .init();
}

#[macro_export]
macro_rules! log_request {
    ($method:expr, $path:expr) => {
        log::info!("→ {} {}", $method, $path)
    };
}

#[macro_export]
macro_rules! log_response {
    ($status:expr, $duration:expr, $size:expr) => {
        log::info!("← {} ({:?}) - {} bytes", $status, $duration, $size)
    };
}
