use slog::{o, Drain, Logger};
use slog_async::Async;
use slog_term::{FullFormat, TermDecorator};

/// Configuration for setting up the logger
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    async_buffer_size: usize,
    use_color: bool,
    quiet: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            async_buffer_size: 1024,
            use_color: true,
            quiet: false,
        }
    }
}

impl LoggerConfig {
    /// Logger that swallows every record; used by tests.
    pub fn quiet() -> Self {
        Self {
            async_buffer_size: 64,
            use_color: false,
            quiet: true,
        }
    }

    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

/// Sets up the root audit logger. Services derive component loggers from it.
pub fn setup_logger(config: LoggerConfig) -> Logger {
    let root = o!("service" => "sams-api", "version" => env!("CARGO_PKG_VERSION"));
    if config.quiet {
        return Logger::root(slog::Discard, root);
    }

    let decorator = {
        let builder = TermDecorator::new();
        let builder = if config.use_color {
            builder.force_color()
        } else {
            builder
        };
        builder.build()
    };

    let drain = FullFormat::new(decorator).build().fuse();

    let drain = Async::new(drain)
        .chan_size(config.async_buffer_size)
        .build()
        .fuse();

    Logger::root(drain, root)
}

/// Child logger tagged with the owning component.
pub fn component(logger: &Logger, name: &'static str) -> Logger {
    logger.new(o!("component" => name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_logger_accepts_records() {
        let logger = setup_logger(LoggerConfig::quiet());
        let child = component(&logger, "assets");
        slog::info!(child, "asset transferred"; "asset_id" => 7);
    }
}
