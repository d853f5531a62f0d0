use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global JSON subscriber.
///
/// `RUST_LOG` controls the level; `default_level` applies when it is
/// unset or unparsable. Records emitted through the `log` facade (such
/// as actix-web's access log) are bridged into the same output.
/// Must be called at most once per process.
pub fn init_telemetry(default_level: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .json(),
        )
        .init();
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}
