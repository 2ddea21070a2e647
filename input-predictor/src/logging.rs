use tracing_subscriber::EnvFilter;

/// `RUST_LOG` when set, otherwise `level` for this workspace's crates.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let app_name = env!("CARGO_PKG_NAME").replace('-', "_");

        format!("{app_name}={level},input_analyser={level}").into()
    })
}

/// Installs the global fmt subscriber. Returns false if one was already set.
pub fn init(level: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .try_init()
        .is_ok()
}
