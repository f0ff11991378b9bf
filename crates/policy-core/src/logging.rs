use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize a tracing subscriber for hosts embedding policy synchronization.
///
/// Compact formatted logs go to stdout. The level comes from `RUST_LOG`,
/// defaulting to "info"; `RUST_LOG=policy_core=debug` traces every file
/// copied or removed.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .compact();

    let filter_layer = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_fails_instead_of_panicking() {
        // Only one global subscriber per process; whichever call comes second must error.
        let first = init();
        let second = init();
        assert!(first.is_err() || second.is_err());
    }
}
