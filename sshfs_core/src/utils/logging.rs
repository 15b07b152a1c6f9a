use env_logger::Env;

/// Initialize logging using env_logger.
/// Reads the RUST_LOG environment variable for filtering and falls back to
/// `info` when it is unset, e.g. `RUST_LOG=sshfs_core=debug cargo run --bin gui`.
pub fn init_logging() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}
