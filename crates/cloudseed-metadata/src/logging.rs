/// Logger bootstrap for binaries embedding the providers.
///
/// `RUST_LOG` is respected; defaults to `info` on stderr. Safe to call more
/// than once (later calls are no-ops), which keeps test setups simple.
pub fn init() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .try_init();
}
