use std::io::IsTerminal;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "lumina=info";
pub const VERBOSE_FILTER: &str = "lumina=debug";

/// `--verbose` wins over `RUST_LOG`; otherwise `RUST_LOG` wins over the default.
pub fn filter_directive(verbose: bool, rust_log: Option<&str>) -> String {
    match (verbose, rust_log.map(str::trim)) {
        (true, _) => VERBOSE_FILTER.to_string(),
        (false, Some(directive)) if !directive.is_empty() => directive.to_string(),
        _ => DEFAULT_FILTER.to_string(),
    }
}

pub fn init_tracing(verbose: bool) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directive = filter_directive(verbose, rust_log.as_deref());
    let env_filter = EnvFilter::try_new(&directive)
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to initialise logging: {err}"))
}
