//! Tracing subscriber setup. Only the binary installs one.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Filter from `TRADEGATE_LOG`, falling back to `log_level`. `json` selects
/// JSON lines; anything else is human-readable.
pub fn init_tracing(log_level: &str, log_format: &str) -> Result<()> {
    let filter = std::env::var("TRADEGATE_LOG").unwrap_or_else(|_| log_level.to_string());
    let env_filter =
        EnvFilter::try_new(filter).map_err(|err| anyhow!("invalid log filter: {err}"))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    if log_format.trim().eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
