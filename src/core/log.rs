use anyhow::{Result, anyhow};
use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

const CRATE_TARGET: &str = "squadplan";

/// Dependencies whose warnings are worth seeing next to our own.
const DEPENDENCY_TARGETS: [&str; 3] = ["reqwest", "fjall", "lsm_tree"];

fn targets(verbose: bool) -> Targets {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    DEPENDENCY_TARGETS.iter().fold(
        Targets::new().with_target(CRATE_TARGET, level),
        |targets, dependency| targets.with_target(*dependency, LevelFilter::WARN),
    )
}

/// Installs the global subscriber on stderr so tables on stdout stay clean.
/// `RUST_LOG` narrows the output further.
pub fn init_logging(verbose: bool) -> Result<()> {
    let default_directive = if verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(fmt::layer().pretty().without_time().with_writer(std::io::stderr))
        .with(targets(verbose))
        .with(env_filter)
        .try_init()
        .map_err(|e| anyhow!("Failed to install log subscriber: {e}"))
}
