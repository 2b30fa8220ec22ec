use anyhow::Context;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `level` accepts any `EnvFilter`
/// directive, e.g. `info` or `burrow_storage=debug,info`.
pub fn init(level: &str, json: bool) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(level).with_context(|| format!("invalid log level '{level}'"))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|err| anyhow::anyhow!(err))
}
