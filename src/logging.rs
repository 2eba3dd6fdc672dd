// 📜 Logging setup shared by the CLI and the server

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Env var holding the log filter, e.g. `pokemon_todo=debug,tower_http=info`
pub const LOG_ENV: &str = "POKEMON_TODO_LOG";

/// Install the global subscriber. Only the first call has an effect.
pub fn init_logging(default_level: Level) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_str()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init()
        .ok();
}
