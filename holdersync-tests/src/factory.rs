mod providers;
mod repos;

pub use providers::*;
pub use repos::*;

use holdersync::Config;

/// Config with every delay shrunk so retry/backoff paths run instantly.
pub fn fast_config() -> Config {
    Config::new()
        .with_batch_size(2)
        .with_fetch_rate_ms(0)
        .with_rate_limit_backoff_ms(1)
        .with_retry_backoff_ms(1)
        .with_request_timeout_ms(5_000)
}
