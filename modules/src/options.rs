//! Various options usable by modules
//!
//! The structs in this module allow other modules to flatten them into
//! their own options struct. This allows for a unified yet non-cluttered
//! option set.

use library::communication::event::ConsumptionOptions;
use library::communication::implementation::redis::RedisBus;
use library::helpers::{parse_millis, parse_seconds};
use library::BoxedError;
use std::time::Duration;
use structopt::StructOpt;
use tracing::{debug, instrument};

/// Options for connecting to the Redis server
#[derive(Debug, StructOpt)]
pub struct RedisOptions {
    /// Redis database server URL
    #[structopt(
        short = "r",
        long = "redis",
        env = "REDIS",
        global = true,
        default_value = "redis://localhost:6379/",
        value_name = "url"
    )]
    pub url: String,
}

impl RedisOptions {
    /// Opens a bus handle and verifies that the server is reachable
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn connect(&self) -> Result<RedisBus, BoxedError> {
        let bus = RedisBus::open(&self.url)?;
        bus.ping().await?;
        debug!("Redis server is reachable");
        Ok(bus)
    }
}

/// Options relevant for message queueing
#[derive(Debug, StructOpt)]
pub struct QueueingOptions {
    /// Unique and stable identifier for this instance.
    /// It is used to identify and resume work after a crash
    /// or deliberate restart, thus it may not change across
    /// executions!
    #[structopt(env)]
    pub id: String,
}

/// Options controlling how queues are read
#[derive(Debug, StructOpt)]
pub struct ConsumerOptions {
    /// Maximum number of entries fetched per read
    #[structopt(long, env, default_value = "10", value_name = "count")]
    pub batch_size: usize,

    /// Duration in milliseconds a single read blocks waiting for new entries
    #[structopt(long, env, default_value = "1000", parse(try_from_str = parse_millis), value_name = "ms")]
    pub poll_interval: Duration,

    /// Seconds an entry may stay unacknowledged before another member takes it over.
    /// Zero disables taking over entries.
    #[structopt(long, env, default_value = "30", parse(try_from_str = parse_seconds), value_name = "seconds")]
    pub claim_idle: Duration,
}

impl From<&ConsumerOptions> for ConsumptionOptions {
    fn from(options: &ConsumerOptions) -> Self {
        Self {
            batch_size: options.batch_size.max(1),
            poll_interval: options.poll_interval,
            claim_idle: Some(options.claim_idle).filter(|idle| !idle.is_zero()),
        }
    }
}

/// Lifetimes of cached values in seconds
#[derive(Debug, Clone, StructOpt)]
pub struct CacheOptions {
    /// Lifetime of cached post snapshots
    #[structopt(long, env, default_value = "300", parse(try_from_str = parse_seconds), value_name = "seconds")]
    pub post_ttl: Duration,

    /// Lifetime of cached comment snapshots
    #[structopt(long, env, default_value = "300", parse(try_from_str = parse_seconds), value_name = "seconds")]
    pub comment_ttl: Duration,

    /// Lifetime of cached like counts
    #[structopt(long, env, default_value = "300", parse(try_from_str = parse_seconds), value_name = "seconds")]
    pub like_count_ttl: Duration,

    /// Lifetime of cached user profiles
    #[structopt(long, env, default_value = "300", parse(try_from_str = parse_seconds), value_name = "seconds")]
    pub user_profile_ttl: Duration,

    /// Lifetime of cached comment listings per user
    #[structopt(long, env, default_value = "300", parse(try_from_str = parse_seconds), value_name = "seconds")]
    pub user_comments_ttl: Duration,
}

/// Options for requests sent over the bus
#[derive(Debug, StructOpt)]
pub struct RpcOptions {
    /// Seconds to wait for a reply to an authentication request
    #[structopt(long, env, default_value = "5", parse(try_from_str = parse_seconds), value_name = "seconds")]
    pub auth_timeout: Duration,
}

#[cfg(test)]
mod does {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn derive_consumption_options() {
        let options = ConsumerOptions {
            batch_size: 25,
            poll_interval: Duration::from_millis(500),
            claim_idle: Duration::from_secs(60),
        };

        assert_eq!(
            ConsumptionOptions::from(&options),
            ConsumptionOptions {
                batch_size: 25,
                poll_interval: Duration::from_millis(500),
                claim_idle: Some(Duration::from_secs(60)),
            }
        );
    }

    #[test]
    fn disable_claims_with_zero_idle_time() {
        let options = ConsumerOptions {
            batch_size: 0,
            poll_interval: Duration::from_millis(500),
            claim_idle: Duration::from_secs(0),
        };

        let derived = ConsumptionOptions::from(&options);
        assert_eq!(derived.claim_idle, None);
        assert_eq!(derived.batch_size, 1);
    }
}
