use crate::options::{CacheOptions, ConsumerOptions, QueueingOptions, RedisOptions};
use structopt::StructOpt;

/// Options for the interaction module
#[derive(Debug, StructOpt)]
pub struct Options {
    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub queueing: QueueingOptions,

    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub redis: RedisOptions,

    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub consumer: ConsumerOptions,

    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub cache: CacheOptions,

    /// Base URL of the service owning the authoritative like counts
    #[structopt(long, env, default_value = "http://localhost:8000", value_name = "url")]
    pub like_service: String,
}
