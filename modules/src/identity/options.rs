use crate::options::{CacheOptions, ConsumerOptions, QueueingOptions, RedisOptions};
use structopt::StructOpt;

/// Options for the identity module
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

    /// Shared secret access tokens are signed with
    #[structopt(long, env, hide_env_values = true, value_name = "secret")]
    pub jwt_secret: String,
}
