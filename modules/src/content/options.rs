use crate::options::{CacheOptions, ConsumerOptions, QueueingOptions, RedisOptions};
use structopt::StructOpt;

/// Options for the content module
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
}
