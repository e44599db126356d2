use modules::options::{RedisOptions, RpcOptions};
use std::str::FromStr;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    about = "Event-driven cache maintenance and token validation over a Redis message bus.",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct MainOptions {
    /// Log level, scopable to different modules
    ///
    /// Levels: trace, debug, info, warn, error
    #[structopt(
        short,
        long,
        global = true,
        default_value = "info,hyper=warn,redis=warn",
        env = "RUST_LOG",
        value_name = "level"
    )]
    pub log: String,

    /// Output format of log messages
    ///
    /// Formats: text, compact, json
    #[structopt(long, global = true, env, default_value = "text", value_name = "format")]
    pub log_format: LogFormat,

    /// Enable status reporting server which can be used as a readiness probe
    #[structopt(long, global = true, env, value_name = "port")]
    pub status_server: Option<u16>,

    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Answers token validation requests
    Identity(modules::identity::Options),
    /// Keeps cached post and comment snapshots current
    Content(modules::content::Options),
    /// Aggregates like interactions into cached counters
    Interaction(modules::interaction::Options),
    /// Validates a single authorization header against a running identity module
    Authenticate(AuthenticateOptions),
}

#[derive(Debug, StructOpt)]
pub struct AuthenticateOptions {
    /// Value of the authorization header, e.g. "Bearer <token>"
    #[structopt(long, env, value_name = "header")]
    pub authorization: String,

    #[structopt(flatten)]
    pub redis: RedisOptions,

    #[structopt(flatten)]
    pub rpc: RpcOptions,
}
