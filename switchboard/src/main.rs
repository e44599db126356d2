use anyhow::{anyhow, Result};
use harness::{ModuleRunner, RedisCommunicationFactory};
use library::communication::CommunicationFactory;
use modules::content::Content;
use modules::identity::{Identity, IdentityClient};
use modules::interaction::Interaction;
use options::{AuthenticateOptions, Command, LogFormat};
use structopt::StructOpt;
use tracing::info;

mod options;

#[tokio::main]
async fn main() -> Result<()> {
    let (command, runner) = init().await?;

    let reason = match command {
        Command::Identity(options) => runner.run(Identity::new(options)).await,
        Command::Content(options) => runner.run(Content::new(options)).await,
        Command::Interaction(options) => runner.run(Interaction::new(options)).await,
        Command::Authenticate(options) => return authenticate(options).await,
    };

    if reason.is_failure() {
        Err(anyhow!("module terminated: {}", reason))
    } else {
        Ok(())
    }
}

async fn init() -> Result<(options::Command, ModuleRunner)> {
    let options = options::MainOptions::from_args();

    let formatter = tracing_subscriber::fmt().with_env_filter(options.log);

    match options.log_format {
        LogFormat::Text => formatter.init(),
        LogFormat::Compact => formatter.compact().init(),
        LogFormat::Json => formatter.json().init(),
    };

    let runner = match options.status_server {
        Some(port) => ModuleRunner::new_with_status_server(port),
        None => ModuleRunner::default(),
    };

    info!("Switchboard {}", env!("CARGO_PKG_VERSION"));

    Ok((options.command, runner))
}

async fn authenticate(options: AuthenticateOptions) -> Result<()> {
    let bus = options
        .redis
        .connect()
        .await
        .map_err(|e| anyhow!("unable to reach the bus: {}", e))?;

    let factory = RedisCommunicationFactory::new(bus);
    let client = IdentityClient::new(factory.requestor(), options.rpc.auth_timeout);

    match client.authenticate(&options.authorization).await {
        Ok(user) => {
            println!("{}", serde_json::to_string_pretty(&user)?);
            Ok(())
        }
        Err(e) => Err(anyhow!("{} ({})", e, e.status_code())),
    }
}
