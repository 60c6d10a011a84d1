use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use url::Url;

mod bot;
use bot::Relay;

mod config;
use config::{Environment, Overrides, RelayConfig};

mod relay;
use relay::Dispatcher;

mod webhooks;
use webhooks::build_rocket;

#[derive(Parser)]
#[clap(version)]
struct Opts {
    /// Configuration file for the relay, flags take precedence over it
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// HTTP port, overrides the configuration file
    #[clap(long)]
    port: Option<u16>,
    /// dev | prod
    #[clap(long)]
    environment: Option<Environment>,
    /// Link to the GitHub repository with the pull requests
    #[clap(long)]
    repo: Option<Url>,
    /// Link to the project board
    #[clap(long)]
    project: Option<Url>,
    /// Matrix homeserver URL
    #[clap(long)]
    homeserver: Option<Url>,
    /// Matrix account username
    #[clap(long)]
    username: Option<String>,
    /// Matrix account password
    #[clap(long)]
    password: Option<String>,
    /// Directory where Matrix state and session information are stored
    #[clap(long)]
    state_dir: Option<PathBuf>,
    /// ID of the Matrix room notifications are sent to
    #[clap(long)]
    room: Option<String>,
}

impl Opts {
    fn overrides(self) -> Overrides {
        Overrides {
            port: self.port,
            environment: self.environment,
            repo: self.repo,
            project: self.project,
            homeserver: self.homeserver,
            username: self.username,
            password: self.password,
            state_dir: self.state_dir,
            room: self.room,
        }
    }
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opts = Opts::parse();
    let config_file = match &opts.config {
        Some(path) => Some(BufReader::new(
            File::open(path).with_context(|| format!("couldn't open {}", path.display()))?,
        )),
        None => None,
    };
    let config = RelayConfig::load(config_file, opts.overrides()).context("invalid configuration")?;

    let settings = config.settings();
    let relay = Relay::new(config.clone(), settings).context("failed to create matrix bot")?;
    relay.init().await.context("failed to init matrix bot")?;

    let dispatcher = Dispatcher::new(Arc::new(relay.notifier()));
    tokio::spawn(async move { relay.run().await });

    info!(
        "starting server on {}:{}",
        config.environment.listen_address(),
        config.port
    );
    build_rocket(&config, dispatcher)
        .launch()
        .await
        .map_err(|err| anyhow::anyhow!(err))?;

    info!("gracefully shut down");
    Ok(())
}
