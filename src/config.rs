use std::{
    fmt::Display,
    io::Read,
    net::{IpAddr, Ipv4Addr},
    path::PathBuf,
    str::FromStr,
    sync::Arc,
};

use anyhow::{anyhow, Context};
use matrix_sdk::ruma::RoomId;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tokio::sync::RwLock;
use url::Url;

const DEFAULT_PORT: u16 = 6666;

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Port the webhook server listens on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Deployment environment, decides which address the server binds to
    #[serde(default)]
    pub environment: Environment,
    /// Link to the GitHub repository with the pull requests
    pub repo: Option<Url>,
    /// Link to the project board
    pub project: Option<Url>,
    /// The URL for the homeserver we should connect to
    pub matrix_homeserver: Url,
    /// The bot's account username
    pub matrix_username: String,
    /// The bot's account password
    pub matrix_password: String,
    /// Path to a directory where the bot will store Matrix state and current session information.
    pub matrix_state_dir: PathBuf,
    /// ID of the Matrix room where the bot should post messages. The bot will only accept
    /// invitations to this room.
    pub matrix_room_id: RoomId,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Values given on the command line, they take precedence over the configuration file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub port: Option<u16>,
    pub environment: Option<Environment>,
    pub repo: Option<Url>,
    pub project: Option<Url>,
    pub homeserver: Option<Url>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub state_dir: Option<PathBuf>,
    pub room: Option<String>,
}

impl Overrides {
    fn merge_into(self, values: &mut Mapping) -> anyhow::Result<()> {
        set(values, "port", self.port)?;
        set(values, "environment", self.environment)?;
        set(values, "repo", self.repo)?;
        set(values, "project", self.project)?;
        set(values, "matrix_homeserver", self.homeserver)?;
        set(values, "matrix_username", self.username)?;
        set(values, "matrix_password", self.password)?;
        set(values, "matrix_state_dir", self.state_dir)?;
        set(values, "matrix_room_id", self.room)?;

        Ok(())
    }
}

fn set<T: Serialize>(values: &mut Mapping, key: &str, value: Option<T>) -> anyhow::Result<()> {
    if let Some(value) = value {
        values.insert(Value::String(key.to_string()), serde_yaml::to_value(value)?);
    }

    Ok(())
}

impl RelayConfig {
    /// Reads the optional YAML configuration file and applies the command line values on top of
    /// it. Settings missing from both are reported by name.
    pub fn load<R: Read>(file: Option<R>, overrides: Overrides) -> anyhow::Result<Self> {
        let mut values = match file {
            Some(reader) => serde_yaml::from_reader(reader).context("couldn't parse config file")?,
            None => Mapping::new(),
        };
        overrides.merge_into(&mut values)?;

        Ok(serde_yaml::from_value(Value::Mapping(values))?)
    }

    /// Settings that can be changed at runtime through chat commands.
    pub fn settings(&self) -> SharedSettings {
        Arc::new(RwLock::new(Settings {
            repo: self.repo.clone(),
            project: self.project.clone(),
            room_id: self.matrix_room_id.clone(),
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

impl Default for Environment {
    fn default() -> Self {
        Self::Dev
    }
}

impl Environment {
    /// Development servers are only reachable from the local machine.
    pub fn listen_address(self) -> IpAddr {
        match self {
            Self::Dev => IpAddr::V4(Ipv4Addr::LOCALHOST),
            Self::Prod => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        }
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => Err(anyhow!("unknown environment `{}`, expected dev or prod", other)),
        }
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dev => write!(f, "dev"),
            Self::Prod => write!(f, "prod"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub repo: Option<Url>,
    pub project: Option<Url>,
    /// Room the notifications are posted to
    pub room_id: RoomId,
}

pub type SharedSettings = Arc<RwLock<Settings>>;
