use matrix_sdk::{
    room::Room,
    ruma::{
        events::{
            room::message::{MessageEventContent, MessageType, TextMessageEventContent},
            AnyMessageEventContent, SyncMessageEvent,
        },
        RoomId,
    },
    Client,
};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::SharedSettings;

const PREFIX: char = '!';

const HELP: &str = "available commands:
!repo: link to the GitHub repository
!set_repo <url>: set the link to the GitHub repository
!project: link to the project board
!set_project <url>: set the link to the project board
!source: link to the source code of this bot
!channel: room pull request notifications are sent to
!set_channel <room id>: send pull request notifications to another room";

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Repo,
    SetRepo(Url),
    Project,
    SetProject(Url),
    Source,
    Channel,
    SetChannel(RoomId),
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command `{0}`, try !help")]
    Unknown(String),
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("`{0}` isn't a valid URL")]
    InvalidUrl(String),
    #[error("`{0}` isn't a valid room id, it should look like !abcdef:example.org")]
    InvalidRoom(String),
}

impl Command {
    /// Parses a message body. Returns `None` when the message isn't addressed to the bot.
    pub fn parse(body: &str) -> Option<Result<Self, CommandError>> {
        let body = body.trim().strip_prefix(PREFIX)?;

        let mut words = body.split_whitespace();
        let name = words.next()?;
        let argument = words.next();

        let command = match name {
            "help" => Ok(Self::Help),
            "repo" => Ok(Self::Repo),
            "set_repo" => parse_url(argument, "repository URL").map(Self::SetRepo),
            "project" => Ok(Self::Project),
            "set_project" => parse_url(argument, "project URL").map(Self::SetProject),
            "source" => Ok(Self::Source),
            "channel" => Ok(Self::Channel),
            "set_channel" => argument
                .ok_or(CommandError::MissingArgument("room id"))
                .and_then(|room| {
                    RoomId::try_from(room).map_err(|_| CommandError::InvalidRoom(room.to_string()))
                })
                .map(Self::SetChannel),
            other => Err(CommandError::Unknown(other.to_string())),
        };

        Some(command)
    }

    /// Runs the command and returns the reply.
    pub async fn execute(self, settings: &SharedSettings) -> String {
        match self {
            Self::Help => HELP.to_string(),
            Self::Repo => link_or_unset(settings.read().await.repo.as_ref(), "repository"),
            Self::SetRepo(repo) => {
                let reply = format!("Repo was set to {}", repo);
                settings.write().await.repo = Some(repo);
                reply
            }
            Self::Project => link_or_unset(settings.read().await.project.as_ref(), "project"),
            Self::SetProject(project) => {
                let reply = format!("Project was set to {}", project);
                settings.write().await.project = Some(project);
                reply
            }
            Self::Source => match env!("CARGO_PKG_REPOSITORY") {
                "" => "no source repository is known for this build".to_string(),
                source => source.to_string(),
            },
            Self::Channel => room_link(&settings.read().await.room_id),
            Self::SetChannel(room_id) => {
                let reply = format!("Channel was set to {}", room_link(&room_id));
                settings.write().await.room_id = room_id;
                reply
            }
        }
    }
}

fn parse_url(argument: Option<&str>, what: &'static str) -> Result<Url, CommandError> {
    let argument = argument.ok_or(CommandError::MissingArgument(what))?;
    Url::parse(argument).map_err(|_| CommandError::InvalidUrl(argument.to_string()))
}

fn link_or_unset(link: Option<&Url>, what: &str) -> String {
    match link {
        Some(link) => link.to_string(),
        None => format!("no {} link is set", what),
    }
}

fn room_link(room_id: &RoomId) -> String {
    format!("https://matrix.to/#/{}", room_id)
}

/// Answers the `!` commands sent in rooms the bot has joined.
pub async fn answer_commands(
    ev: SyncMessageEvent<MessageEventContent>,
    room: Room,
    client: Client,
    settings: SharedSettings,
) {
    let room = match room {
        Room::Joined(room) => room,
        _ => return,
    };

    if client.user_id().await.as_ref() == Some(&ev.sender) {
        return;
    }

    let body = match ev.content.msgtype {
        MessageType::Text(TextMessageEventContent { body, .. }) => body,
        _ => return,
    };

    let reply = match Command::parse(&body) {
        None => return,
        Some(Err(err)) => {
            debug!("invalid command from {}: {}", ev.sender, err);
            err.to_string()
        }
        Some(Ok(command)) => {
            info!("{} sent command {:?}", ev.sender, command);
            let not_joined = match &command {
                Command::SetChannel(room_id) => client.get_joined_room(room_id).is_none(),
                _ => false,
            };

            let mut reply = command.execute(&settings).await;
            if not_joined {
                reply.push_str(", invite me there so I can post notifications");
            }
            reply
        }
    };

    let content = AnyMessageEventContent::RoomMessage(MessageEventContent::text_plain(reply));
    if let Err(err) = room.send(content, None).await {
        warn!("couldn't answer command in room {}: {}", room.room_id(), err);
    }
}
