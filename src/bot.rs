use std::{
    fs::{self, File},
    io::{BufReader, BufWriter},
    path::Path,
    time::Duration,
};

use anyhow::{anyhow, Context};
use matrix_sdk::{
    room::Room,
    ruma::events::{
        room::{member::MemberEventContent, message::MessageEventContent},
        AnyMessageEventContent, StrippedStateEvent, SyncMessageEvent,
    },
    Client, ClientConfig, Session, SyncSettings,
};
use tokio::time::timeout;
use tracing::{debug, info, trace};

use crate::{
    config::{RelayConfig, SharedSettings},
    relay::{NotificationMessage, NotificationSender},
};

mod handlers;
use handlers::{answer_commands, autojoin_authorized_room};

mod message_builder;
use message_builder::MessageBuilder;

/// Upper bound for a single message delivery.
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

const SESSION_FILE: &str = "session.yaml";
const DEVICE_NAME: &str = "pull request relay";

pub struct Relay {
    client: Client,
    config: RelayConfig,
    settings: SharedSettings,
}

impl Relay {
    /// Creates a new [`Relay`] bot and builds a [`matrix_sdk::Client`] using the provided
    /// [`RelayConfig`].
    ///
    /// The [`Client`] is only initialized, not ready to be used yet.
    pub fn new(config: RelayConfig, settings: SharedSettings) -> anyhow::Result<Self> {
        let state_dir = &config.matrix_state_dir;
        fs::create_dir_all(state_dir)
            .with_context(|| format!("couldn't create state directory {}", state_dir.display()))?;

        let client_config = ClientConfig::new().store_path(state_dir.join("store"));
        let client = Client::new_with_config(config.matrix_homeserver.clone(), client_config)?;

        Ok(Self {
            client,
            config,
            settings,
        })
    }

    /// Loads session information from file, or creates it if no previous session is found.
    ///
    /// The bot is ready to run once this function has been called.
    pub async fn init(&self) -> anyhow::Result<()> {
        self.load_or_init_session()
            .await
            .context("couldn't init session for matrix bot")?;

        self.client
            .register_event_handler({
                let settings = self.settings.clone();
                move |ev: StrippedStateEvent<MemberEventContent>, client: Client, room: Room| {
                    let settings = settings.clone();
                    async move { autojoin_authorized_room(ev, client, room, settings).await }
                }
            })
            .await;

        self.client
            .register_event_handler({
                let settings = self.settings.clone();
                move |ev: SyncMessageEvent<MessageEventContent>, room: Room, client: Client| {
                    let settings = settings.clone();
                    async move { answer_commands(ev, room, client, settings).await }
                }
            })
            .await;

        Ok(())
    }

    /// The handle used by the webhook dispatcher to post notifications.
    pub fn notifier(&self) -> MatrixNotifier {
        MatrixNotifier {
            client: self.client.clone(),
            settings: self.settings.clone(),
        }
    }

    /// Start listening to Matrix events.
    ///
    /// [`Relay::init`] **must** be called before this function, otherwise the [`Client`] isn't
    /// logged in.
    pub async fn run(&self) {
        debug!("running...");
        self.client.sync(SyncSettings::default()).await
    }

    /// Restores the session saved in the state directory, or logs in with the configured
    /// credentials and saves the new session for the next start.
    async fn load_or_init_session(&self) -> anyhow::Result<()> {
        let session_file = self.config.matrix_state_dir.join(SESSION_FILE);

        if let Some(session) = read_session(&session_file)? {
            let (user_id, device_id) = (session.user_id.clone(), session.device_id.clone());
            self.client.restore_login(session).await?;
            info!("restored session of {} on device {}", user_id, device_id);
            return Ok(());
        }

        let response = self
            .client
            .login(
                &self.config.matrix_username,
                &self.config.matrix_password,
                None,
                Some(DEVICE_NAME),
            )
            .await
            .with_context(|| format!("couldn't log in as {}", self.config.matrix_username))?;
        info!(
            "logged in as {} on new device {}",
            response.user_id, response.device_id
        );

        write_session(
            &session_file,
            &Session {
                access_token: response.access_token,
                user_id: response.user_id,
                device_id: response.device_id,
            },
        )
    }
}

fn read_session(path: &Path) -> anyhow::Result<Option<Session>> {
    if !path.is_file() {
        return Ok(None);
    }

    let reader = BufReader::new(File::open(path)?);
    let session = serde_yaml::from_reader(reader)
        .with_context(|| format!("couldn't parse session file {}", path.display()))?;
    Ok(Some(session))
}

fn write_session(path: &Path, session: &Session) -> anyhow::Result<()> {
    let writer = BufWriter::new(
        File::create(path).with_context(|| format!("couldn't create {}", path.display()))?,
    );
    serde_yaml::to_writer(writer, session)?;
    Ok(())
}

/// Posts notifications to the configured Matrix room.
#[derive(Clone)]
pub struct MatrixNotifier {
    client: Client,
    settings: SharedSettings,
}

#[rocket::async_trait]
impl NotificationSender for MatrixNotifier {
    async fn send(&self, message: &NotificationMessage) -> anyhow::Result<()> {
        let room_id = self.settings.read().await.room_id.clone();
        let room = self.client.get_joined_room(&room_id).ok_or_else(|| {
            anyhow!(
                "room with id {} isn't joined yet, can't send message",
                room_id
            )
        })?;

        let message = MessageBuilder::notification(message);
        trace!(
            "sending message `{}` to room `{}`",
            message.plain,
            room.room_id()
        );
        let content = AnyMessageEventContent::RoomMessage(message.into());

        timeout(SEND_TIMEOUT, room.send(content, None))
            .await
            .map_err(|_| anyhow!("sending message timed out after {:?}", SEND_TIMEOUT))??;

        Ok(())
    }
}
