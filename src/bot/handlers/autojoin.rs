use std::time::Duration;

use matrix_sdk::{
    room::{Invited, Room},
    ruma::events::{room::member::MemberEventContent, StrippedStateEvent},
    Client,
};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::SharedSettings;

const FIRST_JOIN_DELAY: Duration = Duration::from_secs(2);
const LAST_JOIN_DELAY: Duration = Duration::from_secs(3600);

/// Accepts invitations to the room notifications are posted to, and declines every other one.
pub async fn autojoin_authorized_room(
    room_member: StrippedStateEvent<MemberEventContent>,
    client: Client,
    room: Room,
    settings: SharedSettings,
) {
    let invited = match (client.user_id().await, room) {
        (Some(user_id), Room::Invited(invited)) if room_member.state_key == user_id.as_str() => {
            invited
        }
        _ => return,
    };

    let room_id = invited.room_id().clone();
    let room_name = invited
        .display_name()
        .await
        .unwrap_or_else(|_| room_id.to_string());
    info!("invited to room `{}` ({})", room_name, room_id);

    let notification_room = settings.read().await.room_id.clone();
    if room_id != notification_room {
        warn!(
            "declining invitation to `{}`, notifications go to `{}`",
            room_id, notification_room
        );
        if let Err(err) = invited.reject_invitation().await {
            error!("couldn't decline invitation to `{}`: {}", room_id, err);
        }
        return;
    }

    join_with_retries(&invited).await;
}

/// Synapse may send the invitation before the bot is allowed to join, so failed joins are retried
/// with a growing delay. See https://github.com/matrix-org/synapse/issues/4345
async fn join_with_retries(invited: &Invited) {
    debug!("joining room `{}`", invited.room_id());

    let mut delays = join_delays();
    loop {
        let err = match invited.accept_invitation().await {
            Ok(()) => {
                info!("joined room `{}`", invited.room_id());
                return;
            }
            Err(err) => err,
        };

        match delays.next() {
            Some(delay) => {
                warn!(
                    "couldn't join room `{}` ({}), retrying in {:?}",
                    invited.room_id(),
                    err,
                    delay
                );
                sleep(delay).await;
            }
            None => {
                error!("giving up on joining room `{}`: {}", invited.room_id(), err);
                return;
            }
        }
    }
}

/// Doubling delays between join attempts, up to an hour.
fn join_delays() -> impl Iterator<Item = Duration> {
    std::iter::successors(Some(FIRST_JOIN_DELAY), |delay| Some(*delay * 2))
        .take_while(|delay| *delay <= LAST_JOIN_DELAY)
}
