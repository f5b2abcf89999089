//! `JoinRequest` handling.
//!
//! Names are trimmed and validated, then checked for uniqueness
//! (ASCII case-insensitive) before the user is attached to the connection.

use crate::connection::{ConnectionId, SessionRegistry, User};
use crate::error::HandlerError;
use crate::messaging::TypedPacketHandler;
use tracing::{debug, info};
use ttt_shared::{DeliveryMode, JoinFailReason, JoinRequest, OnJoin, OnJoinFailed};

pub const MAX_USER_NAME_CHARS: usize = 32;

/// Attaches a user to a connection and answers with `OnJoin` or `OnJoinFailed`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JoinHandler;

/// Trims `name` and checks it is 1 to 32 characters of letters, digits, `_` or `-`.
pub fn validate_user_name(name: &str) -> Result<&str, JoinFailReason> {
    let name = name.trim();
    let length = name.chars().count();
    if length == 0 || length > MAX_USER_NAME_CHARS {
        return Err(JoinFailReason::InvalidName);
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err(JoinFailReason::InvalidName);
    }
    Ok(name)
}

impl JoinHandler {
    fn admit<'a>(
        request: &'a JoinRequest,
        connection_id: ConnectionId,
        sessions: &SessionRegistry,
    ) -> Result<&'a str, JoinFailReason> {
        if sessions
            .get_connection(connection_id)
            .is_ok_and(|c| c.user.is_some())
        {
            return Err(JoinFailReason::AlreadyJoined);
        }
        let name = validate_user_name(&request.user_name)?;
        if sessions.connection_id_by_user_name(name).is_some() {
            return Err(JoinFailReason::NameTaken);
        }
        Ok(name)
    }
}

impl TypedPacketHandler for JoinHandler {
    type Packet = JoinRequest;

    fn handle(
        &self,
        request: JoinRequest,
        connection_id: ConnectionId,
        sessions: &mut SessionRegistry,
    ) -> Result<(), HandlerError> {
        // Surfaces UnknownConnection before any reply is attempted
        sessions.get_connection(connection_id)?;

        match Self::admit(&request, connection_id, sessions) {
            Ok(name) => {
                let user = User::new(name);
                let reply = OnJoin {
                    user_id: user.id.to_string(),
                    user_name: user.name.clone(),
                };
                info!("🎮 Connection {} joined as '{}'", connection_id, user.name);
                sessions.set_user(connection_id, user)?;
                sessions.send(connection_id, &reply, DeliveryMode::ReliableOrdered)?;
            }
            Err(reason) => {
                debug!(
                    "Join from connection {} refused ({:?}): '{}'",
                    connection_id, reason, request.user_name
                );
                sessions.send(
                    connection_id,
                    &OnJoinFailed { reason },
                    DeliveryMode::ReliableOrdered,
                )?;
            }
        }
        Ok(())
    }
}
