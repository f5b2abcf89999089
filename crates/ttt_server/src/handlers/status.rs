//! `ServerStatusRequest` handling: the joined user count and a sorted,
//! capped list of names.

use crate::connection::{ConnectionId, SessionRegistry};
use crate::error::HandlerError;
use crate::messaging::TypedPacketHandler;
use ttt_shared::{DeliveryMode, OnServerStatus, ServerStatusRequest};

/// Most user names listed in one status reply.
pub const MAX_LISTED_USERS: usize = 10;

/// Reports how many users are joined and lists some of them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerStatusHandler;

impl TypedPacketHandler for ServerStatusHandler {
    type Packet = ServerStatusRequest;

    fn handle(
        &self,
        _request: ServerStatusRequest,
        connection_id: ConnectionId,
        sessions: &mut SessionRegistry,
    ) -> Result<(), HandlerError> {
        let mut user_names: Vec<String> = sessions.users().map(|u| u.name.clone()).collect();
        let players_online = u16::try_from(user_names.len()).unwrap_or(u16::MAX);
        user_names.sort_unstable();
        user_names.truncate(MAX_LISTED_USERS);

        let reply = OnServerStatus {
            players_online,
            user_names,
        };
        sessions.send(connection_id, &reply, DeliveryMode::ReliableOrdered)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::User;
    use crate::handlers::test_support::{decode, sessions_with};
    use ttt_shared::Packet;

    #[test]
    fn test_status_counts_joined_users_only() {
        let (mut sessions, handle) = sessions_with(&[1, 2, 3]);
        sessions.set_user(2, User::new("carol")).unwrap();
        sessions.set_user(3, User::new("bob")).unwrap();

        ServerStatusHandler
            .handle(ServerStatusRequest, 1, &mut sessions)
            .unwrap();

        let sent = handle.take_sent();
        assert_eq!(sent[0].connection_id, 1);
        assert_eq!(
            decode(&sent[0].payload),
            Packet::OnServerStatus(OnServerStatus {
                players_online: 2,
                user_names: vec!["bob".into(), "carol".into()],
            })
        );
    }

    #[test]
    fn test_status_lists_at_most_ten_names() {
        let ids: Vec<_> = (1..=12).collect();
        let (mut sessions, handle) = sessions_with(&ids);
        for id in ids {
            sessions.set_user(id, User::new(format!("user{:02}", id))).unwrap();
        }

        ServerStatusHandler
            .handle(ServerStatusRequest, 1, &mut sessions)
            .unwrap();

        match decode(&handle.take_sent()[0].payload) {
            Packet::OnServerStatus(status) => {
                assert_eq!(status.players_online, 12);
                assert_eq!(status.user_names.len(), MAX_LISTED_USERS);
                assert_eq!(status.user_names[0], "user01");
                assert_eq!(status.user_names[9], "user10");
            }
            other => panic!("unexpected reply {:?}", other),
        }
    }
}
