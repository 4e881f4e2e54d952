//! Queryable serving one hosted session
//!
//! The host declares a SINGLE queryable on `<prefix>/<scope>/session/<id>/*`.
//! It answers:
//!
//! 1. **Advert queries** on `<prefix>/<scope>/session/*/advert`
//!    - Replied with the encoded [`OnlineSession`] on the concrete advert key
//!    - Not replied at all when the session is not advertised
//!
//! 2. **Join queries** on `<prefix>/<scope>/session/<id>/join`
//!    - Replied with the connect address while public slots remain, taking one slot
//!    - Replied with an error once the session is full
//!
//! 3. **Leave queries** on `<prefix>/<scope>/session/<id>/leave`
//!    - Give one slot back, never above the session capacity
//!    - Replied with the number of open slots

use std::sync::{Arc, Mutex};

use zenoh::handlers::FifoChannelHandler;
use zenoh::query::{Query, Queryable};

use super::keyexpr::{KeyexprSession, SessionAction};
use crate::error::{LobbyError, Result};
use crate::types::OnlineSession;

/// Mutable part of a hosted session
#[derive(Debug)]
pub(crate) struct HostedState {
    pub(crate) session: OnlineSession,
    pub(crate) connect_address: String,
}

impl HostedState {
    /// Take one public slot, returns false when the session is full
    fn take_slot(&mut self) -> bool {
        if self.session.num_open_public_connections == 0 {
            return false;
        }
        self.session.num_open_public_connections -= 1;
        true
    }

    /// Give a slot back, returns false when none was taken
    fn release_slot(&mut self) -> bool {
        if self.session.num_open_public_connections >= self.session.settings.num_public_connections {
            return false;
        }
        self.session.num_open_public_connections += 1;
        true
    }
}

/// Queryable of one hosted session
#[derive(Debug)]
pub(crate) struct SessionQueryable {
    queryable: Queryable<FifoChannelHandler<Query>>,
    keyexpr: KeyexprSession,
    state: Arc<Mutex<HostedState>>,
}

impl SessionQueryable {
    /// Declare the queryable for `keyexpr` (a session key with wildcard action)
    pub(crate) async fn declare(
        session: &zenoh::Session,
        keyexpr: KeyexprSession,
        state: Arc<Mutex<HostedState>>,
    ) -> Result<Self> {
        let queryable = session
            .declare_queryable(keyexpr.to_keyexpr()?)
            .await
            .map_err(LobbyError::Zenoh)?;

        Ok(Self {
            queryable,
            keyexpr,
            state,
        })
    }

    /// Answer queries until the queryable is undeclared
    pub(crate) async fn serve(self) {
        while let Ok(query) = self.queryable.recv_async().await {
            if let Err(e) = self.answer(&query).await {
                tracing::debug!(
                    "Failed to answer query on {}: {}",
                    query.key_expr().as_str(),
                    e
                );
            }
        }
        tracing::debug!("Session queryable {:?} closed", self.keyexpr.session_id());
    }

    async fn answer(&self, query: &Query) -> Result<()> {
        let parsed = match KeyexprSession::try_from(query.key_expr()) {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::debug!("Ignoring query on {}", query.key_expr().as_str());
                return Ok(());
            }
        };

        match parsed.action() {
            Some(SessionAction::Advert) => {
                let advert = {
                    let state = self.lock_state()?;
                    if !state.session.settings.should_advertise {
                        return Ok(());
                    }
                    zenoh_ext::z_serialize(&state.session)
                };
                let reply_keyexpr = self.keyexpr.with_action(SessionAction::Advert).to_keyexpr()?;
                query
                    .reply(reply_keyexpr, advert)
                    .await
                    .map_err(LobbyError::Zenoh)
            }
            Some(SessionAction::Join) => {
                let address = {
                    let mut state = self.lock_state()?;
                    state.take_slot().then(|| state.connect_address.clone())
                };
                match address {
                    Some(address) => {
                        tracing::info!(
                            "Accepted join on session {:?}",
                            self.keyexpr.session_id()
                        );
                        query
                            .reply(query.key_expr().clone(), zenoh_ext::z_serialize(&address))
                            .await
                            .map_err(LobbyError::Zenoh)
                    }
                    None => {
                        tracing::info!(
                            "Rejected join on full session {:?}",
                            self.keyexpr.session_id()
                        );
                        query
                            .reply_err("session is full")
                            .await
                            .map_err(LobbyError::Zenoh)
                    }
                }
            }
            Some(SessionAction::Leave) => {
                let (released, open) = {
                    let mut state = self.lock_state()?;
                    let released = state.release_slot();
                    (released, state.session.num_open_public_connections)
                };
                if released {
                    tracing::info!("Player left session {:?}", self.keyexpr.session_id());
                } else {
                    tracing::debug!(
                        "Leave on session {:?} with no slot taken",
                        self.keyexpr.session_id()
                    );
                }
                query
                    .reply(query.key_expr().clone(), zenoh_ext::z_serialize(&open))
                    .await
                    .map_err(LobbyError::Zenoh)
            }
            None => {
                tracing::debug!("Query without action on {}", query.key_expr().as_str());
                Ok(())
            }
        }
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, HostedState>> {
        self.state
            .lock()
            .map_err(|_| LobbyError::Internal("hosted session state poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SessionSettings, UserId};

    #[test]
    fn test_take_slot_until_full() {
        let mut state = HostedState {
            session: OnlineSession {
                session_id: "abc".to_string(),
                owner: UserId::new("host"),
                settings: SessionSettings {
                    num_public_connections: 2,
                    ..SessionSettings::default()
                },
                num_open_public_connections: 2,
            },
            connect_address: "127.0.0.1:7777".to_string(),
        };

        assert!(state.take_slot());
        assert!(state.take_slot());
        assert!(!state.take_slot());
        assert_eq!(state.session.num_open_public_connections, 0);
    }

    #[test]
    fn test_release_slot_up_to_capacity() {
        let mut state = HostedState {
            session: OnlineSession {
                session_id: "abc".to_string(),
                owner: UserId::new("host"),
                settings: SessionSettings {
                    num_public_connections: 1,
                    ..SessionSettings::default()
                },
                num_open_public_connections: 1,
            },
            connect_address: "127.0.0.1:7777".to_string(),
        };

        assert!(!state.release_slot());
        assert!(state.take_slot());
        assert!(!state.take_slot());
        assert!(state.release_slot());
        assert_eq!(state.session.num_open_public_connections, 1);
        assert!(state.take_slot());
    }
}
