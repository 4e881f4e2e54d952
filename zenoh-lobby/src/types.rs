/// Core types for the zenoh-lobby library
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{LobbyError, Result};

/// Settings key carrying the advertised display name
pub const SERVER_NAME_KEY: &str = "SERVER_NAME_KEY";

/// Settings key carrying the advertised host label
pub const SERVER_HOSTNAME_KEY: &str = "SERVER_HOSTNAME_KEY";

/// Placeholder used when a result has no display name attribute
pub const EMPTY_SERVER_NAME: &str = "Empty Server Name";

/// Placeholder used when a result has no host label attribute
pub const EMPTY_HOST_NAME: &str = "Empty Host Name";

/// Symbolic name addressing the active session
///
/// Create, join and destroy requests issued by one coordinator all address
/// the same name. The handle behind it is owned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionName(String);

impl SessionName {
    /// Create from a specific name
    /// Returns error if name is empty
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(LobbyError::InvalidSessionName(
                "Session name cannot be empty".to_string(),
            ));
        }
        Ok(SessionName(name))
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionName {
    fn default() -> Self {
        SessionName("GameSession".to_string())
    }
}

impl TryFrom<String> for SessionName {
    type Error = LobbyError;

    fn try_from(name: String) -> Result<Self> {
        SessionName::new(name)
    }
}

impl From<SessionName> for String {
    fn from(name: SessionName) -> Self {
        name.0
    }
}

impl std::fmt::Display for SessionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of the local player owning a request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the caller wants to advertise
///
/// Passed once to the provider when requesting session creation and not
/// retained afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescriptor {
    /// Advertised display name
    pub name: String,
    /// Advertised host label
    pub host: String,
    /// Requested player capacity
    pub max_players: u32,
    /// Restrict the session to the local network
    pub lan_only: bool,
    /// Advertise through presence
    pub uses_presence: bool,
    /// Allow joining through presence
    pub allow_join_via_presence: bool,
}

impl SessionDescriptor {
    /// Descriptor with presence enabled, as used by `create_room`
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        max_players: u32,
        lan_only: bool,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            max_players,
            lan_only,
            uses_presence: true,
            allow_join_via_presence: true,
        }
    }
}

/// Settings handed to the provider's `create_session`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub is_lan_match: bool,
    pub uses_presence: bool,
    pub num_public_connections: u32,
    pub num_private_connections: u32,
    pub allow_join_in_progress: bool,
    pub should_advertise: bool,
    pub allow_join_via_presence: bool,
    pub allow_join_via_presence_friends_only: bool,
    /// Advertised string attributes (display name, host label)
    pub attributes: BTreeMap<String, String>,
}

impl SessionSettings {
    /// Look up an advertised attribute
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Set an advertised attribute
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            is_lan_match: false,
            uses_presence: true,
            num_public_connections: 0,
            num_private_connections: 0,
            allow_join_in_progress: true,
            should_advertise: true,
            allow_join_via_presence: true,
            allow_join_via_presence_friends_only: false,
            attributes: BTreeMap::new(),
        }
    }
}

impl From<&SessionDescriptor> for SessionSettings {
    fn from(descriptor: &SessionDescriptor) -> Self {
        let mut settings = SessionSettings {
            is_lan_match: descriptor.lan_only,
            uses_presence: descriptor.uses_presence,
            num_public_connections: descriptor.max_players,
            allow_join_via_presence: descriptor.allow_join_via_presence,
            ..SessionSettings::default()
        };
        settings.set(SERVER_NAME_KEY, descriptor.name.clone());
        settings.set(SERVER_HOSTNAME_KEY, descriptor.host.clone());
        settings
    }
}

/// A search query issued by `discover`
///
/// Each call builds a new query with a fresh `search_id`; completions that
/// carry an older id belong to a superseded query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSearch {
    pub search_id: u64,
    pub is_lan_query: bool,
    pub max_search_results: usize,
    /// Only match sessions advertised through presence
    pub presence_only: bool,
}

impl SessionSearch {
    pub fn new(search_id: u64, max_search_results: usize, is_lan_query: bool) -> Self {
        Self {
            search_id,
            is_lan_query,
            max_search_results,
            presence_only: true,
        }
    }
}

/// A session as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnlineSession {
    /// Provider-owned session handle
    pub session_id: String,
    /// Owner of the session
    pub owner: UserId,
    pub settings: SessionSettings,
    pub num_open_public_connections: u32,
}

/// Raw provider entry in a result list
///
/// `session` is `None` when the provider returned an entry it could not
/// make sense of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub session: Option<OnlineSession>,
    pub ping_ms: u32,
}

impl SearchResult {
    pub fn valid(session: OnlineSession, ping_ms: u32) -> Self {
        Self {
            session: Some(session),
            ping_ms,
        }
    }

    pub fn invalid() -> Self {
        Self {
            session: None,
            ping_ms: 0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.session.is_some()
    }
}

/// Display record broadcast for each valid search result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSearchResult {
    pub name: String,
    pub host: String,
    pub ping_ms: u32,
    pub current_players: u32,
    pub max_players: u32,
    /// Position in the raw result list of the last search
    pub index: usize,
}

impl SessionSearchResult {
    /// Project a raw entry, `None` for invalid entries
    pub fn project(result: &SearchResult, index: usize) -> Option<Self> {
        let session = result.session.as_ref()?;
        let settings = &session.settings;
        let max_players = settings.num_public_connections;
        Some(Self {
            name: settings
                .get(SERVER_NAME_KEY)
                .unwrap_or(EMPTY_SERVER_NAME)
                .to_string(),
            host: settings
                .get(SERVER_HOSTNAME_KEY)
                .unwrap_or(EMPTY_HOST_NAME)
                .to_string(),
            ping_ms: result.ping_ms,
            current_players: max_players.saturating_sub(session.num_open_public_connections),
            max_players,
            index,
        })
    }
}

impl std::fmt::Display for SessionSearchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} (host: {}, {}/{} players, {} ms)",
            self.index, self.name, self.host, self.current_players, self.max_players, self.ping_ms
        )
    }
}

/// Outcome reported by the provider for a join request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinResult {
    Success,
    SessionIsFull,
    SessionDoesNotExist,
    CouldNotRetrieveAddress,
    AlreadyInSession,
    UnknownError,
}

impl std::fmt::Display for JoinResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JoinResult::Success => "success",
            JoinResult::SessionIsFull => "session is full",
            JoinResult::SessionDoesNotExist => "session does not exist",
            JoinResult::CouldNotRetrieveAddress => "could not retrieve address",
            JoinResult::AlreadyInSession => "already in session",
            JoinResult::UnknownError => "unknown error",
        };
        write!(f, "{}", s)
    }
}

/// Role of the local process in the addressed session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionRole {
    /// No session
    #[default]
    Idle,
    /// Hosting a session created by this coordinator
    Hosting,
    /// Joined a remote session
    Joined,
}

impl std::fmt::Display for SessionRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionRole::Idle => write!(f, "Idle"),
            SessionRole::Hosting => write!(f, "Hosting"),
            SessionRole::Joined => write!(f, "Joined"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(settings: SessionSettings, open: u32) -> OnlineSession {
        OnlineSession {
            session_id: "abc".to_string(),
            owner: UserId::new("owner"),
            settings,
            num_open_public_connections: open,
        }
    }

    #[test]
    fn test_session_name_empty() {
        assert!(SessionName::new("").is_err());
        assert!(SessionName::new("   ").is_err());
        assert_eq!(SessionName::new("My Session").unwrap().as_str(), "My Session");
    }

    #[test]
    fn test_settings_from_descriptor() {
        let descriptor = SessionDescriptor::new("Room", "Alice", 4, true);
        let settings = SessionSettings::from(&descriptor);

        assert!(settings.is_lan_match);
        assert!(settings.uses_presence);
        assert_eq!(settings.num_public_connections, 4);
        assert_eq!(settings.num_private_connections, 0);
        assert!(settings.allow_join_in_progress);
        assert!(settings.should_advertise);
        assert!(settings.allow_join_via_presence);
        assert!(!settings.allow_join_via_presence_friends_only);
        assert_eq!(settings.get(SERVER_NAME_KEY), Some("Room"));
        assert_eq!(settings.get(SERVER_HOSTNAME_KEY), Some("Alice"));
    }

    #[test]
    fn test_projection_occupancy() {
        let descriptor = SessionDescriptor::new("Room", "Alice", 8, false);
        let result = SearchResult::valid(session((&descriptor).into(), 5), 42);

        let projected = SessionSearchResult::project(&result, 3).unwrap();
        assert_eq!(projected.name, "Room");
        assert_eq!(projected.host, "Alice");
        assert_eq!(projected.ping_ms, 42);
        assert_eq!(projected.max_players, 8);
        assert_eq!(projected.current_players, 3);
        assert_eq!(projected.index, 3);
    }

    #[test]
    fn test_projection_placeholders() {
        let settings = SessionSettings {
            num_public_connections: 2,
            ..SessionSettings::default()
        };
        // More open slots than capacity must not underflow
        let result = SearchResult::valid(session(settings, 5), 7);

        let projected = SessionSearchResult::project(&result, 0).unwrap();
        assert_eq!(projected.name, EMPTY_SERVER_NAME);
        assert_eq!(projected.host, EMPTY_HOST_NAME);
        assert_eq!(projected.current_players, 0);
    }

    #[test]
    fn test_projection_invalid_entry() {
        assert!(SessionSearchResult::project(&SearchResult::invalid(), 0).is_none());
    }

    #[test]
    fn test_search_result_display() {
        let record = SessionSearchResult {
            name: "Room".to_string(),
            host: "Alice".to_string(),
            ping_ms: 12,
            current_players: 1,
            max_players: 4,
            index: 2,
        };
        assert_eq!(
            format!("{}", record),
            "[2] Room (host: Alice, 1/4 players, 12 ms)"
        );
    }
}
