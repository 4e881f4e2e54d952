//! Configuration for a SessionCoordinator

use serde::{Deserialize, Serialize};

use crate::names;
use crate::types::SessionName;

/// Main configuration for a SessionCoordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Symbolic name every create/join/destroy request addresses
    pub session_name: SessionName,

    /// Level opened in listen mode once hosting starts
    pub room_level: String,

    /// Level opened after the session is destroyed (None = stay where we are)
    pub menu_level: Option<String>,

    /// Default host label for advertised sessions
    pub host_label: String,

    /// Timeout for step() method in milliseconds
    /// step() returns when either a completion was dispatched or this timeout elapses
    pub step_timeout_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            session_name: SessionName::default(),
            room_level: "/Game/Maps/Room".to_string(),
            menu_level: None,
            host_label: names::generate_unique_name(),
            step_timeout_ms: 5000,
        }
    }
}

impl CoordinatorConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session name
    pub fn with_session_name(mut self, name: SessionName) -> Self {
        self.session_name = name;
        self
    }

    /// Set the level opened when hosting starts
    pub fn with_room_level(mut self, level: impl Into<String>) -> Self {
        self.room_level = level.into();
        self
    }

    /// Set the level opened after the session ends
    pub fn with_menu_level(mut self, level: Option<String>) -> Self {
        self.menu_level = level;
        self
    }

    /// Set the default host label
    pub fn with_host_label(mut self, label: impl Into<String>) -> Self {
        self.host_label = label.into();
        self
    }

    /// Set the step timeout in milliseconds
    pub fn with_step_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.step_timeout_ms = timeout_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.session_name.as_str(), "GameSession");
        assert_eq!(config.room_level, "/Game/Maps/Room");
        assert!(config.menu_level.is_none());
        assert!(!config.host_label.is_empty());
        assert_eq!(config.step_timeout_ms, 5000);
    }

    #[test]
    fn test_builder() {
        let config = CoordinatorConfig::new()
            .with_session_name(SessionName::new("My Session").unwrap())
            .with_menu_level(Some("/Game/Maps/Menu".to_string()))
            .with_host_label("Alice")
            .with_step_timeout_ms(100);
        assert_eq!(config.session_name.as_str(), "My Session");
        assert_eq!(config.menu_level.as_deref(), Some("/Game/Maps/Menu"));
        assert_eq!(config.host_label, "Alice");
        assert_eq!(config.step_timeout_ms, 100);
    }

    #[test]
    fn test_partial_json() {
        let config: CoordinatorConfig =
            serde_json::from_str(r#"{ "session_name": "Lobby", "step_timeout_ms": 250 }"#)
                .unwrap();
        assert_eq!(config.session_name.as_str(), "Lobby");
        assert_eq!(config.step_timeout_ms, 250);
        assert_eq!(config.room_level, "/Game/Maps/Room");
    }

    #[test]
    fn test_empty_session_name_rejected() {
        let result = serde_json::from_str::<CoordinatorConfig>(r#"{ "session_name": "" }"#);
        assert!(result.is_err());
    }
}
