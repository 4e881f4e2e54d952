//! # zenoh-lobby
//!
//! Session management for multiplayer games: create, advertise, discover, join
//! and tear down game sessions ("rooms") through a pluggable online services
//! provider.
//!
//! ## Overview
//!
//! A [`SessionCoordinator`] turns four intents (advertise, discover, join,
//! leave) into requests on a provider's [`SessionInterface`], and turns the
//! provider's completions into [`SessionEvent`]s for any number of
//! subscribers. The provider does the actual networking; this crate ships one
//! built on Zenoh queries ([`ZenohOnlineServices`]).
//!
//! ## Key Features
//!
//! - Provider and host game injected as trait objects, no global state
//! - Search results projected into display records with stable positional indices
//! - Superseded searches never leak into the live result list
//! - LAN-only and online session scopes
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use zenoh_lobby::{CoordinatorConfig, GameHost, SessionCoordinator, SessionExt, UserId};
//!
//! struct Game;
//!
//! impl GameHost for Game {
//!     fn local_player(&self) -> Option<UserId> {
//!         Some(UserId::new("player_1"))
//!     }
//!     fn open_level(&self, entry: &str, listen: bool) {
//!         println!("open {} (listen: {})", entry, listen);
//!     }
//!     fn client_travel(&self, address: &str) {
//!         println!("travel to {}", address);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let session = zenoh::open(zenoh::Config::default()).await?;
//!     let services = session.declare_online_services().await?;
//!
//!     let mut coordinator =
//!         SessionCoordinator::new(CoordinatorConfig::default(), Arc::new(services), Arc::new(Game));
//!     coordinator.initialize()?;
//!     let (_, events) = coordinator.subscribe();
//!
//!     coordinator.find_rooms(10, true)?;
//!     coordinator.step().await;
//!     for event in events.drain() {
//!         println!("{}", event);
//!     }
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod coordinator;
pub mod error;
pub mod host;
pub mod names;
pub mod network;
pub mod observers;
pub mod provider;
pub mod session_ext;
pub mod types;

// Re-exports for convenience
pub use config::CoordinatorConfig;
pub use coordinator::{SessionCoordinator, SessionEvent, StepResult};
pub use error::{LobbyError, Result};
pub use host::GameHost;
pub use network::{ZenohOnlineServices, ZenohSessionInterface};
pub use observers::{Observers, SubscriptionId};
pub use provider::{CompletionKind, OnlineServices, SessionCompletion, SessionInterface};
pub use session_ext::{OnlineServicesBuilder, SessionExt};
pub use types::{
    JoinResult, OnlineSession, SearchResult, SessionDescriptor, SessionName, SessionRole,
    SessionSearch, SessionSearchResult, SessionSettings, UserId,
};
