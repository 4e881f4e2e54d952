//! Provider-facing interface
//!
//! The coordinator never talks to a transport directly. It drives a
//! [`SessionInterface`] obtained from an [`OnlineServices`] provider and
//! learns about finished requests through [`SessionCompletion`]s delivered on
//! the interface's completion channel.

use std::sync::Arc;

use crate::error::Result;
use crate::types::{JoinResult, SearchResult, SessionName, SessionSearch, SessionSettings, UserId};

/// Completion of a previously issued request
///
/// Each request produces exactly one completion. Completions of the same
/// kind arrive in request order; there is no ordering across kinds.
#[derive(Debug, Clone)]
pub enum SessionCompletion {
    /// `create_session` finished
    Create {
        session_name: SessionName,
        success: bool,
    },
    /// `find_sessions` finished
    Find {
        /// Id of the query the results belong to
        search_id: u64,
        success: bool,
        results: Vec<SearchResult>,
    },
    /// `join_session` finished
    Join {
        session_name: SessionName,
        result: JoinResult,
    },
    /// `destroy_session` finished
    Destroy {
        session_name: SessionName,
        success: bool,
    },
}

/// Kind of a completion, reported by the coordinator's step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Create,
    Find,
    Join,
    Destroy,
}

impl SessionCompletion {
    pub fn kind(&self) -> CompletionKind {
        match self {
            SessionCompletion::Create { .. } => CompletionKind::Create,
            SessionCompletion::Find { .. } => CompletionKind::Find,
            SessionCompletion::Join { .. } => CompletionKind::Join,
            SessionCompletion::Destroy { .. } => CompletionKind::Destroy,
        }
    }
}

/// Session capability of an online services provider
///
/// Request methods only start the work. `Ok(())` means the request was
/// accepted and a completion will follow; an error means nothing was started
/// and no completion will be delivered.
pub trait SessionInterface: Send + Sync {
    /// Hand out the completion channel
    ///
    /// Returns `None` once the receiver has already been taken, so completion
    /// handlers can only be bound once.
    fn completions(&self) -> Option<flume::Receiver<SessionCompletion>>;

    fn create_session(
        &self,
        owner: &UserId,
        session_name: &SessionName,
        settings: &SessionSettings,
    ) -> Result<()>;

    fn find_sessions(&self, owner: &UserId, search: &SessionSearch) -> Result<()>;

    fn join_session(
        &self,
        owner: &UserId,
        session_name: &SessionName,
        result: &SearchResult,
    ) -> Result<()>;

    fn destroy_session(&self, session_name: &SessionName) -> Result<()>;

    /// Address to travel to for an established session
    ///
    /// `Some("")` is a resolution that produced no usable address.
    fn resolve_connect_address(&self, session_name: &SessionName) -> Option<String>;
}

/// Pluggable online subsystem
pub trait OnlineServices: Send + Sync {
    /// Name of the subsystem, for diagnostics
    fn name(&self) -> &str;

    /// The session capability, `None` when the subsystem has none
    fn session_interface(&self) -> Option<Arc<dyn SessionInterface>>;
}
