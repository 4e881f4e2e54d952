/// Session coordination module
use std::sync::Arc;

use crate::config::CoordinatorConfig;
use crate::error::{LobbyError, Result};
use crate::host::GameHost;
use crate::observers::{Observers, SubscriptionId};
use crate::provider::{CompletionKind, OnlineServices, SessionCompletion, SessionInterface};
use crate::types::{
    JoinResult, SearchResult, SessionDescriptor, SessionName, SessionRole, SessionSearch,
    SessionSearchResult, SessionSettings, UserId,
};

/// Notifications broadcast to subscribers (typically the UI layer)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The online subsystem is missing, nothing can be done
    ProviderUnavailable,
    CreateSucceeded { session_name: SessionName },
    CreateFailed { session_name: SessionName },
    SearchStarted,
    SearchStopped { success: bool },
    /// One valid entry of a completed search
    ResultDiscovered(SessionSearchResult),
    JoinSucceeded { session_name: SessionName, address: String },
    JoinFailed { session_name: SessionName, result: JoinResult },
    DestroyCompleted { session_name: SessionName, success: bool },
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEvent::ProviderUnavailable => write!(f, "No online subsystem found!"),
            SessionEvent::CreateSucceeded { session_name } => {
                write!(f, "Session '{}' created", session_name)
            }
            SessionEvent::CreateFailed { session_name } => {
                write!(f, "Failed to create session '{}'", session_name)
            }
            SessionEvent::SearchStarted => write!(f, "Searching for sessions..."),
            SessionEvent::SearchStopped { success: true } => write!(f, "Search finished"),
            SessionEvent::SearchStopped { success: false } => write!(f, "Search failed"),
            SessionEvent::ResultDiscovered(result) => write!(f, "{}", result),
            SessionEvent::JoinSucceeded {
                session_name,
                address,
            } => write!(f, "Joined session '{}' at {}", session_name, address),
            SessionEvent::JoinFailed {
                session_name,
                result,
            } => write!(f, "Failed to join session '{}': {}", session_name, result),
            SessionEvent::DestroyCompleted {
                session_name,
                success,
            } => {
                let outcome = if *success { "ended" } else { "could not be ended" };
                write!(f, "Session '{}' {}", session_name, outcome)
            }
        }
    }
}

/// Result of one coordinator step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// A provider completion was dispatched to its handler
    Completion(CompletionKind),
    /// Nothing completed before the step timeout
    Timeout,
    /// The provider closed its completion channel
    Stop,
}

/// Translates session intents into provider requests and provider
/// completions into [`SessionEvent`]s
///
/// Intended for use from a single calling context: requests are fire and
/// forget, completions are handled when the caller drives [`step`] or
/// [`dispatch_pending`].
///
/// [`step`]: SessionCoordinator::step
/// [`dispatch_pending`]: SessionCoordinator::dispatch_pending
pub struct SessionCoordinator {
    config: CoordinatorConfig,

    /// Provider the session interface is acquired from
    services: Arc<dyn OnlineServices>,

    /// Host game driven on completions
    host: Arc<dyn GameHost>,

    /// Session interface, None until initialized or when the provider has none
    sessions: Option<Arc<dyn SessionInterface>>,

    /// Completion channel bound at initialization
    completion_rx: Option<flume::Receiver<SessionCompletion>>,

    initialized: bool,

    observers: Observers<SessionEvent>,

    role: SessionRole,

    searching: bool,

    next_search_id: u64,

    /// Query whose completion will be adopted
    current_search: Option<SessionSearch>,

    /// Result list of the last adopted search, addressed by `join`
    last_results: Vec<SearchResult>,
}

impl SessionCoordinator {
    pub fn new(
        config: CoordinatorConfig,
        services: Arc<dyn OnlineServices>,
        host: Arc<dyn GameHost>,
    ) -> Self {
        Self {
            config,
            services,
            host,
            sessions: None,
            completion_rx: None,
            initialized: false,
            observers: Observers::new(),
            role: SessionRole::Idle,
            searching: false,
            next_search_id: 0,
            current_search: None,
            last_results: Vec::new(),
        }
    }

    /// Acquire the session interface and bind the completion handlers
    ///
    /// When the provider has no session interface the coordinator stays
    /// inert for its whole lifetime. Calling this twice is a no-op.
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            tracing::warn!("Coordinator for '{}' already initialized", self.config.session_name);
            return Ok(());
        }
        self.initialized = true;

        let Some(sessions) = self.services.session_interface() else {
            tracing::error!(
                "Online subsystem '{}' has no session interface, sessions disabled",
                self.services.name()
            );
            self.observers.emit(&SessionEvent::ProviderUnavailable);
            return Err(LobbyError::ProviderUnavailable);
        };

        let completion_rx = sessions.completions().ok_or_else(|| {
            LobbyError::Internal("session completions are already bound".to_string())
        })?;

        tracing::info!(
            "Coordinator for '{}' bound to online subsystem '{}'",
            self.config.session_name,
            self.services.name()
        );
        self.sessions = Some(sessions);
        self.completion_rx = Some(completion_rx);
        Ok(())
    }

    /// Subscribe to session events
    pub fn subscribe(&mut self) -> (SubscriptionId, flume::Receiver<SessionEvent>) {
        self.observers.subscribe()
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Request creation of a session advertising `descriptor`
    pub fn advertise(&mut self, descriptor: SessionDescriptor) -> Result<()> {
        tracing::info!(
            "Creating session '{}' as '{}' (host '{}', {} players, lan: {})",
            self.config.session_name,
            descriptor.name,
            descriptor.host,
            descriptor.max_players,
            descriptor.lan_only
        );
        let sessions = self.session_interface()?;
        let owner = self.local_player()?;

        let settings = SessionSettings::from(&descriptor);
        sessions
            .create_session(&owner, &self.config.session_name, &settings)
            .inspect_err(|e| tracing::warn!("Create request rejected: {}", e))
    }

    /// Create a room hosted under `host_name`
    pub fn create_room(
        &mut self,
        room_name: impl Into<String>,
        host_name: impl Into<String>,
        max_players: u32,
        use_lan: bool,
    ) -> Result<()> {
        self.advertise(SessionDescriptor::new(room_name, host_name, max_players, use_lan))
    }

    /// Start a new search, superseding any search still in flight
    ///
    /// The previous result list is dropped immediately, so indices handed
    /// out for it can no longer be joined.
    pub fn discover(&mut self, max_results: usize, lan_only: bool) -> Result<()> {
        tracing::info!("Searching sessions (max {}, lan: {})", max_results, lan_only);
        let sessions = self.session_interface()?;
        let owner = self.local_player()?;
        if max_results == 0 {
            tracing::warn!("Search needs at least one result slot");
            return Err(LobbyError::InvalidMaxResults(max_results));
        }

        self.next_search_id += 1;
        let search = SessionSearch::new(self.next_search_id, max_results, lan_only);
        if self.current_search.is_some() && self.searching {
            tracing::debug!("Search {} supersedes a search in flight", search.search_id);
        }
        self.current_search = Some(search.clone());
        self.last_results.clear();
        self.searching = true;
        self.observers.emit(&SessionEvent::SearchStarted);

        if let Err(e) = sessions.find_sessions(&owner, &search) {
            tracing::warn!("Search request rejected: {}", e);
            self.searching = false;
            self.current_search = None;
            self.observers.emit(&SessionEvent::SearchStopped { success: false });
            return Err(e);
        }
        Ok(())
    }

    pub fn find_rooms(&mut self, max_results: usize, use_lan: bool) -> Result<()> {
        self.discover(max_results, use_lan)
    }

    /// Join the entry at `index` of the last result list
    pub fn join(&mut self, index: usize) -> Result<()> {
        let sessions = self.session_interface()?;
        let owner = self.local_player()?;

        let Some(result) = self.last_results.get(index) else {
            tracing::warn!(
                "Failed to join session at index {}: last search returned {} result(s)",
                index,
                self.last_results.len()
            );
            return Err(LobbyError::InvalidResultIndex {
                index,
                len: self.last_results.len(),
            });
        };
        if !result.is_valid() {
            tracing::warn!("Failed to join session at index {}: invalid result", index);
            return Err(LobbyError::InvalidSearchResult(index));
        }

        tracing::info!("Joining session at index {}", index);
        sessions
            .join_session(&owner, &self.config.session_name, result)
            .inspect_err(|e| tracing::warn!("Join request rejected: {}", e))
    }

    pub fn join_room(&mut self, room_id: usize) -> Result<()> {
        self.join(room_id)
    }

    /// Request destruction of the addressed session
    pub fn end_session(&mut self) -> Result<()> {
        tracing::info!("Destroying session '{}'", self.config.session_name);
        let sessions = self.session_interface()?;
        sessions
            .destroy_session(&self.config.session_name)
            .inspect_err(|e| tracing::warn!("Destroy request rejected: {}", e))
    }

    /// Leave the addressed session; same request as [`end_session`](Self::end_session)
    pub fn leave(&mut self) -> Result<()> {
        self.end_session()
    }

    pub fn close_room(&mut self) -> Result<()> {
        self.end_session()
    }

    pub fn leave_room(&mut self) -> Result<()> {
        self.leave()
    }

    /// Wait for the next provider completion and dispatch it
    ///
    /// Returns when either:
    /// - A completion was handled (returns Completion)
    /// - The step timeout (configured in CoordinatorConfig) elapses (returns Timeout)
    /// - The provider dropped its completion sender (returns Stop)
    pub async fn step(&mut self) -> StepResult {
        let timeout = tokio::time::Duration::from_millis(self.config.step_timeout_ms);
        let completion_rx = self.completion_rx.clone();

        let sleep = tokio::time::sleep(timeout);
        tokio::pin!(sleep);

        tokio::select! {
            () = &mut sleep => StepResult::Timeout,
            // Inert coordinators never complete anything
            result = async {
                match &completion_rx {
                    Some(completion_rx) => completion_rx.recv_async().await,
                    None => futures::future::pending().await,
                }
            } => match result {
                Ok(completion) => StepResult::Completion(self.handle_completion(completion)),
                Err(_) => {
                    tracing::info!(
                        "Completion channel of '{}' closed",
                        self.services.name()
                    );
                    StepResult::Stop
                }
            }
        }
    }

    /// Dispatch every completion already delivered, without waiting
    ///
    /// Returns the number of completions handled.
    pub fn dispatch_pending(&mut self) -> usize {
        let Some(completion_rx) = self.completion_rx.clone() else {
            return 0;
        };
        let mut handled = 0;
        while let Ok(completion) = completion_rx.try_recv() {
            self.handle_completion(completion);
            handled += 1;
        }
        handled
    }

    /// Route a completion to its handler
    pub fn handle_completion(&mut self, completion: SessionCompletion) -> CompletionKind {
        let kind = completion.kind();
        match completion {
            SessionCompletion::Create {
                session_name,
                success,
            } => self.on_create_complete(session_name, success),
            SessionCompletion::Find {
                search_id,
                success,
                results,
            } => self.on_find_complete(search_id, success, results),
            SessionCompletion::Join {
                session_name,
                result,
            } => self.on_join_complete(session_name, result),
            SessionCompletion::Destroy {
                session_name,
                success,
            } => self.on_destroy_complete(session_name, success),
        }
        kind
    }

    fn on_create_complete(&mut self, session_name: SessionName, success: bool) {
        tracing::info!(
            "Create complete for '{}', succeeded: {}",
            session_name,
            success
        );

        if success {
            self.role = SessionRole::Hosting;
            self.observers
                .emit(&SessionEvent::CreateSucceeded { session_name });
            self.host.open_level(&self.config.room_level, true);
        } else {
            self.observers.emit(&SessionEvent::CreateFailed { session_name });
        }
    }

    fn on_find_complete(&mut self, search_id: u64, success: bool, results: Vec<SearchResult>) {
        let current_id = self.current_search.as_ref().map(|search| search.search_id);
        if current_id != Some(search_id) {
            tracing::debug!(
                "Dropping completion of superseded search {} (current: {:?})",
                search_id,
                current_id
            );
            return;
        }

        tracing::info!(
            "Find complete for search {}, succeeded: {}",
            search_id,
            success
        );
        self.searching = false;
        self.observers.emit(&SessionEvent::SearchStopped { success });
        if !success {
            return;
        }

        // Invalid entries keep their slot so indices match the raw list
        for (index, result) in results.iter().enumerate() {
            if let Some(record) = SessionSearchResult::project(result, index) {
                self.observers.emit(&SessionEvent::ResultDiscovered(record));
            }
        }
        tracing::info!("Search {} returned {} result(s)", search_id, results.len());
        self.last_results = results;
    }

    fn on_join_complete(&mut self, session_name: SessionName, result: JoinResult) {
        tracing::info!("Join complete for '{}': {}", session_name, result);

        if result != JoinResult::Success {
            self.observers.emit(&SessionEvent::JoinFailed {
                session_name,
                result,
            });
            return;
        }

        let address = self
            .sessions
            .as_ref()
            .and_then(|sessions| sessions.resolve_connect_address(&session_name))
            .unwrap_or_default();
        if address.is_empty() {
            // No address, no travel and no error
            tracing::debug!("No connect address resolved for '{}'", session_name);
            return;
        }

        self.role = SessionRole::Joined;
        self.host.client_travel(&address);
        self.observers.emit(&SessionEvent::JoinSucceeded {
            session_name,
            address,
        });
    }

    fn on_destroy_complete(&mut self, session_name: SessionName, success: bool) {
        tracing::info!(
            "Destroy complete for '{}', succeeded: {}",
            session_name,
            success
        );

        self.observers.emit(&SessionEvent::DestroyCompleted {
            session_name,
            success,
        });
        if success {
            self.role = SessionRole::Idle;
            if let Some(menu_level) = &self.config.menu_level {
                self.host.open_level(menu_level, false);
            }
        }
    }

    fn session_interface(&mut self) -> Result<Arc<dyn SessionInterface>> {
        match &self.sessions {
            Some(sessions) => Ok(sessions.clone()),
            None => {
                tracing::error!("No online subsystem found!");
                self.observers.emit(&SessionEvent::ProviderUnavailable);
                Err(LobbyError::ProviderUnavailable)
            }
        }
    }

    fn local_player(&self) -> Result<UserId> {
        self.host.local_player().ok_or_else(|| {
            tracing::warn!("No local player to own the session request");
            LobbyError::NoLocalPlayer
        })
    }

    /// Current role in the addressed session
    pub fn role(&self) -> SessionRole {
        self.role
    }

    /// Whether a search is in flight
    pub fn is_searching(&self) -> bool {
        self.searching
    }

    /// Initialized without a session interface
    pub fn is_inert(&self) -> bool {
        self.initialized && self.sessions.is_none()
    }

    /// Raw result list of the last adopted search
    pub fn results(&self) -> &[SearchResult] {
        &self.last_results
    }

    /// The query whose completion will be adopted next
    pub fn current_search(&self) -> Option<&SessionSearch> {
        self.current_search.as_ref()
    }

    pub fn session_name(&self) -> &SessionName {
        &self.config.session_name
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }
}
