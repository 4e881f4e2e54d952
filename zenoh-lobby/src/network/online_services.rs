//! Online services provider backed by a Zenoh session
//!
//! ## Request handling
//!
//! Every request method returns immediately. The work runs on a task spawned
//! on the runtime the provider was declared on, and its outcome is pushed as a
//! [`SessionCompletion`] on the completion channel.
//!
//! - **create**: declares a [`SessionQueryable`] for a fresh session id and
//!   keeps serving it until the session is destroyed
//! - **find**: queries `<prefix>/<scope>/session/*/advert`, every reply is one
//!   entry of the result list, undecodable replies included as invalid entries
//! - **join**: queries `<prefix>/<scope>/session/<id>/join` and records the
//!   connect address the host replied with
//! - **destroy**: stops serving the hosted session, or queries the joined
//!   session's `leave` key so the host gets the slot back
//!
//! Every request gets exactly one completion. A create destroyed before its
//! queryable is declared completes with `success: false`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use zenoh::key_expr::KeyExpr;
use zenoh::query::{ConsolidationMode, QueryTarget};

use super::keyexpr::{KeyexprSession, Scope, SessionAction};
use super::session_queryable::{HostedState, SessionQueryable};
use crate::error::{LobbyError, Result};
use crate::provider::{OnlineServices, SessionCompletion, SessionInterface};
use crate::types::{
    JoinResult, OnlineSession, SearchResult, SessionName, SessionSearch, SessionSettings, UserId,
};

/// Prefix used when none is configured
pub const DEFAULT_PREFIX: &str = "zenoh/lobby";

/// Options of the Zenoh provider
#[derive(Debug, Clone)]
pub(crate) struct ProviderConfig {
    /// Key expression prefix for all lobby operations
    pub keyexpr_prefix: KeyExpr<'static>,

    /// Address joiners of our hosted sessions travel to
    pub connect_address: String,

    /// How long a search or join query waits for replies (in milliseconds)
    pub search_timeout_ms: u64,
}

/// A session served by this provider
#[derive(Debug)]
struct HostedSession {
    session_id: String,
    task: tokio::task::JoinHandle<()>,
    /// Create completion already sent
    announced: bool,
}

/// A session joined through this provider
#[derive(Debug)]
struct JoinedSession {
    connect_address: String,
    leave_keyexpr: KeyExpr<'static>,
}

/// Session and lookup tables shared with the request tasks
#[derive(Debug, Default)]
struct Registry {
    hosted: HashMap<SessionName, HostedSession>,
    joined: HashMap<SessionName, JoinedSession>,
}

impl Registry {
    fn contains(&self, session_name: &SessionName) -> bool {
        self.hosted.contains_key(session_name) || self.joined.contains_key(session_name)
    }

    /// Mark the create of `session_id` as announced, false if it was destroyed meanwhile
    fn announce(&mut self, session_name: &SessionName, session_id: &str) -> bool {
        match self.hosted.get_mut(session_name) {
            Some(hosted) if hosted.session_id == session_id => {
                hosted.announced = true;
                true
            }
            _ => false,
        }
    }

    fn remove_hosted(&mut self, session_name: &SessionName, session_id: &str) {
        if self
            .hosted
            .get(session_name)
            .is_some_and(|hosted| hosted.session_id == session_id)
        {
            self.hosted.remove(session_name);
        }
    }
}

/// [`SessionInterface`] over a Zenoh session
#[derive(Debug)]
pub struct ZenohSessionInterface {
    session: zenoh::Session,
    config: ProviderConfig,
    runtime: tokio::runtime::Handle,
    registry: Arc<Mutex<Registry>>,
    completion_tx: flume::Sender<SessionCompletion>,
    completion_rx: Mutex<Option<flume::Receiver<SessionCompletion>>>,
}

impl ZenohSessionInterface {
    pub(crate) fn new(
        session: zenoh::Session,
        config: ProviderConfig,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        let (completion_tx, completion_rx) = flume::unbounded();
        Self {
            session,
            config,
            runtime,
            registry: Arc::new(Mutex::new(Registry::default())),
            completion_tx,
            completion_rx: Mutex::new(Some(completion_rx)),
        }
    }

    /// Session ids currently served by this provider
    pub fn hosted_session_ids(&self) -> Vec<String> {
        match self.registry.lock() {
            Ok(registry) => registry
                .hosted
                .values()
                .map(|hosted| hosted.session_id.clone())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn lock_registry(&self) -> Result<std::sync::MutexGuard<'_, Registry>> {
        self.registry
            .lock()
            .map_err(|_| LobbyError::Internal("session registry poisoned".to_string()))
    }

    fn complete(completion_tx: &flume::Sender<SessionCompletion>, completion: SessionCompletion) {
        if completion_tx.send(completion).is_err() {
            tracing::debug!("Completion dropped, nobody is listening");
        }
    }

    fn generate_session_id() -> String {
        bs58::encode(uuid::Uuid::new_v4().as_bytes()).into_string()
    }
}

impl SessionInterface for ZenohSessionInterface {
    fn completions(&self) -> Option<flume::Receiver<SessionCompletion>> {
        self.completion_rx.lock().ok()?.take()
    }

    fn create_session(
        &self,
        owner: &UserId,
        session_name: &SessionName,
        settings: &SessionSettings,
    ) -> Result<()> {
        let mut registry = self.lock_registry()?;
        if registry.contains(session_name) {
            tracing::warn!("Session '{}' already exists", session_name);
            Self::complete(
                &self.completion_tx,
                SessionCompletion::Create {
                    session_name: session_name.clone(),
                    success: false,
                },
            );
            return Ok(());
        }

        let session_id = Self::generate_session_id();
        let keyexpr = KeyexprSession::queryable(
            self.config.keyexpr_prefix.clone(),
            Scope::from_lan(settings.is_lan_match),
            &session_id,
        );
        let state = Arc::new(Mutex::new(HostedState {
            session: OnlineSession {
                session_id: session_id.clone(),
                owner: owner.clone(),
                settings: settings.clone(),
                num_open_public_connections: settings.num_public_connections,
            },
            connect_address: self.config.connect_address.clone(),
        }));

        let session = self.session.clone();
        let registry_ref = self.registry.clone();
        let completion_tx = self.completion_tx.clone();
        let name = session_name.clone();
        let id = session_id.clone();
        let task = self.runtime.spawn(async move {
            match SessionQueryable::declare(&session, keyexpr, state).await {
                Ok(queryable) => {
                    // Checked under the lock destroy takes, so the create is
                    // either announced or reported as failed, never both
                    let announced = match registry_ref.lock() {
                        Ok(mut registry) => {
                            let announced = registry.announce(&name, &id);
                            Self::complete(
                                &completion_tx,
                                SessionCompletion::Create {
                                    session_name: name.clone(),
                                    success: announced,
                                },
                            );
                            announced
                        }
                        Err(_) => {
                            Self::complete(
                                &completion_tx,
                                SessionCompletion::Create {
                                    session_name: name.clone(),
                                    success: false,
                                },
                            );
                            false
                        }
                    };
                    if announced {
                        tracing::info!("Hosting session '{}'", name);
                        queryable.serve().await;
                    } else {
                        tracing::info!("Session '{}' destroyed before it was hosted", name);
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to declare session '{}': {}", name, e);
                    if let Ok(mut registry) = registry_ref.lock() {
                        registry.remove_hosted(&name, &id);
                    }
                    Self::complete(
                        &completion_tx,
                        SessionCompletion::Create {
                            session_name: name,
                            success: false,
                        },
                    );
                }
            }
        });

        // Still holding the registry lock, so a failing task cannot remove
        // the entry before it is inserted
        registry
            .hosted
            .insert(
                session_name.clone(),
                HostedSession {
                    session_id,
                    task,
                    announced: false,
                },
            );
        Ok(())
    }

    fn find_sessions(&self, _owner: &UserId, search: &SessionSearch) -> Result<()> {
        let lookup = KeyexprSession::lookup(
            self.config.keyexpr_prefix.clone(),
            Scope::from_lan(search.is_lan_query),
        )
        .to_keyexpr()?;
        let timeout = Duration::from_millis(self.config.search_timeout_ms);
        let session = self.session.clone();
        let completion_tx = self.completion_tx.clone();
        let search = search.clone();

        self.runtime.spawn(async move {
            let (success, results) = match collect_adverts(&session, lookup, timeout, &search).await {
                Ok(results) => (true, results),
                Err(e) => {
                    tracing::warn!("Search {} failed: {}", search.search_id, e);
                    (false, Vec::new())
                }
            };
            Self::complete(
                &completion_tx,
                SessionCompletion::Find {
                    search_id: search.search_id,
                    success,
                    results,
                },
            );
        });
        Ok(())
    }

    fn join_session(
        &self,
        _owner: &UserId,
        session_name: &SessionName,
        result: &SearchResult,
    ) -> Result<()> {
        let Some(target) = &result.session else {
            return Err(LobbyError::RequestRejected(
                "cannot join an invalid search result".to_string(),
            ));
        };

        if self.lock_registry()?.contains(session_name) {
            tracing::warn!("Session '{}' is already in use", session_name);
            Self::complete(
                &self.completion_tx,
                SessionCompletion::Join {
                    session_name: session_name.clone(),
                    result: JoinResult::AlreadyInSession,
                },
            );
            return Ok(());
        }

        let target_keyexpr = KeyexprSession::queryable(
            self.config.keyexpr_prefix.clone(),
            Scope::from_lan(target.settings.is_lan_match),
            &target.session_id,
        );
        let join_keyexpr = target_keyexpr.with_action(SessionAction::Join).to_keyexpr()?;
        let leave_keyexpr = target_keyexpr.with_action(SessionAction::Leave).to_keyexpr()?;
        let timeout = Duration::from_millis(self.config.search_timeout_ms);
        let session = self.session.clone();
        let registry = self.registry.clone();
        let completion_tx = self.completion_tx.clone();
        let name = session_name.clone();

        self.runtime.spawn(async move {
            let result = match request_join(&session, join_keyexpr, timeout).await {
                Ok(connect_address) => match registry.lock() {
                    Ok(mut registry) => {
                        registry.joined.insert(
                            name.clone(),
                            JoinedSession {
                                connect_address,
                                leave_keyexpr,
                            },
                        );
                        JoinResult::Success
                    }
                    Err(_) => JoinResult::UnknownError,
                },
                Err(result) => result,
            };
            Self::complete(
                &completion_tx,
                SessionCompletion::Join {
                    session_name: name,
                    result,
                },
            );
        });
        Ok(())
    }

    fn destroy_session(&self, session_name: &SessionName) -> Result<()> {
        let mut registry = self.lock_registry()?;
        if let Some(hosted) = registry.hosted.remove(session_name) {
            if hosted.announced {
                // Dropping the task drops the queryable, which undeclares it
                hosted.task.abort();
                tracing::info!("Stopped hosting session '{}'", session_name);
            } else {
                // The create task sees the entry gone and reports its failure
                tracing::info!("Cancelled pending session '{}'", session_name);
            }
            Self::complete(
                &self.completion_tx,
                SessionCompletion::Destroy {
                    session_name: session_name.clone(),
                    success: true,
                },
            );
            return Ok(());
        }

        let Some(joined) = registry.joined.remove(session_name) else {
            tracing::warn!("No session named '{}' to destroy", session_name);
            Self::complete(
                &self.completion_tx,
                SessionCompletion::Destroy {
                    session_name: session_name.clone(),
                    success: false,
                },
            );
            return Ok(());
        };
        drop(registry);

        let timeout = Duration::from_millis(self.config.search_timeout_ms);
        let session = self.session.clone();
        let completion_tx = self.completion_tx.clone();
        let name = session_name.clone();
        self.runtime.spawn(async move {
            // The local record is gone either way, the host just misses the slot
            if let Err(e) = request_leave(&session, joined.leave_keyexpr, timeout).await {
                tracing::warn!("Host of '{}' did not acknowledge leave: {}", name, e);
            }
            tracing::info!("Left session '{}'", name);
            Self::complete(
                &completion_tx,
                SessionCompletion::Destroy {
                    session_name: name,
                    success: true,
                },
            );
        });
        Ok(())
    }

    fn resolve_connect_address(&self, session_name: &SessionName) -> Option<String> {
        self.registry
            .lock()
            .ok()?
            .joined
            .get(session_name)
            .map(|joined| joined.connect_address.clone())
    }
}

/// Query every advert in scope and turn the replies into a result list
async fn collect_adverts(
    session: &zenoh::Session,
    lookup: KeyExpr<'static>,
    timeout: Duration,
    search: &SessionSearch,
) -> Result<Vec<SearchResult>> {
    tracing::debug!("Search {} querying {}", search.search_id, lookup.as_str());
    let started = Instant::now();
    let replies = session
        .get(lookup)
        .target(QueryTarget::All)
        .consolidation(ConsolidationMode::None)
        .timeout(timeout)
        .await?;

    let mut results = Vec::new();
    while results.len() < search.max_search_results {
        let Ok(reply) = replies.recv_async().await else {
            break;
        };
        let ping_ms = u32::try_from(started.elapsed().as_millis()).unwrap_or(u32::MAX);

        let entry = match reply.result() {
            Ok(sample) => match zenoh_ext::z_deserialize::<OnlineSession>(sample.payload()) {
                Ok(advert) => {
                    if search.presence_only && !advert.settings.uses_presence {
                        tracing::debug!("Skipping session {} without presence", advert.session_id);
                        continue;
                    }
                    SearchResult::valid(advert, ping_ms)
                }
                Err(e) => {
                    tracing::debug!(
                        "Undecodable advert on {}: {:?}",
                        sample.key_expr().as_str(),
                        e
                    );
                    SearchResult::invalid()
                }
            },
            Err(e) => {
                tracing::debug!("Search reply error: {:?}", e.payload());
                SearchResult::invalid()
            }
        };
        results.push(entry);
    }

    tracing::info!(
        "Search {} found {} session(s)",
        search.search_id,
        results.len()
    );
    Ok(results)
}

/// Ask a host for a connect address
async fn request_join(
    session: &zenoh::Session,
    join_keyexpr: KeyExpr<'static>,
    timeout: Duration,
) -> std::result::Result<String, JoinResult> {
    tracing::debug!("Requesting join on {}", join_keyexpr.as_str());
    let replies = session
        .get(join_keyexpr)
        .timeout(timeout)
        .await
        .map_err(|e| {
            tracing::warn!("Join query failed: {}", e);
            JoinResult::UnknownError
        })?;

    let Ok(reply) = replies.recv_async().await else {
        return Err(JoinResult::SessionDoesNotExist);
    };
    match reply.result() {
        Ok(sample) => zenoh_ext::z_deserialize::<String>(sample.payload()).map_err(|e| {
            tracing::warn!("Undecodable connect address: {:?}", e);
            JoinResult::CouldNotRetrieveAddress
        }),
        Err(_) => Err(JoinResult::SessionIsFull),
    }
}

/// Tell a host its joined slot is free again
async fn request_leave(
    session: &zenoh::Session,
    leave_keyexpr: KeyExpr<'static>,
    timeout: Duration,
) -> Result<u32> {
    tracing::debug!("Requesting leave on {}", leave_keyexpr.as_str());
    let replies = session.get(leave_keyexpr).timeout(timeout).await?;
    let reply = replies
        .recv_async()
        .await
        .map_err(|_| LobbyError::RequestRejected("no reply to leave".to_string()))?;
    match reply.result() {
        Ok(sample) => zenoh_ext::z_deserialize::<u32>(sample.payload())
            .map_err(|e| LobbyError::Serialization(format!("leave reply: {:?}", e))),
        Err(e) => Err(LobbyError::RequestRejected(format!(
            "leave refused: {:?}",
            e.payload()
        ))),
    }
}

/// [`OnlineServices`] provider backed by a Zenoh session
#[derive(Debug)]
pub struct ZenohOnlineServices {
    interface: Arc<ZenohSessionInterface>,
}

impl ZenohOnlineServices {
    pub(crate) fn new(interface: ZenohSessionInterface) -> Self {
        Self {
            interface: Arc::new(interface),
        }
    }

    /// Direct access to the Zenoh-backed session interface
    pub fn interface(&self) -> &Arc<ZenohSessionInterface> {
        &self.interface
    }

    /// Key expression prefix the provider advertises under
    pub fn prefix(&self) -> &KeyExpr<'static> {
        &self.interface.config.keyexpr_prefix
    }
}

impl OnlineServices for ZenohOnlineServices {
    fn name(&self) -> &str {
        "zenoh"
    }

    fn session_interface(&self) -> Option<Arc<dyn SessionInterface>> {
        Some(self.interface.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoordinatorConfig;
    use crate::coordinator::{SessionCoordinator, SessionEvent, StepResult};
    use crate::host::GameHost;
    use crate::provider::CompletionKind;
    use crate::session_ext::SessionExt;
    use crate::types::{SessionDescriptor, SessionRole};

    struct TestHost {
        player: UserId,
        travels: Mutex<Vec<String>>,
    }

    impl TestHost {
        fn new(player: &str) -> Arc<Self> {
            Arc::new(Self {
                player: UserId::new(player),
                travels: Mutex::new(Vec::new()),
            })
        }
    }

    impl GameHost for TestHost {
        fn local_player(&self) -> Option<UserId> {
            Some(self.player.clone())
        }

        fn open_level(&self, _entry: &str, _listen: bool) {}

        fn client_travel(&self, address: &str) {
            self.travels.lock().unwrap().push(address.to_string());
        }
    }

    /// Unique prefix so concurrently running tests never see each other
    fn test_prefix() -> KeyExpr<'static> {
        KeyExpr::try_from(format!("test/lobby/{}", ZenohSessionInterface::generate_session_id()))
            .unwrap()
    }

    async fn services(
        session: &zenoh::Session,
        prefix: &KeyExpr<'static>,
        address: &str,
    ) -> ZenohOnlineServices {
        session
            .declare_online_services()
            .prefix(prefix.clone())
            .connect_address(address.to_string())
            .search_timeout_ms(500)
            .await
            .unwrap()
    }

    async fn coordinator(services: ZenohOnlineServices, host: Arc<TestHost>) -> SessionCoordinator {
        let mut coordinator = SessionCoordinator::new(
            CoordinatorConfig::default().with_step_timeout_ms(5000),
            Arc::new(services),
            host,
        );
        coordinator.initialize().unwrap();
        coordinator
    }

    async fn step_until(coordinator: &mut SessionCoordinator, kind: CompletionKind) {
        for _ in 0..3 {
            match coordinator.step().await {
                StepResult::Completion(done) if done == kind => return,
                other => tracing::debug!("Waiting for {:?}, got {:?}", kind, other),
            }
        }
        panic!("No {:?} completion", kind);
    }

    fn discovered(events: &flume::Receiver<SessionEvent>) -> Vec<crate::types::SessionSearchResult> {
        events
            .drain()
            .filter_map(|event| match event {
                SessionEvent::ResultDiscovered(record) => Some(record),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_host_discover_join_leave() {
        let session = zenoh::open(zenoh::Config::default()).await.unwrap();
        let prefix = test_prefix();

        let mut host = coordinator(
            services(&session, &prefix, "10.1.2.3:7777").await,
            TestHost::new("alice"),
        )
        .await;
        let guest_host = TestHost::new("bob");
        let mut guest = coordinator(
            services(&session, &prefix, "10.9.9.9:7777").await,
            guest_host.clone(),
        )
        .await;
        let (_, guest_events) = guest.subscribe();

        host.create_room("Nebula", "Alice", 2, true).unwrap();
        step_until(&mut host, CompletionKind::Create).await;
        assert_eq!(host.role(), SessionRole::Hosting);

        // Online scope does not see LAN sessions
        guest.discover(5, false).unwrap();
        step_until(&mut guest, CompletionKind::Find).await;
        assert!(discovered(&guest_events).is_empty());

        guest.discover(5, true).unwrap();
        step_until(&mut guest, CompletionKind::Find).await;
        let records = discovered(&guest_events);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Nebula");
        assert_eq!(records[0].host, "Alice");
        assert_eq!(records[0].current_players, 0);
        assert_eq!(records[0].max_players, 2);
        assert_eq!(records[0].index, 0);

        guest.join(records[0].index).unwrap();
        step_until(&mut guest, CompletionKind::Join).await;
        assert_eq!(guest.role(), SessionRole::Joined);
        assert_eq!(
            guest_host.travels.lock().unwrap().as_slice(),
            ["10.1.2.3:7777".to_string()]
        );

        // The join took a slot
        guest.discover(5, true).unwrap();
        step_until(&mut guest, CompletionKind::Find).await;
        let records = discovered(&guest_events);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].current_players, 1);

        guest.leave().unwrap();
        step_until(&mut guest, CompletionKind::Destroy).await;
        assert_eq!(guest.role(), SessionRole::Idle);

        host.end_session().unwrap();
        step_until(&mut host, CompletionKind::Destroy).await;
        assert_eq!(host.role(), SessionRole::Idle);

        // Let the aborted serving task drop its queryable
        tokio::time::sleep(Duration::from_millis(200)).await;
        guest.discover(5, true).unwrap();
        step_until(&mut guest, CompletionKind::Find).await;
        assert!(discovered(&guest_events).is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_full_session_rejects_join() {
        let session = zenoh::open(zenoh::Config::default()).await.unwrap();
        let prefix = test_prefix();

        let host = services(&session, &prefix, "10.1.2.3:7777").await;
        let host_rx = host.interface().completions().unwrap();
        let settings = SessionSettings::from(&SessionDescriptor::new("Tiny", "Alice", 1, false));
        host.interface()
            .create_session(&UserId::new("alice"), &SessionName::default(), &settings)
            .unwrap();
        assert!(matches!(
            host_rx.recv_async().await.unwrap(),
            SessionCompletion::Create { success: true, .. }
        ));
        assert_eq!(host.interface().hosted_session_ids().len(), 1);

        let guest = services(&session, &prefix, "").await;
        let guest_rx = guest.interface().completions().unwrap();
        guest
            .interface()
            .find_sessions(&UserId::new("bob"), &SessionSearch::new(1, 5, false))
            .unwrap();
        let results = match guest_rx.recv_async().await.unwrap() {
            SessionCompletion::Find {
                search_id: 1,
                success: true,
                results,
            } => results,
            other => panic!("Expected find completion, got {:?}", other),
        };
        assert_eq!(results.len(), 1);

        let first = SessionName::new("first").unwrap();
        let second = SessionName::new("second").unwrap();
        for name in [&first, &second] {
            guest
                .interface()
                .join_session(&UserId::new("bob"), name, &results[0])
                .unwrap();
        }
        let mut outcomes = Vec::new();
        for _ in 0..2 {
            match guest_rx.recv_async().await.unwrap() {
                SessionCompletion::Join {
                    session_name,
                    result,
                } => outcomes.push((session_name, result)),
                other => panic!("Expected join completion, got {:?}", other),
            }
        }
        let results: Vec<JoinResult> = outcomes.iter().map(|(_, result)| *result).collect();
        assert!(results.contains(&JoinResult::Success));
        assert!(results.contains(&JoinResult::SessionIsFull));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_duplicate_create_and_unknown_destroy() {
        let session = zenoh::open(zenoh::Config::default()).await.unwrap();
        let services = services(&session, &test_prefix(), "10.1.2.3:7777").await;
        let interface = services.interface();
        let completions = interface.completions().unwrap();
        assert!(interface.completions().is_none());

        let owner = UserId::new("alice");
        let name = SessionName::default();
        let settings = SessionSettings::default();
        interface.create_session(&owner, &name, &settings).unwrap();
        interface.create_session(&owner, &name, &settings).unwrap();

        let mut created = Vec::new();
        for _ in 0..2 {
            match completions.recv_async().await.unwrap() {
                SessionCompletion::Create { success, .. } => created.push(success),
                other => panic!("Expected create completion, got {:?}", other),
            }
        }
        created.sort();
        assert_eq!(created, vec![false, true]);

        let unknown = SessionName::new("unknown").unwrap();
        interface.destroy_session(&unknown).unwrap();
        assert!(matches!(
            completions.recv_async().await.unwrap(),
            SessionCompletion::Destroy { success: false, .. }
        ));
        assert_eq!(interface.resolve_connect_address(&unknown), None);

        interface.destroy_session(&name).unwrap();
        assert!(matches!(
            completions.recv_async().await.unwrap(),
            SessionCompletion::Destroy { success: true, .. }
        ));
        assert!(interface.hosted_session_ids().is_empty());
    }

    async fn host_session(
        services: &ZenohOnlineServices,
        completions: &flume::Receiver<SessionCompletion>,
        name: &str,
        settings: SessionSettings,
    ) {
        services
            .interface()
            .create_session(&UserId::new("alice"), &SessionName::new(name).unwrap(), &settings)
            .unwrap();
        match completions.recv_async().await.unwrap() {
            SessionCompletion::Create { success: true, .. } => {}
            other => panic!("Expected successful create, got {:?}", other),
        }
    }

    async fn search(
        services: &ZenohOnlineServices,
        completions: &flume::Receiver<SessionCompletion>,
        search: SessionSearch,
    ) -> Vec<SearchResult> {
        services
            .interface()
            .find_sessions(&UserId::new("bob"), &search)
            .unwrap();
        match completions.recv_async().await.unwrap() {
            SessionCompletion::Find {
                success: true,
                results,
                ..
            } => results,
            other => panic!("Expected find completion, got {:?}", other),
        }
    }

    async fn join(
        services: &ZenohOnlineServices,
        completions: &flume::Receiver<SessionCompletion>,
        name: &SessionName,
        target: &SearchResult,
    ) -> JoinResult {
        services
            .interface()
            .join_session(&UserId::new("bob"), name, target)
            .unwrap();
        match completions.recv_async().await.unwrap() {
            SessionCompletion::Join { result, .. } => result,
            other => panic!("Expected join completion, got {:?}", other),
        }
    }

    fn room(name: &str, max_players: u32) -> SessionSettings {
        SessionSettings::from(&SessionDescriptor::new(name, "Alice", max_players, true))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_leave_gives_slot_back() {
        let session = zenoh::open(zenoh::Config::default()).await.unwrap();
        let prefix = test_prefix();

        let host = services(&session, &prefix, "10.1.2.3:7777").await;
        let host_rx = host.interface().completions().unwrap();
        host_session(&host, &host_rx, "solo", room("Solo", 1)).await;

        let guest = services(&session, &prefix, "").await;
        let guest_rx = guest.interface().completions().unwrap();
        let results = search(&guest, &guest_rx, SessionSearch::new(1, 5, true)).await;
        assert_eq!(results.len(), 1);

        let first = SessionName::new("first").unwrap();
        assert_eq!(
            join(&guest, &guest_rx, &first, &results[0]).await,
            JoinResult::Success
        );

        guest.interface().destroy_session(&first).unwrap();
        assert!(matches!(
            guest_rx.recv_async().await.unwrap(),
            SessionCompletion::Destroy { success: true, .. }
        ));
        assert_eq!(guest.interface().resolve_connect_address(&first), None);

        let results = search(&guest, &guest_rx, SessionSearch::new(2, 5, true)).await;
        let record = crate::types::SessionSearchResult::project(&results[0], 0).unwrap();
        assert_eq!(record.current_players, 0);
        assert_eq!(record.max_players, 1);

        let second = SessionName::new("second").unwrap();
        assert_eq!(
            join(&guest, &guest_rx, &second, &results[0]).await,
            JoinResult::Success
        );
        assert_eq!(
            guest.interface().resolve_connect_address(&second).as_deref(),
            Some("10.1.2.3:7777")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_destroy_right_after_create_completes_both() {
        let session = zenoh::open(zenoh::Config::default()).await.unwrap();
        let prefix = test_prefix();
        let services = services(&session, &prefix, "10.1.2.3:7777").await;
        let interface = services.interface();
        let completions = interface.completions().unwrap();

        let name = SessionName::default();
        interface
            .create_session(&UserId::new("alice"), &name, &room("Brief", 2))
            .unwrap();
        interface.destroy_session(&name).unwrap();

        let mut creates = 0;
        let mut destroys = 0;
        for _ in 0..2 {
            match completions.recv_async().await.unwrap() {
                SessionCompletion::Create { .. } => creates += 1,
                SessionCompletion::Destroy { success, .. } => {
                    assert!(success);
                    destroys += 1;
                }
                other => panic!("Unexpected completion {:?}", other),
            }
        }
        assert_eq!((creates, destroys), (1, 1));
        assert!(
            tokio::time::timeout(Duration::from_millis(300), completions.recv_async())
                .await
                .is_err(),
            "Each request completes once"
        );
        assert!(interface.hosted_session_ids().is_empty());

        let results = search(&services, &completions, SessionSearch::new(1, 5, true)).await;
        assert!(results.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_search_filters() {
        let session = zenoh::open(zenoh::Config::default()).await.unwrap();
        let prefix = test_prefix();

        let host = services(&session, &prefix, "10.1.2.3:7777").await;
        let host_rx = host.interface().completions().unwrap();
        host_session(&host, &host_rx, "listed", room("Listed", 4)).await;
        host_session(
            &host,
            &host_rx,
            "no_presence",
            SessionSettings {
                uses_presence: false,
                ..room("No Presence", 4)
            },
        )
        .await;
        host_session(
            &host,
            &host_rx,
            "hidden",
            SessionSettings {
                should_advertise: false,
                ..room("Hidden", 4)
            },
        )
        .await;

        let guest = services(&session, &prefix, "").await;
        let guest_rx = guest.interface().completions().unwrap();
        let names = |results: &[SearchResult]| {
            let mut names: Vec<String> = results
                .iter()
                .enumerate()
                .filter_map(|(index, result)| {
                    crate::types::SessionSearchResult::project(result, index)
                })
                .map(|record| record.name)
                .collect();
            names.sort();
            names
        };

        // Presence only by default
        let results = search(&guest, &guest_rx, SessionSearch::new(1, 10, true)).await;
        assert_eq!(names(&results), vec!["Listed".to_string()]);

        let any_presence = SessionSearch {
            presence_only: false,
            ..SessionSearch::new(2, 10, true)
        };
        let results = search(&guest, &guest_rx, any_presence).await;
        assert_eq!(
            names(&results),
            vec!["Listed".to_string(), "No Presence".to_string()]
        );

        host_session(&host, &host_rx, "second", room("Second", 4)).await;
        host_session(&host, &host_rx, "third", room("Third", 4)).await;
        let results = search(&guest, &guest_rx, SessionSearch::new(3, 2, true)).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(SearchResult::is_valid));
    }
}
