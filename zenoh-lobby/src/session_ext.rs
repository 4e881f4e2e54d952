use zenoh::{key_expr::KeyExpr, Resolvable};

use crate::error::{LobbyError, Result};
use crate::network::online_services::ProviderConfig;
use crate::network::{ZenohOnlineServices, ZenohSessionInterface, DEFAULT_PREFIX};

/// Extension trait for zenoh::Session to declare a lobby provider
pub trait SessionExt {
    /// Declare an online services provider on this session
    ///
    /// Must be resolved inside a tokio runtime: request work is spawned on it.
    ///
    /// # Example
    /// ```no_run
    /// use zenoh_lobby::SessionExt;
    ///
    /// # async fn example() {
    /// let session = zenoh::open(zenoh::Config::default()).await.unwrap();
    /// let services = session
    ///     .declare_online_services()
    ///     .connect_address("192.168.1.20:7777".to_string())
    ///     .await
    ///     .unwrap();
    /// # }
    /// ```
    fn declare_online_services(&self) -> OnlineServicesBuilder<'_>;
}

impl SessionExt for zenoh::Session {
    fn declare_online_services(&self) -> OnlineServicesBuilder<'_> {
        OnlineServicesBuilder::new(self)
    }
}

/// Builder for the Zenoh online services provider
///
/// Allows configuring the provider before creating it, similar to zenoh's builder pattern.
#[must_use = "Resolvables do nothing unless you resolve them using `.await`"]
pub struct OnlineServicesBuilder<'a> {
    session: &'a zenoh::Session,
    prefix: Option<KeyExpr<'static>>,
    connect_address: String,
    search_timeout_ms: u64,
}

impl<'a> OnlineServicesBuilder<'a> {
    fn new(session: &'a zenoh::Session) -> Self {
        Self {
            session,
            prefix: None,
            connect_address: "127.0.0.1:7777".to_string(),
            search_timeout_ms: 3000,
        }
    }

    /// Set the key expression prefix
    pub fn prefix(mut self, prefix: KeyExpr<'static>) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Set the address joiners of hosted sessions travel to
    pub fn connect_address(mut self, address: String) -> Self {
        self.connect_address = address;
        self
    }

    /// Set how long search and join queries wait for replies, in milliseconds
    pub fn search_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.search_timeout_ms = timeout_ms;
        self
    }
}

impl Resolvable for OnlineServicesBuilder<'_> {
    type To = Result<ZenohOnlineServices>;
}

impl<'a> std::future::IntoFuture for OnlineServicesBuilder<'a> {
    type Output = <Self as Resolvable>::To;
    type IntoFuture =
        std::pin::Pin<Box<dyn std::future::Future<Output = Self::Output> + Send + 'a>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            let keyexpr_prefix = match self.prefix {
                Some(prefix) => prefix,
                None => KeyExpr::try_from(DEFAULT_PREFIX)?,
            };
            let config = ProviderConfig {
                keyexpr_prefix,
                connect_address: self.connect_address,
                search_timeout_ms: self.search_timeout_ms,
            };
            tracing::info!(
                "Declaring lobby provider on '{}' (connect address {})",
                config.keyexpr_prefix,
                config.connect_address
            );
            let runtime = tokio::runtime::Handle::try_current()
                .map_err(|e| LobbyError::Internal(format!("no tokio runtime: {}", e)))?;
            let interface = ZenohSessionInterface::new(self.session.clone(), config, runtime);
            Ok(ZenohOnlineServices::new(interface))
        })
    }
}
