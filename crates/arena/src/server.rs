//! `ArenaServer` builder and accept loop.
//!
//! This is the entry point for running an arena. It ties the layers
//! together: transport → gateway → event processor → registry → fan-out,
//! with the persistence queue hanging off the side.

use std::future::Future;
use std::sync::Arc;

use arena_persist::{PersistQueue, PersistenceGateway};
use arena_protocol::{Codec, JsonCodec};
use arena_session::{Authenticator, SessionRegistry};
use arena_transport::{Transport, Upgrade, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::{ArenaConfig, ArenaError, ArenaMonitor, EventProcessor};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The registry
/// inside the event processor is the only mutable part.
pub(crate) struct ServerState<A: Authenticator, C: Codec> {
    pub(crate) auth: A,
    pub(crate) events: EventProcessor<C>,
    pub(crate) config: ArenaConfig,
}

/// Builder for configuring and starting an arena server.
///
/// # Example
///
/// ```rust,no_run
/// use arena::prelude::*;
///
/// # async fn start() -> Result<(), ArenaError> {
/// let tokens = TokenTable::new().with("dev-ana", Identity::new(UserId(1), "ana"));
/// let server = ArenaServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(tokens, LogGateway)
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ArenaServerBuilder {
    config: ArenaConfig,
}

impl ArenaServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ArenaConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ArenaConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Binds the listener and starts the persistence worker.
    ///
    /// Uses [`JsonCodec`] and [`WebSocketTransport`], which is what
    /// browser clients speak.
    pub async fn build<A, G>(
        self,
        auth: A,
        gateway: G,
    ) -> Result<ArenaServer<A, JsonCodec>, ArenaError>
    where
        A: Authenticator,
        G: PersistenceGateway,
    {
        self.config.validate()?;
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let persist = PersistQueue::spawn(gateway, &self.config.persistence);
        let events = EventProcessor::new(
            Arc::new(Mutex::new(SessionRegistry::new())),
            persist,
            JsonCodec,
            self.config.limits.clone(),
        );
        let state = Arc::new(ServerState {
            auth,
            events,
            config: self.config,
        });

        Ok(ArenaServer { transport, state })
    }
}

impl Default for ArenaServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound arena server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ArenaServer<A: Authenticator, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A, C>>,
}

impl<A, C> ArenaServer<A, C>
where
    A: Authenticator,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A read-only view of the roster that stays valid while the server
    /// runs.
    pub fn monitor(&self) -> ArenaMonitor {
        ArenaMonitor::new(Arc::clone(self.state.events.registry()))
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), ArenaError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` resolves.
    ///
    /// Each accepted socket gets its own task, which also runs the
    /// WebSocket upgrade; a peer that stalls or fails never touches the
    /// others. Connections that are already open keep running
    /// after shutdown until their clients leave.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), ArenaError>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(addr = %self.listen_addr(), "arena server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("arena server shutting down");
                    self.transport.shutdown().await?;
                    return Ok(());
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(pending) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            let conn_id = pending.id();
                            if let Err(e) = handle_connection(pending, state).await {
                                tracing::debug!(%conn_id, error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }
    }

    fn listen_addr(&self) -> String {
        match self.local_addr() {
            Ok(addr) => addr.to_string(),
            Err(_) => self.state.config.bind_addr.clone(),
        }
    }
}
