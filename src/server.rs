//! Listener and worker pool lifecycle.
//!
//! [`StatusServer`] moves through `Stopped → Starting → Running → Stopped`.
//! Every start builds a fresh multi-thread runtime with
//! [`WORKER_THREADS`] workers and a listener with a backlog of
//! [`MAX_QUEUED_CONNECTIONS`]; every stop tears both down. Failures are
//! logged and returned, never fatal to the host.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpSocket};
use tokio::runtime::Runtime;

use crate::api::{self, AssetRoot};
use crate::app_state::AppState;
use crate::config::{MAX_QUEUED_CONNECTIONS, PRODUCT_NAME, StatusServerConfig, WORKER_THREADS};
use crate::domain::{ChangeBus, ReplayProvider, TemplateVariables};
use crate::error::StatusError;
use crate::service::ChangeEventBridge;
use crate::ws::{WebSocketRegistry, WsSession};

/// Time allowed for closing sessions before the runtime is torn down.
const STOP_GRACE: Duration = Duration::from_secs(2);

/// Lifecycle state of a [`StatusServer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// No listener, no workers.
    Stopped,
    /// Runtime and listener are being created.
    Starting,
    /// Accepting connections.
    Running,
}

/// Resources that exist only while running.
struct Running {
    runtime: Runtime,
    local_addr: SocketAddr,
}

/// The embedded status server.
pub struct StatusServer {
    config: StatusServerConfig,
    replay: Arc<dyn ReplayProvider>,
    bus: ChangeBus,
    variables: Arc<TemplateVariables>,
    registry: Arc<WebSocketRegistry<WsSession>>,
    state: ServerState,
    running: Option<Running>,
}

impl StatusServer {
    /// Creates a stopped server.
    ///
    /// `replay` supplies the documents sent to new sessions and `bus` is
    /// the channel the state owner publishes changes on.
    #[must_use]
    pub fn new(
        config: StatusServerConfig,
        replay: Arc<dyn ReplayProvider>,
        bus: ChangeBus,
    ) -> Self {
        let variables = TemplateVariables::dashboard(
            PRODUCT_NAME,
            &config.canonical_ip(),
            config.listen_addr.port(),
        );
        Self {
            config,
            replay,
            bus,
            variables: Arc::new(variables),
            registry: Arc::new(WebSocketRegistry::new()),
            state: ServerState::Stopped,
            running: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Address the listener is bound to, while running.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }

    /// Placeholder table used for the root page.
    #[must_use]
    pub fn variables(&self) -> &Arc<TemplateVariables> {
        &self.variables
    }

    /// Live WebSocket sessions.
    #[must_use]
    pub fn registry(&self) -> &Arc<WebSocketRegistry<WsSession>> {
        &self.registry
    }

    /// Binds and starts serving on `port`, or on the configured port when
    /// `None`. A running instance is stopped first.
    ///
    /// On success the `port` template variable holds the bound port.
    ///
    /// # Errors
    ///
    /// Returns [`StatusError::Bind`] if the worker pool cannot be built or
    /// the port cannot be bound. The server is left [`ServerState::Stopped`].
    pub async fn start(&mut self, port: Option<u16>) -> Result<SocketAddr, StatusError> {
        if self.running.is_some() {
            self.stop().await;
        }

        self.state = ServerState::Starting;
        let addr = SocketAddr::new(
            self.config.listen_addr.ip(),
            port.unwrap_or(self.config.listen_addr.port()),
        );

        match self.launch(addr) {
            Ok(running) => {
                let local_addr = running.local_addr;
                self.variables.set_port(local_addr.port());
                self.running = Some(running);
                self.state = ServerState::Running;
                tracing::info!(addr = %local_addr, "local server listening");
                Ok(local_addr)
            }
            Err(err) => {
                self.state = ServerState::Stopped;
                tracing::error!(addr = %addr, error = %err, "could not start local server");
                Err(err)
            }
        }
    }

    /// Closes every session and terminates all in-flight requests.
    ///
    /// Calling this while stopped does nothing.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            self.state = ServerState::Stopped;
            return;
        };

        let registry = Arc::clone(&self.registry);
        let closing = running
            .runtime
            .spawn(async move { registry.disconnect_all().await });
        match tokio::time::timeout(STOP_GRACE, closing).await {
            Ok(Ok(closed)) => tracing::debug!(closed, "sessions closed"),
            Ok(Err(err)) => tracing::warn!(error = %err, "session shutdown task failed"),
            Err(_) => tracing::warn!("sessions did not close in time"),
        }

        running.runtime.shutdown_background();
        let discarded = self.registry.discard_all().await;
        if discarded > 0 {
            tracing::debug!(discarded, "dropped sessions left after shutdown");
        }

        self.state = ServerState::Stopped;
        tracing::info!(addr = %running.local_addr, "local server stopped");
    }

    /// Builds the worker pool, binds the listener and spawns the HTTP
    /// service and the change bridge on it.
    fn launch(&self, addr: SocketAddr) -> Result<Running, StatusError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(WORKER_THREADS)
            .thread_name("status-worker")
            .enable_all()
            .build()
            .map_err(StatusError::Bind)?;

        let spawned = {
            let _guard = runtime.enter();
            self.serve(addr)
        };

        match spawned {
            Ok(local_addr) => Ok(Running {
                runtime,
                local_addr,
            }),
            Err(err) => {
                runtime.shutdown_background();
                Err(StatusError::Bind(err))
            }
        }
    }

    /// Must run inside the server runtime's context.
    fn serve(&self, addr: SocketAddr) -> io::Result<SocketAddr> {
        let listener = bind_listener(addr)?;
        let local_addr = listener.local_addr()?;

        let state = AppState {
            registry: Arc::clone(&self.registry),
            replay: Arc::clone(&self.replay),
            variables: Arc::clone(&self.variables),
            assets: AssetRoot::new(self.config.asset_root.clone()),
        };
        let app = api::build_router(state);

        tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                tracing::error!(error = %err, "local server terminated");
            }
        });
        drop(ChangeEventBridge::new(Arc::clone(&self.registry)).spawn(&self.bus));

        Ok(local_addr)
    }
}

impl fmt::Debug for StatusServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusServer")
            .field("state", &self.state)
            .field("local_addr", &self.local_addr())
            .field("asset_root", &self.config.asset_root)
            .finish_non_exhaustive()
    }
}

impl Drop for StatusServer {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.runtime.shutdown_background();
        }
    }
}

/// Binds `addr` with the fixed accept backlog.
fn bind_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    #[cfg(unix)]
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(MAX_QUEUED_CONNECTIONS)
}
