//! The user-facing session façade: composes peer resolution, the
//! binding manager, the callback adapter and the deferred-command set,
//! owns the readiness state machine and publishes connection
//! parameters once the engine reports ready.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use acelink_proto::READY_FAILURE_PORT;
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::adapter::CallbackAdapter;
use crate::binding::{BindOutcome, BindingManager};
use crate::discovery::{select_peer, PlatformEnv};
use crate::dispatch::{run_on_ui, UiDispatcher};
use crate::error::ClientError;
use crate::pending::{DeferredCommand, PendingCommands};
use crate::transport::{
    EngineCallbackSink, EngineHandle, EngineTransport, StartEngineResponse, TransportObserver,
};

/// Immutable session configuration supplied at construction.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub client_name: String,
    /// Start the engine as soon as the binding connects. Defaults to
    /// true.
    pub start_on_bind: bool,
}

impl SessionConfig {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            start_on_bind: true,
        }
    }

    pub fn start_on_bind(mut self, start_on_bind: bool) -> Self {
        self.start_on_bind = start_on_bind;
        self
    }
}

/// Readiness state of the session. Mutated only by the session itself;
/// observed through [`EngineSession::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Binding,
    Bound,
    Starting,
    Ready,
    Stopped,
    Failed,
    Disconnected,
}

/// Connection parameters captured from the remote on the transition
/// into Ready and cleared when the session leaves it. A port of 0 means
/// "not captured".
#[derive(Debug, Clone, Default)]
pub struct ConnectionParameters {
    pub access_token: Option<String>,
    pub engine_api_port: i32,
    pub http_api_port: i32,
}

impl ConnectionParameters {
    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Host-facing callbacks. Every method is delivered on the UI dispatch
/// context.
pub trait HostCallback: Send + Sync {
    fn on_connected(&self, engine: Arc<dyn EngineHandle>);
    fn on_failed(&self);
    fn on_disconnected(&self);
    fn on_unpacking(&self) {}
    fn on_starting(&self) {}
    fn on_stopped(&self) {}
    fn on_playlist_updated(&self) {}
    fn on_epg_updated(&self) {}
    fn on_settings_updated(&self) {}
    fn on_restart_player(&self) {}
}

pub(crate) struct SessionInner {
    config: SessionConfig,
    env: Arc<dyn PlatformEnv>,
    binding: BindingManager,
    host: Arc<dyn HostCallback>,
    ui: Arc<dyn UiDispatcher>,
    adapter: Arc<CallbackAdapter>,
    state: Mutex<SessionState>,
    params: Mutex<ConnectionParameters>,
    pending: Mutex<PendingCommands>,
    // Latches true on the first Ready and is never cleared, so a stale
    // `stopped` overtaking a reconnection's `ready` cannot hide the
    // engine from the host.
    active: AtomicBool,
}

/// Client session for the engine service of one peer application.
///
/// The public API is synchronous and safe to call from the UI dispatch
/// context; readiness and failure are reported through the
/// [`HostCallback`] supplied at construction.
pub struct EngineSession {
    inner: Arc<SessionInner>,
}

impl EngineSession {
    pub fn new(
        config: SessionConfig,
        env: Arc<dyn PlatformEnv>,
        transport: Arc<dyn EngineTransport>,
        host: Arc<dyn HostCallback>,
        ui: Arc<dyn UiDispatcher>,
    ) -> Self {
        debug!(
            target: "acelink::session",
            name = %config.client_name,
            start_on_bind = config.start_on_bind,
            "new engine session"
        );
        let start_on_bind = config.start_on_bind;
        let inner = Arc::new_cyclic(|weak| SessionInner {
            adapter: Arc::new(CallbackAdapter::new(weak.clone())),
            binding: BindingManager::new(transport),
            pending: Mutex::new(PendingCommands::new(start_on_bind)),
            state: Mutex::new(SessionState::Idle),
            params: Mutex::new(ConnectionParameters::default()),
            active: AtomicBool::new(false),
            config,
            env,
            host,
            ui,
        });
        Self { inner }
    }

    /// Resolves a peer and issues a bind request. Idempotent while a
    /// binding exists.
    pub fn bind(&self) -> Result<(), ClientError> {
        self.inner.bind()
    }

    /// Best-effort callback unregister at the remote, then transport
    /// unbind. No-op when unbound.
    pub fn unbind(&self) {
        self.inner.unbind()
    }

    /// Starts the engine, deferring the command (and binding first) when
    /// the remote handle is not yet available.
    pub fn start_engine(&self) -> Result<(), ClientError> {
        self.inner.start_engine()
    }

    /// Enables the AceCast server, deferring the command (and binding
    /// first) when the remote handle is not yet available.
    pub fn enable_acecast_server(&self) -> Result<(), ClientError> {
        self.inner.enable_acecast_server()
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.lock()
    }

    pub fn is_bound(&self) -> bool {
        self.inner.binding.is_bound()
    }

    /// True once the engine has ever reached Ready in this session's
    /// lifetime.
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.params.lock().access_token.clone()
    }

    pub fn engine_api_port(&self) -> i32 {
        self.inner.params.lock().engine_api_port
    }

    pub fn http_api_port(&self) -> i32 {
        self.inner.params.lock().http_api_port
    }
}

impl SessionInner {
    fn set_state(&self, next: SessionState) {
        let mut state = self.state.lock();
        if *state != next {
            debug!(target: "acelink::session", from = ?*state, to = ?next, "state transition");
            *state = next;
        }
    }

    fn bind(&self) -> Result<(), ClientError> {
        debug!(
            target: "acelink::session",
            name = %self.config.client_name,
            "bind requested"
        );
        let peer = select_peer(self.env.as_ref())?;
        let observer: Arc<dyn TransportObserver> = self.adapter.clone();
        if let BindOutcome::Bound = self.binding.bind(&peer, observer)? {
            self.set_state(SessionState::Binding);
        }
        Ok(())
    }

    fn unbind(&self) {
        debug!(
            target: "acelink::session",
            name = %self.config.client_name,
            "unbind requested"
        );
        let sink: Arc<dyn EngineCallbackSink> = self.adapter.clone();
        if self.binding.unbind(sink) {
            self.params.lock().clear();
            let next = if self.active.load(Ordering::Acquire) {
                SessionState::Stopped
            } else {
                SessionState::Idle
            };
            self.set_state(next);
        }
    }

    fn start_engine(&self) -> Result<(), ClientError> {
        if let Some(engine) = self.binding.engine() {
            self.issue_start(&engine);
            Ok(())
        } else {
            self.pending.lock().request(DeferredCommand::StartEngine);
            if !self.binding.is_bound() {
                self.bind()?;
            }
            Ok(())
        }
    }

    fn enable_acecast_server(&self) -> Result<(), ClientError> {
        if let Some(engine) = self.binding.engine() {
            // Failure here is logged and swallowed; the host keeps its
            // session.
            if let Err(err) = engine.enable_acecast_server() {
                warn!(target: "acelink::session", error = %err, "failed to enable AceCast server");
            }
            Ok(())
        } else {
            self.pending.lock().request(DeferredCommand::EnableAceCast);
            if !self.binding.is_bound() {
                self.bind()?;
            }
            Ok(())
        }
    }

    /// Starts the engine through the dedicated response callback. A
    /// transport failure on this path moves the session to Failed and
    /// returns false.
    fn issue_start(&self, engine: &Arc<dyn EngineHandle>) -> bool {
        self.set_state(SessionState::Starting);
        let response: Arc<dyn StartEngineResponse> = self.adapter.clone();
        if let Err(err) = engine.start_engine_with_callback(response) {
            error!(target: "acelink::session", error = %err, "failed to start engine");
            self.fail();
            return false;
        }
        true
    }

    /// Transport connected: register the callback sink, then replay any
    /// deferred commands in order.
    pub(crate) fn handle_connected(&self, engine: Arc<dyn EngineHandle>) {
        if !self.binding.attach_engine(engine.clone()) {
            debug!(target: "acelink::session", "connected event after unbind, dropped");
            return;
        }
        debug!(target: "acelink::session", "engine service connected");
        self.set_state(SessionState::Bound);

        let sink: Arc<dyn EngineCallbackSink> = self.adapter.clone();
        if let Err(err) = engine.register_callback(sink, true) {
            error!(target: "acelink::session", error = %err, "failed to register engine callback");
            self.fail();
            return;
        }

        let commands = self.pending.lock().drain();
        for command in commands {
            match command {
                DeferredCommand::StartEngine => {
                    if !self.issue_start(&engine) {
                        return;
                    }
                }
                DeferredCommand::EnableAceCast => {
                    if let Err(err) = engine.enable_acecast_server() {
                        warn!(
                            target: "acelink::session",
                            error = %err,
                            "failed to enable AceCast server"
                        );
                    }
                }
            }
        }
    }

    /// Transport disconnected: the peer crashed or was uninstalled. The
    /// active latch deliberately survives.
    pub(crate) fn handle_disconnected(&self) {
        if !self.binding.detach() {
            debug!(target: "acelink::session", "disconnect event while unbound, dropped");
            return;
        }
        warn!(target: "acelink::session", "engine service disconnected");
        self.params.lock().clear();
        self.set_state(SessionState::Disconnected);
        let host = self.host.clone();
        run_on_ui(self.ui.as_ref(), move || host.on_disconnected());
    }

    /// The sole readiness transition. Reads all three connection
    /// parameters from the remote before the host sees `on_connected`.
    pub(crate) fn handle_ready(&self, port: i32) {
        if !self.binding.is_bound() {
            debug!(target: "acelink::session", port, "ready notification after unbind, dropped");
            return;
        }
        if port == READY_FAILURE_PORT {
            warn!(target: "acelink::session", "engine reported failed start");
            self.fail();
            return;
        }
        let Some(engine) = self.binding.engine() else {
            // Disconnect raced the notification; the handle is gone.
            return;
        };

        let token = match engine.access_token() {
            Ok(token) => token,
            Err(err) => {
                error!(target: "acelink::session", error = %err, "failed to read access token");
                self.fail();
                return;
            }
        };
        let engine_api_port = match engine.engine_api_port() {
            Ok(port) => port,
            Err(err) => {
                error!(target: "acelink::session", error = %err, "failed to read engine api port");
                self.fail();
                return;
            }
        };
        let http_api_port = match engine.http_api_port() {
            Ok(port) => port,
            Err(err) => {
                error!(target: "acelink::session", error = %err, "failed to read http api port");
                self.fail();
                return;
            }
        };

        if let Some(token) = token.as_deref() {
            if token.len() < 4 {
                warn!(
                    target: "acelink::session",
                    "remote returned a malformed access token, treating engine as failed"
                );
                self.fail();
                return;
            }
        }

        debug!(
            target: "acelink::session",
            engine_api_port,
            http_api_port,
            token_prefix = token.as_deref().map(token_prefix),
            "engine ready"
        );

        {
            let mut params = self.params.lock();
            params.access_token = token;
            params.engine_api_port = engine_api_port;
            params.http_api_port = http_api_port;
        }
        self.active.store(true, Ordering::Release);
        self.set_state(SessionState::Ready);

        let host = self.host.clone();
        run_on_ui(self.ui.as_ref(), move || host.on_connected(engine));
    }

    /// Response to `start_engine_with_callback`. Authoritative for the
    /// token and port read; routed through [`Self::handle_ready`] so
    /// there is exactly one readiness path.
    pub(crate) fn handle_start_result(&self, success: bool) {
        if !self.binding.is_bound() {
            debug!(target: "acelink::session", "start response after unbind, dropped");
            return;
        }
        if !success {
            self.handle_ready(READY_FAILURE_PORT);
            return;
        }
        let Some(engine) = self.binding.engine() else {
            return;
        };
        match engine.engine_api_port() {
            Ok(port) => self.handle_ready(port),
            Err(err) => {
                error!(target: "acelink::session", error = %err, "failed to read engine api port");
                self.fail();
            }
        }
    }

    pub(crate) fn handle_stopped(&self) {
        if !self.binding.is_bound() {
            debug!(target: "acelink::session", "stopped notification after unbind, dropped");
            return;
        }
        debug!(target: "acelink::session", "engine stopped");
        // The active latch stays set.
        self.params.lock().clear();
        self.set_state(SessionState::Stopped);
        let host = self.host.clone();
        run_on_ui(self.ui.as_ref(), move || host.on_stopped());
    }

    /// Passes an informational notification through to the host on the
    /// UI dispatch context, dropping it when the session is unbound.
    pub(crate) fn forward<F>(&self, event: &'static str, deliver: F)
    where
        F: FnOnce(&dyn HostCallback) + Send + 'static,
    {
        if !self.binding.is_bound() {
            debug!(target: "acelink::session", event, "notification after unbind, dropped");
            return;
        }
        debug!(target: "acelink::session", event, "engine notification");
        let host = self.host.clone();
        run_on_ui(self.ui.as_ref(), move || deliver(host.as_ref()));
    }

    fn fail(&self) {
        self.params.lock().clear();
        self.set_state(SessionState::Failed);
        let host = self.host.clone();
        run_on_ui(self.ui.as_ref(), move || host.on_failed());
    }
}

/// First four characters of the token, for logs. The full value never
/// reaches a sink.
fn token_prefix(token: &str) -> &str {
    token.get(..4).unwrap_or(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_prefix_is_safe_on_short_and_multibyte_input() {
        assert_eq!(token_prefix("ABCD1234"), "ABCD");
        assert_eq!(token_prefix("AB"), "AB");
        // Falls back to the full value when byte 4 is not a char boundary.
        assert_eq!(token_prefix("日本語トークン"), "日本語トークン");
    }
}
