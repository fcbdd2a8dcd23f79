//! The fixed-ABI seam between the connector and the cross-process
//! transport. Implementations wrap the platform binding primitives; the
//! traits mirror the engine service interface and must not be extended
//! without a peer-side counterpart.

use std::sync::Arc;

use thiserror::Error;

use crate::discovery::PeerDescriptor;

/// Failure of a remote invocation at the IPC layer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("remote call failed: {0}")]
    Remote(String),
    #[error("engine process is gone")]
    Dead,
}

/// Handle to the remote engine, obtained from the transport once a
/// binding is established. Invalid after the transport disconnects.
///
/// Every method is a synchronous blocking cross-process round-trip.
pub trait EngineHandle: Send + Sync {
    fn register_callback(
        &self,
        sink: Arc<dyn EngineCallbackSink>,
        want_events: bool,
    ) -> Result<(), TransportError>;
    fn unregister_callback(&self, sink: Arc<dyn EngineCallbackSink>) -> Result<(), TransportError>;
    fn start_engine(&self) -> Result<(), TransportError>;
    fn start_engine_with_callback(
        &self,
        response: Arc<dyn StartEngineResponse>,
    ) -> Result<(), TransportError>;
    fn enable_acecast_server(&self) -> Result<(), TransportError>;
    fn access_token(&self) -> Result<Option<String>, TransportError>;
    fn engine_api_port(&self) -> Result<i32, TransportError>;
    fn http_api_port(&self) -> Result<i32, TransportError>;
}

/// Callback sink the peer invokes with unsolicited notifications.
/// Calls arrive on an arbitrary transport thread.
pub trait EngineCallbackSink: Send + Sync {
    fn on_unpacking(&self);
    fn on_starting(&self);
    /// `port` is the engine's listening port, or
    /// [`acelink_proto::READY_FAILURE_PORT`] when the start failed.
    fn on_ready(&self, port: i32);
    fn on_stopped(&self);
    fn on_playlist_updated(&self);
    fn on_epg_updated(&self);
    fn on_settings_updated(&self);
    fn on_restart_player(&self);
    /// Legacy notification that cannot be removed from the ABI.
    fn on_wait_for_network(&self) {}
}

/// Response sink for `start_engine_with_callback`.
pub trait StartEngineResponse: Send + Sync {
    fn on_result(&self, success: bool);
}

/// Transport-level connection events, delivered on a transport thread
/// some time after a successful bind request.
pub trait TransportObserver: Send + Sync {
    fn on_transport_connected(&self, engine: Arc<dyn EngineHandle>);
    fn on_transport_disconnected(&self);
}

/// Platform binding primitives for the selected peer.
pub trait EngineTransport: Send + Sync {
    /// Issues a bind request with auto-create-remote-process semantics.
    /// Returns `false` when the platform rejects the request. On success
    /// the transport later delivers a connected event, and eventually a
    /// disconnected event, through the observer.
    fn bind(&self, peer: &PeerDescriptor, observer: Arc<dyn TransportObserver>) -> bool;

    /// Tears down the current binding. No-op when unbound.
    fn unbind(&self);
}
