//! AceLink: client-side connector for the Ace Stream engine service.
//!
//! Responsibilities:
//! - resolving which installed peer application provides the engine
//! - owning the cross-process binding lifecycle
//! - marshalling remote notifications onto the host's UI dispatch context
//! - replaying commands requested before the engine was reachable
//!
//! The transport and platform query primitives stay behind traits so
//! the whole connector can run against in-process doubles; see the
//! `tests/` directory for a scripted engine.

mod adapter;
pub mod binding;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod pending;
pub mod session;
pub mod transport;

pub use binding::{BindOutcome, BindingManager};
pub use discovery::{select_peer, PeerDescriptor, PlatformEnv};
pub use dispatch::{ChannelDispatcher, UiDispatcher, UiTask};
pub use error::ClientError;
pub use pending::{DeferredCommand, PendingCommands};
pub use session::{
    ConnectionParameters, EngineSession, HostCallback, SessionConfig, SessionState,
};
pub use transport::{
    EngineCallbackSink, EngineHandle, EngineTransport, StartEngineResponse, TransportError,
    TransportObserver,
};
