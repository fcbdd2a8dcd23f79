use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced synchronously by the connector's public API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No installed peer application provides the engine service.
    #[error("no engine application is installed")]
    NotInstalled,
    /// The platform refused the bind request for the selected peer.
    #[error("bind request rejected for {application_id}")]
    BindRejected { application_id: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
}
