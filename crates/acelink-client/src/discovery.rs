//! Resolves which installed peer application should provide the engine
//! service.

use acelink_proto::{KNOWN_APPLICATION_IDS, SERVICE_INTERFACE};
use tracing::{debug, error};

use crate::error::ClientError;

/// An installed peer application offering the engine service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerDescriptor {
    pub application_id: String,
    pub version_code: i64,
}

/// Platform query context used during peer resolution.
pub trait PlatformEnv: Send + Sync {
    /// Version code of an installed application, `None` when the
    /// application is not installed.
    fn installed_version_code(&self, application_id: &str) -> Option<i64>;

    /// Application ids advertising a service for the given interface
    /// name, in platform iteration order.
    fn advertising_services(&self, interface_name: &str) -> Vec<String>;
}

/// Selects the peer application with the highest version code, or fails
/// with [`ClientError::NotInstalled`] when none is available.
///
/// Peers older than the discoverability floor never show up in the
/// interface query, which is why the well-known list is consulted
/// first; newer peers appear in both sources and are de-duplicated
/// against it. Ties keep the earliest candidate in iteration order.
pub fn select_peer(env: &dyn PlatformEnv) -> Result<PeerDescriptor, ClientError> {
    let mut candidates: Vec<PeerDescriptor> = Vec::new();

    for id in KNOWN_APPLICATION_IDS {
        if let Some(version_code) = env.installed_version_code(id) {
            candidates.push(PeerDescriptor {
                application_id: id.to_string(),
                version_code,
            });
        }
    }

    for id in env.advertising_services(SERVICE_INTERFACE) {
        if KNOWN_APPLICATION_IDS.contains(&id.as_str()) {
            continue;
        }
        if let Some(version_code) = env.installed_version_code(&id) {
            candidates.push(PeerDescriptor {
                application_id: id,
                version_code,
            });
        }
    }

    let selected = candidates.into_iter().reduce(|best, candidate| {
        if candidate.version_code > best.version_code {
            candidate
        } else {
            best
        }
    });

    match selected {
        Some(peer) => {
            debug!(
                target: "acelink::discovery",
                application_id = %peer.application_id,
                version_code = peer.version_code,
                "selected engine application"
            );
            Ok(peer)
        }
        None => {
            error!(target: "acelink::discovery", "no engine application is installed");
            Err(ClientError::NotInstalled)
        }
    }
}
