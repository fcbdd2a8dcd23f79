//! Shared ABI definitions for the Ace Stream engine service.
//! Keeping this in a dedicated crate allows regeneration of bindings
//! for other client languages without pulling in the connector runtime.

use serde::{Deserialize, Serialize};

/// Interface name advertised by peers whose service is discoverable by
/// platform query.
pub const SERVICE_INTERFACE: &str = "org.acestream.engine.service.v0.IAceStreamEngine";

/// Well-known application ids, in selection order. Peers older than
/// [`INTENT_DISCOVERY_MIN_VERSION`] are only reachable through this list.
pub const KNOWN_APPLICATION_IDS: [&str; 4] = [
    "org.acestream.media",
    "org.acestream.media.atv",
    "org.acestream.core",
    "org.acestream.core.atv",
];

/// Version code of the first peer release that advertises
/// [`SERVICE_INTERFACE`] for platform discovery (3.1.30.1).
pub const INTENT_DISCOVERY_MIN_VERSION: i64 = 301_301_000;

/// Port value the engine reports through `ready` when it failed to start.
pub const READY_FAILURE_PORT: i32 = -1;

/// Message identifiers for the legacy messenger variant of the protocol.
pub mod msg {
    /// Registers a client; replies flow back over the channel supplied
    /// with the registration message.
    pub const REGISTER_CLIENT: i32 = 1;
    /// Unregisters a previously registered client channel.
    pub const UNREGISTER_CLIENT: i32 = 2;
    /// Asks the service to start the engine.
    pub const START: i32 = 3;
    /// Engine is unpacking bundled files after an install or update.
    pub const ENGINE_UNPACKING: i32 = 4;
    /// Service is launching the engine and connecting to it.
    pub const ENGINE_STARTING: i32 = 5;
    /// Carries the listening port in the message argument, or
    /// [`super::READY_FAILURE_PORT`] when the engine failed to start.
    pub const ENGINE_READY: i32 = 6;
    /// Engine stopped.
    pub const ENGINE_STOPPED: i32 = 7;
    pub const PLAYLIST_UPDATED: i32 = 8;
    pub const EPG_UPDATED: i32 = 9;
    pub const RESTART_PLAYER: i32 = 10;
    pub const SETTINGS_UPDATED: i32 = 11;
}

/// Unsolicited notifications the engine service pushes to registered
/// clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineNotification {
    Unpacking,
    Starting,
    Ready { port: i32 },
    Stopped,
    PlaylistUpdated,
    EpgUpdated,
    SettingsUpdated,
    RestartPlayer,
    /// Retained for ABI compatibility only; clients absorb it.
    WaitForNetwork,
}

impl EngineNotification {
    /// Message id of this notification in the legacy messenger variant.
    /// `WaitForNetwork` predates that mapping and has none.
    pub fn message_id(&self) -> Option<i32> {
        match self {
            Self::Unpacking => Some(msg::ENGINE_UNPACKING),
            Self::Starting => Some(msg::ENGINE_STARTING),
            Self::Ready { .. } => Some(msg::ENGINE_READY),
            Self::Stopped => Some(msg::ENGINE_STOPPED),
            Self::PlaylistUpdated => Some(msg::PLAYLIST_UPDATED),
            Self::EpgUpdated => Some(msg::EPG_UPDATED),
            Self::SettingsUpdated => Some(msg::SETTINGS_UPDATED),
            Self::RestartPlayer => Some(msg::RESTART_PLAYER),
            Self::WaitForNetwork => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_serializes_snake_case() {
        let json = serde_json::to_string(&EngineNotification::Ready { port: 8621 })
            .expect("serialize ok");
        assert_eq!(json, r#"{"ready":{"port":8621}}"#);

        let parsed: EngineNotification =
            serde_json::from_str(r#""playlist_updated""#).expect("deserialize ok");
        assert_eq!(parsed, EngineNotification::PlaylistUpdated);
    }

    #[test]
    fn messenger_ids_cover_every_notification_but_wait_for_network() {
        assert_eq!(
            EngineNotification::Ready { port: 1 }.message_id(),
            Some(msg::ENGINE_READY)
        );
        assert_eq!(
            EngineNotification::Stopped.message_id(),
            Some(msg::ENGINE_STOPPED)
        );
        assert_eq!(EngineNotification::WaitForNetwork.message_id(), None);
    }
}
