//! Receives transport events and unsolicited engine notifications and
//! feeds them into the session. Holds only a weak session reference so
//! a binding leaked by the platform cannot pin a destroyed session.

use std::sync::{Arc, Weak};

use tracing::debug;

use crate::session::SessionInner;
use crate::transport::{EngineCallbackSink, EngineHandle, StartEngineResponse, TransportObserver};

pub(crate) struct CallbackAdapter {
    session: Weak<SessionInner>,
}

impl CallbackAdapter {
    pub(crate) fn new(session: Weak<SessionInner>) -> Self {
        Self { session }
    }

    fn session(&self) -> Option<Arc<SessionInner>> {
        let session = self.session.upgrade();
        if session.is_none() {
            debug!(target: "acelink::adapter", "event for destroyed session, dropped");
        }
        session
    }
}

impl TransportObserver for CallbackAdapter {
    fn on_transport_connected(&self, engine: Arc<dyn EngineHandle>) {
        if let Some(session) = self.session() {
            session.handle_connected(engine);
        }
    }

    fn on_transport_disconnected(&self) {
        if let Some(session) = self.session() {
            session.handle_disconnected();
        }
    }
}

impl EngineCallbackSink for CallbackAdapter {
    fn on_unpacking(&self) {
        if let Some(session) = self.session() {
            session.forward("unpacking", |host| host.on_unpacking());
        }
    }

    fn on_starting(&self) {
        if let Some(session) = self.session() {
            session.forward("starting", |host| host.on_starting());
        }
    }

    fn on_ready(&self, port: i32) {
        if let Some(session) = self.session() {
            session.handle_ready(port);
        }
    }

    fn on_stopped(&self) {
        if let Some(session) = self.session() {
            session.handle_stopped();
        }
    }

    fn on_playlist_updated(&self) {
        if let Some(session) = self.session() {
            session.forward("playlist_updated", |host| host.on_playlist_updated());
        }
    }

    fn on_epg_updated(&self) {
        if let Some(session) = self.session() {
            session.forward("epg_updated", |host| host.on_epg_updated());
        }
    }

    fn on_settings_updated(&self) {
        if let Some(session) = self.session() {
            session.forward("settings_updated", |host| host.on_settings_updated());
        }
    }

    fn on_restart_player(&self) {
        if let Some(session) = self.session() {
            session.forward("restart_player", |host| host.on_restart_player());
        }
    }

    fn on_wait_for_network(&self) {
        // Absorbed: the notification survives on the ABI but has no
        // client-side meaning anymore.
    }
}

impl StartEngineResponse for CallbackAdapter {
    fn on_result(&self, success: bool) {
        if let Some(session) = self.session() {
            session.handle_start_result(success);
        }
    }
}
