//! Transport binding lifecycle: idempotent bind/unbind plus custody of
//! the remote engine handle for the current binding.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::discovery::PeerDescriptor;
use crate::error::ClientError;
use crate::transport::{EngineCallbackSink, EngineHandle, EngineTransport, TransportObserver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// A bind request was issued to the platform.
    Bound,
    /// A binding already exists; no second request was issued.
    AlreadyBound,
}

#[derive(Default)]
struct BindingInner {
    bound: bool,
    engine: Option<Arc<dyn EngineHandle>>,
}

/// Owns the bound flag and the engine handle. `bind`, `unbind` and
/// `is_bound` are mutually serialised by the inner lock, which stays
/// held across the platform bind/unbind calls; transport events take
/// the same lock only briefly, from their own thread.
pub struct BindingManager {
    transport: Arc<dyn EngineTransport>,
    inner: Mutex<BindingInner>,
}

impl BindingManager {
    pub fn new(transport: Arc<dyn EngineTransport>) -> Self {
        Self {
            transport,
            inner: Mutex::new(BindingInner::default()),
        }
    }

    /// Issues a bind request for the selected peer. Idempotent: when a
    /// binding already exists no second request reaches the platform.
    pub fn bind(
        &self,
        peer: &PeerDescriptor,
        observer: Arc<dyn TransportObserver>,
    ) -> Result<BindOutcome, ClientError> {
        let mut inner = self.inner.lock();
        if inner.bound {
            debug!(target: "acelink::binding", "already bound");
            return Ok(BindOutcome::AlreadyBound);
        }

        debug!(
            target: "acelink::binding",
            application_id = %peer.application_id,
            "issuing bind request"
        );
        // The platform call happens under the lock so a concurrent
        // unbind cannot tear down a binding that is still being
        // established. Connect and disconnect events arrive later on a
        // transport thread, never inline, so this cannot re-enter.
        if self.transport.bind(peer, observer) {
            inner.bound = true;
            Ok(BindOutcome::Bound)
        } else {
            warn!(
                target: "acelink::binding",
                application_id = %peer.application_id,
                "platform rejected bind request"
            );
            Err(ClientError::BindRejected {
                application_id: peer.application_id.clone(),
            })
        }
    }

    /// Tears down the binding, attempting a best-effort callback
    /// unregister at the remote first. Returns false when already
    /// unbound.
    pub fn unbind(&self, sink: Arc<dyn EngineCallbackSink>) -> bool {
        let mut inner = self.inner.lock();
        if !inner.bound {
            debug!(target: "acelink::binding", "already unbound");
            return false;
        }
        inner.bound = false;

        // Remote callbacks land on a transport thread, so the lock can
        // stay held across the unregister round-trip without risking
        // same-thread re-entry.
        if let Some(engine) = inner.engine.take() {
            if let Err(err) = engine.unregister_callback(sink) {
                warn!(
                    target: "acelink::binding",
                    error = %err,
                    "callback unregister failed during unbind"
                );
            }
        }
        self.transport.unbind();
        true
    }

    pub fn is_bound(&self) -> bool {
        self.inner.lock().bound
    }

    /// Engine handle for the current binding, when the transport has
    /// delivered one.
    pub fn engine(&self) -> Option<Arc<dyn EngineHandle>> {
        self.inner.lock().engine.clone()
    }

    /// Records the engine handle from a transport connected event.
    /// Returns false when an unbind raced the event, in which case the
    /// handle is discarded.
    pub(crate) fn attach_engine(&self, engine: Arc<dyn EngineHandle>) -> bool {
        let mut inner = self.inner.lock();
        if !inner.bound {
            return false;
        }
        inner.engine = Some(engine);
        true
    }

    /// Clears the binding after a transport disconnected event. Returns
    /// false when there was no binding to clear.
    pub(crate) fn detach(&self) -> bool {
        let mut inner = self.inner.lock();
        if !inner.bound && inner.engine.is_none() {
            return false;
        }
        inner.bound = false;
        inner.engine = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTransport {
        accept: bool,
        bind_requests: AtomicUsize,
        unbind_calls: AtomicUsize,
    }

    impl CountingTransport {
        fn new(accept: bool) -> Self {
            Self {
                accept,
                bind_requests: AtomicUsize::new(0),
                unbind_calls: AtomicUsize::new(0),
            }
        }
    }

    impl EngineTransport for CountingTransport {
        fn bind(&self, _peer: &PeerDescriptor, _observer: Arc<dyn TransportObserver>) -> bool {
            self.bind_requests.fetch_add(1, Ordering::SeqCst);
            self.accept
        }

        fn unbind(&self) {
            self.unbind_calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct NullObserver;

    impl TransportObserver for NullObserver {
        fn on_transport_connected(&self, _engine: Arc<dyn EngineHandle>) {}
        fn on_transport_disconnected(&self) {}
    }

    struct NullSink;

    impl EngineCallbackSink for NullSink {
        fn on_unpacking(&self) {}
        fn on_starting(&self) {}
        fn on_ready(&self, _port: i32) {}
        fn on_stopped(&self) {}
        fn on_playlist_updated(&self) {}
        fn on_epg_updated(&self) {}
        fn on_settings_updated(&self) {}
        fn on_restart_player(&self) {}
    }

    fn peer() -> PeerDescriptor {
        PeerDescriptor {
            application_id: "org.acestream.media".into(),
            version_code: 100,
        }
    }

    #[test]
    fn second_bind_is_a_no_op() {
        let transport = Arc::new(CountingTransport::new(true));
        let manager = BindingManager::new(transport.clone());

        let first = manager.bind(&peer(), Arc::new(NullObserver)).unwrap();
        let second = manager.bind(&peer(), Arc::new(NullObserver)).unwrap();

        assert_eq!(first, BindOutcome::Bound);
        assert_eq!(second, BindOutcome::AlreadyBound);
        assert_eq!(transport.bind_requests.load(Ordering::SeqCst), 1);
        assert!(manager.is_bound());
    }

    #[test]
    fn rejected_bind_leaves_manager_unbound() {
        let transport = Arc::new(CountingTransport::new(false));
        let manager = BindingManager::new(transport);

        let err = manager.bind(&peer(), Arc::new(NullObserver)).unwrap_err();
        assert!(matches!(err, ClientError::BindRejected { .. }));
        assert!(!manager.is_bound());
    }

    #[test]
    fn unbind_cannot_overtake_an_in_flight_bind() {
        use crossbeam_channel::{bounded, Receiver, Sender};
        use std::sync::atomic::AtomicBool;
        use std::thread;
        use std::time::Duration;

        struct GatedTransport {
            events: Arc<Mutex<Vec<&'static str>>>,
            live: AtomicBool,
            entered_tx: Sender<()>,
            gate_rx: Receiver<()>,
        }

        impl EngineTransport for GatedTransport {
            fn bind(&self, _peer: &PeerDescriptor, _observer: Arc<dyn TransportObserver>) -> bool {
                self.events.lock().push("bind entered");
                self.entered_tx.send(()).expect("gate listener");
                self.gate_rx.recv().expect("gate opened");
                self.live.store(true, Ordering::SeqCst);
                self.events.lock().push("bind completed");
                true
            }

            fn unbind(&self) {
                self.live.store(false, Ordering::SeqCst);
                self.events.lock().push("unbind");
            }
        }

        let (entered_tx, entered_rx) = bounded(1);
        let (gate_tx, gate_rx) = bounded(1);
        let events = Arc::new(Mutex::new(Vec::new()));
        let transport = Arc::new(GatedTransport {
            events: events.clone(),
            live: AtomicBool::new(false),
            entered_tx,
            gate_rx,
        });
        let manager = Arc::new(BindingManager::new(transport.clone()));

        let binder = {
            let manager = manager.clone();
            thread::spawn(move || {
                manager
                    .bind(&peer(), Arc::new(NullObserver))
                    .expect("bind ok")
            })
        };
        entered_rx.recv().expect("bind in flight");

        let unbinder = {
            let manager = manager.clone();
            thread::spawn(move || manager.unbind(Arc::new(NullSink)))
        };
        // Let the unbind reach the binding lock before the gate opens.
        thread::sleep(Duration::from_millis(50));
        gate_tx.send(()).expect("gate opened");

        assert_eq!(binder.join().expect("binder"), BindOutcome::Bound);
        // The unbind serialised behind the bind and tore it down.
        assert!(unbinder.join().expect("unbinder"));

        assert_eq!(*events.lock(), vec!["bind entered", "bind completed", "unbind"]);
        assert!(!manager.is_bound());
        assert!(!transport.live.load(Ordering::SeqCst));
    }

    #[test]
    fn unbind_when_unbound_is_a_no_op() {
        let transport = Arc::new(CountingTransport::new(true));
        let manager = BindingManager::new(transport.clone());

        assert!(!manager.unbind(Arc::new(NullSink)));
        assert_eq!(transport.unbind_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn attach_after_unbind_discards_the_handle() {
        let transport = Arc::new(CountingTransport::new(true));
        let manager = BindingManager::new(transport);

        struct DeadEngine;
        impl EngineHandle for DeadEngine {
            fn register_callback(
                &self,
                _sink: Arc<dyn EngineCallbackSink>,
                _want_events: bool,
            ) -> Result<(), crate::transport::TransportError> {
                Ok(())
            }
            fn unregister_callback(
                &self,
                _sink: Arc<dyn EngineCallbackSink>,
            ) -> Result<(), crate::transport::TransportError> {
                Ok(())
            }
            fn start_engine(&self) -> Result<(), crate::transport::TransportError> {
                Ok(())
            }
            fn start_engine_with_callback(
                &self,
                _response: Arc<dyn crate::transport::StartEngineResponse>,
            ) -> Result<(), crate::transport::TransportError> {
                Ok(())
            }
            fn enable_acecast_server(&self) -> Result<(), crate::transport::TransportError> {
                Ok(())
            }
            fn access_token(&self) -> Result<Option<String>, crate::transport::TransportError> {
                Ok(None)
            }
            fn engine_api_port(&self) -> Result<i32, crate::transport::TransportError> {
                Ok(0)
            }
            fn http_api_port(&self) -> Result<i32, crate::transport::TransportError> {
                Ok(0)
            }
        }

        manager.bind(&peer(), Arc::new(NullObserver)).unwrap();
        manager.unbind(Arc::new(NullSink));
        assert!(!manager.attach_engine(Arc::new(DeadEngine)));
        assert!(manager.engine().is_none());
    }
}
