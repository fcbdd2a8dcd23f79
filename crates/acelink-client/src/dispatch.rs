//! UI dispatch context abstraction. Every host callback runs through
//! here so the session can be exercised without a real UI loop.

use std::thread::{self, ThreadId};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};

pub type UiTask = Box<dyn FnOnce() + Send>;

/// The distinguished single-threaded ordered execution context on which
/// the host expects every callback.
pub trait UiDispatcher: Send + Sync {
    /// True when the calling thread is the dispatch thread itself.
    fn is_dispatch_thread(&self) -> bool;

    /// Enqueues a task for execution on the dispatch thread.
    fn dispatch(&self, task: UiTask);
}

/// Runs `f` inline when already on the dispatch thread, otherwise
/// enqueues it.
pub(crate) fn run_on_ui<F>(ui: &dyn UiDispatcher, f: F)
where
    F: FnOnce() + Send + 'static,
{
    if ui.is_dispatch_thread() {
        f();
    } else {
        ui.dispatch(Box::new(f));
    }
}

/// Stock dispatcher for hosts that pump their own loop: tasks queue on
/// a channel and run when the owning thread drains it.
pub struct ChannelDispatcher {
    owner: ThreadId,
    tx: Sender<UiTask>,
    rx: Receiver<UiTask>,
}

impl ChannelDispatcher {
    /// The constructing thread becomes the dispatch thread.
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            owner: thread::current().id(),
            tx,
            rx,
        }
    }

    /// Runs every task queued so far. Must be called from the dispatch
    /// thread.
    pub fn drain(&self) {
        debug_assert!(self.is_dispatch_thread());
        while let Ok(task) = self.rx.try_recv() {
            task();
        }
    }

    /// Blocks until a task arrives or the timeout elapses, then drains
    /// the queue. Returns false on timeout.
    pub fn pump(&self, timeout: Duration) -> bool {
        debug_assert!(self.is_dispatch_thread());
        match self.rx.recv_timeout(timeout) {
            Ok(task) => {
                task();
                self.drain();
                true
            }
            Err(_) => false,
        }
    }
}

impl Default for ChannelDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl UiDispatcher for ChannelDispatcher {
    fn is_dispatch_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    fn dispatch(&self, task: UiTask) {
        // Send only fails when the dispatcher itself is gone.
        let _ = self.tx.send(task);
    }
}
