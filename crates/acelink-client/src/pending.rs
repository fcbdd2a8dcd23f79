//! Commands recorded before the remote engine is reachable and replayed
//! exactly once when it becomes reachable.

/// A user-requested operation the session could not issue yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredCommand {
    StartEngine,
    EnableAceCast,
}

/// Replay happens in this fixed order, after callback registration.
const REPLAY_ORDER: [DeferredCommand; 2] =
    [DeferredCommand::StartEngine, DeferredCommand::EnableAceCast];

/// At most one pending instance per command; requesting an already
/// pending command is a no-op.
#[derive(Debug, Default)]
pub struct PendingCommands {
    start_engine: bool,
    enable_acecast: bool,
}

impl PendingCommands {
    pub fn new(start_on_bind: bool) -> Self {
        Self {
            start_engine: start_on_bind,
            enable_acecast: false,
        }
    }

    pub fn request(&mut self, command: DeferredCommand) {
        *self.slot_mut(command) = true;
    }

    pub fn is_pending(&self, command: DeferredCommand) -> bool {
        match command {
            DeferredCommand::StartEngine => self.start_engine,
            DeferredCommand::EnableAceCast => self.enable_acecast,
        }
    }

    /// Removes and returns the pending commands in replay order.
    pub fn drain(&mut self) -> Vec<DeferredCommand> {
        REPLAY_ORDER
            .into_iter()
            .filter(|command| std::mem::take(self.slot_mut(*command)))
            .collect()
    }

    fn slot_mut(&mut self, command: DeferredCommand) -> &mut bool {
        match command {
            DeferredCommand::StartEngine => &mut self.start_engine,
            DeferredCommand::EnableAceCast => &mut self.enable_acecast,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_honours_replay_order() {
        let mut pending = PendingCommands::new(false);
        pending.request(DeferredCommand::EnableAceCast);
        pending.request(DeferredCommand::StartEngine);
        assert_eq!(
            pending.drain(),
            vec![DeferredCommand::StartEngine, DeferredCommand::EnableAceCast]
        );
    }

    #[test]
    fn repeated_requests_replay_once() {
        let mut pending = PendingCommands::new(false);
        pending.request(DeferredCommand::StartEngine);
        pending.request(DeferredCommand::StartEngine);
        assert_eq!(pending.drain(), vec![DeferredCommand::StartEngine]);
        assert!(pending.drain().is_empty());
    }

    #[test]
    fn start_on_bind_seeds_a_pending_start() {
        let mut pending = PendingCommands::new(true);
        assert!(pending.is_pending(DeferredCommand::StartEngine));
        assert_eq!(pending.drain(), vec![DeferredCommand::StartEngine]);
    }
}
