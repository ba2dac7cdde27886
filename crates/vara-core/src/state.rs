// ── Connection state machine ──
//
// The single authoritative connected/disconnected value for a session.
// Only the session's command loop mutates it; everyone else reads or
// waits on it through a `watch` channel.
//
//   Disconnected ──CONNECTED──▶ Connected ──DISCONNECTED──▶ Disconnected (terminal)
//
// Once terminated (DISCONNECTED received or channels torn down) the
// session never reports Connected again.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

use vara_api::Command;

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    Connected,
    #[default]
    Disconnected,
}

/// A state change caused by [`StateMachine::apply`] or [`StateMachine::terminate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Entered `Connected`; pending dial/accept waits may proceed.
    Connected,
    /// Entered the terminal `Disconnected`; channels must be torn down.
    Disconnected,
}

#[derive(Debug)]
pub struct StateMachine {
    state: watch::Sender<ConnectionState>,
    terminated: AtomicBool,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            state,
            terminated: AtomicBool::new(false),
        }
    }

    pub fn current(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.current() == ConnectionState::Connected
    }

    /// `true` once the session has reached its terminal state.
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Feed one command event through the machine.
    pub(crate) fn apply(&self, cmd: &Command) -> Option<Transition> {
        match cmd {
            Command::Connected { .. } => {
                if self.is_terminated() {
                    return None;
                }
                let changed = self.state.send_if_modified(|state| {
                    if *state == ConnectionState::Connected {
                        return false;
                    }
                    *state = ConnectionState::Connected;
                    true
                });
                changed.then_some(Transition::Connected)
            }
            Command::Disconnected => self.terminate(),
            _ => None,
        }
    }

    /// Enter the terminal state. Returns `None` if already there.
    pub(crate) fn terminate(&self) -> Option<Transition> {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return None;
        }
        self.state.send_replace(ConnectionState::Disconnected);
        Some(Transition::Disconnected)
    }

    /// Block until the state equals `target`.
    pub async fn wait_for(&self, target: ConnectionState) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|state| *state == target).await;
    }
}

// ── Tests ────────────────────────────────────────────────────────────
