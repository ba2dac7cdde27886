// ── Transmitter keying bridge ──
//
// The modem asks for the transmitter with `PTT ON` / `PTT OFF`; the
// application supplies whatever actually keys the radio (CAT command,
// serial RTS line, VOX...). Keying failures are logged and swallowed:
// an error here must never stop the command loop, or the session would
// miss its own DISCONNECTED.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use vara_api::Command;

/// Error returned by a [`PttController`].
pub type PttError = Box<dyn std::error::Error + Send + Sync>;

/// Something that can key and unkey a transmitter.
///
/// Called inline from the command loop, so implementations should
/// return promptly.
pub trait PttController: Send + Sync {
    fn set_ptt(&self, on: bool) -> Result<(), PttError>;
}

/// Translates PTT command events into [`PttController`] calls.
#[derive(Clone, Default)]
pub struct PttBridge {
    rig: Option<Arc<dyn PttController>>,
}

impl fmt::Debug for PttBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PttBridge")
            .field("rig", &self.rig.is_some())
            .finish()
    }
}

impl PttBridge {
    pub fn new(rig: Option<Arc<dyn PttController>>) -> Self {
        Self { rig }
    }

    /// React to a command event; anything but `PTT ON/OFF` is ignored.
    pub fn handle(&self, cmd: &Command) {
        match cmd {
            Command::PttOn => self.key(true),
            Command::PttOff => self.key(false),
            _ => {}
        }
    }

    /// Best-effort unkey, used during teardown.
    pub fn release(&self) {
        self.key(false);
    }

    fn key(&self, on: bool) {
        let Some(rig) = &self.rig else {
            return;
        };
        match rig.set_ptt(on) {
            Ok(()) => debug!(on, "transmitter keying updated"),
            Err(e) => warn!(error = %e, on, "failed to set PTT"),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRig {
        calls: Mutex<Vec<bool>>,
    }

    impl PttController for RecordingRig {
        fn set_ptt(&self, on: bool) -> Result<(), PttError> {
            self.calls
                .lock()
                .map_err(|_| "poisoned")?
                .push(on);
            Ok(())
        }
    }

    struct BrokenRig;

    impl PttController for BrokenRig {
        fn set_ptt(&self, _on: bool) -> Result<(), PttError> {
            Err("serial port unplugged".into())
        }
    }

    #[test]
    fn forwards_ptt_events_in_order() {
        let rig = Arc::new(RecordingRig::default());
        let controller: Arc<dyn PttController> = rig.clone();
        let bridge = PttBridge::new(Some(controller));

        bridge.handle(&Command::PttOn);
        bridge.handle(&Command::Buffer(12));
        bridge.handle(&Command::PttOff);
        bridge.release();

        let calls = rig.calls.lock().map(|c| c.clone()).unwrap_or_default();
        assert_eq!(calls, vec![true, false, false]);
    }

    #[test]
    fn keying_failures_are_absorbed() {
        let controller: Arc<dyn PttController> = Arc::new(BrokenRig);
        let bridge = PttBridge::new(Some(controller));
        bridge.handle(&Command::PttOn);
        bridge.release();
    }

    #[test]
    fn no_rig_is_a_no_op() {
        let bridge = PttBridge::default();
        bridge.handle(&Command::PttOn);
        assert_eq!(format!("{bridge:?}"), "PttBridge { rig: false }");
    }
}
