use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info};

use crate::app::models::{AttachOutcome, DeviceKey, DeviceSession};
use crate::app::session::classifier::{apply_candidate, classify_attach};

#[derive(Debug, Default)]
struct StoreState {
    session: DeviceSession,
    // Identity of the device whose attach last set `session.mode`.
    tracked: Option<DeviceKey>,
}

/// Single owner of the [`DeviceSession`]. Classification and arbitration happen under
/// one lock, so a detach cannot interleave with a half-applied attach.
#[derive(Debug, Default)]
pub struct SessionStore {
    state: Mutex<StoreState>,
    detach_requires_tracked_device: bool,
}

impl SessionStore {
    pub fn new(detach_requires_tracked_device: bool) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            detach_requires_tracked_device,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> DeviceSession {
        self.lock().session.clone()
    }

    /// `None` when the device is not phone-like; the session is untouched in that case.
    pub fn attach(
        &self,
        key: Option<DeviceKey>,
        name: &str,
        description: &str,
    ) -> Option<AttachOutcome> {
        let Some(classification) = classify_attach(name, description) else {
            debug!(name = %name, "ignoring non-phone device");
            return None;
        };
        let mut state = self.lock();
        let before = state.session.mode;
        let mode_changed = apply_candidate(&mut state.session, classification);
        if state.session.mode == classification.candidate {
            state.tracked = key;
        }
        info!(
            name = %name,
            candidate = %classification.candidate,
            previous = %before,
            mode = %state.session.mode,
            "device attached"
        );
        Some(AttachOutcome {
            name: name.to_string(),
            session: state.session.clone(),
            mode_changed,
        })
    }

    /// Resets the session. With identity matching enabled, a removal of a device other
    /// than the tracked one is ignored and `None` is returned.
    pub fn detach(&self, key: Option<&DeviceKey>) -> Option<DeviceSession> {
        let mut state = self.lock();
        if self.detach_requires_tracked_device {
            if let (Some(tracked), Some(removed)) = (state.tracked.as_ref(), key) {
                if tracked != removed {
                    debug!(removed = ?removed, tracked = ?tracked, "ignoring removal of untracked device");
                    return None;
                }
            }
        }
        state.session.reset();
        state.tracked = None;
        info!("device detached; session reset");
        Some(state.session.clone())
    }
}
