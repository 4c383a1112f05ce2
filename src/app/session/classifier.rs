//! Attach-event classification as ordered rule tables.
//!
//! The name and description of a bus device are concatenated and upper-cased; a
//! device is only considered when one of [`ALLOW_LIST`] occurs in it. The candidate
//! mode comes from the first row of [`MODE_RULES`] with a matching needle.

use crate::app::models::{DeviceMode, DeviceSession, DeviceType};

pub const ALLOW_LIST: &[&str] = &[
    "SAMSUNG", "MOBILE", "ADB", "MODEM", "ANDROID", "QUALCOMM", "MTK", "GADGET",
];

pub const MODE_RULES: &[(&[&str], DeviceMode)] = &[
    (&["ADB"], DeviceMode::Adb),
    (&["DOWNLOAD", "MODEM", "GADGET"], DeviceMode::Download),
    (&["FASTBOOT"], DeviceMode::Fastboot),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub device_type: DeviceType,
    pub candidate: DeviceMode,
}

pub fn classify_attach(name: &str, description: &str) -> Option<Classification> {
    let haystack = format!("{name}{description}").to_uppercase();
    if !ALLOW_LIST.iter().any(|needle| haystack.contains(needle)) {
        return None;
    }
    let device_type = if haystack.contains("SAMSUNG") {
        DeviceType::Samsung
    } else {
        DeviceType::Android
    };
    let candidate = MODE_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| haystack.contains(needle)))
        .map(|(_, mode)| *mode)
        .unwrap_or(DeviceMode::UsbConnected);
    Some(Classification {
        device_type,
        candidate,
    })
}

pub fn candidate_wins(current: DeviceMode, candidate: DeviceMode) -> bool {
    current == DeviceMode::Disconnected || candidate.priority() >= current.priority()
}

/// Applies an accepted attach. Returns whether `mode` changed value.
pub fn apply_candidate(session: &mut DeviceSession, classification: Classification) -> bool {
    session.device_type = classification.device_type;
    session.connected = true;
    if !candidate_wins(session.mode, classification.candidate) {
        return false;
    }
    let changed = session.mode != classification.candidate;
    session.mode = classification.candidate;
    changed
}
