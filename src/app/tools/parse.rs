use crate::app::models::{AttachedDevice, ConnectionState};

/// Status words in the order they are tested against each line; first match wins.
const STATUS_RULES: &[(&str, ConnectionState)] = &[
    ("device", ConnectionState::Online),
    ("unauthorized", ConnectionState::Unauthorized),
    ("offline", ConnectionState::Offline),
    ("recovery", ConnectionState::Recovery),
    ("sideload", ConnectionState::Sideload),
    ("fastboot", ConnectionState::Fastboot),
];

pub fn parse_connection_state(output: &str) -> ConnectionState {
    for line in output.lines().filter(|line| !line.trim().is_empty()) {
        for (word, state) in STATUS_RULES {
            if line.contains(&format!("\t{word}")) {
                return *state;
            }
        }
    }
    ConnectionState::NotFound
}

pub fn parse_adb_devices(output: &str) -> Vec<AttachedDevice> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !line.trim_start().starts_with('*'))
        .filter(|line| !line.to_lowercase().contains("list of devices"))
        .filter_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 2 {
                return None;
            }
            let model = tokens
                .iter()
                .skip(2)
                .find_map(|token| token.strip_prefix("model:"))
                .map(str::to_string);
            Some(AttachedDevice {
                serial: tokens[0].to_string(),
                state: tokens[1].to_string(),
                model,
            })
        })
        .collect()
}

/// Value of a `getvar` query. The flashing tool prints `<key>: <value>`, usually on stderr,
/// followed by a `Finished.` status line.
pub fn parse_getvar_value(output: &str, key: &str) -> Option<String> {
    let prefix = format!("{key}:");
    output
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix(&prefix))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// First non-empty line of a `getprop <key>` reply.
pub fn parse_single_prop(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}
