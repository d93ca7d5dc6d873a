#![no_main]

use desk_core::{map_external_state, StatusMapping};
use desk_sync::TrackerNotification;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    if let Ok(notification) = TrackerNotification::parse(&raw) {
        let _ = notification.is_issue_lifecycle();
        match map_external_state(notification.state_label()) {
            StatusMapping::Mapped(status) => assert!(!status.as_str().is_empty()),
            StatusMapping::Unchanged => {}
        }
    }
});
