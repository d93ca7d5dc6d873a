//! Foundational types and low-level utilities shared across Desk crates.
//!
//! Defines the request model, the external-state mapper, and the atomic-write
//! and time helpers used by store persistence and event timestamps.

pub mod atomic_io;
pub mod request_model;
pub mod status_mapper;
pub mod time_utils;

pub use atomic_io::write_text_atomic;
pub use request_model::{NewRequest, RequestRecord, RequestStatus, StatusChangeEvent};
pub use status_mapper::{map_external_state, StatusMapping};
pub use time_utils::{current_unix_timestamp, current_unix_timestamp_ms};

#[cfg(test)]
mod tests {
    use std::fs::read_to_string;

    use super::*;

    #[test]
    fn time_utils_round_trip_bounds() {
        let now_s = current_unix_timestamp();
        let now_ms = current_unix_timestamp_ms();
        let now_ms_s = now_ms / 1_000;
        assert!(now_ms_s >= now_s);
        assert!(now_ms_s <= now_s.saturating_add(1));
    }

    #[test]
    fn write_text_atomic_writes_content() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("sample.json");
        write_text_atomic(&path, "{}").expect("write");
        let contents = read_to_string(&path).expect("read");
        assert_eq!(contents, "{}");
    }
}
