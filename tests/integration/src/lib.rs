//! Workspace end-to-end tests live under `tests/`.
