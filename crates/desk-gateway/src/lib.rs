//! Core library surface for the Desk gateway crate.
pub mod desk_server;

pub use desk_server::*;
