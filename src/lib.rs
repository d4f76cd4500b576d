//! signal-inbox — turns messages queued on a signal-cli REST relay into files.

pub mod config;
pub mod error;
pub mod inbox;
pub mod relay;
