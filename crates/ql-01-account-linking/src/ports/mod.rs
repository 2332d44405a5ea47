//! Ports layer for the Account Linking subsystem.
//!
//! - Inbound (Driving) port: the linking API offered to callers
//! - Outbound (Driven) ports: identity verification, challenge storage,
//!   link persistence and time

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
