//! # Domain Layer - Account Linking Subsystem
//!
//! Pure protocol logic. Nothing here performs I/O; time is always passed in.
//!
//! ## Components
//!
//! - `entities`: Challenge, ScanResponse, LinkingResult, LinkState
//! - `issuer`: ChallengeIssuer
//! - `codec`: LinkingPayload and PayloadCodec
//! - `validator`: ResponseValidator and its six gates
//! - `state_machine`: ChallengeRecord and LinkingAttempt
//! - `report`: OutcomeTally
//! - `config`: LinkingConfig
//! - `errors`: LinkingError, DecodeError, RejectionReason

pub mod codec;
pub mod config;
pub mod entities;
pub mod errors;
pub mod issuer;
pub mod report;
pub mod state_machine;
pub mod time;
pub mod validator;

#[cfg(test)]
pub(crate) mod fixtures;

pub use codec::*;
pub use config::*;
pub use entities::*;
pub use errors::*;
pub use issuer::*;
pub use report::*;
pub use state_machine::*;
pub use validator::*;
