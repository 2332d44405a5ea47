//! Reference adapters for the outbound ports.
//!
//! In-memory implementations used by the runtime, the demo flow and tests.

pub mod clock;
pub mod device;
pub mod key_state;
pub mod memory_store;
pub mod sinks;

pub use clock::ManualTimeSource;
pub use device::EdgeDevice;
pub use key_state::Ed25519KeyStateVerifier;
pub use memory_store::InMemoryChallengeStore;
pub use sinks::{MemoryLinkSink, TracingLinkSink};
