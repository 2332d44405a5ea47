//! Link sinks.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::LinkingResult;
use crate::ports::outbound::{LinkSink, SinkError};

/// Keeps every recorded link in memory.
#[derive(Debug, Default)]
pub struct MemoryLinkSink {
    links: Mutex<Vec<LinkingResult>>,
}

impl MemoryLinkSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn links(&self) -> Vec<LinkingResult> {
        self.links.lock().clone()
    }

    /// Most recent wallet linked to `identifier`.
    pub fn wallet_for(&self, identifier: &str) -> Option<String> {
        self.links
            .lock()
            .iter()
            .rev()
            .find(|link| link.identifier() == identifier)
            .map(|link| link.wallet_address().to_string())
    }
}

#[async_trait]
impl LinkSink for MemoryLinkSink {
    async fn record(&self, result: &LinkingResult) -> Result<(), SinkError> {
        self.links.lock().push(result.clone());
        Ok(())
    }
}

/// Emits each link as a structured log event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLinkSink;

#[async_trait]
impl LinkSink for TracingLinkSink {
    async fn record(&self, result: &LinkingResult) -> Result<(), SinkError> {
        tracing::info!(
            identifier = %result.identifier(),
            wallet_address = %result.wallet_address(),
            linked_at = result.linked_at(),
            verification_method = result.verification_method(),
            "account linked"
        );
        Ok(())
    }
}
