use extract_core::ExtractionProgram;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("channel closed")]
    Closed,
    #[error("no page attached")]
    Detached,
    #[error("{0}")]
    Failed(String),
}

/// Host-specific connection to the page under inspection.
///
/// Extraction outcomes never come back through this trait: `evaluate` only
/// delivers the program, results arrive later on the [`MessageListener`].
///
/// [`MessageListener`]: crate::MessageListener
#[async_trait::async_trait]
pub trait RemoteChannel: Send + Sync {
    /// URL of the attached page; empty when nothing is attached.
    async fn current_url(&self) -> Result<String, ChannelError>;

    async fn evaluate(&self, program: &ExtractionProgram) -> Result<(), ChannelError>;

    async fn reload(&self) -> Result<(), ChannelError>;

    async fn go_back(&self) -> Result<(), ChannelError>;

    async fn navigate(&self, url: &str) -> Result<(), ChannelError>;
}
