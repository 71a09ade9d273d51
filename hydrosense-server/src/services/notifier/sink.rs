use crate::errors::AlertError;

#[async_trait::async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver one Markdown formatted message
    async fn send(&self, text: &str) -> Result<(), AlertError>;
}
