use anyhow::Result;
use async_trait::async_trait;

/// Outbound mail collaborator. Only password-reset delivery is needed.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, to: &str, name: &str, reset_url: &str) -> Result<()>;
}

/// Mailer that writes the message to the log instead of delivering it.
/// Used when no mail transport is configured and in tests.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(&self, to: &str, name: &str, reset_url: &str) -> Result<()> {
        tracing::info!(
            to,
            name,
            reset_url,
            "password reset requested (log-only mail transport)"
        );
        Ok(())
    }
}
