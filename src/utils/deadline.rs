use crate::utils::error::{MigrationError, Result};
use std::future::Future;
use std::time::Duration;

/// Run one control-plane call under a deadline; expiry becomes `PlatformTimeout`.
pub async fn with_deadline<T, F>(operation: &str, deadline: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("⏱️ {} did not answer within {:?}", operation, deadline);
            Err(MigrationError::PlatformTimeout {
                operation: operation.to_string(),
                seconds: deadline.as_secs(),
            })
        }
    }
}
