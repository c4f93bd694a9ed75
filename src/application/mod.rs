use crate::domain::errors::DomainError;

pub mod addressees;
pub mod cart_service;
pub mod order_service;
pub mod payment_service;
pub mod settings_service;

/// Runs a storage call off the async executor.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, DomainError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DomainError::Internal(e.to_string()))?
}
