//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap store calls with a deadline
//! - Map an elapsed deadline to [`StoreError::Timeout`]
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - Callers on the request path treat timeouts as fail-open

use std::future::Future;
use std::time::Duration;

use tokio::time;

use crate::rules::StoreError;

/// Run `future` with a deadline.
pub async fn with_timeout<T, F>(limit: Duration, future: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}
