use serde::Serialize;
use std::future::Future;

use crate::error::AppResult;

/// Uniform envelope for remote operations. Exactly one of `value`/`error` is
/// set once `loading` is false; each invocation owns its own envelope.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CallResult<T> {
    pub value: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> CallResult<T> {
    pub fn loading() -> Self {
        Self { value: None, loading: true, error: None }
    }

    pub fn ok(value: T) -> Self {
        Self { value: Some(value), loading: false, error: None }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self { value: None, loading: false, error: Some(message.into()) }
    }

    pub fn is_ok(&self) -> bool {
        !self.loading && self.value.is_some()
    }
}

/// Run a remote operation and absorb its failure into the envelope. Callers
/// observe state, not exceptions; transport errors never propagate as panics
/// or `Err` from here.
pub async fn execute<T, F>(operation: F, error_message: &str) -> CallResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match operation.await {
        Ok(value) => CallResult::ok(value),
        Err(e) => {
            tracing::warn!(target: "fundgate", "remote call failed: {}", e);
            let msg = e.message().to_string();
            CallResult::err(if msg.is_empty() { error_message.to_string() } else { msg })
        }
    }
}
