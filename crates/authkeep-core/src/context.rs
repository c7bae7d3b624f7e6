//! Typed request-scoped execution context.
//!
//! Every session operation receives a [`RequestContext`] by reference. It
//! carries the request id used in log fields, an optional deadline, a
//! cancellation token, and the calling client's metadata. Collaborators call
//! [`RequestContext::check`] before doing work, or wrap their future in
//! [`RequestContext::run`] to stop as soon as the caller gives up.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::AppError;
use crate::result::AppResult;
use crate::types::ClientMeta;

/// Request-scoped values passed explicitly through the call chain.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id for log records.
    request_id: Uuid,
    /// Point in time after which the request is abandoned.
    deadline: Option<Instant>,
    /// Signalled when the caller cancels.
    cancellation: CancellationToken,
    /// Calling client, for audit fields on issued sessions.
    client: ClientMeta,
}

impl RequestContext {
    /// Create a context with a fresh request id, no deadline and no client metadata.
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            deadline: None,
            cancellation: CancellationToken::new(),
            client: ClientMeta::default(),
        }
    }

    /// Set the deadline to `timeout` from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Set an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attach client metadata.
    pub fn with_client(mut self, client: ClientMeta) -> Self {
        self.client = client;
        self
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Correlation id of this request.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Client metadata of this request.
    pub fn client(&self) -> &ClientMeta {
        &self.client
    }

    /// Deadline of this request, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline. `None` means unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// The cancellation token observed by this request.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Cancel this request and every child derived from it.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Returns true once the request has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Derive a context that is cancelled with this one but can also be
    /// cancelled on its own.
    pub fn child(&self) -> Self {
        Self {
            request_id: self.request_id,
            deadline: self.deadline,
            cancellation: self.cancellation.child_token(),
            client: self.client.clone(),
        }
    }

    /// Fail fast if the request was cancelled or its deadline has passed.
    pub fn check(&self) -> AppResult<()> {
        if self.cancellation.is_cancelled() {
            return Err(self.cancelled_error());
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(self.timeout_error());
            }
        }
        Ok(())
    }

    /// Drive `fut` to completion unless the request is cancelled or times out first.
    pub async fn run<T, F>(&self, fut: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        self.check()?;

        let guarded = async {
            tokio::select! {
                biased;
                _ = self.cancellation.cancelled() => Err(self.cancelled_error()),
                res = fut => res,
            }
        };

        match self.deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, guarded).await {
                Ok(res) => res,
                Err(_) => Err(self.timeout_error()),
            },
            None => guarded.await,
        }
    }

    fn cancelled_error(&self) -> AppError {
        AppError::cancelled(format!("Request {} was cancelled", self.request_id))
    }

    fn timeout_error(&self) -> AppError {
        AppError::timeout(format!("Request {} exceeded its deadline", self.request_id))
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
