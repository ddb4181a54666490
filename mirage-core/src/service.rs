//! The reasoning service seam.
//!
//! The interpreter never talks to a transport directly. It builds a
//! [`claude::Request`] (system text, role-tagged messages, tools and an
//! optional forced tool choice) and hands it to a [`ReasoningService`].

use async_trait::async_trait;
use claude::{Claude, Request, Response};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by a reasoning service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Claude API error: {0}")]
    Claude(#[from] claude::Error),

    #[error("no scripted reply left for call {call}")]
    Exhausted { call: usize },
}

/// Anything that can turn a request into exactly one reply.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Send one request and wait for the reply.
    async fn complete(&self, request: Request) -> Result<Response, ServiceError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

#[async_trait]
impl ReasoningService for Claude {
    async fn complete(&self, request: Request) -> Result<Response, ServiceError> {
        Ok(Claude::complete(self, request).await?)
    }

    fn name(&self) -> &str {
        self.model()
    }
}

#[async_trait]
impl<T: ReasoningService + ?Sized> ReasoningService for &T {
    async fn complete(&self, request: Request) -> Result<Response, ServiceError> {
        (**self).complete(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<T: ReasoningService + ?Sized> ReasoningService for Arc<T> {
    async fn complete(&self, request: Request) -> Result<Response, ServiceError> {
        (**self).complete(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<T: ReasoningService + ?Sized> ReasoningService for Box<T> {
    async fn complete(&self, request: Request) -> Result<Response, ServiceError> {
        (**self).complete(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
