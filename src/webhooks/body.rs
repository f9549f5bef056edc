//! Replayable request bodies
//!
//! Signature verification needs the exact bytes GitHub signed, and the event
//! parser needs the same bytes as JSON. [`ReplayableBody`] drains the transport
//! stream once into an owned buffer and hands that buffer to every consumer.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use futures::StreamExt;
use thiserror::Error;
use tokio::sync::OnceCell;

/// Default upper bound for a buffered webhook body (5 MiB)
pub const DEFAULT_BODY_LIMIT: usize = 5 * 1024 * 1024;

/// Errors raised while buffering a request body
#[derive(Debug, Error)]
pub enum BodyError {
    /// The body is larger than the configured limit.
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    /// The transport failed while the body was being read.
    #[error("failed to read request body: {0}")]
    Read(String),

    /// A character view was requested but the body is not UTF-8.
    #[error("request body is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The transport stream was taken by an earlier read that failed.
    #[error("request body source already consumed")]
    SourceConsumed,
}

/// A transport stream that can be drained exactly once.
///
/// Taking `self` by value means a source cannot be read twice.
#[async_trait]
pub trait BodySource: Send {
    /// Read the whole stream, failing once more than `limit` bytes arrive.
    async fn drain(self: Box<Self>, limit: usize) -> Result<Bytes, BodyError>;
}

#[async_trait]
impl BodySource for Body {
    async fn drain(self: Box<Self>, limit: usize) -> Result<Bytes, BodyError> {
        let mut stream = (*self).into_data_stream();
        let mut buffer = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| BodyError::Read(e.to_string()))?;
            if buffer.len() + chunk.len() > limit {
                return Err(BodyError::TooLarge { limit });
            }
            buffer.extend_from_slice(&chunk);
        }

        Ok(Bytes::from(buffer))
    }
}

struct Inner {
    source: Mutex<Option<Box<dyn BodySource>>>,
    buffer: OnceCell<Bytes>,
    limit: usize,
}

/// Request body that can be read any number of times.
///
/// The first access drains the underlying [`BodySource`]; later accesses,
/// through any accessor and from any clone, see the same buffered bytes.
#[derive(Clone)]
pub struct ReplayableBody {
    inner: Arc<Inner>,
}

impl ReplayableBody {
    /// Wrap a transport stream. Nothing is read until the first access.
    pub fn new(source: impl BodySource + 'static, limit: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                source: Mutex::new(Some(Box::new(source))),
                buffer: OnceCell::new(),
                limit,
            }),
        }
    }

    /// Build a body whose bytes are already in memory.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            inner: Arc::new(Inner {
                source: Mutex::new(None),
                limit: bytes.len(),
                buffer: OnceCell::new_with(Some(bytes)),
            }),
        }
    }

    /// Whether the transport stream has been drained yet
    pub fn is_buffered(&self) -> bool {
        self.inner.buffer.initialized()
    }

    /// The raw bytes of the body.
    pub async fn bytes(&self) -> Result<Bytes, BodyError> {
        let bytes = self
            .inner
            .buffer
            .get_or_try_init(|| async {
                let source = match self.inner.source.lock() {
                    Ok(mut guard) => guard.take(),
                    Err(poisoned) => poisoned.into_inner().take(),
                };
                let source = source.ok_or(BodyError::SourceConsumed)?;
                source.drain(self.inner.limit).await
            })
            .await?;

        Ok(bytes.clone())
    }

    /// A fresh cursor positioned at the start of the body.
    pub async fn reader(&self) -> Result<Cursor<Bytes>, BodyError> {
        Ok(Cursor::new(self.bytes().await?))
    }

    /// The body decoded as UTF-8.
    pub async fn text(&self) -> Result<String, BodyError> {
        let bytes = self.bytes().await?;
        Ok(std::str::from_utf8(&bytes)?.to_owned())
    }
}

impl std::fmt::Debug for ReplayableBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayableBody")
            .field("buffered", &self.is_buffered())
            .field("len", &self.inner.buffer.get().map(Bytes::len))
            .field("limit", &self.inner.limit)
            .finish()
    }
}
