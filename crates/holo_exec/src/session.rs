//! Contract between the execution core and the store client that actually
//! talks to cluster members.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, Serializer};

use crate::error::AttemptError;

/// Opaque, immutable name of one cluster member (the harness uses `host:port`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostId(Arc<str>);

impl HostId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HostId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for HostId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<SocketAddr> for HostId {
    fn from(value: SocketAddr) -> Self {
        Self::new(value.to_string())
    }
}

impl Serialize for HostId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Store client that can run one attempt of a statement against one host.
///
/// Implementations own connections and wire encoding; the driver owns
/// timeouts, retries and speculation.
#[async_trait]
pub trait Session: Send + Sync + 'static {
    type Statement: fmt::Display + Send + Sync + 'static;

    /// Hosts eligible for query plans, in preference order.
    fn hosts(&self) -> Vec<HostId>;

    /// Execute one attempt and return the number of rows produced.
    async fn execute(&self, host: &HostId, statement: &Self::Statement)
        -> Result<u64, AttemptError>;
}

/// One logical query: a statement plus the flags that shape its execution.
#[derive(Debug)]
pub struct Query<T> {
    pub statement: Arc<T>,
    /// Only idempotent queries may run speculative attempts.
    pub idempotent: bool,
}

impl<T> Query<T> {
    pub fn new(statement: T) -> Self {
        Self {
            statement: Arc::new(statement),
            idempotent: false,
        }
    }

    pub fn idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        self
    }
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            statement: Arc::clone(&self.statement),
            idempotent: self.idempotent,
        }
    }
}
