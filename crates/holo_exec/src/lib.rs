//! Client-side execution core for HoloStore write exercisers.
//!
//! Higher layers supply a [`Session`] that knows how to run one attempt of a
//! statement against one host. [`ExecutionDriver`] turns every logical query
//! into one or more attempts, racing speculative attempts per a
//! [`SpeculativePolicy`] and resending failed ones per a [`RetryPolicy`], and
//! hands exactly one [`ObservedQueryEvent`] per query to a [`QueryObserver`].
//! [`MetricsObserver`] folds those events into per-host attempt and latency
//! aggregates.

pub mod driver;
pub mod error;
pub mod metrics;
pub mod observer;
pub mod retry;
pub mod session;
pub mod speculative;

pub use driver::ExecutionDriver;
pub use error::{AggregationError, AttemptError, ConnectionError, QueryError};
pub use metrics::{HostMetrics, HostSummary};
pub use observer::{MetricsObserver, ObservedQueryEvent, QueryObserver};
pub use retry::{FixedBudgetRetry, NoRetry, RetryDecision, RetryPolicy, RotatingRetry};
pub use session::{HostId, Query, Session};
pub use speculative::{NoSpeculation, SimpleSpeculative, SpeculativeDecision, SpeculativePolicy};
