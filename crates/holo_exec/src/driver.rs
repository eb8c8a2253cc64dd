//! Per-query orchestration of retry and speculative attempts.
//!
//! Each logical query runs its attempts inside one `FuturesUnordered`, racing
//! them against a speculative-launch timer. The first success wins; losing
//! attempts are dropped with the set, so their results can never reach the
//! observer. Dropping an attempt abandons its result but does not guarantee
//! the remote side never applied the write.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::stream::FuturesUnordered;
use futures_util::{FutureExt, StreamExt};
use tokio::time::{self, Instant};
use tracing::debug;

use crate::error::{AttemptError, ConnectionError, QueryError};
use crate::observer::{ObservedQueryEvent, QueryObserver};
use crate::retry::{FixedBudgetRetry, RetryDecision, RetryPolicy};
use crate::session::{HostId, Query, Session};
use crate::speculative::{SimpleSpeculative, SpeculativeDecision, SpeculativePolicy};

/// Default per-attempt timeout; generous enough for a slow replica.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_SPECULATIVE_MAX_ATTEMPTS: u32 = 2;
pub const DEFAULT_SPECULATIVE_DELAY: Duration = Duration::from_millis(10);

/// Outcome of one attempt, tagged with the host it ran against.
struct AttemptReport {
    host: HostId,
    result: Result<u64, AttemptError>,
}

/// Runs logical queries against a [`Session`] and reports each one exactly
/// once to the configured observer.
pub struct ExecutionDriver<S: Session> {
    session: Arc<S>,
    hosts: Arc<[HostId]>,
    retry: Arc<dyn RetryPolicy>,
    speculative: Arc<dyn SpeculativePolicy>,
    observer: Arc<dyn QueryObserver>,
    attempt_timeout: Duration,
    plan_cursor: AtomicUsize,
}

impl<S: Session> ExecutionDriver<S> {
    /// Snapshots the session's hosts; fails when there are none to plan over.
    pub fn new(session: Arc<S>, observer: Arc<dyn QueryObserver>) -> Result<Self, ConnectionError> {
        let hosts: Arc<[HostId]> = session.hosts().into();
        if hosts.is_empty() {
            return Err(ConnectionError::NoHosts);
        }
        Ok(Self {
            session,
            hosts,
            retry: Arc::new(FixedBudgetRetry::new(DEFAULT_RETRY_MAX_ATTEMPTS)),
            speculative: Arc::new(SimpleSpeculative::new(
                DEFAULT_SPECULATIVE_MAX_ATTEMPTS,
                DEFAULT_SPECULATIVE_DELAY,
            )),
            observer,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            plan_cursor: AtomicUsize::new(0),
        })
    }

    pub fn with_retry_policy(mut self, retry: Arc<dyn RetryPolicy>) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_speculative_policy(mut self, speculative: Arc<dyn SpeculativePolicy>) -> Self {
        self.speculative = speculative;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn hosts(&self) -> &[HostId] {
        &self.hosts
    }

    /// Execute one logical query to completion.
    ///
    /// The terminal event is delivered to the observer before being returned.
    pub async fn execute(&self, query: Query<S::Statement>) -> ObservedQueryEvent {
        let started = Instant::now();
        let plan = self.query_plan();
        let mut plan_pos = 0usize;
        let mut in_flight: FuturesUnordered<BoxFuture<'static, AttemptReport>> =
            FuturesUnordered::new();

        in_flight.push(self.launch(plan[plan_pos].clone(), &query));
        let mut launched: u32 = 1;
        let mut speculative_launched: u32 = 0;
        let mut last_launch = Instant::now();
        let mut deadline = self.speculation_deadline(&query, speculative_launched, last_launch);
        let mut retries_exhausted = false;

        loop {
            let wake = deadline.unwrap_or(last_launch);
            tokio::select! {
                // Completed attempts take priority over a timer firing at the same instant.
                biased;

                Some(report) = in_flight.next() => {
                    let err = match report.result {
                        Ok(rows) => {
                            return self.finish(&query, report.host, launched, started, rows, Ok(()));
                        }
                        Err(err) => err,
                    };

                    // Once the budget is spent no further attempts of any kind are launched.
                    let decision = if retries_exhausted {
                        RetryDecision::Stop
                    } else {
                        self.retry.decide(launched)
                    };
                    let next_host = match decision {
                        RetryDecision::Stop => {
                            if !retries_exhausted {
                                debug!(host = %report.host, attempts = launched, error = %err, "retry budget exhausted");
                            }
                            retries_exhausted = true;
                            deadline = None;
                            None
                        }
                        RetryDecision::SameHost => Some(report.host.clone()),
                        RetryDecision::NextHost => {
                            plan_pos += 1;
                            Some(plan[plan_pos % plan.len()].clone())
                        }
                    };

                    if let Some(host) = next_host {
                        debug!(failed = %report.host, host = %host, attempts = launched, error = %err, "retrying attempt");
                        in_flight.push(self.launch(host, &query));
                        launched += 1;
                        last_launch = Instant::now();
                        deadline = self.speculation_deadline(&query, speculative_launched, last_launch);
                    }

                    if in_flight.is_empty() {
                        let failure = QueryError::ExhaustedRetries { attempts: launched, last: err };
                        return self.finish(&query, report.host, launched, started, 0, Err(failure));
                    }
                }
                _ = time::sleep_until(wake), if deadline.is_some() => {
                    plan_pos += 1;
                    let host = plan[plan_pos % plan.len()].clone();
                    debug!(host = %host, attempts = launched, "launching speculative attempt");
                    in_flight.push(self.launch(host, &query));
                    launched += 1;
                    speculative_launched += 1;
                    last_launch = Instant::now();
                    deadline = self.speculation_deadline(&query, speculative_launched, last_launch);
                }
            }
        }
    }

    /// Hosts for one query, rotated so consecutive queries start on different members.
    fn query_plan(&self) -> Vec<HostId> {
        let offset = self.plan_cursor.fetch_add(1, Ordering::Relaxed) % self.hosts.len();
        self.hosts[offset..]
            .iter()
            .chain(self.hosts[..offset].iter())
            .cloned()
            .collect()
    }

    fn speculation_deadline(
        &self,
        query: &Query<S::Statement>,
        speculative_launched: u32,
        last_launch: Instant,
    ) -> Option<Instant> {
        if !query.idempotent {
            return None;
        }
        let now = Instant::now();
        match self
            .speculative
            .decision(speculative_launched, now.saturating_duration_since(last_launch))
        {
            SpeculativeDecision::NoMoreAttempts => None,
            SpeculativeDecision::LaunchNow => Some(now),
            SpeculativeDecision::LaunchAfter(delay) => Some(now + delay),
        }
    }

    fn launch(&self, host: HostId, query: &Query<S::Statement>) -> BoxFuture<'static, AttemptReport> {
        let session = Arc::clone(&self.session);
        let statement = Arc::clone(&query.statement);
        let timeout = self.attempt_timeout;
        async move {
            let result = match time::timeout(timeout, session.execute(&host, &statement)).await {
                Ok(result) => result,
                Err(_) => Err(AttemptError::Timeout {
                    host: host.clone(),
                    timeout,
                }),
            };
            AttemptReport { host, result }
        }
        .boxed()
    }

    fn finish(
        &self,
        query: &Query<S::Statement>,
        host: HostId,
        attempts: u32,
        started: Instant,
        rows: u64,
        outcome: Result<(), QueryError>,
    ) -> ObservedQueryEvent {
        let event = ObservedQueryEvent {
            statement: query.statement.to_string(),
            host,
            attempts,
            latency: started.elapsed(),
            rows,
            outcome,
        };
        self.observer.on_event(&event);
        event
    }
}
