//! Write workload: many logical SETs pushed through the execution driver.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use holo_exec::{
    ExecutionDriver, FixedBudgetRetry, HostSummary, MetricsObserver, Query, Session,
    SimpleSpeculative,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::time;
use tracing::{debug, info};

use crate::config::BenchConfig;
use crate::session::{RespSession, WriteStatement};

/// Upper bound (exclusive) of the random integer written with every key.
const PAYLOAD_RANGE: u32 = 10_000;

/// Aggregate outcome of one benchmark run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub speculative: bool,
    pub seed: u64,
    pub queries: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub elapsed_ms: u64,
    pub hosts: Vec<HostSummary>,
}

/// Connect to the configured seeds and run the workload.
///
/// A seed connection failure is returned as an error before any write is issued.
pub async fn run(config: &BenchConfig, speculative: bool) -> anyhow::Result<RunReport> {
    let session = RespSession::connect(&config.nodes, config.attempt_timeout)
        .await
        .context("connect to cluster")?;
    drive(Arc::new(session), config, speculative).await
}

/// Run the workload against an already established session.
pub async fn drive<S>(
    session: Arc<S>,
    config: &BenchConfig,
    speculative: bool,
) -> anyhow::Result<RunReport>
where
    S: Session<Statement = WriteStatement>,
{
    let observer = Arc::new(
        MetricsObserver::new(config.verbose).with_error_counts(config.count_errors),
    );
    let driver = ExecutionDriver::new(session, observer.clone())
        .context("build execution driver")?
        .with_retry_policy(Arc::new(FixedBudgetRetry::new(config.retry_max_attempts)))
        .with_speculative_policy(Arc::new(SimpleSpeculative::new(
            config.spec_max_attempts,
            config.spec_delay,
        )))
        .with_attempt_timeout(config.attempt_timeout);
    let driver = Arc::new(driver);

    // Use a random seed when the user provides zero.
    let seed = if config.seed == 0 {
        rand::thread_rng().gen()
    } else {
        config.seed
    };
    info!(
        hosts = driver.hosts().len(),
        cycles = config.cycles,
        clients = config.clients,
        speculative,
        seed,
        "starting write workload"
    );

    let start = time::Instant::now();
    let mut tasks = Vec::with_capacity(config.clients);
    for client_id in 0..config.clients {
        let cycles = client_share(config.cycles, config.clients, client_id);
        let driver = Arc::clone(&driver);
        let key_prefix = config.key_prefix.clone();
        // Mix the base seed with the client id for deterministic per-client RNG.
        let seed = seed ^ (client_id as u64).wrapping_mul(0x9e3779b97f4a7c15);
        tasks.push(tokio::spawn(async move {
            run_client(client_id, driver, cycles, key_prefix, seed, speculative).await
        }));
    }

    let mut succeeded = 0u64;
    let mut failed = 0u64;
    for task in tasks {
        let (ok, err) = task.await.context("client task panicked")?;
        succeeded += ok;
        failed += err;
    }
    let elapsed = start.elapsed();
    info!(
        succeeded,
        failed,
        elapsed_ms = duration_ms(elapsed),
        "write workload finished"
    );

    Ok(RunReport {
        speculative,
        seed,
        queries: succeeded + failed,
        succeeded,
        failed,
        elapsed_ms: duration_ms(elapsed),
        hosts: observer.summary(),
    })
}

/// Issue `cycles` writes sequentially, returning (succeeded, failed).
async fn run_client<S>(
    client_id: usize,
    driver: Arc<ExecutionDriver<S>>,
    cycles: u64,
    key_prefix: String,
    seed: u64,
    speculative: bool,
) -> (u64, u64)
where
    S: Session<Statement = WriteStatement>,
{
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut succeeded = 0u64;
    let mut failed = 0u64;

    for _ in 0..cycles {
        let statement = WriteStatement {
            key: format!("{key_prefix}{:032x}", rng.gen::<u128>()),
            value: rng.gen_range(0..PAYLOAD_RANGE).to_string(),
        };
        let event = driver
            .execute(Query::new(statement).idempotent(speculative))
            .await;
        match &event.outcome {
            Ok(()) => succeeded += 1,
            Err(err) => {
                failed += 1;
                debug!(client = client_id, host = %event.host, error = %err, "write failed");
            }
        }
    }

    (succeeded, failed)
}

/// Cycles assigned to one client; the remainder goes to the lowest ids.
fn client_share(cycles: u64, clients: usize, client_id: usize) -> u64 {
    let clients = clients.max(1) as u64;
    let client_id = client_id as u64;
    cycles / clients + u64::from(client_id < cycles % clients)
}

fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
