//! Environment-driven settings for a benchmark run.
//!
//! The CLI only carries the speculative-execution switch; everything else is
//! tuned through `HOLO_BENCH_*` variables so runs can be scripted without
//! rebuilding.

use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use holo_exec::driver::{
    DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_RETRY_MAX_ATTEMPTS, DEFAULT_SPECULATIVE_DELAY,
    DEFAULT_SPECULATIVE_MAX_ATTEMPTS,
};

/// Runtime configuration for one benchmark process.
#[derive(Clone, Debug)]
pub struct BenchConfig {
    /// Seed hosts of the cluster (`host:port`, RESP).
    pub nodes: Vec<SocketAddr>,
    /// Number of logical write queries to issue.
    pub cycles: u64,
    /// Number of concurrent client tasks sharing the cycles.
    pub clients: usize,
    /// Per-attempt timeout, also used when dialing seeds.
    pub attempt_timeout: Duration,
    /// Total attempts allowed per logical query by the retry policy.
    pub retry_max_attempts: u32,
    /// Maximum parallel attempts per logical query when speculating.
    pub spec_max_attempts: u32,
    /// Delay between speculative launches.
    pub spec_delay: Duration,
    /// Log one line per observed query.
    pub verbose: bool,
    /// Tally failed queries per host next to the latency metrics.
    pub count_errors: bool,
    /// Key namespace for generated writes.
    pub key_prefix: String,
    /// Payload RNG seed (`0` picks a random seed).
    pub seed: u64,
    /// Optional JSON summary destination.
    pub summary_out: Option<PathBuf>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            nodes: vec![SocketAddr::from(([127, 0, 0, 1], 16379))],
            cycles: 10_000,
            clients: 1,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            retry_max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            spec_max_attempts: DEFAULT_SPECULATIVE_MAX_ATTEMPTS,
            spec_delay: DEFAULT_SPECULATIVE_DELAY,
            verbose: false,
            count_errors: false,
            key_prefix: "tweet_".to_string(),
            seed: 0,
            summary_out: None,
        }
    }
}

impl BenchConfig {
    /// Loads configuration from `HOLO_BENCH_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let nodes = match lookup("HOLO_BENCH_NODES") {
            Some(raw) => parse_nodes(&raw)?,
            None => defaults.nodes,
        };
        anyhow::ensure!(!nodes.is_empty(), "HOLO_BENCH_NODES must not be empty");

        let cycles = parse_value(lookup("HOLO_BENCH_CYCLES"), defaults.cycles)?;
        let clients = parse_value(lookup("HOLO_BENCH_CLIENTS"), defaults.clients)?;
        anyhow::ensure!(clients > 0, "HOLO_BENCH_CLIENTS must be > 0");

        let attempt_timeout =
            parse_duration(lookup("HOLO_BENCH_ATTEMPT_TIMEOUT"), defaults.attempt_timeout)?;
        anyhow::ensure!(
            !attempt_timeout.is_zero(),
            "HOLO_BENCH_ATTEMPT_TIMEOUT must be > 0"
        );
        let retry_max_attempts = parse_value(
            lookup("HOLO_BENCH_RETRY_MAX_ATTEMPTS"),
            defaults.retry_max_attempts,
        )?;
        anyhow::ensure!(
            retry_max_attempts > 0,
            "HOLO_BENCH_RETRY_MAX_ATTEMPTS must be > 0"
        );
        let spec_max_attempts = parse_value(
            lookup("HOLO_BENCH_SPEC_MAX_ATTEMPTS"),
            defaults.spec_max_attempts,
        )?;
        anyhow::ensure!(
            spec_max_attempts > 0,
            "HOLO_BENCH_SPEC_MAX_ATTEMPTS must be > 0"
        );
        let spec_delay = parse_duration(lookup("HOLO_BENCH_SPEC_DELAY"), defaults.spec_delay)?;

        Ok(Self {
            nodes,
            cycles,
            clients,
            attempt_timeout,
            retry_max_attempts,
            spec_max_attempts,
            spec_delay,
            verbose: parse_value(lookup("HOLO_BENCH_VERBOSE"), defaults.verbose)?,
            count_errors: parse_value(lookup("HOLO_BENCH_COUNT_ERRORS"), defaults.count_errors)?,
            key_prefix: lookup("HOLO_BENCH_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            seed: parse_value(lookup("HOLO_BENCH_SEED"), defaults.seed)?,
            summary_out: lookup("HOLO_BENCH_SUMMARY_OUT")
                .filter(|raw| !raw.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

/// Parse a comma-separated list of `host:port` addresses.
pub fn parse_nodes(input: &str) -> Result<Vec<SocketAddr>> {
    let mut out = Vec::new();
    for part in input.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
        out.push(
            part.parse::<SocketAddr>()
                .with_context(|| format!("invalid node address {part:?} (expected host:port)"))?,
        );
    }
    Ok(out)
}

/// Parses an optional value with fallback default.
fn parse_value<T>(value: Option<String>, default_value: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|err| anyhow::anyhow!("invalid value {raw:?}: {err}")),
        None => Ok(default_value),
    }
}

/// Parses an optional human-readable duration (`10ms`, `2s`) with fallback default.
fn parse_duration(value: Option<String>, default_value: Duration) -> Result<Duration> {
    match value {
        Some(raw) => humantime::parse_duration(raw.trim())
            .with_context(|| format!("invalid duration value: {raw}")),
        None => Ok(default_value),
    }
}
