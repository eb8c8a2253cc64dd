//! HoloStore write exerciser.
//!
//! Connects to a set of seed nodes over RESP, pushes a stream of SETs through
//! [`holo_exec::ExecutionDriver`] with a bounded retry policy and optional
//! speculative execution, and reports per-host attempts and latency.

pub mod config;
pub mod report;
pub mod session;
pub mod workload;

pub use config::BenchConfig;
pub use report::{render_summary, write_summary};
pub use session::{RespSession, WriteStatement};
pub use workload::{drive, run, RunReport};
