//! Binary entrypoint for `holo-bench`.

use clap::Parser;
use holo_bench::{render_summary, run, write_summary, BenchConfig};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Write exerciser for HoloStore clusters. Tuning lives in `HOLO_BENCH_*`.
#[derive(Parser, Debug)]
#[command(name = "holo-bench")]
struct Args {
    /// Mark writes idempotent, enabling speculative execution.
    #[arg(long)]
    spec_exec: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("holo_bench=info,holo_exec=info,warn")),
        )
        .init();

    let args = Args::parse();
    let config = BenchConfig::from_env()?;
    let report = match run(&config, args.spec_exec).await {
        Ok(report) => report,
        Err(err) => {
            let detail = format!("{err:#}");
            error!(error = %detail, "benchmark aborted");
            return Err(err);
        }
    };

    print!("{}", render_summary(&report));
    if let Some(path) = &config.summary_out {
        write_summary(path, &report)?;
        eprintln!("wrote summary: {}", path.display());
    }
    Ok(())
}
