//! End-of-run summary rendering.

use std::path::Path;

use anyhow::Context;

use crate::workload::RunReport;

/// Plain-text per-host summary printed once the workload finishes.
pub fn render_summary(report: &RunReport) -> String {
    let mut out = String::from("\n==========\n\n");
    for host in &report.hosts {
        out.push_str(&host.to_string());
        out.push('\n');
    }
    out
}

/// Serialize and write the run report as JSON.
pub fn write_summary(path: &Path, report: &RunReport) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        // Ensure the output directory exists before writing.
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create dir {}", parent.display()))?;
    }
    let data = serde_json::to_vec_pretty(report).context("serialize summary")?;
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
