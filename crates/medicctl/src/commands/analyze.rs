//! `medicctl analyze`

use super::Context;
use crate::errors::exit_code_for_severity;
use crate::output;
use anyhow::Result;
use medic_common::performance::PerformanceAnalyzer;

pub async fn run(ctx: &Context, top: Option<usize>) -> Result<i32> {
    let mut config = ctx.config.performance.clone();
    if let Some(top) = top {
        config.top_processes = top;
    }

    let mut analyzer = PerformanceAnalyzer::new(config);
    let report = analyzer.run_analysis().await;

    if ctx.json {
        output::print_json(&report)?;
    } else {
        output::render_performance(&report);
    }
    Ok(exit_code_for_severity(report.bottlenecks.overall_assessment))
}
