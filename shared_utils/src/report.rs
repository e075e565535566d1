//! Report Module
//!
//! End-of-batch summary for humans.

use crate::batch::BatchResult;
use crate::progress::{format_bytes, format_duration};
use console::style;
use std::fmt;
use std::time::Duration;

fn line(out: &mut String, text: fmt::Arguments<'_>) {
    out.push_str(&text.to_string());
    out.push('\n');
}

/// Renders the summary box and the failure list.
pub fn render_summary_report(
    result: &BatchResult,
    duration: Duration,
    operation_name: &str,
) -> String {
    let reduction = if result.input_bytes > 0 {
        (1.0 - result.output_bytes as f64 / result.input_bytes as f64) * 100.0
    } else {
        0.0
    };

    let rule = "═".repeat(60);
    let mut out = String::from("\n");
    line(&mut out, format_args!("╔{}╗", rule));
    line(&mut out, format_args!("  📊 {} Summary", style(operation_name).bold()));
    line(&mut out, format_args!("╠{}╣", rule));
    line(&mut out, format_args!("  📁 Files Processed:  {:>10}", result.total));
    line(&mut out, format_args!("  🔄 Converted:        {:>10}", style(result.converted).green()));
    line(&mut out, format_args!("  📋 Copied:           {:>10}", style(result.copied).green()));
    line(&mut out, format_args!("  ⏭️  Skipped:          {:>10}", style(result.skipped).yellow()));
    line(&mut out, format_args!("  ❌ Failed:           {:>10}", style(result.failed).red()));
    line(&mut out, format_args!("  📈 Success Rate:     {:>9.1}%", result.success_rate()));
    line(&mut out, format_args!("╠{}╣", rule));
    line(&mut out, format_args!("  💾 Input Size:       {:>10}", format_bytes(result.input_bytes)));
    line(&mut out, format_args!("  💾 Output Size:      {:>10}", format_bytes(result.output_bytes)));
    line(&mut out, format_args!("  📉 Size Reduction:   {:>9.1}%", reduction));
    line(&mut out, format_args!("  ⏱️  Total Time:       {:>10}", format_duration(duration)));
    line(&mut out, format_args!("╚{}╝", rule));

    if !result.errors.is_empty() {
        out.push('\n');
        line(&mut out, format_args!("{}", style("❌ Errors encountered:").red().bold()));
        for (path, error) in &result.errors {
            line(&mut out, format_args!("   {} → {}", path.display(), error));
        }
    }

    out
}

pub fn print_summary_report(result: &BatchResult, duration: Duration, operation_name: &str) {
    print!("{}", render_summary_report(result, duration, operation_name));
}
