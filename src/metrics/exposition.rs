//! Prometheus text exposition format (version 0.0.4)

use super::instruments::{Gauge, Summary};
use super::MetricSet;
use std::fmt::Write;

/// Content type of the rendered body
pub const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render every instrument of the set
pub fn encode(metrics: &MetricSet) -> String {
    let mut out = String::new();
    write_summary(&mut out, metrics.latency());
    write_gauge(&mut out, metrics.upload_speed());
    write_gauge(&mut out, metrics.download_speed());
    out
}

fn write_header(out: &mut String, name: &str, help: &str, kind: &str) {
    let _ = writeln!(out, "# HELP {} {}", name, escape_help(help));
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
}

fn write_summary(out: &mut String, summary: &Summary) {
    let name = summary.name();
    let snapshot = summary.snapshot();

    write_header(out, name, summary.help(), "summary");
    for (quantile, value) in &snapshot.quantiles {
        let _ = writeln!(
            out,
            "{}{{quantile=\"{}\"}} {}",
            name,
            format_f64(*quantile),
            format_f64(*value)
        );
    }
    let _ = writeln!(out, "{}_sum {}", name, format_f64(snapshot.sum));
    let _ = writeln!(out, "{}_count {}", name, snapshot.count);
}

fn write_gauge(out: &mut String, gauge: &Gauge) {
    write_header(out, gauge.name(), gauge.help(), "gauge");
    let _ = writeln!(out, "{} {}", gauge.name(), format_f64(gauge.get()));
}

/// Sample value in the spelling the text format expects
pub fn format_f64(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        format!("{}", value)
    }
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}
