//! Output formatting for run reports.
//!
//! Supports both human-readable and JSON output formats for
//! integration with scripts and other tools.

use std::fmt::Write;

use swapbench_plan::FetchOutcome;
use swapbench_plan::FleetReport;
use swapbench_plan::InstanceInfo;
use swapbench_plan::InstanceOutcome;
use swapbench_plan::TestCase;

/// Trait for types that can be output in multiple formats.
pub trait Outputable {
    /// Convert to JSON value for structured output.
    fn to_json(&self) -> serde_json::Value;

    /// Convert to human-readable string.
    fn to_human(&self) -> String;
}

/// Print a value in the appropriate format.
pub fn print_output<T: Outputable>(value: &T, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&value.to_json())
                .unwrap_or_else(|e| { format!("{{\"error\": \"failed to serialize: {}\"}}", e) })
        );
    } else {
        println!("{}", value.to_human());
    }
}

/// Result of a single `run` instance.
pub struct InstanceOutput {
    pub case: TestCase,
    pub instance: InstanceInfo,
    pub outcome: InstanceOutcome,
}

impl Outputable for InstanceOutput {
    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "case": self.case.name(),
            "instance": self.instance,
            "outcome": self.outcome,
        })
    }

    fn to_human(&self) -> String {
        let mut out = format!(
            "{} {} (instance {} of {})\n",
            self.case, self.instance.role, self.instance.ordinal, self.instance.instance_count
        );
        write_outcome(&mut out, &self.outcome);
        out.trim_end().to_string()
    }
}

impl Outputable for FleetReport {
    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }))
    }

    fn to_human(&self) -> String {
        let mut out = format!("{} ({} instances)\n", self.case, self.instances.len());
        for instance in &self.instances {
            let _ = writeln!(out, "\n[{} {}]", instance.role, instance.ordinal);
            write_outcome(&mut out, &instance.outcome);
        }
        out.trim_end().to_string()
    }
}

fn write_outcome(out: &mut String, outcome: &InstanceOutcome) {
    match outcome {
        InstanceOutcome::Provider(report) => {
            let _ = writeln!(out, "Address:    {}", report.address);
            let _ = writeln!(out, "Published:  {} blocks", report.published.len());
        }
        InstanceOutcome::Requestor(report) => {
            let _ = writeln!(out, "Provider:   {}", report.provider);
            for record in &report.records {
                let _ = writeln!(out, "  #{:<5} {}  {}", record.index, record.id.short(), describe(&record.outcome));
            }
            let _ = writeln!(out, "Fetched:    {} of {}", report.fetched(), report.records.len());
            if report.missing > 0 {
                let _ = writeln!(out, "Missing:    {}", report.missing);
            }
            let _ = writeln!(out, "Total:      {:.3} ms", report.total.as_secs_f64() * 1000.0);
            if let Some(throughput) = report.throughput_bytes_per_sec() {
                let _ = writeln!(out, "Throughput: {:.1} KiB/s", throughput / 1024.0);
            }
        }
        InstanceOutcome::Rendezvous(report) => {
            let _ = writeln!(out, "Ready:      position {}", report.ready_position);
        }
    }
}

fn describe(outcome: &FetchOutcome) -> String {
    match outcome {
        FetchOutcome::Fetched { latency, size_bytes } => {
            format!("{:>10.3} ms  {} bytes", latency.as_secs_f64() * 1000.0, size_bytes)
        }
        FetchOutcome::Failed { latency, reason } => {
            format!("{:>10.3} ms  FAILED: {}", latency.as_secs_f64() * 1000.0, reason)
        }
        FetchOutcome::TimedOut { after } => format!("timed out after {:?}", after),
        FetchOutcome::Corrupt { latency, actual } => {
            format!("{:>10.3} ms  CORRUPT: received {}", latency.as_secs_f64() * 1000.0, actual.short())
        }
    }
}
