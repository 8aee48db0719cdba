use std::fmt::Write as _;
use std::time::Duration;

use action_flow::{FlowReport, StepStatus};
use anyhow::Result;
use clap::ValueEnum;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

pub fn render_report(report: &FlowReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Human => Ok(human_report(report)),
    }
}

fn human_report(report: &FlowReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Run {}", report.run_id.short());
    for (index, step) in report.steps.iter().enumerate() {
        let marker = match step.outcome.status {
            StepStatus::Success => "ok",
            StepStatus::Skipped => "skip",
            StepStatus::Failure => "FAIL",
        };
        let _ = write!(
            out,
            "  {:>2}. {:<24} {:<4} {:>8}",
            index + 1,
            step.state.as_str(),
            marker,
            humantime::format_duration(round_ms(step.elapsed_ms)).to_string()
        );
        if let Some(message) = &step.outcome.message {
            let _ = write!(out, "  {message}");
        }
        out.push('\n');
        if let Some(snapshot) = &step.outcome.diagnostic {
            let _ = writeln!(out, "      snapshot: {}", snapshot.path().display());
        }
    }
    let _ = writeln!(
        out,
        "Final state: {}{} after {}",
        report.final_state,
        if report.cancelled { " (cancelled)" } else { "" },
        humantime::format_duration(round_ms(report.elapsed_ms))
    );
    let _ = writeln!(
        out,
        "Finished at {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    out
}

/// Whole seconds above ten seconds, milliseconds below.
fn round_ms(ms: u64) -> Duration {
    if ms >= 10_000 {
        Duration::from_secs(ms / 1000)
    } else {
        Duration::from_millis(ms)
    }
}
