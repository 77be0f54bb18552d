//! Pipeline metrics for IdP Warden.
//!
//! Counters are emitted through the `metrics` facade so any installed recorder
//! picks them up. In-process totals are kept alongside for the CLI summary.

use iw_core::BatchReport;
use metrics::{counter, describe_counter};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

pub const EVENTS_INGESTED: &str = "iw_events_ingested_total";
pub const FINDINGS: &str = "iw_findings_total";
pub const INCIDENTS_CREATED: &str = "iw_incidents_created_total";
pub const PLANS: &str = "iw_plans_total";
pub const COMMANDS: &str = "iw_commands_total";
pub const ASSESSMENT_FAILURES: &str = "iw_assessment_failures_total";
pub const INCIDENT_FAILURES: &str = "iw_incident_failures_total";

/// Snapshot of the in-process totals.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct PipelineTotals {
    pub events: u64,
    pub findings: u64,
    pub incidents: u64,
    pub plans: u64,
    pub commands: u64,
    pub assessment_failures: u64,
    pub incident_failures: u64,
}

/// Metrics collector for pipeline runs.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    events: AtomicU64,
    findings: AtomicU64,
    incidents: AtomicU64,
    plans: AtomicU64,
    commands: AtomicU64,
    assessment_failures: AtomicU64,
    incident_failures: AtomicU64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::register_metrics();
        Self::default()
    }

    fn register_metrics() {
        describe_counter!(EVENTS_INGESTED, "Total number of identity events ingested");
        describe_counter!(FINDINGS, "Total number of findings detected");
        describe_counter!(INCIDENTS_CREATED, "Total number of incidents created");
        describe_counter!(PLANS, "Total number of response plans persisted");
        describe_counter!(COMMANDS, "Total number of command suggestions persisted");
        describe_counter!(
            ASSESSMENT_FAILURES,
            "Total number of findings whose risk assessment failed"
        );
        describe_counter!(
            INCIDENT_FAILURES,
            "Total number of incidents whose response stage failed"
        );
    }

    /// Records everything a completed batch produced.
    pub fn record_batch(&self, report: &BatchReport) {
        Self::bump(&self.events, EVENTS_INGESTED, report.events);
        Self::bump(&self.findings, FINDINGS, report.findings);
        Self::bump(&self.incidents, INCIDENTS_CREATED, report.incidents.len());
        Self::bump(&self.plans, PLANS, report.plans);
        Self::bump(&self.commands, COMMANDS, report.commands);
        Self::bump(
            &self.assessment_failures,
            ASSESSMENT_FAILURES,
            report.assessment_failures,
        );
        Self::bump(
            &self.incident_failures,
            INCIDENT_FAILURES,
            report.incident_failures.len(),
        );
    }

    fn bump(total: &AtomicU64, name: &'static str, amount: usize) {
        let amount = amount as u64;
        total.fetch_add(amount, Ordering::Relaxed);
        counter!(name).increment(amount);
    }

    pub fn totals(&self) -> PipelineTotals {
        PipelineTotals {
            events: self.events.load(Ordering::Relaxed),
            findings: self.findings.load(Ordering::Relaxed),
            incidents: self.incidents.load(Ordering::Relaxed),
            plans: self.plans.load(Ordering::Relaxed),
            commands: self.commands.load(Ordering::Relaxed),
            assessment_failures: self.assessment_failures.load(Ordering::Relaxed),
            incident_failures: self.incident_failures.load(Ordering::Relaxed),
        }
    }
}
