//! Run command - fetches a window of events and processes it as one batch.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use colored::Colorize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use iw_actions::CommandSynthesizer;
use iw_connectors::{EventSource, JsonFileEventSource, OpenAiReasoner};
use iw_core::{
    BatchReport, DetectionEngine, Orchestrator, PipelineStore, PromotionPolicy,
    ReasoningCapability,
};
use iw_observability::PipelineMetrics;

use crate::config::AppConfig;
use crate::OutputFormat;

/// Longest look-back window the CLI accepts, about a century.
pub const MAX_HOURS: u32 = 876_000;

/// Run configuration from CLI arguments.
#[derive(Debug, Clone, Copy)]
pub struct RunConfig {
    /// Look-back window in hours.
    pub hours: u32,
}

impl RunConfig {
    /// Start of the look-back window ending at `now`.
    pub fn since(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        now.checked_sub_signed(Duration::hours(i64::from(self.hours)))
            .ok_or_else(|| anyhow!("Look-back window of {} hours is too large", self.hours))
    }
}

/// Wires the pipeline from configuration.
pub fn build_orchestrator(
    config: &AppConfig,
    reasoner: Arc<dyn ReasoningCapability>,
    store: PipelineStore,
) -> Result<Orchestrator> {
    let engine = DetectionEngine::from_config(&config.detection)
        .context("Invalid detection configuration")?;
    let policy = PromotionPolicy::new(config.promotion.threshold)
        .context("Invalid promotion configuration")?;
    let synthesizer = Arc::new(CommandSynthesizer::new(&config.commands.base_url));

    Orchestrator::builder(reasoner, synthesizer, store)
        .with_engine(engine)
        .with_policy(policy)
        .build()
        .context("Failed to build orchestrator")
}

/// Fetches events since `since` and runs them through the pipeline.
pub async fn execute(
    source: &dyn EventSource,
    orchestrator: &Orchestrator,
    since: DateTime<Utc>,
    metrics: &PipelineMetrics,
) -> Result<BatchReport> {
    let events = source
        .fetch(since)
        .await
        .with_context(|| format!("Failed to fetch events from {}", source.name()))?;
    info!(source = source.name(), count = events.len(), %since, "Fetched events");

    let report = orchestrator
        .process_batch(&events)
        .await
        .context("Batch processing failed")?;
    metrics.record_batch(&report);
    Ok(report)
}

/// Entry point for `idp-warden run`.
pub async fn run_pipeline(config: AppConfig, run: RunConfig, format: OutputFormat) -> Result<()> {
    let reasoner = Arc::new(
        OpenAiReasoner::new(config.llm.clone()).context("Failed to create reasoning client")?,
    );
    let store = PipelineStore::jsonl(&config.storage.data_dir);
    let orchestrator = build_orchestrator(&config, reasoner, store)?;
    let source = JsonFileEventSource::new(&config.source.events_path);
    let metrics = PipelineMetrics::new();

    let since = run.since(Utc::now())?;
    let report = execute(&source, &orchestrator, since, &metrics).await?;

    if format == OutputFormat::Json {
        let output = json!({
            "hours": run.hours,
            "report": report,
            "data_dir": config.storage.data_dir,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_summary(&report, run.hours);
    }
    Ok(())
}

fn print_summary(report: &BatchReport, hours: u32) {
    println!("{}", "Batch Summary".bold());
    println!("─────────────");
    println!("  Events:      {}", report.events);
    println!("  Findings:    {}", report.findings);
    println!(
        "  Assessed:    {} ({} failed)",
        report.assessed, report.assessment_failures
    );
    println!("  Incidents:   {}", report.incidents.len());
    println!("  Plans:       {}", report.plans);
    println!("  Commands:    {}", report.commands);

    for failure in &report.incident_failures {
        println!(
            "  {} incident {}: {}",
            "✗".red(),
            failure.incident_id,
            failure.error
        );
    }

    println!();
    println!(
        "{}",
        format!("Done processing events from last {} hour(s).", hours).green()
    );
}
