//! Show command - reads the record logs back.

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use iw_core::{PipelineStore, RecordLog};

use crate::OutputFormat;

/// Which logs to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShowTarget {
    Findings,
    Incidents,
    Plans,
    Commands,
    All,
}

impl ShowTarget {
    fn includes(self, other: ShowTarget) -> bool {
        self == ShowTarget::All || self == other
    }
}

/// One log read back for display.
#[derive(Debug, Serialize)]
pub struct Section {
    pub title: &'static str,
    pub records: Vec<Value>,
    /// Per-line failures; the rest of the log is still shown.
    pub errors: Vec<String>,
}

async fn load_section<T>(title: &'static str, log: &Arc<dyn RecordLog<T>>) -> Result<Section>
where
    T: Serialize + Send + Sync,
{
    let mut section = Section {
        title,
        records: Vec::new(),
        errors: Vec::new(),
    };
    for record in log.read_all().await? {
        match record {
            Ok(record) => section.records.push(serde_json::to_value(&record)?),
            Err(e) => section.errors.push(e.to_string()),
        }
    }
    Ok(section)
}

/// Loads the requested logs in pipeline order.
pub async fn load_sections(store: &PipelineStore, target: ShowTarget) -> Result<Vec<Section>> {
    let mut sections = Vec::new();
    if target.includes(ShowTarget::Findings) {
        sections.push(load_section("Findings", &store.findings).await?);
    }
    if target.includes(ShowTarget::Incidents) {
        sections.push(load_section("Incidents", &store.incidents).await?);
    }
    if target.includes(ShowTarget::Plans) {
        sections.push(load_section("Plans", &store.plans).await?);
    }
    if target.includes(ShowTarget::Commands) {
        sections.push(load_section("Commands", &store.commands).await?);
    }
    Ok(sections)
}

/// Entry point for `idp-warden show`.
pub async fn show_records(
    store: &PipelineStore,
    target: ShowTarget,
    format: OutputFormat,
) -> Result<()> {
    let sections = load_sections(store, target).await?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&sections)?);
        return Ok(());
    }

    for section in &sections {
        print_section(section)?;
    }
    Ok(())
}

fn print_section(section: &Section) -> Result<()> {
    println!();
    println!("{}", section.title.bold().underline());

    if section.records.is_empty() && section.errors.is_empty() {
        println!(
            "  {}",
            format!("No {} found", section.title.to_lowercase()).yellow()
        );
        return Ok(());
    }

    let singular = section.title.trim_end_matches('s');
    for (index, record) in section.records.iter().enumerate() {
        println!("{}", format!("{} #{}", singular, index + 1).cyan());
        println!("{}", serde_json::to_string_pretty(record)?);
    }
    for error in &section.errors {
        println!("  {} {}", "✗".red(), error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use iw_core::store::FINDINGS_FILE;
    use iw_core::testing::base_time;
    use iw_core::{Finding, FindingKind};

    #[tokio::test]
    async fn test_malformed_lines_are_reported_individually() {
        let dir = tempfile::tempdir().unwrap();
        let store = PipelineStore::jsonl(dir.path());
        let finding = Finding::new(
            FindingKind::FailedLoginBurst,
            "burst",
            vec!["f0".to_string()],
            Some("00u1".to_string()),
            base_time(),
        );
        store.findings.append(&finding).await.unwrap();

        let path = dir.path().join(FINDINGS_FILE);
        let mut contents = std::fs::read_to_string(&path).unwrap();
        contents.push_str("{not json}\n");
        std::fs::write(&path, contents).unwrap();
        store.findings.append(&finding).await.unwrap();

        let sections = load_sections(&store, ShowTarget::Findings).await.unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].records.len(), 2);
        assert_eq!(sections[0].errors.len(), 1);
        assert!(sections[0].errors[0].contains("line 2"));
    }

    #[tokio::test]
    async fn test_all_loads_every_log_in_order() {
        let store = PipelineStore::in_memory();
        let sections = load_sections(&store, ShowTarget::All).await.unwrap();
        let titles: Vec<&str> = sections.iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["Findings", "Incidents", "Plans", "Commands"]);
        assert!(sections.iter().all(|s| s.records.is_empty()));
    }
}
