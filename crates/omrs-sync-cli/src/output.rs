//! Output formatting and reporting

use crate::OutputFormat;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use omrs_sync_core::{
    ProgressInfo, Result, RetiredConcept, SourceCheck, SourceStatus, SyncCounters, SyncError,
};
use serde::Serialize;

/// Everything reported at the end of a `sync` run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    #[serde(flatten)]
    pub counters: SyncCounters,
    pub dry_run: bool,
}

/// Output formatter for different formats
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(|e| {
            SyncError::config_error(format!("Failed to serialize output: {e}"))
        })?;
        println!("{json}");
        Ok(())
    }

    pub fn print_summary(&self, summary: &RunSummary) -> Result<()> {
        match self.format {
            OutputFormat::Json => self.print_json(summary),
            OutputFormat::Human => {
                self.print_summary_human(summary);
                Ok(())
            }
        }
    }

    fn print_summary_human(&self, summary: &RunSummary) {
        let counters = &summary.counters;
        if summary.dry_run {
            println!("{}", "Dry run: no changes were kept".yellow());
        }
        println!("{}", "Summary:".bold());
        println!("  Sources created:        {}", counters.sources_exported);
        println!("  Classes created:        {}", counters.classes_exported);
        println!("  Concepts processed:     {}", counters.concepts_processed);
        println!("  Concepts exported:      {}", counters.concepts_exported);
        if counters.retired_concepts_exported > 0 {
            println!(
                "  Retired concepts:       {}",
                counters.retired_concepts_exported.to_string().yellow()
            );
        }
        println!(
            "  Internal mappings:      {}",
            counters.internal_mappings_exported
        );
        println!(
            "  External mappings:      {}",
            counters.external_mappings_exported
        );
        println!(
            "  Answers created:        {} (for {} questions)",
            counters.answers_exported, counters.questions_exported
        );
        println!(
            "  Set members created:    {} (in {} sets)",
            counters.set_members_exported, counters.concept_sets_exported
        );
        if counters.ignored_self_mappings > 0 {
            println!(
                "  Ignored self-mappings:  {}",
                counters.ignored_self_mappings.to_string().yellow()
            );
        }
        println!("{} Synchronization complete", "✓".green());
    }

    pub fn print_retired(&self, retired: &[RetiredConcept]) -> Result<()> {
        match self.format {
            OutputFormat::Json => self.print_json(retired),
            OutputFormat::Human => {
                if retired.is_empty() {
                    println!("No retired concepts");
                    return Ok(());
                }
                println!("{}", "Retired concepts:".bold());
                for concept in retired {
                    match &concept.name {
                        Some(name) => println!("  {}  {}", concept.id.to_string().cyan(), name),
                        None => println!("  {}", concept.id.to_string().cyan()),
                    }
                }
                println!("\n{} retired concept(s)", retired.len());
                Ok(())
            }
        }
    }

    pub fn print_source_checks(&self, checks: &[SourceCheck]) -> Result<()> {
        match self.format {
            OutputFormat::Json => self.print_json(checks),
            OutputFormat::Human => {
                for check in checks {
                    let status = match check.status {
                        SourceStatus::Found => "found".green(),
                        SourceStatus::Unchecked => "unchecked".yellow(),
                    };
                    println!(
                        "  {} {}/{} ({})",
                        status, check.owner, check.remote_id, check.local_name
                    );
                }
                println!("\n{} source(s) checked", checks.len());
                Ok(())
            }
        }
    }
}

/// Progress bar fed by the synchronizer's progress callback
pub struct SyncProgress {
    bar: ProgressBar,
}

impl SyncProgress {
    pub fn new() -> Self {
        let style = ProgressStyle::with_template("{prefix:10} [{bar:30}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");
        let bar = ProgressBar::new(0);
        bar.set_style(style);
        Self { bar }
    }

    pub fn callback(&self) -> impl Fn(ProgressInfo) + Send + Sync + 'static {
        let bar = self.bar.clone();
        move |info: ProgressInfo| {
            bar.set_prefix(info.phase.to_string());
            bar.set_length(info.total as u64);
            bar.set_position(info.completed as u64);
        }
    }

    pub fn finish(self) {
        self.bar.finish_and_clear();
    }
}
