use anyhow::{Context as _, Result};
use colored::Colorize;
use compaction::types::relative_to;
use compaction::{
    PlanOutcome, RunStats, SkipCategory, SystemTopology, WorkerBudget, plan_directory,
};
use std::path::Path;

use crate::Context;
use crate::classifier::DefaultClassifier;
use crate::cli::PlanArgs;
use crate::config::CompactorConfig;
use crate::policy::SystemDirectoryPolicy;
use crate::progress::PlanProgress;
use crate::ui::{self, format_size};

/// Skipped directories listed before the rest are summarised
const SKIP_LIST_LIMIT: usize = 20;

pub fn run(ctx: &Context, config: &CompactorConfig, args: PlanArgs) -> Result<()> {
    let mut request = config.planner.plan_request();
    request.thorough = args.thorough;
    request.debug_scan_all = args.debug_scan_all;
    request.verbosity = ctx.verbose;
    if let Some(min_savings) = args.min_savings {
        request.min_savings_percent = min_savings;
    }

    let policy = SystemDirectoryPolicy::new(&config.policy);
    let classifier = DefaultClassifier::new(&config.classifier);
    let budget = WorkerBudget::detect(&SystemTopology, args.single_worker);
    log::debug!(
        "Worker budget: {} entropy workers, execution {:?}",
        budget.entropy_workers,
        budget.execution_workers
    );

    let progress = PlanProgress::new(ctx, args.json);
    let outcome = plan_directory(&args.path, &request, &policy, &classifier, &budget, &progress);
    progress.finish();
    let outcome = outcome.with_context(|| format!("Failed to plan {}", args.path.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    if !ctx.quiet {
        print_plan(ctx, &outcome, args.files);
    }
    print_summary(&outcome);
    Ok(())
}

fn print_plan(ctx: &Context, outcome: &PlanOutcome, list_files: bool) {
    let stats = &outcome.stats;
    let base = stats.base_dir.as_deref().unwrap_or(Path::new("."));

    ui::header("Compression Plan");
    ui::kv("Directory", &base.display().to_string());
    ui::kv("Minimum savings", &format!("{:.1}%", stats.min_savings_percent));
    ui::kv("Scanned", &format_size(stats.total_original_size));
    if stats.protected_files > 0 {
        ui::kv(
            "Protected",
            &format!(
                "{} files ({})",
                stats.protected_files,
                format_size(stats.protected_bytes)
            ),
        );
    }

    let stages = outcome.plan.stages();
    if !stages.is_empty() {
        ui::section("Stages");
        for stage in &stages {
            println!(
                "  {:<10} {:>8} files  {:>10}",
                stage.tier.to_string().cyan(),
                stage.files.len(),
                format_size(stage.total_bytes())
            );
            if list_files {
                for file in &stage.files {
                    ui::dim(&relative_to(&file.path, base));
                }
            }
        }
    }

    print_directory_skips(ctx, stats);

    if !stats.errors.is_empty() {
        ui::section("Errors");
        for error in &stats.errors {
            ui::error(error);
        }
    }
    println!();
}

fn print_directory_skips(ctx: &Context, stats: &RunStats) {
    let entropy: Vec<_> = stats.directory_skips_in(SkipCategory::HighEntropy).collect();
    if entropy.is_empty() {
        return;
    }

    ui::section(&format!("Low-savings directories ({})", entropy.len()));
    let limit = if ctx.verbose > 0 { entropy.len() } else { SKIP_LIST_LIMIT };
    for record in entropy.iter().take(limit) {
        println!(
            "  {} {} {}",
            "✗".yellow(),
            record.relative_path,
            record.reason.dimmed()
        );
    }
    if entropy.len() > limit {
        ui::dim(&format!("... and {} more (use -v to list all)", entropy.len() - limit));
    }
}

fn print_summary(outcome: &PlanOutcome) {
    let stats = &outcome.stats;
    if outcome.plan.is_empty() {
        ui::info(&format!(
            "Nothing to compress ({} files skipped)",
            stats.skipped_files
        ));
        return;
    }

    ui::success(&format!(
        "{} files ready to compress ({}), {} skipped",
        outcome.plan.len(),
        format_size(outcome.plan.total_bytes()),
        stats.skipped_files
    ));
    if stats.skip_low_savings_files > 0 {
        ui::warn(&format!(
            "{} files left out for low expected savings",
            stats.skip_low_savings_files
        ));
    }
}
