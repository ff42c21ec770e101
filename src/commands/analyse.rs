use anyhow::{Context as _, Result};
use colored::Colorize;
use compaction::{RunStats, SkipCategory, SystemTopology, WorkerBudget, analyse_directory};
use serde::Serialize;

use crate::Context;
use crate::classifier::DefaultClassifier;
use crate::cli::AnalyseArgs;
use crate::config::CompactorConfig;
use crate::policy::SystemDirectoryPolicy;
use crate::progress::PlanProgress;
use crate::ui::{self, format_savings, format_size, truncate_path};

#[derive(Serialize)]
struct Projection {
    original_bytes: u64,
    compressed_bytes: u64,
    saved_bytes: u64,
    saved_percent: f64,
}

impl Projection {
    fn from_stats(stats: &RunStats) -> Self {
        let original = stats.entropy_projected_original_bytes;
        let compressed = stats.entropy_projected_compressed_bytes.min(original);
        let saved = original - compressed;
        Self {
            original_bytes: original,
            compressed_bytes: compressed,
            saved_bytes: saved,
            saved_percent: if original == 0 {
                0.0
            } else {
                saved as f64 / original as f64 * 100.0
            },
        }
    }
}

#[derive(Serialize)]
struct AnalysisReport<'a> {
    projection: Projection,
    stats: &'a RunStats,
}

pub fn run(ctx: &Context, config: &CompactorConfig, args: AnalyseArgs) -> Result<()> {
    let mut request = config.planner.analyse_request();
    request.verbosity = ctx.verbose;
    if let Some(min_savings) = args.min_savings {
        request.min_savings_percent = min_savings;
    }

    let policy = SystemDirectoryPolicy::new(&config.policy);
    let classifier = DefaultClassifier::new(&config.classifier);
    let budget = WorkerBudget::detect(&SystemTopology, args.single_worker);

    let progress = PlanProgress::new(ctx, args.json);
    let stats = analyse_directory(&args.path, &request, &policy, &classifier, &budget, &progress);
    progress.finish();
    let stats = stats.with_context(|| format!("Failed to analyse {}", args.path.display()))?;

    let projection = Projection::from_stats(&stats);
    if args.json {
        let report = AnalysisReport {
            projection,
            stats: &stats,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(ctx, &stats, &projection);
    Ok(())
}

fn print_report(ctx: &Context, stats: &RunStats, projection: &Projection) {
    if stats.directory_skips_in(SkipCategory::System).any(|r| r.relative_path == ".") {
        ui::warn("Base directory is excluded, nothing to analyse");
        return;
    }

    if !ctx.quiet {
        ui::header("Entropy Analysis");
        ui::kv(
            "Sampled",
            &format!(
                "{} directories, {} below {:.1}%",
                stats.entropy_directories_sampled,
                stats.entropy_directories_below_threshold,
                stats.min_savings_percent
            ),
        );
        ui::kv(
            "Eligible",
            &format_size(projection.original_bytes),
        );

        if stats.entropy_samples.is_empty() {
            ui::dim(&format!(
                "No directory holds at least {} of its own data",
                format_size(stats.entropy_report_threshold_bytes)
            ));
        } else {
            ui::section("Directories");
            println!(
                "  {:<40} {:>10} {:>8} {:>9}",
                "Path".dimmed(),
                "Size".dimmed(),
                "Entropy".dimmed(),
                "Savings".dimmed()
            );
            for sample in &stats.entropy_samples {
                println!(
                    "  {:<40} {:>10} {:>8.2} {:>9}",
                    truncate_path(&sample.relative_path, 40),
                    format_size(sample.total_bytes),
                    sample.average_entropy,
                    format_savings(sample.estimated_savings, stats.min_savings_percent)
                );
            }
        }
        println!();
    }

    if projection.original_bytes == 0 {
        ui::info("No eligible files found");
        return;
    }

    ui::success(&format!(
        "Projected size {} of {} (~{:.1}% saved, {})",
        format_size(projection.compressed_bytes),
        format_size(projection.original_bytes),
        projection.saved_percent,
        format_size(projection.saved_bytes)
    ));
}
