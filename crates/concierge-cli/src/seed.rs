//! Seeding command handlers.
//!
//! Failures are recorded on the seed run by the seeder; here they are also
//! returned so the process exits non-zero.

use concierge_sync::{SeedMode, SeedOptions, SeedReport};

use crate::context::Context;

pub(crate) async fn run_seed(ctx: &Context, bypass_cache: bool, enrich: bool) -> anyhow::Result<()> {
    let seeder = ctx.seeder()?;
    let report = seeder
        .seed(SeedMode::Buffered(SeedOptions {
            bypass_cache,
            enrich_details: enrich,
        }))
        .await?;
    print_report(&report);
    Ok(())
}

pub(crate) async fn run_stream_seed(ctx: &Context) -> anyhow::Result<()> {
    let seeder = ctx.seeder()?;
    let report = seeder.seed(SeedMode::Streaming).await?;
    print_report(&report);
    if report.aborted_early {
        println!("note: stream ended early (cap or time limit); partial results were kept");
    }
    Ok(())
}

fn print_report(report: &SeedReport) {
    println!(
        "run {}: seeded {} ({} inserted, {} updated, {} enriched)",
        report.run_id, report.seeded, report.inserted, report.updated, report.enriched
    );
    for (group, count) in &report.per_group_counts {
        println!("  {group:<24} {count}");
    }
}
