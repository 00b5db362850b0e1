//! Read-only commands: seed runs and the curated set.

use clap::Subcommand;
use concierge_core::SeedRun;
use concierge_sync::CuratedReader;
use uuid::Uuid;

use crate::context::Context;

#[derive(Debug, Subcommand)]
pub(crate) enum RunsCommands {
    /// Most recent runs, newest first
    List {
        #[arg(long, default_value = "10")]
        limit: u32,
    },
    /// One run in full
    Show { run_id: Uuid },
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "\u{2014}".to_string(), |v| v.to_string())
}

pub(crate) async fn run_runs(ctx: &Context, command: RunsCommands) -> anyhow::Result<()> {
    match command {
        RunsCommands::List { limit } => {
            let runs = ctx.stores.runs.list_runs(limit).await?;
            if runs.is_empty() {
                println!("no seed runs recorded");
            }
            for run in &runs {
                println!("{}", summary_line(run));
            }
        }
        RunsCommands::Show { run_id } => {
            let run = ctx
                .stores
                .runs
                .get_run(run_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("seed run '{run_id}' not found"))?;
            println!("{}", serde_json::to_string_pretty(&run)?);
        }
    }
    Ok(())
}

fn summary_line(run: &SeedRun) -> String {
    format!(
        "{}  {:<9} {:<7} {:<9} seeded={:<5} total={:<7} error={}",
        run.run_id,
        run.mode,
        run.status,
        run.stage,
        run.seeded_count,
        or_dash(run.total),
        or_dash(run.last_error.as_ref().map(|e| e.code.clone())),
    )
}

pub(crate) async fn run_curated(
    ctx: &Context,
    limit: u32,
    cursor: Option<&str>,
) -> anyhow::Result<()> {
    let page = CuratedReader::new(ctx.stores.clone())
        .list(limit, cursor)
        .await?;
    for hotel in &page.hotels {
        println!(
            "{:<16} {:<40} {:<20} {}",
            hotel.hotel_id,
            hotel.name,
            or_dash(hotel.city.as_deref()),
            or_dash(hotel.country.as_deref()),
        );
    }
    if page.seeding {
        println!("seeding in progress (stage: {})", or_dash(page.stage));
    }
    if let Some(next) = page.next_cursor {
        println!("next cursor: {next}");
    }
    Ok(())
}
