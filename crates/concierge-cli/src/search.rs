//! `search` command: one orchestrated vendor search.

use std::sync::Arc;

use chrono::NaiveDate;
use clap::Args;
use concierge_core::RoomRequest;
use concierge_sync::{SearchOrchestrator, SearchParams};

use crate::context::Context;

#[derive(Debug, Args)]
pub(crate) struct SearchArgs {
    /// Hotel id to search (repeatable)
    #[arg(long = "hotel", required = true)]
    pub(crate) hotels: Vec<String>,
    /// Check-in date (YYYY-MM-DD)
    #[arg(long)]
    pub(crate) checkin: NaiveDate,
    /// Check-out date (YYYY-MM-DD)
    #[arg(long)]
    pub(crate) checkout: NaiveDate,
    #[arg(long, default_value = "2")]
    pub(crate) adults: u32,
    /// Age of each child (repeatable)
    #[arg(long = "child-age")]
    pub(crate) child_ages: Vec<u32>,
    /// Guest nationality (ISO 3166-1 alpha-2)
    #[arg(long, default_value = "US")]
    pub(crate) nationality: String,
    /// Try only the requested nationality
    #[arg(long)]
    pub(crate) no_sweep: bool,
}

pub(crate) async fn run_search(ctx: &Context, args: SearchArgs) -> anyhow::Result<()> {
    if args.checkout <= args.checkin {
        anyhow::bail!("checkout must be after checkin");
    }
    let orchestrator = SearchOrchestrator::new(
        ctx.vendor()?,
        Arc::clone(&ctx.stores.search_logs),
        Arc::clone(&ctx.clock),
        ctx.config.search_sweep_enabled,
        ctx.config.search_fallback_nationalities.clone(),
    );
    let children = u32::try_from(args.child_ages.len())?;
    let params = SearchParams {
        hotel_ids: args.hotels,
        checkin: args.checkin,
        checkout: args.checkout,
        rooms: vec![RoomRequest {
            adt: args.adults,
            chd: children,
            age: args.child_ages,
        }],
        nationality: args.nationality,
        timeout_secs: None,
        sweep: args.no_sweep.then_some(false),
    };

    match orchestrator.search(params).await {
        Ok(outcome) => {
            for attempt in &outcome.fallback_tried {
                println!(
                    "  {} -> {} result(s) in {} ms",
                    attempt.nationality_code, attempt.result_count, attempt.elapsed_ms
                );
            }
            println!(
                "{} hotel(s) for nationality {}{}",
                outcome.response.count,
                outcome.used_nationality,
                if outcome.fallback_hit { " (fallback)" } else { "" }
            );
            println!("{}", serde_json::to_string_pretty(&outcome.response)?);
            Ok(())
        }
        Err(e) => {
            for attempt in &e.attempts {
                println!(
                    "  {} -> {}",
                    attempt.nationality_code,
                    attempt.error_code.as_deref().unwrap_or("ok")
                );
            }
            Err(anyhow::anyhow!("search failed ({}): {}", e.code(), e.source))
        }
    }
}
