mod context;
mod inspect;
mod search;
mod seed;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::inspect::RunsCommands;
use crate::search::SearchArgs;

#[derive(Debug, Parser)]
#[command(name = "concierge-cli")]
#[command(about = "Vendor sync and curation pipeline")]
struct Cli {
    /// Use the in-process store instead of Postgres (nothing is persisted)
    #[arg(long, global = true)]
    in_memory: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database management
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Seed the curated set from a buffered catalog fetch
    Seed {
        /// Fetch the catalog even if a fresh cached copy exists
        #[arg(long)]
        bypass_cache: bool,
        /// Fetch details for hotels without a hero image
        #[arg(long)]
        enrich: bool,
    },
    /// Seed the curated set by streaming the catalog
    StreamSeed,
    /// Run a search with the nationality sweep
    Search(SearchArgs),
    /// Inspect seed runs
    Runs {
        #[command(subcommand)]
        command: RunsCommands,
    },
    /// Page through the curated set
    Curated {
        #[arg(long, default_value = "20")]
        limit: u32,
        /// Hotel id to continue after
        #[arg(long)]
        cursor: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("concierge-cli: run with --help for commands");
        return Ok(());
    };

    match command {
        Commands::Db { command } => run_db(command).await,
        Commands::Seed {
            bypass_cache,
            enrich,
        } => {
            let ctx = context::Context::open(cli.in_memory).await?;
            seed::run_seed(&ctx, bypass_cache, enrich).await
        }
        Commands::StreamSeed => {
            let ctx = context::Context::open(cli.in_memory).await?;
            seed::run_stream_seed(&ctx).await
        }
        Commands::Search(args) => {
            let ctx = context::Context::open(cli.in_memory).await?;
            search::run_search(&ctx, args).await
        }
        Commands::Runs { command } => {
            let ctx = context::Context::open(cli.in_memory).await?;
            inspect::run_runs(&ctx, command).await
        }
        Commands::Curated { limit, cursor } => {
            let ctx = context::Context::open(cli.in_memory).await?;
            inspect::run_curated(&ctx, limit, cursor.as_deref()).await
        }
    }
}

async fn run_db(command: DbCommands) -> anyhow::Result<()> {
    let config = concierge_core::load_app_config()?;
    let pool_config = concierge_db::PoolConfig::from_app_config(&config);
    let pool = concierge_db::connect_pool(&config.database_url, pool_config).await?;
    match command {
        DbCommands::Ping => {
            concierge_db::health_check(&pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = concierge_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
