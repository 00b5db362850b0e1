mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use concierge_core::{Clock, SystemClock};
use concierge_db::Stores;
use concierge_sync::{
    CuratedReader, HotelVendor, SearchOrchestrator, SeedSettings, SeedTrigger, Seeder,
};
use concierge_vendor::VendorClient;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = concierge_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = concierge_db::PoolConfig::from_app_config(&config);
    let pool = concierge_db::connect_pool(&config.database_url, pool_config).await?;
    concierge_db::run_migrations(&pool).await?;
    let stores = Stores::postgres(pool);

    // Missing vendor credentials stop startup here, not on the first request.
    let vendor: Arc<dyn HotelVendor> = Arc::new(VendorClient::new(&config.vendor)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let profile = concierge_core::load_curation(&config.curation_path)?;

    let seeder = Arc::new(Seeder::new(
        Arc::clone(&vendor),
        stores.clone(),
        Arc::clone(&clock),
        profile,
        SeedSettings::from_app_config(&config),
    ));
    let trigger = Arc::new(SeedTrigger::from_app_config(
        seeder,
        stores.clone(),
        &config,
    ));
    let search = Arc::new(SearchOrchestrator::new(
        vendor,
        Arc::clone(&stores.search_logs),
        clock,
        config.search_sweep_enabled,
        config.search_fallback_nationalities.clone(),
    ));
    let curated = Arc::new(CuratedReader::new(stores.clone()).with_trigger(Arc::clone(&trigger)));

    let _scheduler = scheduler::build_scheduler(Arc::clone(&trigger)).await?;

    let auth = AuthState::from_env(matches!(
        config.env,
        concierge_core::Environment::Development
    ))?;
    let app = build_app(
        AppState {
            stores,
            search,
            curated,
            trigger,
        },
        auth,
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
