//! Shared setup for commands that touch the pipeline.

use std::sync::Arc;

use anyhow::Context as _;
use concierge_core::{AppConfig, Clock, SystemClock};
use concierge_db::Stores;
use concierge_sync::{HotelVendor, SeedSettings, Seeder};
use concierge_vendor::VendorClient;

pub(crate) struct Context {
    pub(crate) config: AppConfig,
    pub(crate) stores: Stores,
    pub(crate) clock: Arc<dyn Clock>,
}

impl Context {
    /// Load configuration and connect the stores.
    ///
    /// With `in_memory` no database is needed and `DATABASE_URL` may be unset.
    pub(crate) async fn open(in_memory: bool) -> anyhow::Result<Self> {
        let (config, stores) = if in_memory {
            tracing::info!("using in-memory store; results are not persisted");
            (concierge_core::load_app_config_in_memory()?, Stores::in_memory())
        } else {
            let config = concierge_core::load_app_config()?;
            let pool_config = concierge_db::PoolConfig::from_app_config(&config);
            let pool = concierge_db::connect_pool(&config.database_url, pool_config)
                .await
                .context("failed to connect to database")?;
            (config, Stores::postgres(pool))
        };
        Ok(Self {
            config,
            stores,
            clock: Arc::new(SystemClock),
        })
    }

    pub(crate) fn vendor(&self) -> anyhow::Result<Arc<dyn HotelVendor>> {
        let client = VendorClient::new(&self.config.vendor)
            .map_err(|e| anyhow::anyhow!("failed to build vendor client: {e}"))?;
        let vendor: Arc<dyn HotelVendor> = Arc::new(client);
        Ok(vendor)
    }

    pub(crate) fn seeder(&self) -> anyhow::Result<Seeder> {
        let profile = concierge_core::load_curation(&self.config.curation_path)?;
        Ok(Seeder::new(
            self.vendor()?,
            self.stores.clone(),
            Arc::clone(&self.clock),
            profile,
            SeedSettings::from_app_config(&self.config),
        ))
    }
}
