//! Curated-set reads for application callers.

use std::sync::Arc;

use concierge_core::{CuratedHotelRecord, SeedStage};
use concierge_db::Stores;
use serde::Serialize;

use crate::error::SyncError;
use crate::guard::{SeedTrigger, TriggerOutcome};
use crate::seeder::SeedMode;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CuratedPage {
    pub hotels: Vec<CuratedHotelRecord>,
    pub next_cursor: Option<String>,
    /// A seed run is queued or running.
    pub seeding: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<SeedStage>,
}

pub struct CuratedReader {
    stores: Stores,
    trigger: Option<Arc<SeedTrigger>>,
}

impl CuratedReader {
    #[must_use]
    pub fn new(stores: Stores) -> Self {
        Self {
            stores,
            trigger: None,
        }
    }

    /// Start a streaming seed in the background whenever a first page comes
    /// back empty.
    #[must_use]
    pub fn with_trigger(mut self, trigger: Arc<SeedTrigger>) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// One keyset page of the curated set plus the state of any seed run.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Db`] if a store read fails. A failed background
    /// trigger is logged, not returned.
    pub async fn list(&self, limit: u32, cursor: Option<&str>) -> Result<CuratedPage, SyncError> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let cursor = cursor.filter(|c| !c.is_empty());
        let hotels = self.stores.curated.list_hotels(limit, cursor).await?;
        let next_cursor = if hotels.len() == usize::try_from(limit).unwrap_or(usize::MAX) {
            hotels.last().map(|h| h.hotel_id.clone())
        } else {
            None
        };

        let mut stage = self
            .stores
            .runs
            .latest_active_run()
            .await?
            .map(|run| run.stage);

        if hotels.is_empty() && cursor.is_none() && stage.is_none() {
            if let Some(trigger) = &self.trigger {
                match trigger.trigger(SeedMode::Streaming).await {
                    Ok(TriggerOutcome::Started { run_id, .. }) => {
                        tracing::info!(%run_id, "curated set empty; seeding started");
                        stage = Some(SeedStage::Queued);
                    }
                    Ok(TriggerOutcome::Suppressed(reason)) => {
                        tracing::debug!(
                            reason = reason.as_str(),
                            "curated set empty; seed suppressed"
                        );
                    }
                    Err(e) => tracing::warn!(error = %e, "failed to trigger seeding"),
                }
            }
        }

        Ok(CuratedPage {
            hotels,
            next_cursor,
            seeding: stage.is_some(),
            stage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeder::{SeedSettings, Seeder};
    use crate::testing::{catalog_doc, record, t0, ScriptedVendor, StreamScript};
    use concierge_core::{CurationProfile, FixedClock, SeedRun, StreamLimits};
    use concierge_db::{CuratedStore, MemoryStore, RunStore};

    async fn seeded_store(n: usize) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let hotels: Vec<_> = (0..n)
            .map(|i| record(&format!("H{i:02}"), "FR", "Paris"))
            .map(|r| CuratedHotelRecord::from_catalog(r, "test", t0()))
            .collect();
        store.upsert_hotels(&hotels).await.unwrap();
        store
    }

    #[tokio::test]
    async fn pages_with_keyset_cursor() {
        let store = seeded_store(5).await;
        let reader = CuratedReader::new(Stores::from_shared(store));

        let first = reader.list(2, None).await.unwrap();
        assert_eq!(first.hotels.len(), 2);
        assert_eq!(first.next_cursor.as_deref(), Some("H01"));
        assert!(!first.seeding);

        let last = reader.list(2, Some("H03")).await.unwrap();
        assert_eq!(last.hotels.len(), 1);
        assert_eq!(last.hotels[0].hotel_id, "H04");
        assert_eq!(last.next_cursor, None);
    }

    #[tokio::test]
    async fn reports_seeding_stage_of_active_run() {
        let store = seeded_store(1).await;
        let mut run = SeedRun::queued("streaming", t0());
        store.insert_run(&run).await.unwrap();
        run.enter(SeedStage::Streaming, t0());
        store.save_run(&run).await.unwrap();

        let page = CuratedReader::new(Stores::from_shared(store))
            .list(10, None)
            .await
            .unwrap();
        assert!(page.seeding);
        assert_eq!(page.stage, Some(SeedStage::Streaming));
        assert_eq!(page.hotels.len(), 1);
    }

    #[tokio::test]
    async fn empty_set_without_trigger_is_not_an_error() {
        let page = CuratedReader::new(Stores::in_memory())
            .list(0, None)
            .await
            .unwrap();
        assert!(page.hotels.is_empty());
        assert!(!page.seeding);
    }

    #[tokio::test]
    async fn empty_set_triggers_background_seed() {
        let store = Arc::new(MemoryStore::new());
        let stores = Stores::from_shared(store.clone());
        let clock = Arc::new(FixedClock::new(t0()));
        let doc = catalog_doc(&[record("H1", "FR", "Paris")]);
        let seeder = Seeder::new(
            Arc::new(ScriptedVendor::with_stream(StreamScript::Fast(doc))),
            stores.clone(),
            clock,
            CurationProfile {
                allowed_countries: vec!["FR".into()],
                target_cities: vec![],
                min_star_rating: None,
                require_coordinates: false,
                limit_per_group: 5,
                limit_total: 5,
                stream: StreamLimits::default(),
            },
            SeedSettings {
                catalog_ttl_hours: 1,
                details_ttl_hours: 1,
                budget_ms: 60_000,
                hard_timeout_ms: 10_000,
            },
        );
        let trigger = SeedTrigger::new(
            Arc::new(seeder),
            stores.clone(),
            chrono::Duration::minutes(5),
        );
        let reader = CuratedReader::new(stores).with_trigger(Arc::new(trigger));

        let page = reader.list(10, None).await.unwrap();
        assert!(page.hotels.is_empty());
        assert!(page.seeding);

        for _ in 0..200 {
            if store.count_hotels().await.unwrap() == 1 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(store.count_hotels().await.unwrap(), 1);
        assert_eq!(store.list_runs(5).await.unwrap().len(), 1);
    }

    #[test]
    fn page_serializes_camel_case() {
        let page = CuratedPage {
            hotels: vec![],
            next_cursor: Some("H9".into()),
            seeding: true,
            stage: Some(SeedStage::Writing),
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["nextCursor"], "H9");
        assert_eq!(json["stage"], "writing");
    }
}
