// ── Invocation context ──
//
// Everything one CLI invocation needs: where the server is, how to
// authenticate, which entities are visible and where the filter cache
// lives. Built once in `main` and passed to every command handler.
// Sessions are opened per operation and closed before returning.

use std::path::PathBuf;

use hactl_api::{AreaEntry, EventFilter, Session, Subscription};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::FilterCache;
use crate::config::ContextConfig;
use crate::error::CoreError;
use crate::filter::{EntityFilter, FilterMode};

/// Outcome of a [`Context::sync`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Number of exposed entities written.
    pub exposed: usize,
    /// How many of them have a resolved area.
    pub with_area: usize,
    pub cache_dir: PathBuf,
}

/// One entry of the cached entity list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CachedEntity {
    pub entity_id: String,
    pub area_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Context {
    config: ContextConfig,
    cache: FilterCache,
}

impl Context {
    pub fn new(config: ContextConfig) -> Self {
        let cache = FilterCache::new(config.cache_dir.clone());
        Self { config, cache }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn cache(&self) -> &FilterCache {
        &self.cache
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.config.filter_mode
    }

    // ── Connection ───────────────────────────────────────────────────

    /// Open an authenticated session.
    pub async fn connect(&self) -> Result<Session, CoreError> {
        let token = self.config.token.as_ref().ok_or(CoreError::NoCredentials)?;
        Session::connect(&self.config.url, token, self.config.timeout)
            .await
            .map_err(|e| CoreError::from(e).with_url(&self.config.url))
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Resolve the registries on the server and rewrite the filter cache.
    pub async fn sync(&self) -> Result<SyncReport, CoreError> {
        let mut session = self.connect().await?;
        let resolved = session.resolve_registry().await;
        session.close().await;
        let resolved = resolved?;

        let summary = self.cache.write(&resolved)?;
        info!(
            exposed = summary.exposed,
            with_area = summary.with_area,
            "filter cache synced"
        );
        Ok(SyncReport {
            exposed: summary.exposed,
            with_area: summary.with_area,
            cache_dir: self.cache.dir().to_path_buf(),
        })
    }

    /// Subscribe to server events. The returned subscription owns its
    /// own connection and ends when `cancel` fires.
    pub async fn subscribe_events(
        &self,
        filter: EventFilter,
        cancel: CancellationToken,
    ) -> Result<Subscription, CoreError> {
        let session = self.connect().await?;
        Ok(session.subscribe(filter, cancel).await?)
    }

    /// Every area defined on the server.
    pub async fn list_areas(&self) -> Result<Vec<AreaEntry>, CoreError> {
        let mut session = self.connect().await?;
        let areas = session.list_areas().await;
        session.close().await;
        Ok(areas?)
    }

    /// Expose or hide an entity from the voice assistant.
    pub async fn set_exposed(&self, entity_id: &str, exposed: bool) -> Result<(), CoreError> {
        self.require_all_mode(if exposed { "expose" } else { "unexpose" })?;

        let mut session = self.connect().await?;
        let result = session.set_exposed(entity_id, exposed).await;
        session.close().await;
        result?;

        debug!(entity_id, exposed, "entity exposure updated");
        Ok(())
    }

    /// Change the friendly name of an entity.
    pub async fn rename_entity(&self, entity_id: &str, name: &str) -> Result<(), CoreError> {
        self.require_all_mode("rename")?;

        let mut session = self.connect().await?;
        let result = session.rename_entity(entity_id, name).await;
        session.close().await;
        result?;

        debug!(entity_id, name, "entity renamed");
        Ok(())
    }

    /// Admin operations reach entities the filter would hide, so they are
    /// only allowed in `all` mode.
    pub fn require_all_mode(&self, operation: &str) -> Result<(), CoreError> {
        match self.config.filter_mode {
            FilterMode::All => Ok(()),
            mode @ FilterMode::Exposed => Err(CoreError::RequiresAllMode {
                operation: operation.to_owned(),
                mode: mode.to_string(),
            }),
        }
    }

    // ── Cache-only queries ───────────────────────────────────────────

    /// Exposed entities from the last sync, optionally restricted to one
    /// area. Needs no connection; the exposed list is required whatever
    /// the filter mode.
    pub fn cached_entities(&self, area: Option<&str>) -> Result<Vec<CachedEntity>, CoreError> {
        let filter = EntityFilter::load(FilterMode::Exposed, &self.cache)?;
        Ok(filter
            .exposed_ids()
            .filter(|id| area.is_none_or(|query| filter.matches_area(id, query)))
            .map(|id| CachedEntity {
                entity_id: id.to_owned(),
                area_id: filter.area_of(id).map(str::to_owned),
            })
            .collect())
    }
}
