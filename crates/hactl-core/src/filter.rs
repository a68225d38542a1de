// ── Entity filter ──
//
// Gates which entities commands may see. In `exposed` mode only the
// entities exposed to the voice assistant pass, as recorded by the last
// `sync`; in `all` mode everything passes. Area lookups come from the
// same cache, are optional, and only answer in `exposed` mode.

use std::collections::BTreeMap;

use hactl_api::ResolvedRegistry;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::debug;

use crate::cache::FilterCache;
use crate::error::CoreError;

/// Which entities are visible.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FilterMode {
    /// Only voice-assistant-exposed entities (needs a synced cache).
    #[default]
    Exposed,
    /// Every entity; the exposed cache is never consulted.
    All,
}

/// Loaded filter state for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityFilter {
    mode: FilterMode,
    /// `None` in `all` mode.
    exposed: Option<IndexSet<String>>,
    /// Always empty in `all` mode.
    areas: BTreeMap<String, String>,
}

impl EntityFilter {
    /// Load the filter from the on-disk cache.
    ///
    /// In `exposed` mode a missing or unparsable exposed list is an error
    /// (the user has to run `sync`) and the area map is optional. In `all`
    /// mode neither file is read and area queries never match.
    pub fn load(mode: FilterMode, cache: &FilterCache) -> Result<Self, CoreError> {
        let (exposed, areas) = match mode {
            FilterMode::All => (None, BTreeMap::new()),
            FilterMode::Exposed => (
                Some(cache.read_exposed()?),
                cache.read_areas().unwrap_or_default(),
            ),
        };
        debug!(
            %mode,
            exposed = exposed.as_ref().map(IndexSet::len),
            areas = areas.len(),
            "entity filter loaded"
        );
        Ok(Self {
            mode,
            exposed,
            areas,
        })
    }

    /// Build the filter straight from a freshly resolved registry.
    pub fn from_resolved(mode: FilterMode, registry: &ResolvedRegistry) -> Self {
        let (exposed, areas) = match mode {
            FilterMode::All => (None, BTreeMap::new()),
            FilterMode::Exposed => (
                Some(registry.exposed.clone()),
                registry.entity_area.clone(),
            ),
        };
        Self {
            mode,
            exposed,
            areas,
        }
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Whether commands may touch `entity_id`.
    pub fn is_allowed(&self, entity_id: &str) -> bool {
        self.exposed
            .as_ref()
            .is_none_or(|exposed| exposed.contains(entity_id))
    }

    /// Resolved area id of `entity_id`, if known. Always `None` in `all`
    /// mode.
    pub fn area_of(&self, entity_id: &str) -> Option<&str> {
        self.areas.get(entity_id).map(String::as_str)
    }

    /// Case-insensitive comparison of the entity's area with `query`.
    /// False when the area is unknown or the query is empty.
    pub fn matches_area(&self, entity_id: &str, query: &str) -> bool {
        if query.is_empty() {
            return false;
        }
        self.area_of(entity_id)
            .is_some_and(|area| area.to_lowercase() == query.to_lowercase())
    }

    /// Keep the allowed items of `items`, in input order.
    pub fn filter<T, F>(&self, items: Vec<T>, key: F) -> Vec<T>
    where
        F: Fn(&T) -> &str,
    {
        items
            .into_iter()
            .filter(|item| self.is_allowed(key(item)))
            .collect()
    }

    /// Allowed entity ids in cache order. Empty in `all` mode, where the
    /// set of entities is not known locally.
    pub fn exposed_ids(&self) -> impl Iterator<Item = &str> {
        self.exposed.iter().flatten().map(String::as_str)
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn registry() -> ResolvedRegistry {
        let mut reg = ResolvedRegistry::default();
        reg.exposed.insert("light.a".into());
        reg.exposed.insert("switch.b".into());
        reg.entity_area.insert("light.a".into(), "Office".into());
        reg
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("ALL".parse::<FilterMode>().unwrap(), FilterMode::All);
        assert_eq!("exposed".parse::<FilterMode>().unwrap(), FilterMode::Exposed);
        assert!("some".parse::<FilterMode>().is_err());
        assert_eq!(FilterMode::All.to_string(), "all");
        assert_eq!(FilterMode::default(), FilterMode::Exposed);
    }

    #[test]
    fn exposed_mode_gates_on_the_exposed_set() {
        let filter = EntityFilter::from_resolved(FilterMode::Exposed, &registry());
        assert!(filter.is_allowed("light.a"));
        assert!(!filter.is_allowed("light.hidden"));
    }

    #[test]
    fn all_mode_allows_everything() {
        let filter = EntityFilter::from_resolved(FilterMode::All, &registry());
        assert!(filter.is_allowed("light.hidden"));
        assert_eq!(filter.exposed_ids().count(), 0);
    }

    #[test]
    fn area_match_is_case_insensitive() {
        let filter = EntityFilter::from_resolved(FilterMode::Exposed, &registry());
        assert!(filter.matches_area("light.a", "office"));
        assert!(filter.matches_area("light.a", "OFFICE"));
        assert!(!filter.matches_area("light.a", "garage"));
        assert!(!filter.matches_area("light.a", ""));
        assert!(!filter.matches_area("switch.b", "office"));
    }

    #[test]
    fn filter_keeps_input_order() {
        let filter = EntityFilter::from_resolved(FilterMode::Exposed, &registry());
        let kept = filter.filter(
            vec!["switch.b", "light.x", "light.a", "switch.b"],
            |s| *s,
        );
        assert_eq!(kept, vec!["switch.b", "light.a", "switch.b"]);
    }

    #[test]
    fn all_mode_never_reads_the_exposed_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = FilterCache::new(tmp.path());
        std::fs::write(cache.exposed_path(), b"garbage").unwrap();

        let filter = EntityFilter::load(FilterMode::All, &cache).unwrap();
        assert!(filter.is_allowed("anything.at_all"));
    }

    #[test]
    fn exposed_mode_requires_the_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = FilterCache::new(tmp.path());
        let err = EntityFilter::load(FilterMode::Exposed, &cache).unwrap_err();
        assert!(matches!(err, CoreError::CacheMissing { .. }));
    }

    #[test]
    fn missing_area_cache_degrades_to_no_match() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = FilterCache::new(tmp.path());
        std::fs::write(cache.exposed_path(), br#"["light.a"]"#).unwrap();

        let filter = EntityFilter::load(FilterMode::Exposed, &cache).unwrap();
        assert!(filter.is_allowed("light.a"));
        assert_eq!(filter.area_of("light.a"), None);
        assert!(!filter.matches_area("light.a", "office"));
    }

    #[test]
    fn all_mode_area_queries_never_match() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = FilterCache::new(tmp.path());
        let mut reg = registry();
        reg.entity_area.insert("light.a".into(), "Garagem".into());
        cache.write(&reg).unwrap();

        let loaded = EntityFilter::load(FilterMode::All, &cache).unwrap();
        let in_memory = EntityFilter::from_resolved(FilterMode::All, &reg);
        for filter in [&loaded, &in_memory] {
            assert_eq!(filter.area_of("light.a"), None);
            assert!(!filter.matches_area("light.a", "Garagem"));
            assert!(!filter.matches_area("light.a", "garagem"));
        }

        let exposed = EntityFilter::load(FilterMode::Exposed, &cache).unwrap();
        assert!(exposed.matches_area("light.a", "garagem"));
    }

    #[test]
    fn loaded_filter_equals_in_memory_filter() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = FilterCache::new(tmp.path());
        cache.write(&registry()).unwrap();

        for mode in [FilterMode::Exposed, FilterMode::All] {
            assert_eq!(
                EntityFilter::load(mode, &cache).unwrap(),
                EntityFilter::from_resolved(mode, &registry())
            );
        }
    }
}
