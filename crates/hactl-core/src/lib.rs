// hactl-core: Business logic between hactl-api and the CLI.

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod filter;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{CacheSummary, FilterCache};
pub use config::{ContextConfig, DEFAULT_URL};
pub use context::{CachedEntity, Context, SyncReport};
pub use error::CoreError;
pub use filter::{EntityFilter, FilterMode};

// Session-layer types consumers handle directly.
pub use hactl_api::{AreaEntry, EventFilter, HassEvent, ResolvedRegistry, Subscription};
