//! On-disk filter cache.
//!
//! Two artifacts live in the cache directory:
//!
//! | File                    | Content                                   |
//! |-------------------------|-------------------------------------------|
//! | `exposed-entities.json` | JSON array of exposed entity ids          |
//! | `entity-areas.json`     | JSON object mapping entity id to area id  |
//!
//! Both are rewritten as whole-file replacements: the new content goes to
//! a temporary file in the same directory, which is then renamed over the
//! old one. A reader therefore sees either the previous or the new file,
//! never a torn write. Files are owner-only (0600). The cache directory
//! itself is forced to 0700 on every write, as are any missing parents
//! created along the way; parents that already exist are left alone.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use hactl_api::ResolvedRegistry;
use indexmap::IndexSet;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::CoreError;

pub const EXPOSED_FILE: &str = "exposed-entities.json";
pub const AREAS_FILE: &str = "entity-areas.json";

/// What a cache write stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheSummary {
    pub exposed: usize,
    pub with_area: usize,
}

/// Handle on the cache directory. Cheap; does no I/O until used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCache {
    dir: PathBuf,
}

impl FilterCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn exposed_path(&self) -> PathBuf {
        self.dir.join(EXPOSED_FILE)
    }

    pub fn areas_path(&self) -> PathBuf {
        self.dir.join(AREAS_FILE)
    }

    // ── Writer ───────────────────────────────────────────────────────

    /// Replace both cache files with `registry`.
    ///
    /// The exposed list keeps the registry's order. The two files are
    /// replaced one after the other, so a concurrent reader may briefly
    /// pair a new exposed list with the previous area map.
    pub fn write(&self, registry: &ResolvedRegistry) -> Result<CacheSummary, CoreError> {
        ensure_private_dir(&self.dir).map_err(|source| CoreError::CacheWrite {
            path: self.dir.clone(),
            source,
        })?;

        let exposed: Vec<&str> = registry.exposed.iter().map(String::as_str).collect();
        write_json_atomic(&self.exposed_path(), &exposed)?;
        write_json_atomic(&self.areas_path(), &registry.entity_area)?;

        debug!(
            dir = %self.dir.display(),
            exposed = registry.exposed.len(),
            with_area = registry.entity_area.len(),
            "filter cache written"
        );
        Ok(CacheSummary {
            exposed: registry.exposed.len(),
            with_area: registry.entity_area.len(),
        })
    }

    // ── Readers ──────────────────────────────────────────────────────

    /// Load the exposed-id set. Mandatory in `exposed` mode, so both a
    /// missing and an unparsable file are errors.
    pub fn read_exposed(&self) -> Result<IndexSet<String>, CoreError> {
        let path = self.exposed_path();
        let ids: Vec<String> = read_json(&path)?;
        Ok(ids.into_iter().collect())
    }

    /// Load the entity→area map. Optional: `None` when the file is
    /// missing or unreadable, so area lookups degrade to "no match".
    pub fn read_areas(&self) -> Option<BTreeMap<String, String>> {
        let path = self.areas_path();
        match read_json(&path) {
            Ok(map) => Some(map),
            Err(CoreError::CacheMissing { .. }) => {
                debug!(path = %path.display(), "no area cache");
                None
            }
            Err(e) => {
                warn!(error = %e, "ignoring unreadable area cache");
                None
            }
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(CoreError::CacheMissing {
                path: path.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(CoreError::CacheCorrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            });
        }
    };
    serde_json::from_slice(&bytes).map_err(|e| CoreError::CacheCorrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CoreError> {
    let write_err = |source: io::Error| CoreError::CacheWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut body = serde_json::to_vec_pretty(value).map_err(|e| write_err(e.into()))?;
    body.push(b'\n');

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(&body).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(write_err)?;
    }

    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Create `dir` (and missing parents) as 0700 and tighten `dir` itself to
/// 0700 if it already existed with wider permissions.
fn ensure_private_dir(dir: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::{DirBuilderExt, PermissionsExt};

        fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)?;
        let current = fs::metadata(dir)?.permissions().mode() & 0o777;
        if current != 0o700 {
            debug!(dir = %dir.display(), mode = format!("{current:o}"), "tightening cache dir");
            fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
        }
    }
    #[cfg(not(unix))]
    fs::create_dir_all(dir)?;

    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────
