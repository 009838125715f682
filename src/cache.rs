//! On-disk cache of finished assessments.
//!
//! Entries are keyed by a SHA-256 over the raw input bytes, the table format
//! they are parsed as and the scoring configuration fingerprint, so any
//! change to one of them produces a miss. The
//! directory is bounded to `max_entries` files; the oldest are evicted first.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::config::CacheConfig;
use crate::models::Assessment;
use crate::table::TableFormat;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(input: &[u8], format: TableFormat, fingerprint: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(input);
        hasher.update(format!("|format:{format}").as_bytes());
        hasher.update(b"|config:");
        hasher.update(fingerprint.as_bytes());
        CacheKey(format!("{:x}", hasher.finalize()))
    }

    pub fn to_filename(&self) -> String {
        format!("{}.json", self.0)
    }
}

pub struct AssessmentCache {
    dir: PathBuf,
    max_entries: usize,
}

impl AssessmentCache {
    pub fn new(dir: PathBuf, max_entries: usize) -> Result<Self> {
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;
        }
        Ok(AssessmentCache { dir, max_entries })
    }

    /// Open the cache described by `config`, or `None` when caching is off
    /// or no cache directory can be determined.
    pub fn from_config(config: &CacheConfig) -> Result<Option<Self>> {
        if !config.enabled || config.max_entries == 0 {
            return Ok(None);
        }
        let dir = match &config.dir {
            Some(dir) => dir.clone(),
            None => match dirs::cache_dir() {
                Some(base) => base.join("scc-risk"),
                None => return Ok(None),
            },
        };
        Self::new(dir, config.max_entries).map(Some)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cached assessment for `key`. Unreadable or corrupt entries are misses.
    pub fn get(&self, key: &CacheKey) -> Option<Assessment> {
        let path = self.dir.join(key.to_filename());
        let data = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&data) {
            Ok(assessment) => {
                tracing::debug!(path = %path.display(), "cache hit");
                Some(assessment)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "discarding corrupt cache entry");
                let _ = fs::remove_file(&path);
                None
            }
        }
    }

    pub fn insert(&self, key: &CacheKey, assessment: &Assessment) -> Result<()> {
        let path = self.dir.join(key.to_filename());
        let data = serde_json::to_string(assessment)?;
        fs::write(&path, data)
            .with_context(|| format!("Failed to write cache entry {}", path.display()))?;
        self.evict()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> Vec<(PathBuf, SystemTime)> {
        let Ok(read) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        read.flatten()
            .filter(|e| e.path().extension().map(|x| x == "json").unwrap_or(false))
            .map(|e| {
                let modified = e
                    .metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (e.path(), modified)
            })
            .collect()
    }

    /// Drop the oldest entries until at most `max_entries` remain.
    fn evict(&self) -> Result<()> {
        let mut entries = self.entries();
        if entries.len() <= self.max_entries {
            return Ok(());
        }
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        let excess = entries.len() - self.max_entries;
        for (path, _) in entries.into_iter().take(excess) {
            tracing::debug!(path = %path.display(), "evicting cache entry");
            fs::remove_file(&path)
                .with_context(|| format!("Failed to evict cache entry {}", path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NormalizationReport, ScoringScheme};
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    fn sample(source: &str) -> Assessment {
        Assessment::empty(source, ScoringScheme::Weighted, NormalizationReport::default())
    }

    #[test]
    fn test_key_changes_with_input_format_and_config() {
        let base = CacheKey::new(b"a,b\n1,2\n", TableFormat::Csv, "{}");
        assert_eq!(base, CacheKey::new(b"a,b\n1,2\n", TableFormat::Csv, "{}"));
        assert_ne!(base, CacheKey::new(b"a,b\n1,3\n", TableFormat::Csv, "{}"));
        assert_ne!(base, CacheKey::new(b"a,b\n1,2\n", TableFormat::Csv, "{\"top_n\":5}"));
        assert_ne!(base, CacheKey::new(b"a,b\n1,2\n", TableFormat::Json, "{}"));
        assert_eq!(base.to_filename().len(), 64 + 5);
    }

    #[test]
    fn test_round_trip_and_miss() {
        let dir = TempDir::new().unwrap();
        let cache = AssessmentCache::new(dir.path().to_path_buf(), 4).unwrap();
        let key = CacheKey::new(b"data", TableFormat::Csv, "cfg");

        assert!(cache.get(&key).is_none());
        cache.insert(&key, &sample("line.csv")).unwrap();
        assert_eq!(cache.get(&key).unwrap().source, "line.csv");
        assert!(cache.get(&CacheKey::new(b"data", TableFormat::Csv, "other")).is_none());
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = AssessmentCache::new(dir.path().to_path_buf(), 4).unwrap();
        let key = CacheKey::new(b"data", TableFormat::Csv, "cfg");
        fs::write(dir.path().join(key.to_filename()), "{not json").unwrap();

        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_eviction_keeps_newest_entries() {
        let dir = TempDir::new().unwrap();
        let cache = AssessmentCache::new(dir.path().to_path_buf(), 3).unwrap();

        let keys: Vec<CacheKey> = (0..5u8)
            .map(|i| CacheKey::new(&[i], TableFormat::Csv, "cfg"))
            .collect();
        for (i, key) in keys.iter().enumerate() {
            cache.insert(key, &sample(&format!("s{i}"))).unwrap();
            // Pin mtimes so eviction order does not depend on clock resolution.
            let file = fs::File::options()
                .write(true)
                .open(dir.path().join(key.to_filename()))
                .unwrap();
            file.set_modified(UNIX_EPOCH + Duration::from_secs(1_000 + i as u64))
                .unwrap();
        }

        assert_eq!(cache.len(), 3);
        assert!(cache.get(&keys[0]).is_none());
        assert!(cache.get(&keys[4]).is_some());
    }

    #[test]
    fn test_disabled_config_yields_no_cache() {
        let config = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(AssessmentCache::from_config(&config).unwrap().is_none());
    }
}
