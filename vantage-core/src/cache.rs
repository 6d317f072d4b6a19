//! File-based research cache keyed by (subject, topic).
//!
//! One JSON file per key, written atomically (write to a `.tmp` sibling,
//! then rename) so a crash mid-write never leaves a readable corrupt entry.
//! Expiry is lazy: `lookup` deletes stale entries as it finds them, and
//! `sweep_expired` is offered as a maintenance pass. Every failure path is
//! fail-open: a broken cache degrades to a cache miss, never an error.

use crate::types::ResearchArtifact;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One persisted cache record, exactly as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub competitor: String,
    pub research_focus: String,
    pub cached_at: DateTime<Utc>,
    pub research_data: ResearchArtifact,
}

/// Per-entry summary returned by [`ResearchCache::stats`].
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntryInfo {
    pub competitor: String,
    pub research_focus: String,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_expired: bool,
    pub sources_count: usize,
    pub confidence_score: f64,
}

/// Aggregate cache statistics for observability.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub total_cached: usize,
    pub expired_count: usize,
    /// Entries sorted by `cached_at` descending.
    pub cache_entries: Vec<CacheEntryInfo>,
}

/// Content-addressed, expiry-aware store of research artifacts.
pub struct ResearchCache {
    cache_dir: PathBuf,
    max_age_days: i64,
}

impl ResearchCache {
    /// Create a cache rooted at `cache_dir`. The directory is created on
    /// first write.
    pub fn new(cache_dir: impl Into<PathBuf>, max_age_days: u32) -> Self {
        let cache_dir = cache_dir.into();
        debug!(dir = %cache_dir.display(), max_age_days, "research cache initialized");
        Self {
            cache_dir,
            max_age_days: i64::from(max_age_days),
        }
    }

    /// Derive the deterministic filesystem-safe key for `(subject, topic)`.
    ///
    /// The topic is truncated to 30 characters before normalization; both
    /// parts are stripped to alphanumerics/space/dash/underscore, trailing
    /// whitespace removed, then joined with `_`, spaces replaced by
    /// underscores, and lowercased.
    pub fn derive_key(subject: &str, topic: &str) -> String {
        fn sanitize(input: &str) -> String {
            input
                .chars()
                .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
                .collect::<String>()
                .trim_end()
                .to_string()
        }

        let subject_part = sanitize(subject);
        let topic_part = sanitize(&topic.chars().take(30).collect::<String>());
        format!("{subject_part}_{topic_part}")
            .replace(' ', "_")
            .to_lowercase()
    }

    /// The normalized subject token used for prefix eviction.
    fn subject_prefix(subject: &str) -> String {
        let mut key = Self::derive_key(subject, "");
        // derive_key joins subject and topic with '_'; the empty topic leaves
        // a trailing separator which is exactly the prefix boundary we want.
        if !key.ends_with('_') {
            key.push('_');
        }
        key
    }

    fn entry_path(&self, subject: &str, topic: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.json", Self::derive_key(subject, topic)))
    }

    /// Retrieve a cached artifact if present and not expired.
    ///
    /// Expired entries are deleted as a side effect. Unreadable entries are
    /// treated as absent.
    pub fn lookup(&self, subject: &str, topic: &str) -> Option<ResearchArtifact> {
        let path = self.entry_path(subject, topic);
        if !path.exists() {
            debug!(subject, "no cache entry");
            return None;
        }

        let entry = self.read_entry(&path)?;
        if self.is_expired(entry.cached_at) {
            info!(
                subject,
                cached_at = %entry.cached_at,
                "cache entry expired, evicting"
            );
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "failed to remove expired cache entry");
            }
            return None;
        }

        info!(subject, cached_at = %entry.cached_at, "cache hit");
        Some(entry.research_data)
    }

    /// Store an artifact, overwriting any prior entry for the same key.
    ///
    /// Returns `false` (and logs) on any I/O failure; never panics or errors.
    pub fn store(&self, subject: &str, topic: &str, artifact: &ResearchArtifact) -> bool {
        let entry = CacheEntry {
            competitor: subject.to_string(),
            research_focus: topic.to_string(),
            cached_at: Utc::now(),
            research_data: artifact.clone(),
        };

        let json = match serde_json::to_vec_pretty(&entry) {
            Ok(json) => json,
            Err(e) => {
                warn!(subject, error = %e, "failed to serialize cache entry");
                return false;
            }
        };

        let path = self.entry_path(subject, topic);
        match atomic_write(&path, &json) {
            Ok(()) => {
                info!(subject, path = %path.display(), "cached research data");
                true
            }
            Err(e) => {
                warn!(subject, error = %e, "failed to write cache entry");
                false
            }
        }
    }

    /// Remove entries. With a subject, removes every entry whose key was
    /// derived from that subject; otherwise removes everything. Returns the
    /// number of files deleted.
    pub fn evict(&self, subject: Option<&str>) -> usize {
        let prefix = subject.map(Self::subject_prefix);
        let mut deleted = 0;

        for path in self.entry_files() {
            if let Some(ref prefix) = prefix {
                let matches = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|name| name.starts_with(prefix.as_str()));
                if !matches {
                    continue;
                }
            }
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    deleted += 1;
                    debug!(path = %path.display(), "deleted cache entry");
                }
                Err(e) => warn!(path = %path.display(), error = %e, "failed to delete cache entry"),
            }
        }

        info!(deleted, subject = subject.unwrap_or("<all>"), "cleared cache entries");
        deleted
    }

    /// Scan all entries and delete the expired ones. Returns the count removed.
    pub fn sweep_expired(&self) -> usize {
        let mut deleted = 0;

        for path in self.entry_files() {
            let Some(entry) = self.read_entry(&path) else {
                continue;
            };
            if self.is_expired(entry.cached_at) {
                match std::fs::remove_file(&path) {
                    Ok(()) => {
                        deleted += 1;
                        info!(path = %path.display(), "deleted expired cache entry");
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "failed to delete expired entry")
                    }
                }
            }
        }

        info!(deleted, "swept expired cache entries");
        deleted
    }

    /// Enumerate entries with their expiry status, newest first.
    pub fn stats(&self) -> CacheStats {
        let mut entries = Vec::new();

        for path in self.entry_files() {
            let Some(entry) = self.read_entry(&path) else {
                continue;
            };
            let expires_at = entry.cached_at + Duration::days(self.max_age_days);
            entries.push(CacheEntryInfo {
                competitor: entry.competitor,
                research_focus: entry.research_focus,
                cached_at: entry.cached_at,
                expires_at,
                is_expired: Utc::now() > expires_at,
                sources_count: entry.research_data.sources.len(),
                confidence_score: entry.research_data.confidence_score,
            });
        }

        entries.sort_by(|a, b| b.cached_at.cmp(&a.cached_at));
        CacheStats {
            total_cached: entries.len(),
            expired_count: entries.iter().filter(|e| e.is_expired).count(),
            cache_entries: entries,
        }
    }

    fn is_expired(&self, cached_at: DateTime<Utc>) -> bool {
        Utc::now() > cached_at + Duration::days(self.max_age_days)
    }

    /// Read and parse one entry, fail-open.
    fn read_entry(&self, path: &Path) -> Option<CacheEntry> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read cache entry");
                return None;
            }
        };
        match serde_json::from_str(&data) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse cache entry, treating as absent");
                None
            }
        }
    }

    /// All `.json` files currently in the cache directory.
    fn entry_files(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };
        entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect()
    }
}

/// Whole-file replace write: `.tmp` sibling then rename.
fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ResearchSource, SourceKind};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample_artifact(subject: &str) -> ResearchArtifact {
        ResearchArtifact {
            competitor: subject.to_string(),
            ai_narrative: format!("{subject} narrative"),
            key_initiatives: vec!["initiative one".into(), "initiative two".into()],
            investment_data: None,
            market_positioning: format!("{subject} positioning"),
            sources: vec![ResearchSource {
                url: "https://example.com/report".into(),
                title: "Annual AI report".into(),
                kind: SourceKind::Report,
                publication_date: Utc::now(),
                author: Some("Analyst".into()),
                credibility_score: 0.85,
            }],
            generated_at: Utc::now(),
            confidence_score: 0.8,
        }
    }

    #[test]
    fn test_derive_key_deterministic() {
        let a = ResearchCache::derive_key("Accenture", "AI narrative and strategic initiatives");
        let b = ResearchCache::derive_key("Accenture", "AI narrative and strategic initiatives");
        assert_eq!(a, b);
        // Topic truncated to 30 chars ("AI narrative and strategic ini").
        assert_eq!(a, "accenture_ai_narrative_and_strategic_ini");
    }

    #[test]
    fn test_derive_key_case_and_whitespace_variants() {
        let a = ResearchCache::derive_key("HCLTech", "Cloud Strategy");
        let b = ResearchCache::derive_key("hcltech", "cloud strategy");
        assert_eq!(a, b);
        // Trailing whitespace is stripped before joining.
        let c = ResearchCache::derive_key("HCLTech  ", "Cloud Strategy ");
        assert_eq!(a, c);
    }

    #[test]
    fn test_derive_key_strips_unsafe_characters() {
        let key = ResearchCache::derive_key("A/B: Corp?", "focus!");
        assert_eq!(key, "ab_corp_focus");
    }

    #[test]
    fn test_derive_key_truncates_topic_before_normalization() {
        let long_topic = "a".repeat(80);
        let key = ResearchCache::derive_key("X", &long_topic);
        assert_eq!(key, format!("x_{}", "a".repeat(30)));
    }

    #[test]
    fn test_store_then_lookup_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cache = ResearchCache::new(dir.path(), 60);
        let artifact = sample_artifact("Infosys");

        assert!(cache.store("Infosys", "AI narrative", &artifact));
        let found = cache.lookup("Infosys", "AI narrative").unwrap();
        assert_eq!(found, artifact);
    }

    #[test]
    fn test_lookup_miss() {
        let dir = TempDir::new().unwrap();
        let cache = ResearchCache::new(dir.path(), 60);
        assert!(cache.lookup("Nobody", "anything").is_none());
    }

    #[test]
    fn test_store_overwrites_prior_entry() {
        let dir = TempDir::new().unwrap();
        let cache = ResearchCache::new(dir.path(), 60);

        let first = sample_artifact("Wipro");
        let mut second = sample_artifact("Wipro");
        second.ai_narrative = "updated narrative".into();

        assert!(cache.store("Wipro", "AI", &first));
        assert!(cache.store("Wipro", "AI", &second));

        let found = cache.lookup("Wipro", "AI").unwrap();
        assert_eq!(found.ai_narrative, "updated narrative");
        assert_eq!(cache.stats().total_cached, 1);
    }

    #[test]
    fn test_expired_entry_absent_and_removed() {
        let dir = TempDir::new().unwrap();
        let cache = ResearchCache::new(dir.path(), 60);

        // Write an entry backdated past expiry directly to disk.
        let entry = CacheEntry {
            competitor: "IBM".into(),
            research_focus: "AI".into(),
            cached_at: Utc::now() - Duration::days(61),
            research_data: sample_artifact("IBM"),
        };
        let path = dir
            .path()
            .join(format!("{}.json", ResearchCache::derive_key("IBM", "AI")));
        std::fs::write(&path, serde_json::to_vec_pretty(&entry).unwrap()).unwrap();

        assert!(cache.lookup("IBM", "AI").is_none());
        assert!(!path.exists(), "expired entry should be deleted on lookup");
    }

    #[test]
    fn test_corrupt_entry_treated_as_absent() {
        let dir = TempDir::new().unwrap();
        let cache = ResearchCache::new(dir.path(), 60);

        let path = dir
            .path()
            .join(format!("{}.json", ResearchCache::derive_key("IBM", "AI")));
        std::fs::write(&path, b"{ not json").unwrap();

        assert!(cache.lookup("IBM", "AI").is_none());
    }

    #[test]
    fn test_evict_by_subject_prefix() {
        let dir = TempDir::new().unwrap();
        let cache = ResearchCache::new(dir.path(), 60);

        cache.store("Accenture", "AI narrative", &sample_artifact("Accenture"));
        cache.store("Accenture", "cloud", &sample_artifact("Accenture"));
        cache.store("Infosys", "AI narrative", &sample_artifact("Infosys"));

        assert_eq!(cache.evict(Some("Accenture")), 2);
        assert!(cache.lookup("Accenture", "AI narrative").is_none());
        assert!(cache.lookup("Infosys", "AI narrative").is_some());
    }

    #[test]
    fn test_evict_all() {
        let dir = TempDir::new().unwrap();
        let cache = ResearchCache::new(dir.path(), 60);

        cache.store("A", "x", &sample_artifact("A"));
        cache.store("B", "x", &sample_artifact("B"));

        assert_eq!(cache.evict(None), 2);
        assert_eq!(cache.stats().total_cached, 0);
    }

    #[test]
    fn test_sweep_expired() {
        let dir = TempDir::new().unwrap();
        let cache = ResearchCache::new(dir.path(), 30);

        cache.store("Fresh", "x", &sample_artifact("Fresh"));

        let stale = CacheEntry {
            competitor: "Stale".into(),
            research_focus: "x".into(),
            cached_at: Utc::now() - Duration::days(31),
            research_data: sample_artifact("Stale"),
        };
        let path = dir
            .path()
            .join(format!("{}.json", ResearchCache::derive_key("Stale", "x")));
        std::fs::write(&path, serde_json::to_vec_pretty(&stale).unwrap()).unwrap();

        assert_eq!(cache.sweep_expired(), 1);
        assert!(cache.lookup("Fresh", "x").is_some());
    }

    #[test]
    fn test_stats_sorted_newest_first() {
        let dir = TempDir::new().unwrap();
        let cache = ResearchCache::new(dir.path(), 60);

        let older = CacheEntry {
            competitor: "Older".into(),
            research_focus: "x".into(),
            cached_at: Utc::now() - Duration::days(5),
            research_data: sample_artifact("Older"),
        };
        let path = dir
            .path()
            .join(format!("{}.json", ResearchCache::derive_key("Older", "x")));
        std::fs::write(&path, serde_json::to_vec_pretty(&older).unwrap()).unwrap();

        cache.store("Newer", "x", &sample_artifact("Newer"));

        let stats = cache.stats();
        assert_eq!(stats.total_cached, 2);
        assert_eq!(stats.expired_count, 0);
        assert_eq!(stats.cache_entries[0].competitor, "Newer");
        assert_eq!(stats.cache_entries[1].competitor, "Older");
    }

    #[test]
    fn test_atomic_write_leaves_no_tmp() {
        let dir = TempDir::new().unwrap();
        let cache = ResearchCache::new(dir.path(), 60);
        cache.store("Clean", "x", &sample_artifact("Clean"));

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
