//! Finished conversions kept for download.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::conversion::ConversionResult;

/// Default file name for a GIF created at `at`: `converted-YYYYMMDD-HHMMSS.gif`.
pub fn download_name(at: DateTime<Utc>) -> String {
    format!("converted-{}.gif", at.format("%Y%m%d-%H%M%S"))
}

/// A converted GIF held in memory.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub id: Uuid,
    pub bytes: Bytes,
    pub mime_type: &'static str,
    pub created_at: DateTime<Utc>,
    pub download_name: String,
}

impl Artifact {
    pub fn from_result(result: ConversionResult) -> Self {
        let created_at = Utc::now();
        Self {
            id: Uuid::new_v4(),
            bytes: result.bytes,
            mime_type: result.mime_type,
            created_at,
            download_name: download_name(created_at),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            id: self.id,
            size: self.size(),
            mime_type: self.mime_type,
            download_name: self.download_name.clone(),
            created_at: self.created_at,
            url: format!("/api/conversions/{}", self.id),
        }
    }
}

/// JSON description of an [`Artifact`].
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactSummary {
    pub id: Uuid,
    pub size: u64,
    pub mime_type: &'static str,
    pub download_name: String,
    pub created_at: DateTime<Utc>,
    pub url: String,
}

struct Entry {
    seq: u64,
    artifact: Artifact,
}

/// Bounded concurrent store of artifacts. The oldest entry is evicted when
/// the store is full.
pub struct ArtifactStore {
    entries: DashMap<Uuid, Entry>,
    capacity: usize,
    next_seq: AtomicU64,
}

impl std::fmt::Debug for ArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStore")
            .field("len", &self.entries.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl ArtifactStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Store an artifact, evicting the oldest ones beyond capacity.
    pub fn insert(&self, artifact: Artifact) {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.entries.insert(artifact.id, Entry { seq, artifact });

        while self.entries.len() > self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().seq)
                .map(|entry| *entry.key());
            match oldest {
                Some(id) => {
                    self.entries.remove(&id);
                    tracing::debug!("Evicted artifact {}", id);
                }
                None => break,
            }
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<Artifact> {
        self.entries.get(id).map(|entry| entry.artifact.clone())
    }

    pub fn remove(&self, id: &Uuid) -> Option<Artifact> {
        self.entries.remove(id).map(|(_, entry)| entry.artifact)
    }

    /// Summaries of all artifacts, newest first.
    pub fn list(&self) -> Vec<ArtifactSummary> {
        let mut entries: Vec<(u64, ArtifactSummary)> = self
            .entries
            .iter()
            .map(|entry| (entry.seq, entry.artifact.summary()))
            .collect();
        entries.sort_by(|a, b| b.0.cmp(&a.0));
        entries.into_iter().map(|(_, summary)| summary).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn artifact(body: &'static [u8]) -> Artifact {
        Artifact::from_result(ConversionResult {
            bytes: Bytes::from_static(body),
            mime_type: "image/gif",
        })
    }

    fn is_download_name(name: &str) -> bool {
        let Some(stamp) = name
            .strip_prefix("converted-")
            .and_then(|rest| rest.strip_suffix(".gif"))
        else {
            return false;
        };
        let (date, time) = match stamp.split_once('-') {
            Some(parts) => parts,
            None => return false,
        };
        date.len() == 8
            && time.len() == 6
            && date.chars().all(|c| c.is_ascii_digit())
            && time.chars().all(|c| c.is_ascii_digit())
    }

    #[test]
    fn test_download_name_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(download_name(at), "converted-20240307-090502.gif");
        assert!(is_download_name(&artifact(b"GIF89a").download_name));
    }

    #[test]
    fn test_insert_and_get() {
        let store = ArtifactStore::new(4);
        let a = artifact(b"GIF89a-1");
        let id = a.id;
        store.insert(a);

        let fetched = store.get(&id).unwrap();
        assert_eq!(&fetched.bytes[..], b"GIF89a-1");
        assert_eq!(fetched.summary().url, format!("/api/conversions/{id}"));
    }

    #[test]
    fn test_oldest_evicted_first() {
        let store = ArtifactStore::new(2);
        let first = artifact(b"1");
        let second = artifact(b"2");
        let third = artifact(b"3");
        let (id1, id2, id3) = (first.id, second.id, third.id);

        store.insert(first);
        store.insert(second);
        store.insert(third);

        assert_eq!(store.len(), 2);
        assert!(store.get(&id1).is_none());
        assert!(store.get(&id2).is_some());
        assert!(store.get(&id3).is_some());
    }

    #[test]
    fn test_remove() {
        let store = ArtifactStore::new(2);
        let a = artifact(b"1");
        let id = a.id;
        store.insert(a);

        assert!(store.remove(&id).is_some());
        assert!(store.remove(&id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_list_newest_first() {
        let store = ArtifactStore::new(4);
        let older = artifact(b"1");
        let newer = artifact(b"2");
        let ids = [newer.id, older.id];
        store.insert(older);
        store.insert(newer);

        let listed: Vec<Uuid> = store.list().into_iter().map(|s| s.id).collect();
        assert_eq!(listed, ids);
    }
}
