use std::{
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{CacheEntry, CacheStore, NetworkError, Result};

/// Persistent cache keeping one file per key under a directory.
///
/// Each file starts with a single JSON metadata line followed by the raw
/// response bytes. Writes land in a temporary file first and are renamed into
/// place, so readers never observe a partially written entry.
#[derive(Clone, Debug)]
pub struct FileCacheStore {
    root: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryHeader {
    key: String,
    #[serde(default)]
    expires_at_ms: Option<u64>,
}

impl FileCacheStore {
    /// Opens (creating if needed) a cache rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|err| io_error("create cache directory", &root, err))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{:016x}.entry", fnv1a(key.as_bytes())))
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let path = self.entry_path(key);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error("read cache entry", &path, err)),
        };

        let split = raw
            .iter()
            .position(|byte| *byte == b'\n')
            .ok_or_else(|| NetworkError::Cache(format!("{}: missing header", path.display())))?;
        let header: EntryHeader = serde_json::from_slice(&raw[..split]).map_err(|err| {
            NetworkError::Cache(format!("{}: invalid header: {err}", path.display()))
        })?;

        // Two keys hashing to the same file.
        if header.key != key {
            return Ok(None);
        }

        let expires_at = header
            .expires_at_ms
            .map(|ms| UNIX_EPOCH + Duration::from_millis(ms));
        let data = Bytes::copy_from_slice(&raw[split + 1..]);

        Ok(Some(CacheEntry { data, expires_at }))
    }

    async fn save(&self, key: &str, entry: CacheEntry) -> Result<()> {
        let header = EntryHeader {
            key: key.to_owned(),
            expires_at_ms: entry.expires_at.map(unix_millis),
        };
        let mut raw = serde_json::to_vec(&header)
            .map_err(|err| NetworkError::Cache(format!("encode header: {err}")))?;
        raw.push(b'\n');
        raw.extend_from_slice(&entry.data);

        let path = self.entry_path(key);
        let tmp = path.with_extension(format!("tmp{}", rand::random::<u32>()));
        tokio::fs::write(&tmp, &raw)
            .await
            .map_err(|err| io_error("write cache entry", &tmp, err))?;
        if let Err(err) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_error("commit cache entry", &path, err));
        }
        Ok(())
    }
}

fn unix_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis().min(u64::MAX as u128) as u64)
        .unwrap_or(0)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;

    bytes.iter().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> NetworkError {
    NetworkError::Cache(format!("{action} {}: {err}", path.display()))
}
