//! NDJSON (newline-delimited JSON) journal adapter.
//!
//! One record per line, appended in write order:
//!
//! ```text
//! {"op":"grant","subject":1,"object":2}
//! {"op":"revoke","subject":1,"object":2}
//! ```
//!
//! Loading replays the file front to back. A final line without its `\n` is
//! a write that was cut short; it is ignored and truncated away. `compact`
//! collapses the history into one `grant` line per live edge via a temp file,
//! rename, and directory fsync.

use crate::StorageAdapter;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use teamvis_core::{PermissionEdge, TeamId, VisResult, VisibilityError};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

/// One journal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum JournalRecord {
    Grant { subject: TeamId, object: TeamId },
    Revoke { subject: TeamId, object: TeamId },
}

impl JournalRecord {
    fn grant(edge: PermissionEdge) -> Self {
        JournalRecord::Grant {
            subject: edge.subject,
            object: edge.object,
        }
    }

    fn revoke(edge: PermissionEdge) -> Self {
        JournalRecord::Revoke {
            subject: edge.subject,
            object: edge.object,
        }
    }
}

/// Append-only file backend.
///
/// ```ignore
/// let adapter = JournalAdapter::new("teamvis.ndjson")?;
/// let store = VisibilityStore::open(Arc::new(adapter)).await?;
/// ```
#[derive(Debug)]
pub struct JournalAdapter {
    path: PathBuf,
    // Serializes appends against compaction.
    write_lock: Mutex<()>,
}

impl JournalAdapter {
    pub fn new(path: impl AsRef<Path>) -> VisResult<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(VisibilityError::InvalidInput(
                "journal path must not be empty".into(),
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn append(&self, record: JournalRecord) -> VisResult<()> {
        let mut line = serde_json::to_vec(&record)
            .map_err(|e| VisibilityError::Internal(format!("encode journal record: {e}")))?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.unavailable("open", e))?;

        let start = self
            .drop_torn_tail(&mut file)
            .await
            .map_err(|e| self.unavailable("repair", e))?;

        if let Err(e) = write_synced(&mut file, &line).await {
            // Leave no partial line behind for the next append to glue onto.
            if let Err(rollback) = file.set_len(start).await {
                tracing::warn!(path = %self.path.display(), error = %rollback, "append rollback failed");
            }
            return Err(self.unavailable("append", e));
        }
        Ok(())
    }

    /// Cuts the file back to its last complete line and returns that length.
    ///
    /// A tail without `\n` is a write that never returned success.
    async fn drop_torn_tail(&self, file: &mut tokio::fs::File) -> io::Result<u64> {
        let len = file.metadata().await?.len();
        if len == 0 {
            return Ok(0);
        }

        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1)).await?;
        file.read_exact(&mut last).await?;
        if last[0] == b'\n' {
            return Ok(len);
        }

        let mut contents = Vec::new();
        file.seek(SeekFrom::Start(0)).await?;
        file.read_to_end(&mut contents).await?;
        let keep = complete_len(&contents) as u64;

        tracing::warn!(
            path = %self.path.display(),
            dropped = len - keep,
            "truncating torn journal tail"
        );
        file.set_len(keep).await?;
        Ok(keep)
    }

    fn unavailable(&self, action: &str, e: io::Error) -> VisibilityError {
        tracing::warn!(path = %self.path.display(), action, error = %e, "journal I/O failed");
        VisibilityError::Unavailable(format!(
            "journal {action} failed for {}: {e}",
            self.path.display()
        ))
    }
}

async fn write_synced(file: &mut tokio::fs::File, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_data().await
}

/// Fsync the directory holding `path` so a rename into it is durable.
#[cfg(unix)]
async fn sync_parent_dir(path: &Path) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    tokio::fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_parent_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Length of the prefix made of whole `\n`-terminated lines.
fn complete_len(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |pos| pos + 1)
}

/// Replays journal text into the live edge set.
///
/// An unterminated final line is skipped; anything else that fails to parse
/// is corruption.
fn replay(contents: &str) -> VisResult<BTreeSet<PermissionEdge>> {
    let complete = &contents[..complete_len(contents.as_bytes())];
    let mut edges = BTreeSet::new();
    for (idx, line) in complete.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: JournalRecord = serde_json::from_str(line)
            .map_err(|e| VisibilityError::Corrupt(format!("journal line {}: {e}", idx + 1)))?;
        match record {
            JournalRecord::Grant { subject, object } => {
                edges.insert(PermissionEdge { subject, object });
            }
            JournalRecord::Revoke { subject, object } => {
                edges.remove(&PermissionEdge { subject, object });
            }
        }
    }
    Ok(edges)
}

#[async_trait]
impl StorageAdapter for JournalAdapter {
    async fn load(&self) -> VisResult<Vec<PermissionEdge>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no journal yet, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.unavailable("read", e)),
        };

        let edges = replay(&contents)?;

        if complete_len(contents.as_bytes()) < contents.len() {
            let _guard = self.write_lock.lock().await;
            let mut file = tokio::fs::OpenOptions::new()
                .read(true)
                .write(true)
                .open(&self.path)
                .await
                .map_err(|e| self.unavailable("open", e))?;
            self.drop_torn_tail(&mut file)
                .await
                .map_err(|e| self.unavailable("repair", e))?;
        }

        tracing::debug!(path = %self.path.display(), edges = edges.len(), "journal replayed");
        Ok(edges.into_iter().collect())
    }

    async fn insert(&self, edge: PermissionEdge) -> VisResult<()> {
        self.append(JournalRecord::grant(edge)).await
    }

    async fn remove(&self, edge: PermissionEdge) -> VisResult<()> {
        self.append(JournalRecord::revoke(edge)).await
    }

    async fn compact(&self, edges: &[PermissionEdge]) -> VisResult<()> {
        let mut buf = Vec::with_capacity(edges.len() * 40);
        for &edge in edges {
            serde_json::to_writer(&mut buf, &JournalRecord::grant(edge))
                .map_err(|e| VisibilityError::Internal(format!("encode journal record: {e}")))?;
            buf.push(b'\n');
        }

        let tmp = self.temp_path();
        let _guard = self.write_lock.lock().await;

        let mut file = tokio::fs::File::create(&tmp)
            .await
            .map_err(|e| self.unavailable("create temp", e))?;
        file.write_all(&buf)
            .await
            .map_err(|e| self.unavailable("write temp", e))?;
        file.flush()
            .await
            .map_err(|e| self.unavailable("write temp", e))?;
        file.sync_all()
            .await
            .map_err(|e| self.unavailable("sync temp", e))?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.unavailable("rename", e))?;
        sync_parent_dir(&self.path)
            .await
            .map_err(|e| self.unavailable("sync dir", e))?;

        tracing::info!(path = %self.path.display(), edges = edges.len(), "journal compacted");
        Ok(())
    }
}
