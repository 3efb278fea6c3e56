//! The snapshot store contract: an opaque blob store keyed by processor
//! name and position, plus an in-memory and a file-backed (temp + rename)
//! double used by this crate's tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::log::Position;

/// A durable serialization of processor state at a specific position.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub name: String,
    pub position: Position,
    pub blob: Vec<u8>,
}

/// A handle for writing a single snapshot, committed atomically or aborted.
#[async_trait]
pub trait SnapshotWriter: Send {
    /// Write (or overwrite) the full blob content. Returns the size written.
    async fn write(&mut self, bytes: &[u8]) -> anyhow::Result<u64>;

    /// Make the snapshot visible to subsequent `last_snapshot` calls. Consumes
    /// the writer so it cannot be used (or aborted) afterwards.
    async fn commit(self: Box<Self>) -> anyhow::Result<()>;

    /// Discard a partially-written snapshot. Safe to call after a partial `write`.
    async fn abort(self: Box<Self>) -> anyhow::Result<()>;
}

/// Persist/load opaque processor state keyed by `(name, position)`.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn last_snapshot(&self, name: &str) -> anyhow::Result<Option<Snapshot>>;
    async fn create_snapshot(
        &self,
        name: &str,
        position: Position,
    ) -> anyhow::Result<Box<dyn SnapshotWriter>>;
}

// ---------------------------------------------------------------------
// In-memory double.
// ---------------------------------------------------------------------

#[derive(Default)]
struct InMemoryState {
    latest: HashMap<String, Snapshot>,
}

/// An in-process snapshot store. Every `create_snapshot` call buffers writes
/// until `commit`, at which point it atomically replaces the previous
/// "latest" snapshot for that name — mirroring the real store's
/// temp-file-then-rename durability contract without touching a filesystem.
#[derive(Clone, Default)]
pub struct InMemorySnapshotStore {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

struct InMemorySnapshotWriter {
    state: Arc<Mutex<InMemoryState>>,
    name: String,
    position: Position,
    buffer: Vec<u8>,
}

#[async_trait]
impl SnapshotWriter for InMemorySnapshotWriter {
    async fn write(&mut self, bytes: &[u8]) -> anyhow::Result<u64> {
        self.buffer.clear();
        self.buffer.extend_from_slice(bytes);
        Ok(self.buffer.len() as u64)
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        #[allow(clippy::unwrap_used)]
        let mut state = self.state.lock().unwrap();
        state.latest.insert(
            self.name.clone(),
            Snapshot {
                name: self.name,
                position: self.position,
                blob: self.buffer,
            },
        );
        Ok(())
    }

    async fn abort(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn last_snapshot(&self, name: &str) -> anyhow::Result<Option<Snapshot>> {
        #[allow(clippy::unwrap_used)]
        let state = self.state.lock().unwrap();
        Ok(state.latest.get(name).cloned())
    }

    async fn create_snapshot(
        &self,
        name: &str,
        position: Position,
    ) -> anyhow::Result<Box<dyn SnapshotWriter>> {
        Ok(Box::new(InMemorySnapshotWriter {
            state: Arc::clone(&self.state),
            name: name.to_string(),
            position,
            buffer: Vec::new(),
        }))
    }
}

// ---------------------------------------------------------------------
// File-backed double: one directory per name, one renamed file per position.
// ---------------------------------------------------------------------

/// Snapshot store backed by the filesystem: `<root>/<name>/<position>.snapshot`,
/// written through a temp file and `persist`-ed (atomic rename) on commit, per
/// the persisted-state layout in §6 of the design doc. Old snapshots are left
/// in place; pruning is a host-application concern.
pub struct FileSnapshotStore {
    root: PathBuf,
}

impl FileSnapshotStore {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn dir_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn path_for(&self, name: &str, position: Position) -> PathBuf {
        self.dir_for(name).join(format!("{position}.snapshot"))
    }

    fn latest_position(&self, name: &str) -> anyhow::Result<Option<Position>> {
        let dir = self.dir_for(name);
        if !dir.exists() {
            return Ok(None);
        }
        let mut best: Option<Position> = None;
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if let Some(stem) = file_name.strip_suffix(".snapshot") {
                if let Ok(position) = stem.parse::<Position>() {
                    best = Some(best.map_or(position, |b| b.max(position)));
                }
            }
        }
        Ok(best)
    }
}

struct FileSnapshotWriter {
    final_path: PathBuf,
    temp: tempfile::NamedTempFile,
}

#[async_trait]
impl SnapshotWriter for FileSnapshotWriter {
    async fn write(&mut self, bytes: &[u8]) -> anyhow::Result<u64> {
        use std::io::Write;
        self.temp.as_file_mut().write_all(bytes)?;
        Ok(bytes.len() as u64)
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        self.temp.persist(&self.final_path)?;
        Ok(())
    }

    async fn abort(self: Box<Self>) -> anyhow::Result<()> {
        // `NamedTempFile`'s `Drop` removes the underlying file.
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn last_snapshot(&self, name: &str) -> anyhow::Result<Option<Snapshot>> {
        let Some(position) = self.latest_position(name)? else {
            return Ok(None);
        };
        let blob = std::fs::read(self.path_for(name, position))?;
        Ok(Some(Snapshot {
            name: name.to_string(),
            position,
            blob,
        }))
    }

    async fn create_snapshot(
        &self,
        name: &str,
        position: Position,
    ) -> anyhow::Result<Box<dyn SnapshotWriter>> {
        let dir = self.dir_for(name);
        std::fs::create_dir_all(&dir)?;
        let temp = tempfile::NamedTempFile::new_in(&dir)?;
        Ok(Box::new(FileSnapshotWriter {
            final_path: self.path_for(name, position),
            temp,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_round_trips() {
        let store = InMemorySnapshotStore::new();
        assert!(store.last_snapshot("proc-a").await.unwrap().is_none());

        let mut writer = store.create_snapshot("proc-a", 7).await.unwrap();
        writer.write(b"state-blob").await.unwrap();
        writer.commit().await.unwrap();

        let snap = store.last_snapshot("proc-a").await.unwrap().unwrap();
        assert_eq!(snap.position, 7);
        assert_eq!(snap.blob, b"state-blob");
    }

    #[tokio::test]
    async fn in_memory_store_aborted_write_is_invisible() {
        let store = InMemorySnapshotStore::new();
        let mut writer = store.create_snapshot("proc-a", 7).await.unwrap();
        writer.write(b"partial").await.unwrap();
        writer.abort().await.unwrap();

        assert!(store.last_snapshot("proc-a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_store_round_trips_and_keeps_highest_position() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().to_path_buf());

        for position in [3, 10, 7] {
            let mut writer = store.create_snapshot("proc-a", position).await.unwrap();
            writer
                .write(format!("blob-{position}").as_bytes())
                .await
                .unwrap();
            writer.commit().await.unwrap();
        }

        let snap = store.last_snapshot("proc-a").await.unwrap().unwrap();
        assert_eq!(snap.position, 10);
        assert_eq!(snap.blob, b"blob-10");
    }

    #[tokio::test]
    async fn file_store_aborted_write_leaves_no_trace() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().to_path_buf());
        let mut writer = store.create_snapshot("proc-a", 1).await.unwrap();
        writer.write(b"partial").await.unwrap();
        writer.abort().await.unwrap();

        assert!(store.last_snapshot("proc-a").await.unwrap().is_none());
    }
}
