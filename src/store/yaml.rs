use async_trait::async_trait;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::{
    Assignment, AssignmentDraft, AssignmentId, Expert, ExpertId, ExpertStatus, HistoryAction,
    HistoryEntry, NewExpert, NewHistoryEntry,
};

use super::snapshot::Snapshot;
use super::{AssignmentQuery, Recorded, Store, StoreLease, StoreResult};

/// Store backed by a single YAML document.
///
/// Every mutation is applied to a copy of the current snapshot, written to a
/// per-process temp file and renamed over the document. The in-memory state
/// only advances once the rename succeeds, so a failed write leaves no trace.
///
/// Several processes may share one document. Writers serialize on an
/// exclusive lock of the sibling `.lock` file and reload the document once
/// they hold it. Within a process the `gate` orders leases and standalone
/// writes. A write made while the gate is taken is treated as part of the
/// current lease, so every writer in a process that leases must lease too.
/// Lock order is gate, then file lock, then state.
#[derive(Debug)]
pub struct YamlStore {
    path: PathBuf,
    state: Mutex<Snapshot>,
    gate: Arc<Mutex<()>>,
}

/// Inter-process hold on a [`YamlStore`]. Unlocks on drop.
#[derive(Debug)]
pub(super) struct FileLease {
    file: File,
    path: PathBuf,
    _gate: OwnedMutexGuard<()>,
}

impl Drop for FileLease {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::error!("Failed to release lock on {}: {}", self.path.display(), e);
        } else {
            tracing::trace!("Released lock on {}", self.path.display());
        }
    }
}

impl YamlStore {
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let snapshot = Self::read_document(&path).await?.unwrap_or_default();

        tracing::debug!("Opened roster store at {}", path.display());

        Ok(Self {
            path,
            state: Mutex::new(snapshot),
            gate: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("yaml.lock")
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension(format!("yaml.{}.tmp", std::process::id()))
    }

    async fn read_document(path: &Path) -> StoreResult<Option<Snapshot>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).await?;
        let snapshot: Snapshot = serde_yaml::from_str(&content)?;
        snapshot.validate()?;
        Ok(Some(snapshot))
    }

    /// Replace the in-memory state with the document on disk, if any.
    async fn reload(&self, state: &mut Snapshot) -> StoreResult<()> {
        if let Some(snapshot) = Self::read_document(&self.path).await? {
            *state = snapshot;
        }
        Ok(())
    }

    /// Take the file lock, blocking until any other holder lets go.
    async fn lock_file(&self) -> StoreResult<File> {
        let lock_path = self.lock_path();
        let file = tokio::task::spawn_blocking(move || -> io::Result<File> {
            if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&lock_path)?;
            if let Err(e) = file.try_lock_exclusive() {
                if e.kind() != fs2::lock_contended_error().kind() {
                    return Err(e);
                }
                tracing::info!("Waiting for {} held by another process", lock_path.display());
                file.lock_exclusive()?;
            }
            Ok(file)
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;
        Ok(file)
    }

    async fn acquire(&self, gate: OwnedMutexGuard<()>) -> StoreResult<FileLease> {
        let file = self.lock_file().await?;
        let lease = FileLease {
            file,
            path: self.lock_path(),
            _gate: gate,
        };
        self.reload(&mut *self.state.lock().await).await?;
        Ok(lease)
    }

    async fn persist(&self, snapshot: &Snapshot) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_yaml::to_string(snapshot)?;
        let temp = self.temp_path();
        fs::write(&temp, content).await?;
        if let Err(e) = fs::rename(&temp, &self.path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Apply `mutate` and write the result. With the gate free the file lock
    /// is taken for this one write.
    async fn commit<T>(&self, mutate: impl FnOnce(&mut Snapshot) -> T) -> StoreResult<T> {
        let _lease = match Arc::clone(&self.gate).try_lock_owned() {
            Ok(gate) => Some(self.acquire(gate).await?),
            Err(_) => None,
        };

        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let result = mutate(&mut next);

        if let Err(e) = self.persist(&next).await {
            tracing::error!("Failed to write roster store {}: {}", self.path.display(), e);
            return Err(e);
        }

        *state = next;
        Ok(result)
    }

    /// Run a read against the document as it is on disk now. Renames are
    /// atomic, so this needs no file lock.
    async fn read<T>(&self, view: impl FnOnce(&Snapshot) -> T) -> StoreResult<T> {
        let mut state = self.state.lock().await;
        self.reload(&mut state).await?;
        Ok(view(&state))
    }
}

#[async_trait]
impl Store for YamlStore {
    async fn lease(&self) -> StoreResult<StoreLease> {
        let gate = Arc::clone(&self.gate).lock_owned().await;
        let lease = self.acquire(gate).await?;
        tracing::trace!("Leased roster store {}", self.path.display());
        Ok(StoreLease::held(lease))
    }

    async fn expert(&self, id: ExpertId) -> StoreResult<Option<Expert>> {
        self.read(|s| s.expert(id)).await
    }

    async fn experts(&self) -> StoreResult<Vec<Expert>> {
        self.read(|s| s.experts()).await
    }

    async fn insert_expert(&self, expert: NewExpert) -> StoreResult<Expert> {
        self.commit(|s| s.insert_expert(expert)).await
    }

    async fn set_expert_status(&self, id: ExpertId, status: ExpertStatus) -> StoreResult<bool> {
        self.commit(|s| s.set_expert_status(id, status)).await
    }

    async fn assignment(&self, id: AssignmentId) -> StoreResult<Option<Assignment>> {
        self.read(|s| s.assignment(id)).await
    }

    async fn assignments(&self, query: &AssignmentQuery) -> StoreResult<Vec<Assignment>> {
        self.read(|s| s.assignments(query)).await
    }

    async fn insert_assignment(&self, draft: AssignmentDraft) -> StoreResult<Assignment> {
        self.commit(|s| s.insert_assignment(draft)).await
    }

    async fn replace_assignment(&self, assignment: &Assignment) -> StoreResult<bool> {
        self.commit(|s| s.replace_assignment(assignment)).await
    }

    async fn append_history(&self, entry: NewHistoryEntry) -> StoreResult<HistoryEntry> {
        self.commit(|s| s.append_history(entry)).await
    }

    async fn history(&self, assignment_id: AssignmentId) -> StoreResult<Vec<HistoryEntry>> {
        self.read(|s| s.history(assignment_id)).await
    }

    async fn insert_assignment_recorded(
        &self,
        draft: AssignmentDraft,
        action: HistoryAction,
        detail: String,
    ) -> StoreResult<Recorded<Assignment>> {
        let (assignment, entry) = self
            .commit(|s| s.insert_assignment_recorded(draft, action, detail))
            .await?;
        Ok(Recorded {
            value: assignment,
            history: Some(Ok(entry)),
        })
    }

    async fn replace_assignment_recorded(
        &self,
        assignment: &Assignment,
        action: HistoryAction,
        detail: String,
    ) -> StoreResult<Recorded<bool>> {
        let entry = self
            .commit(|s| s.replace_assignment_recorded(assignment, action, detail))
            .await?;
        Ok(Recorded {
            value: entry.is_some(),
            history: entry.map(Ok),
        })
    }
}
