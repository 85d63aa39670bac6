//! Debounced autosave of unsaved editor buffers.
//!
//! Each file gets one pending write. Scheduling again before the delay elapses
//! supersedes the earlier write, so a burst of keystrokes produces a single
//! write of the latest text.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strudel_ai_core::workspace::{autosave_key, build_autosave_path};
use tokio::task::JoinHandle;

pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_millis(800);

#[derive(Debug, Clone)]
pub struct AutosaveWriter {
    root: PathBuf,
    delay: Duration,
    generations: Arc<Mutex<HashMap<String, u64>>>,
    /// Serializes writes; the generation is re-checked while held.
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl AutosaveWriter {
    pub fn new(root: impl Into<PathBuf>, delay: Duration) -> Self {
        Self {
            root: root.into(),
            delay,
            generations: Arc::new(Mutex::new(HashMap::new())),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of the autosave for a workspace file.
    pub fn path_for(&self, workspace: Option<&str>, file_path: Option<&str>) -> PathBuf {
        self.root.join(build_autosave_path(workspace, file_path))
    }

    /// Number of writes still waiting on their delay.
    pub fn pending(&self) -> usize {
        self.generations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Queue `text` for writing after the debounce delay.
    ///
    /// Must be called from within a Tokio runtime. The returned handle resolves
    /// to `true` if this call's text was written, `false` if a later call
    /// superseded it or the write failed.
    pub fn schedule(
        &self,
        workspace: Option<&str>,
        file_path: Option<&str>,
        text: String,
    ) -> JoinHandle<bool> {
        let key = autosave_key(workspace, file_path);
        let target = self.path_for(workspace, file_path);
        let generation = {
            let mut generations = self.generations.lock().unwrap_or_else(|e| e.into_inner());
            let entry = generations.entry(key.clone()).or_insert(0);
            *entry += 1;
            *entry
        };

        let generations = Arc::clone(&self.generations);
        let write_lock = Arc::clone(&self.write_lock);
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !is_current(&generations, &key, generation) {
                return false;
            }

            // A newer schedule may have landed while waiting for an earlier write.
            let _guard = write_lock.lock().await;
            if !is_current(&generations, &key, generation) {
                return false;
            }
            let result = write_autosave(&target, &text).await;

            let mut map = generations.lock().unwrap_or_else(|e| e.into_inner());
            if map.get(&key) == Some(&generation) {
                map.remove(&key);
            }
            drop(map);

            match result {
                Ok(()) => {
                    tracing::debug!(path = %target.display(), bytes = text.len(), "autosave written");
                    true
                }
                Err(err) => {
                    tracing::warn!(path = %target.display(), error = %err, "autosave write failed");
                    false
                }
            }
        })
    }
}

fn is_current(generations: &Mutex<HashMap<String, u64>>, key: &str, generation: u64) -> bool {
    generations
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .get(key)
        == Some(&generation)
}

async fn write_autosave(target: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(target, text).await
}

/// Read a previously written autosave; `None` when there is none.
pub async fn read_autosave(
    root: &Path,
    workspace: Option<&str>,
    file_path: Option<&str>,
) -> io::Result<Option<String>> {
    let path = root.join(build_autosave_path(workspace, file_path));
    match tokio::fs::read_to_string(&path).await {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schedule_writes_after_delay() {
        let dir = tempfile::tempdir().unwrap();
        let writer = AutosaveWriter::new(dir.path(), Duration::from_millis(10));

        let handle = writer.schedule(Some("My Room"), Some("beats/alpha strudel"), "s(\"bd\")".into());
        assert!(handle.await.unwrap());

        let written = dir.path().join("autosaves/My-Room/beats/alpha-strudel.strudel");
        assert_eq!(std::fs::read_to_string(written).unwrap(), "s(\"bd\")");
        assert_eq!(writer.pending(), 0);
    }

    #[tokio::test]
    async fn test_later_schedule_supersedes_pending_write() {
        let dir = tempfile::tempdir().unwrap();
        let writer = AutosaveWriter::new(dir.path(), Duration::from_millis(30));

        let first = writer.schedule(Some("room"), Some("a.strudel"), "first".into());
        let second = writer.schedule(Some("room"), Some("a.strudel"), "second".into());
        assert_eq!(writer.pending(), 1);

        assert!(!first.await.unwrap());
        assert!(second.await.unwrap());

        let text = read_autosave(dir.path(), Some("room"), Some("a.strudel"))
            .await
            .unwrap();
        assert_eq!(text.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_distinct_files_do_not_interfere() {
        let dir = tempfile::tempdir().unwrap();
        let writer = AutosaveWriter::new(dir.path(), Duration::from_millis(10));

        let a = writer.schedule(Some("room"), Some("a.strudel"), "a".into());
        let b = writer.schedule(Some("room"), Some("b.strudel"), "b".into());
        assert!(a.await.unwrap());
        assert!(b.await.unwrap());

        assert_eq!(
            read_autosave(dir.path(), Some("room"), Some("b.strudel"))
                .await
                .unwrap()
                .as_deref(),
            Some("b")
        );
    }

    #[tokio::test]
    async fn test_superseded_while_waiting_to_write() {
        let dir = tempfile::tempdir().unwrap();
        let writer = AutosaveWriter::new(dir.path(), Duration::from_millis(5));

        let guard = writer.write_lock.lock().await;
        let first = writer.schedule(Some("room"), Some("a.strudel"), "first".into());
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = writer.schedule(Some("room"), Some("a.strudel"), "second".into());
        drop(guard);

        assert!(!first.await.unwrap());
        assert!(second.await.unwrap());
        let text = read_autosave(dir.path(), Some("room"), Some("a.strudel"))
            .await
            .unwrap();
        assert_eq!(text.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_dot_segments_stay_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        let writer = AutosaveWriter::new(&root, Duration::from_millis(5));

        let target = writer.path_for(Some(".."), Some("../escaped"));
        assert!(target.starts_with(root.join("autosaves")));

        assert!(writer
            .schedule(Some(".."), Some("../escaped"), "x".into())
            .await
            .unwrap());
        assert!(target.exists());
        assert!(!dir.path().join("escaped.strudel").exists());
        assert_eq!(
            read_autosave(&root, Some(".."), Some("../escaped"))
                .await
                .unwrap()
                .as_deref(),
            Some("x")
        );
    }

    #[tokio::test]
    async fn test_read_missing_autosave() {
        let dir = tempfile::tempdir().unwrap();
        let text = read_autosave(dir.path(), None, None).await.unwrap();
        assert_eq!(text, None);
    }

    #[test]
    fn test_path_for_uses_sanitized_layout() {
        let writer = AutosaveWriter::new("/tmp/strudel", DEFAULT_AUTOSAVE_DELAY);
        assert_eq!(
            writer.path_for(None, Some("loops/dub")),
            PathBuf::from("/tmp/strudel/autosaves/workspace/loops/dub.strudel")
        );
    }
}
