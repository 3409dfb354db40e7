//! Config file watcher for hot reload.
//!
//! The parent directory is watched rather than the file, so editors that
//! save by writing a new file and renaming it over the old one keep
//! triggering reloads. A change that fails to load or validate is logged and
//! the running configuration stays in place.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::PipelineConfig;

pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<PipelineConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiver of validated configurations.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<PipelineConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. Events stop when the returned handle is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let ConfigWatcher { path, update_tx } = self;

        let watch_dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let file_name: Option<OsString> = path.file_name().map(|name| name.to_os_string());
        let config_path = path.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!(error = %e, "Config watch error");
                    return;
                }
            };
            if !(event.kind.is_modify() || event.kind.is_create()) {
                return;
            }
            if event
                .paths
                .iter()
                .any(|changed| changed.file_name() == file_name.as_deref())
            {
                reload(&config_path, &update_tx);
            }
        })?;

        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = %path.display(), "Watching config file for changes");
        Ok(watcher)
    }
}

fn reload(path: &Path, tx: &mpsc::UnboundedSender<PipelineConfig>) {
    match load_config(path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "Config file changed, applying");
            if tx.send(config).is_err() {
                tracing::debug!("Config receiver dropped");
            }
        }
        Err(e) => tracing::error!(
            path = %path.display(),
            error = %e,
            "Rejected config change, keeping current configuration"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_change_is_delivered() {
        let dir = std::env::temp_dir().join(format!("pipeline-watch-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pipeline.toml");
        std::fs::write(&path, "[cache]\nmax_entries = 10\n").unwrap();

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _handle = watcher.run().unwrap();
        std::fs::write(&path, "[cache]\nmax_entries = 20\n").unwrap();

        // A truncate-then-write save can surface an intermediate event first.
        let received = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(config) = updates.recv().await {
                if config.cache.max_entries == 20 {
                    return true;
                }
            }
            false
        })
        .await;

        assert!(matches!(received, Ok(true)));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
