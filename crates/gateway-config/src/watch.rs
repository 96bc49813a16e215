//! Optional filesystem-watch hot-reload: re-parses the config file on
//! every write event and swaps it into an `ArcSwap` other components
//! hold a read-only handle to.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{error, info, warn};

use crate::config::{load_config, GatewayConfig};

/// Start watching `path` for writes, reloading and swapping the config
/// into `current` on every change. The returned `RecommendedWatcher`
/// must be kept alive for as long as hot-reload should run; dropping it
/// stops the watch.
///
/// # Errors
/// Returns a `notify::Error` if the filesystem watch can't be
/// established.
pub fn watch_config(
    path: impl AsRef<Path>,
    current: Arc<ArcSwap<GatewayConfig>>,
) -> notify::Result<RecommendedWatcher> {
    let path: PathBuf = path.as_ref().to_path_buf();
    let watch_path = path.clone();
    let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
        let Ok(event) = event else {
            warn!(error = ?event, "config watch error");
            return;
        };
        if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
            return;
        }
        match load_config(Some(&path)) {
            Ok(reloaded) => {
                current.store(Arc::new(reloaded));
                info!(path = %path.display(), "reloaded configuration");
            }
            Err(err) => {
                error!(path = %path.display(), %err, "failed to reload configuration, keeping previous");
            }
        }
    })?;
    watcher.watch(&watch_path, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}
