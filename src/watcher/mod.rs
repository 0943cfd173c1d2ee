use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;

use crate::config::VardeclConfig;
use crate::discover::FileFilter;
use crate::pipeline::{self, FileReport, Mode, PipelineOptions};
use crate::FileStatus;

/// Re-runs the transform on JavaScript files as they change.
///
/// Our own writes trigger another modify event; the content hash recorded
/// after each run makes that second pass a no-op.
pub struct Watcher {
    path: PathBuf,
    filter: FileFilter,
    options: PipelineOptions,
    hashes: HashMap<PathBuf, blake3::Hash>,
}

impl Watcher {
    pub fn new(path: PathBuf, config: &VardeclConfig, source_maps: bool) -> anyhow::Result<Self> {
        let path = path.canonicalize()?;
        let filter = FileFilter::new(&path, config)?;
        Ok(Self {
            path,
            filter,
            options: PipelineOptions {
                mode: Mode::Fix,
                source_maps,
                jobs: 1,
            },
            hashes: HashMap::new(),
        })
    }

    pub fn run(&mut self, mut on_report: impl FnMut(&FileReport)) -> anyhow::Result<()> {
        let (tx, rx) = channel();

        let mut watcher = RecommendedWatcher::new(tx, Config::default())?;

        watcher.watch(&self.path, RecursiveMode::Recursive)?;

        tracing::info!("watching for changes in {}", self.path.display());

        for res in rx {
            match res {
                Ok(event) => {
                    for report in self.handle_event(event) {
                        on_report(&report);
                    }
                }
                Err(e) => tracing::warn!("watch error: {:?}", e),
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: notify::Event) -> Vec<FileReport> {
        use notify::EventKind;
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) => event
                .paths
                .iter()
                .filter(|path| path.is_file())
                .filter_map(|path| self.process_file(path))
                .collect(),
            EventKind::Remove(_) => {
                // Removed paths cannot be canonicalized any more
                self.hashes
                    .retain(|known, _| !event.paths.iter().any(|removed| removed == known));
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    /// Transform `path` unless it is filtered out or its content is the
    /// same as after the last run
    pub fn process_file(&mut self, path: &Path) -> Option<FileReport> {
        let path = path.canonicalize().ok()?;
        let relative = path.strip_prefix(&self.path).ok()?;
        if self.filter.is_ignored(relative) || !self.filter.accepts(relative) {
            return None;
        }

        let content = std::fs::read(&path).ok()?;
        let hash = blake3::hash(&content);
        if self.hashes.get(&path) == Some(&hash) {
            tracing::trace!("unchanged content, skipping {}", relative.display());
            return None;
        }

        let report = pipeline::process_file(&path, &self.options);

        // Remember the content we leave behind, rewritten or not
        let settled = match report.status {
            FileStatus::Changed => std::fs::read(&path).map(|bytes| blake3::hash(&bytes)).ok(),
            FileStatus::Unchanged | FileStatus::Failed => Some(hash),
        };
        if let Some(settled) = settled {
            self.hashes.insert(path, settled);
        }

        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_process_file_skips_settled_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.js");
        std::fs::write(&path, "a = 1;\n").unwrap();

        let mut watcher = Watcher::new(dir.path().to_path_buf(), &VardeclConfig::default(), false).unwrap();
        let report = watcher.process_file(&path).unwrap();
        assert_eq!(report.status, FileStatus::Changed);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "var a = 1;\n");

        // The event caused by our own write is ignored
        assert!(watcher.process_file(&path).is_none());

        std::fs::write(&path, "var a = 1;\nb = 2;\n").unwrap();
        let report = watcher.process_file(&path).unwrap();
        assert_eq!(report.stats.inlined, vec!["b"]);
    }

    #[test]
    fn test_process_file_respects_filter() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        let vendored = dir.path().join("node_modules/pkg/index.js");
        let notes = dir.path().join("notes.txt");
        std::fs::write(&vendored, "a = 1;\n").unwrap();
        std::fs::write(&notes, "a = 1;\n").unwrap();

        let mut watcher = Watcher::new(dir.path().to_path_buf(), &VardeclConfig::default(), false).unwrap();
        assert!(watcher.process_file(&vendored).is_none());
        assert!(watcher.process_file(&notes).is_none());
        assert_eq!(std::fs::read_to_string(&vendored).unwrap(), "a = 1;\n");
    }
}
