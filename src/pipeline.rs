//! Per-file driver used by the CLI and the watcher
//!
//! Every file is an independent transform. Workers pull paths from a shared
//! queue and send one [`FileMessage`] per file back to the caller.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::transform::{Options, Stats, Transformer};
use crate::ui::ProgressMessage;
use crate::{FileMessage, FileStatus};

/// What to do with a rewritten file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Rewrite the file in place
    Fix,
    /// Only report whether the file would change
    Check,
    /// Keep the file, return the rewritten code in the report
    Stdout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub mode: Mode,
    /// Write `<file>.map` next to every rewritten file
    pub source_maps: bool,
    pub jobs: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
    pub stats: Stats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Rewritten code, only kept in [`Mode::Stdout`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_path: Option<PathBuf>,
}

impl FileReport {
    fn failed(path: &Path, error: impl ToString) -> Self {
        Self {
            path: path.to_path_buf(),
            status: FileStatus::Failed,
            stats: Stats::default(),
            error: Some(error.to_string()),
            code: None,
            map_path: None,
        }
    }
}

/// Totals over a batch of reports
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub files: usize,
    pub changed: usize,
    pub failed: usize,
    pub inlined: usize,
    pub hoisted: usize,
}

impl Summary {
    pub fn of(reports: &[FileReport]) -> Self {
        let mut summary = Self {
            files: reports.len(),
            ..Self::default()
        };
        for report in reports {
            match report.status {
                FileStatus::Changed => summary.changed += 1,
                FileStatus::Failed => summary.failed += 1,
                FileStatus::Unchanged => {}
            }
            summary.inlined += report.stats.inlined.len();
            summary.hoisted += report.stats.hoisted.len();
        }
        summary
    }

    pub fn declared(&self) -> usize {
        self.inlined + self.hoisted
    }
}

/// Path of the source map written for `path`
pub fn map_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".map");
    PathBuf::from(name)
}

fn transformer_for(path: &Path) -> Transformer {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Transformer::new(Options {
        file_name: Some(file_name.clone()),
        source_name: file_name,
        include_source_content: true,
    })
}

/// Transform a single file. Never fails: problems are recorded in the report.
pub fn process_file(path: &Path, options: &PipelineOptions) -> FileReport {
    match try_process_file(path, options) {
        Ok(report) => report,
        Err(e) => {
            tracing::warn!("{}: {:#}", path.display(), e);
            FileReport::failed(path, format!("{:#}", e))
        }
    }
}

fn try_process_file(path: &Path, options: &PipelineOptions) -> anyhow::Result<FileReport> {
    use anyhow::Context;

    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let transformed = transformer_for(path).transform(&source)?;
    let changed = transformed.is_changed();
    tracing::debug!(
        path = %path.display(),
        inlined = transformed.stats.inlined.len(),
        hoisted = transformed.stats.hoisted.len(),
        "processed file"
    );

    let mut report = FileReport {
        path: path.to_path_buf(),
        status: if changed { FileStatus::Changed } else { FileStatus::Unchanged },
        stats: transformed.stats.clone(),
        error: None,
        code: None,
        map_path: None,
    };

    match options.mode {
        Mode::Check => {}
        Mode::Stdout => report.code = Some(transformed.code),
        Mode::Fix if changed => {
            std::fs::write(path, &transformed.code)
                .with_context(|| format!("failed to write {}", path.display()))?;
            if options.source_maps {
                let map_path = map_path_for(path);
                std::fs::write(&map_path, transformed.map.to_json()?)
                    .with_context(|| format!("failed to write {}", map_path.display()))?;
                report.map_path = Some(map_path);
            }
        }
        Mode::Fix => {}
    }

    Ok(report)
}

/// Process `files` on `options.jobs` worker threads. Reports come back in
/// the order of `files`.
pub fn process_files(
    files: &[PathBuf],
    options: &PipelineOptions,
    progress: Option<&crossbeam::channel::Sender<ProgressMessage>>,
) -> Vec<FileReport> {
    if let Some(tx) = progress {
        tx.send(ProgressMessage::Started { total: files.len() }).ok();
    }

    let (work_tx, work_rx) = crossbeam::channel::unbounded::<(usize, &PathBuf)>();
    let (done_tx, done_rx) = crossbeam::channel::unbounded::<(usize, FileMessage)>();
    for item in files.iter().enumerate() {
        work_tx.send(item).ok();
    }
    drop(work_tx);

    let workers = options.jobs.clamp(1, files.len().max(1));
    let mut slots: Vec<Option<FileReport>> = vec![None; files.len()];

    let scoped = crossbeam::scope(|scope| {
        for _ in 0..workers {
            let work_rx = work_rx.clone();
            let done_tx = done_tx.clone();
            scope.spawn(move |_| {
                for (index, path) in work_rx {
                    let report = process_file(path, options);
                    let message = match report.error.clone() {
                        Some(error) => FileMessage::Error(path.display().to_string(), error),
                        None => FileMessage::Processed(report),
                    };
                    if done_tx.send((index, message)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(done_tx);

        for (index, message) in done_rx {
            let report = match message {
                FileMessage::Processed(report) => report,
                FileMessage::Error(path, error) => FileReport::failed(Path::new(&path), error),
            };
            if let Some(tx) = progress {
                tx.send(ProgressMessage::FileDone {
                    path: report.path.clone(),
                    status: report.status,
                })
                .ok();
            }
            slots[index] = Some(report);
        }
    });

    if scoped.is_err() {
        tracing::error!("a pipeline worker panicked");
    }
    if let Some(tx) = progress {
        tx.send(ProgressMessage::Finished).ok();
    }

    files
        .iter()
        .zip(slots)
        .map(|(path, slot)| slot.unwrap_or_else(|| FileReport::failed(path, "worker did not finish")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options(mode: Mode) -> PipelineOptions {
        PipelineOptions {
            mode,
            source_maps: false,
            jobs: 2,
        }
    }

    #[test]
    fn test_fix_rewrites_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.js");
        std::fs::write(&path, "a = 1;\n").unwrap();

        let report = process_file(&path, &options(Mode::Fix));
        assert_eq!(report.status, FileStatus::Changed);
        assert_eq!(report.stats.inlined, vec!["a"]);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "var a = 1;\n");

        // A second run finds nothing left to do
        let again = process_file(&path, &options(Mode::Fix));
        assert_eq!(again.status, FileStatus::Unchanged);
    }

    #[test]
    fn test_check_leaves_file_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.js");
        std::fs::write(&path, "f(b = 2);\n").unwrap();

        let report = process_file(&path, &options(Mode::Check));
        assert_eq!(report.status, FileStatus::Changed);
        assert_eq!(report.stats.hoisted, vec!["b"]);
        assert!(report.code.is_none());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "f(b = 2);\n");
    }

    #[test]
    fn test_stdout_returns_code() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.js");
        std::fs::write(&path, "a = 1;\n").unwrap();

        let report = process_file(&path, &options(Mode::Stdout));
        assert_eq!(report.code.as_deref(), Some("var a = 1;\n"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a = 1;\n");
    }

    #[test]
    fn test_source_map_written_next_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.js");
        std::fs::write(&path, "a = 1;\n").unwrap();

        let report = process_file(
            &path,
            &PipelineOptions {
                source_maps: true,
                ..options(Mode::Fix)
            },
        );
        let map_path = dir.path().join("app.js.map");
        assert_eq!(report.map_path.as_deref(), Some(map_path.as_path()));

        let map: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&map_path).unwrap()).unwrap();
        assert_eq!(map["version"], 3);
        assert_eq!(map["file"], "app.js");
        assert_eq!(map["sources"][0], "app.js");
    }

    #[test]
    fn test_syntax_error_is_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.js");
        std::fs::write(&path, "a = = 1;\n").unwrap();

        let report = process_file(&path, &options(Mode::Fix));
        assert_eq!(report.status, FileStatus::Failed);
        assert!(report.error.unwrap().contains("syntax error"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a = = 1;\n");
    }

    #[test]
    fn test_batch_keeps_input_order() {
        let dir = TempDir::new().unwrap();
        let mut files = Vec::new();
        for (name, body) in [("a.js", "x = 1;\n"), ("b.js", "var y = 1;\n"), ("c.js", "(")] {
            let path = dir.path().join(name);
            std::fs::write(&path, body).unwrap();
            files.push(path);
        }

        let (tx, rx) = crossbeam::channel::unbounded();
        let reports = process_files(&files, &options(Mode::Check), Some(&tx));
        let statuses: Vec<FileStatus> = reports.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![FileStatus::Changed, FileStatus::Unchanged, FileStatus::Failed]
        );
        assert_eq!(reports[2].path, files[2]);

        let summary = Summary::of(&reports);
        assert_eq!(summary.files, 3);
        assert_eq!(summary.changed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.declared(), 1);

        drop(tx);
        let messages: Vec<ProgressMessage> = rx.iter().collect();
        assert!(matches!(messages.first(), Some(ProgressMessage::Started { total: 3 })));
        assert!(matches!(messages.last(), Some(ProgressMessage::Finished)));
        assert_eq!(messages.len(), 5);
    }

    #[test]
    fn test_map_path_for() {
        assert_eq!(map_path_for(Path::new("src/app.js")), PathBuf::from("src/app.js.map"));
    }
}
