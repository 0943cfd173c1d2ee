use anyhow::Context;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use crate::config::VardeclConfig;

/// Directories never worth rewriting, on top of `.gitignore`
const DEFAULT_EXCLUDES: &[&str] = &[
    "node_modules/", "bower_components/", "vendor/", "dist/", "build/", "out/",
    "coverage/", ".git/", ".vscode/", ".idea/",
    "*.min.js",
];

/// Decides which files under a root get transformed
pub struct FileFilter {
    ignores: Gitignore,
    include: Vec<glob::Pattern>,
    exclude: Vec<glob::Pattern>,
    extensions: Vec<String>,
}

impl FileFilter {
    pub fn new(root: &Path, config: &VardeclConfig) -> anyhow::Result<Self> {
        let mut builder = GitignoreBuilder::new(root);
        for pattern in DEFAULT_EXCLUDES {
            builder.add_line(None, pattern).ok();
        }

        Ok(Self {
            ignores: builder.build().unwrap_or_else(|_| Gitignore::empty()),
            include: compile_globs(&config.include)?,
            exclude: compile_globs(&config.exclude)?,
            extensions: config
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        })
    }

    /// A file is ignored when it or any of its parent directories is.
    /// `relative` must be relative to the root the filter was built for.
    pub fn is_ignored(&self, relative: &Path) -> bool {
        self.ignores
            .matched_path_or_any_parents(relative, false)
            .is_ignore()
    }

    /// Whether `path` (relative to the walk root) should be transformed
    pub fn accepts(&self, relative: &Path) -> bool {
        let has_extension = relative
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|known| known.eq_ignore_ascii_case(ext)));
        if !has_extension {
            return false;
        }
        if !self.include.is_empty() && !self.include.iter().any(|glob| glob.matches_path(relative)) {
            return false;
        }
        !self.exclude.iter().any(|glob| glob.matches_path(relative))
    }
}

fn compile_globs(patterns: &[String]) -> anyhow::Result<Vec<glob::Pattern>> {
    patterns
        .iter()
        .map(|pattern| {
            glob::Pattern::new(pattern).with_context(|| format!("invalid glob `{}`", pattern))
        })
        .collect()
}

/// Expand the CLI arguments into the list of files to process.
///
/// A file argument is always kept, whatever its extension. Directories are
/// walked respecting `.gitignore`, then filtered by extension and globs.
pub fn discover_files(paths: &[PathBuf], config: &VardeclConfig) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.is_dir() {
            anyhow::bail!("no such file or directory: {}", path.display());
        }

        let filter = FileFilter::new(path, config)?;
        let walker = WalkBuilder::new(path)
            .hidden(true)
            .git_ignore(true)
            .require_git(false)
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("skipping unreadable entry: {}", e);
                    continue;
                }
            };
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            if is_dir {
                continue;
            }
            let relative = entry.path().strip_prefix(path).unwrap_or(entry.path());
            if filter.is_ignored(relative) || !filter.accepts(relative) {
                tracing::trace!("filtered out {}", relative.display());
                continue;
            }
            files.push(entry.into_path());
        }
    }

    files.sort();
    files.dedup();
    tracing::debug!(count = files.len(), "discovered files");
    Ok(files)
}
