use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extensions processed when a directory is given and no config says otherwise
pub const DEFAULT_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VardeclConfig {
    /// Globs a file must match to be processed (all files when empty)
    pub include: Vec<String>,
    /// Globs excluding files, on top of `.gitignore`
    pub exclude: Vec<String>,
    pub extensions: Vec<String>,
    /// Write `<file>.map` next to every rewritten file
    pub source_maps: bool,
    /// Worker threads; defaults to the number of CPUs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
}

impl Default for VardeclConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            source_maps: false,
            jobs: None,
        }
    }
}

impl VardeclConfig {
    pub fn worker_count(&self) -> usize {
        self.jobs
            .filter(|jobs| *jobs > 0)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("vardecl.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<VardeclConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: VardeclConfig = toml::from_str(&contents)
        .map_err(|e| crate::Error::Config(format!("{}: {}", path.display(), e)))?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &VardeclConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_is_none() {
        let dir = TempDir::new().unwrap();
        let loaded = load_config(Some(&dir.path().join("vardecl.toml"))).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_write_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vardecl.toml");
        let config = VardeclConfig {
            exclude: vec!["vendor/**".to_string()],
            source_maps: true,
            jobs: Some(2),
            ..VardeclConfig::default()
        };

        write_config(&path, &config, false).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), Some(config.clone()));

        assert!(write_config(&path, &config, false).is_err());
        assert!(write_config(&path, &config, true).is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vardecl.toml");
        std::fs::write(&path, "source_maps = true\n").unwrap();

        let config = load_config(Some(&path)).unwrap().unwrap();
        assert!(config.source_maps);
        assert_eq!(config.extensions, vec!["js", "jsx", "mjs", "cjs"]);
        assert!(config.include.is_empty());
    }

    #[test]
    fn test_invalid_config_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vardecl.toml");
        std::fs::write(&path, "jobs = \"many\"\n").unwrap();

        let error = load_config(Some(&path)).unwrap_err();
        assert!(error.to_string().contains("vardecl.toml"));
    }

    #[test]
    fn test_worker_count() {
        let config = VardeclConfig { jobs: Some(3), ..VardeclConfig::default() };
        assert_eq!(config.worker_count(), 3);
        let config = VardeclConfig { jobs: Some(0), ..VardeclConfig::default() };
        assert!(config.worker_count() >= 1);
    }
}
