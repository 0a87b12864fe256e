use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
const DEFAULT_DIR: &str = ".";

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    directories: Directories,
}

#[derive(Debug, Deserialize)]
struct Directories {
    #[serde(default = "default_dir")]
    source: String,
    #[serde(default = "default_dir")]
    output: String,
}

impl Default for Directories {
    fn default() -> Self {
        Self {
            source: default_dir(),
            output: default_dir(),
        }
    }
}

fn default_dir() -> String {
    DEFAULT_DIR.to_owned()
}

/// Resolved tool configuration. Documents are read from `source_dir` and
/// newly written files land in `output_dir`; both default to the working
/// directory.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl AppConfig {
    /// Read `config.toml`. A missing file is normal and silently uses the
    /// defaults; an unreadable or unparsable file warns and falls back so a
    /// broken config never blocks the tool.
    pub fn load(path: &Path) -> Self {
        match Self::read_file(path) {
            Ok(Some(config)) => config,
            Ok(None) => Self::defaults(),
            Err(error) => {
                eprintln!("[cbmerge] warning: {error:#}; using default directories");
                Self::defaults()
            }
        }
    }

    pub fn defaults() -> Self {
        Self {
            source_dir: PathBuf::from(DEFAULT_DIR),
            output_dir: PathBuf::from(DEFAULT_DIR),
        }
    }

    fn read_file(path: &Path) -> Result<Option<Self>> {
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let parsed: ConfigFile = toml::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(Some(Self {
            source_dir: PathBuf::from(parsed.directories.source),
            output_dir: PathBuf::from(parsed.directories.output),
        }))
    }

    /// Create missing source/output directories, returning the ones created.
    pub fn ensure_directories(&self) -> Result<Vec<PathBuf>> {
        let mut created = Vec::new();
        for dir in [&self.source_dir, &self.output_dir] {
            if !dir.exists() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create directory {}", dir.display()))?;
                created.push(dir.clone());
            }
        }
        Ok(created)
    }
}
