use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use crate::config::AppConfig;
use crate::document::{load_document, save_document, Document};

/// File-system view over the configured directories: which documents exist,
/// where merged output goes.
#[derive(Debug, Clone)]
pub struct Catalog {
    source_dir: PathBuf,
    output_dir: PathBuf,
}

impl Catalog {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            source_dir: config.source_dir.clone(),
            output_dir: config.output_dir.clone(),
        }
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Sorted names of the `.json` files in the source directory.
    pub fn list_files(&self) -> Result<Vec<String>> {
        let mut names = fs::read_dir(&self.source_dir)
            .with_context(|| format!("failed to read directory {}", self.source_dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| is_document_file(path))
            .filter_map(|path| {
                path.file_name()
                    .and_then(OsStr::to_str)
                    .map(str::to_owned)
            })
            .collect::<Vec<_>>();
        names.sort();
        Ok(names)
    }

    /// `list_files` narrowed to files that actually parse as JSON.
    pub fn loadable_files(&self) -> Result<Vec<String>> {
        let mut names = self.list_files()?;
        names.retain(|name| self.load(name).is_ok());
        Ok(names)
    }

    pub fn load(&self, name: &str) -> Result<Document> {
        load_document(&self.source_dir.join(name))
    }

    /// Persist a merged document. Overwrites go back into the source
    /// directory under the same name; new files land in the output directory,
    /// which is created on demand.
    pub fn save(&self, document: &Document, name: &str, overwrite: bool) -> Result<PathBuf> {
        let path = if overwrite {
            self.source_dir.join(name)
        } else {
            fs::create_dir_all(&self.output_dir).with_context(|| {
                format!("failed to create directory {}", self.output_dir.display())
            })?;
            self.output_dir.join(name)
        };
        save_document(&path, document)?;
        Ok(path)
    }
}

fn is_document_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(OsStr::to_str)
            .map(|extension| extension.eq_ignore_ascii_case("json"))
            .unwrap_or(false)
}

pub fn default_output_name() -> String {
    Local::now().format("merged_%Y%m%d_%H%M%S.json").to_string()
}

pub fn ensure_json_extension(name: &str) -> String {
    if name.to_ascii_lowercase().ends_with(".json") {
        name.to_owned()
    } else {
        format!("{name}.json")
    }
}
