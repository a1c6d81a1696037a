//! Run artifact storage.
//!
//! Each run owns `<output_root>/<run_id>/`, holding one `scene_<i>.png` per
//! illustrated scene plus the rendered `storybook.html`. The root also
//! carries an append-only `index.html` listing runs in completion order.

use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::domain::RunId;
use crate::error::StorageError;

/// File name of the rendered document inside a run directory.
pub const DOCUMENT_FILE: &str = "storybook.html";

/// File name of the run index at the output root.
pub const INDEX_FILE: &str = "index.html";

/// Capability-style handle on the output root.
#[derive(Debug, Clone)]
pub struct RunStore {
    output_root: PathBuf,
}

impl RunStore {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn run_dir(&self, run_id: &RunId) -> PathBuf {
        self.output_root.join(run_id.as_str())
    }

    /// File name for the image of a 1-based scene index.
    pub fn scene_file_name(index: usize) -> String {
        format!("scene_{}.png", index)
    }

    /// Create the run's output directory. Fatal if it cannot be created;
    /// the run must not proceed without a place for its artifacts.
    pub async fn create_run_dir(&self, run_id: &RunId) -> Result<PathBuf, StorageError> {
        let dir = self.run_dir(run_id);

        fs::create_dir_all(&dir)
            .await
            .map_err(|source| StorageError::CreateDir {
                path: dir.clone(),
                source,
            })?;

        Ok(dir)
    }

    /// Persist one scene image, named by its 1-based scene index.
    pub async fn store_scene_image(
        &self,
        run_id: &RunId,
        index: usize,
        png: &[u8],
    ) -> Result<PathBuf, StorageError> {
        let path = self.run_dir(run_id).join(Self::scene_file_name(index));

        fs::write(&path, png)
            .await
            .map_err(|source| StorageError::Write {
                path: path.clone(),
                source,
            })?;

        Ok(path)
    }

    /// Persist the rendered storybook document.
    pub async fn store_document(
        &self,
        run_id: &RunId,
        html: &str,
    ) -> Result<PathBuf, StorageError> {
        let path = self.run_dir(run_id).join(DOCUMENT_FILE);

        fs::write(&path, html)
            .await
            .map_err(|source| StorageError::Write {
                path: path.clone(),
                source,
            })?;

        Ok(path)
    }

    /// Append the run to the discoverable index, creating it on first use.
    ///
    /// The index is append-only and ordered by run completion, which may
    /// differ from run start order when runs execute concurrently.
    pub async fn append_index(&self, run_id: &RunId) -> Result<(), StorageError> {
        let path = self.output_root.join(INDEX_FILE);
        let is_new = !path.exists();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| StorageError::Write {
                path: path.clone(),
                source,
            })?;

        let mut entry = String::new();
        if is_new {
            entry.push_str("<h1>Dreamloom Runs</h1>\n<ul>\n");
        }
        entry.push_str(&format!(
            "<li><a href='{run_id}/{doc}'>{run_id}</a></li>\n",
            doc = DOCUMENT_FILE,
        ));

        file.write_all(entry.as_bytes())
            .await
            .map_err(|source| StorageError::Write {
                path: path.clone(),
                source,
            })?;
        file.flush().await.map_err(|source| StorageError::Write {
            path,
            source,
        })?;

        Ok(())
    }

    /// Run ids that finished rendering (their directory holds a document),
    /// newest first.
    pub async fn list_completed_runs(&self) -> Result<Vec<String>, StorageError> {
        let mut runs = Vec::new();

        if !self.output_root.exists() {
            return Ok(runs);
        }

        let mut entries =
            fs::read_dir(&self.output_root)
                .await
                .map_err(|source| StorageError::Read {
                    path: self.output_root.clone(),
                    source,
                })?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| StorageError::Read {
                path: self.output_root.clone(),
                source,
            })?
        {
            let Some(name) = entry.file_name().to_str().map(String::from) else {
                continue;
            };
            if entry.path().join(DOCUMENT_FILE).exists() {
                runs.push(name);
            }
        }

        // Timestamp-derived ids: lexicographic order is start order.
        runs.sort_by(|a, b| b.cmp(a));
        Ok(runs)
    }
}
