//! Local filesystem platform: datasets are text files under a data directory and sinks are
//! text files under an output directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::{MatrixError, MatrixResult};
use crate::platform::{Platform, SinkMode, Tap, TapKind, TapStore};

pub const NAME: &str = "local";

pub struct LocalPlatform {
    store: Arc<FileStore>,
}

impl LocalPlatform {
    pub fn new(data_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            store: Arc::new(FileStore {
                data_dir: data_dir.into(),
                output_dir: output_dir.into(),
            }),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.store.output_dir
    }
}

impl Platform for LocalPlatform {
    fn name(&self) -> &str {
        NAME
    }

    fn store(&self) -> Arc<dyn TapStore> {
        self.store.clone()
    }

    fn input_source(&self, dataset: &str) -> MatrixResult<Tap> {
        let tap = Tap::source(dataset);
        if !self.store.exists(&tap) {
            return Err(MatrixError::UnknownDataset {
                dataset: self.store.path_of(&tap).display().to_string(),
                platform: NAME.to_string(),
            });
        }
        Ok(tap)
    }
}

struct FileStore {
    data_dir: PathBuf,
    output_dir: PathBuf,
}

impl FileStore {
    fn path_of(&self, tap: &Tap) -> PathBuf {
        match tap.kind {
            TapKind::Source => self.data_dir.join(&tap.identifier),
            TapKind::Sink => self.output_dir.join(&tap.identifier),
        }
    }
}

impl TapStore for FileStore {
    fn read_lines(&self, tap: &Tap) -> MatrixResult<Vec<String>> {
        let path = self.path_of(tap);
        let text = fs::read_to_string(&path).map_err(|e| MatrixError::io(path.display(), e))?;
        Ok(text.lines().map(str::to_string).collect())
    }

    fn write_lines(&self, tap: &Tap, lines: &[String]) -> MatrixResult<()> {
        let path = self.path_of(tap);
        if tap.mode == SinkMode::Keep && path.exists() {
            return Err(MatrixError::SinkExists {
                path: path.display().to_string(),
            });
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| MatrixError::io(parent.display(), e))?;
        }

        let mut text = lines.join("\n");
        if !lines.is_empty() {
            text.push('\n');
        }
        // fs::write truncates: replace, never append
        fs::write(&path, text).map_err(|e| MatrixError::io(path.display(), e))
    }

    fn exists(&self, tap: &Tap) -> bool {
        self.path_of(tap).is_file()
    }
}
