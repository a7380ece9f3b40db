// Key-value persistence in a directory, one JSON file per key.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use canvass_core::{KeyValueStore, KvError};
use log::debug;
use snafu::prelude::*;

use crate::cli::*;

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens the store, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> CliResult<FileStore> {
        let dir = dir.into();
        fs::create_dir_all(&dir).context(CreatingDirectorySnafu {
            path: dir.display().to_string(),
        })?;
        Ok(FileStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let p = self.path(key);
        match fs::read_to_string(&p) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // Written next to the target then renamed, so a crash never leaves half a file.
    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError> {
        let p = self.path(key);
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &p)?;
        debug!("FileStore::set: {:?} ({} bytes)", p, value.len());
        Ok(())
    }
}
