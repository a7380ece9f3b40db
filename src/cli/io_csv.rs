// Reading input files and writing export files.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use snafu::prelude::*;

use crate::cli::*;

/// Reads a whole input file as text.
///
/// Files that are not valid UTF-8 are read as Windows-1252, which is what
/// spreadsheet programs on Windows write.
pub fn read_input(path: &Path) -> CliResult<String> {
    let bytes = fs::read(path).context(ReadingInputSnafu {
        path: path.display().to_string(),
    })?;
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            warn!(
                "read_input: {} is not valid UTF-8 ({}), reading it as Windows-1252",
                path.display(),
                e.utf8_error()
            );
            let bytes = e.into_bytes();
            let (text, _, had_errors) = encoding_rs::WINDOWS_1252.decode(&bytes);
            if had_errors {
                warn!("read_input: {}: undecodable bytes replaced", path.display());
            }
            Ok(text.into_owned())
        }
    }
}

/// Writes an export file in `dir`, creating the directory if needed.
pub fn write_export(dir: &Path, file_name: &str, content: &str) -> CliResult<PathBuf> {
    fs::create_dir_all(dir).context(CreatingDirectorySnafu {
        path: dir.display().to_string(),
    })?;
    let p = dir.join(file_name);
    fs::write(&p, content).context(WritingExportSnafu {
        path: p.display().to_string(),
    })?;
    info!("write_export: {:?} ({} bytes)", p, content.len());
    Ok(p)
}
