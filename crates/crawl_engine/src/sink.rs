use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure the directory that will hold `file` exists; create it if missing.
pub fn ensure_parent_dir(file: &Path) -> Result<(), SinkError> {
    let Some(dir) = file.parent().filter(|dir| !dir.as_os_str().is_empty()) else {
        return Ok(());
    };
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| SinkError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(SinkError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| SinkError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Append-only, newline-delimited record log. Identical records are written
/// as many times as they are appended.
#[derive(Debug)]
pub struct ResultSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ResultSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &str) -> Result<(), SinkError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        ensure_parent_dir(&self.path)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{record}")?;
        file.flush()?;
        Ok(())
    }
}
