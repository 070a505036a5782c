use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{ProcessingError, Result};
use crate::models::RouteResult;

/// Writes result lists, checkpoints and generated tables as JSON
///
/// Every write goes to a temporary file in the destination directory and is
/// renamed into place, so readers never observe a half-written file.
pub struct ResultsWriter {
    pretty: bool,
}

impl ResultsWriter {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn write_results(&self, results: &[RouteResult], path: &Path) -> Result<()> {
        self.write_json(results, path)?;
        debug!("Wrote {} results to {}", results.len(), path.display());
        Ok(())
    }

    pub fn write_json<T: Serialize + ?Sized>(&self, value: &T, path: &Path) -> Result<()> {
        let persistence = |message: String| ProcessingError::Persistence {
            path: path.to_path_buf(),
            message,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir()?,
        };
        fs::create_dir_all(&dir).map_err(|e| persistence(e.to_string()))?;

        let mut temp = NamedTempFile::new_in(&dir).map_err(|e| persistence(e.to_string()))?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            if self.pretty {
                serde_json::to_writer_pretty(&mut writer, value)?;
            } else {
                serde_json::to_writer(&mut writer, value)?;
            }
            writer.flush().map_err(|e| persistence(e.to_string()))?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|e| persistence(e.to_string()))?;
        temp.persist(path)
            .map_err(|e| persistence(e.error.to_string()))?;

        Ok(())
    }
}

impl Default for ResultsWriter {
    fn default() -> Self {
        Self::new()
    }
}

pub fn load_results(path: &Path) -> Result<Vec<RouteResult>> {
    read_json(path)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
