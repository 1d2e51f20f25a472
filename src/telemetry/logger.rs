//! JSONL telemetry writer with file rotation and retention.
//!
//! Files are named `elevator_{session}_{index}.jsonl`, where the session is the local time the
//! logger was created. Names sort chronologically, which is what pruning and replay rely on.
//! Existing files are never overwritten: a logger started within the same second as an earlier
//! one continues after the highest index already on disk.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info, warn};

use super::{TelemetryFrame, TelemetrySink};
use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::io::inputs::ElevatorInputs;

/// File name prefix shared by every telemetry file.
pub const FILE_PREFIX: &str = "elevator_";

/// File extension of telemetry files.
pub const FILE_EXTENSION: &str = "jsonl";

const SESSION_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Rotating JSONL writer.
#[derive(Debug)]
pub struct TelemetryLogger {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    session: String,
    writer: Option<BufWriter<File>>,
    current_path: Option<PathBuf>,
    records_in_file: usize,
    file_index: u32,
    cycle: u64,
}

impl TelemetryLogger {
    /// Creates `dir` if needed. No file is opened until the first record.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be created.
    pub fn new<P: AsRef<Path>>(
        dir: P,
        max_records_per_file: usize,
        max_files_to_keep: usize,
    ) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let session = Local::now().format(SESSION_FORMAT).to_string();
        info!("Telemetry logging to {} (session {})", dir.display(), session);

        Ok(Self {
            dir,
            max_records_per_file: max_records_per_file.max(1),
            max_files_to_keep: max_files_to_keep.max(1),
            session,
            writer: None,
            current_path: None,
            records_in_file: 0,
            file_index: 0,
            cycle: 0,
        })
    }

    pub fn from_config(config: &TelemetryConfig) -> Result<Self> {
        Self::new(&config.log_dir, config.max_records_per_file, config.max_files_to_keep)
    }

    /// File currently being written, if any.
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    /// Records written so far.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Appends one frame, rotating first if the current file is full.
    ///
    /// # Errors
    ///
    /// Returns `Io` or `Telemetry` if the frame cannot be written.
    pub fn write_frame(&mut self, frame: &TelemetryFrame) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        if let Some(writer) = self.writer.as_mut() {
            serde_json::to_writer(&mut *writer, frame)?;
            writer.write_all(b"\n")?;
            self.records_in_file += 1;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        let (path, file) = loop {
            let path = self.dir.join(format!(
                "{}{}_{:04}.{}",
                FILE_PREFIX, self.session, self.file_index, FILE_EXTENSION
            ));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("Telemetry file {} already exists", path.display());
                    self.file_index += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };
        debug!("Opened telemetry file {}", path.display());

        self.writer = Some(BufWriter::new(file));
        self.current_path = Some(path);
        self.records_in_file = 0;
        self.file_index += 1;

        self.prune()
    }

    /// Deletes the oldest telemetry files beyond the retention count.
    fn prune(&self) -> Result<()> {
        let mut files = telemetry_files(&self.dir)?;
        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        let excess = files.len() - self.max_files_to_keep;
        for old in files.drain(..excess) {
            match fs::remove_file(&old) {
                Ok(()) => debug!("Removed old telemetry file {}", old.display()),
                Err(e) => warn!("Failed to remove old telemetry file {}: {}", old.display(), e),
            }
        }
        Ok(())
    }
}

/// Telemetry files in `dir`, oldest first.
pub(crate) fn telemetry_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path.extension().is_some_and(|ext| ext == FILE_EXTENSION)
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(FILE_PREFIX))
        })
        .collect();
    files.sort();
    Ok(files)
}

impl TelemetrySink for TelemetryLogger {
    fn record(&mut self, table: &str, inputs: &ElevatorInputs) -> Result<()> {
        let frame = TelemetryFrame::from_inputs(self.cycle, table, inputs);
        self.write_frame(&frame)?;
        self.cycle += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for TelemetryLogger {
    fn drop(&mut self) {
        if let Err(e) = TelemetrySink::flush(self) {
            warn!("Failed to flush telemetry on shutdown: {}", e);
        }
    }
}
