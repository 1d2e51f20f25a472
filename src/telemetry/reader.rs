//! Reads telemetry files back into frames.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::logger::telemetry_files;
use super::TelemetryFrame;
use crate::error::{ElevatorError, Result};

/// Ordered set of telemetry files to read.
#[derive(Debug, Clone)]
pub struct TelemetryReader {
    files: Vec<PathBuf>,
}

impl TelemetryReader {
    /// Opens a single file, or every telemetry file in a directory in recording order.
    ///
    /// # Errors
    ///
    /// Returns `Replay` if the path does not exist or the directory holds no telemetry files.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let files = if path.is_dir() {
            telemetry_files(path)?
        } else if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            return Err(ElevatorError::Replay(format!("{} does not exist", path.display())));
        };

        if files.is_empty() {
            return Err(ElevatorError::Replay(format!(
                "no telemetry files in {}",
                path.display()
            )));
        }
        Ok(Self { files })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Parses every frame of every file. Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns `Io` if a file cannot be read, or `Replay` naming the file and line of the first
    /// malformed frame.
    pub fn read_all(&self) -> Result<Vec<TelemetryFrame>> {
        let mut frames = Vec::new();
        for path in &self.files {
            let reader = BufReader::new(File::open(path)?);
            for (index, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let frame: TelemetryFrame = serde_json::from_str(&line).map_err(|e| {
                    ElevatorError::Replay(format!("{}:{}: {}", path.display(), index + 1, e))
                })?;
                frames.push(frame);
            }
            debug!("Read telemetry file {}", path.display());
        }
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::inputs::ElevatorInputs;
    use crate::mechanics::MechanicalConstants;
    use crate::telemetry::{TelemetryLogger, TelemetrySink};
    use std::fs;
    use tempfile::TempDir;

    fn record(dir: &Path, count: usize, per_file: usize) {
        let mut inputs = ElevatorInputs::new(MechanicalConstants::new(0.025, 12.0).unwrap());
        let mut logger = TelemetryLogger::new(dir, per_file, 100).unwrap();
        for i in 0..count {
            inputs.elevator_displacement = i as f64 * 0.1;
            logger.record("Elevator", &inputs).unwrap();
        }
    }

    #[test]
    fn test_reads_directory_in_order() {
        let temp = TempDir::new().unwrap();
        record(temp.path(), 5, 2);

        let reader = TelemetryReader::open(temp.path()).unwrap();
        assert_eq!(reader.files().len(), 3);

        let frames = reader.read_all().unwrap();
        let cycles: Vec<u64> = frames.iter().map(|f| f.cycle).collect();
        assert_eq!(cycles, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_reads_single_file() {
        let temp = TempDir::new().unwrap();
        record(temp.path(), 4, 2);
        let first = TelemetryReader::open(temp.path()).unwrap().files()[0].clone();

        let frames = TelemetryReader::open(&first).unwrap().read_all().unwrap();
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn test_skips_blank_lines() {
        let temp = TempDir::new().unwrap();
        record(temp.path(), 2, 10);
        let path = TelemetryReader::open(temp.path()).unwrap().files()[0].clone();
        let contents = fs::read_to_string(&path).unwrap();
        fs::write(&path, format!("\n{}\n\n", contents)).unwrap();

        let frames = TelemetryReader::open(&path).unwrap().read_all().unwrap();
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn test_malformed_line_names_location() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("elevator_bad.jsonl");
        fs::write(&path, "{\"cycle\": 0}\n").unwrap();

        let err = TelemetryReader::open(&path).unwrap().read_all().unwrap_err();
        assert!(matches!(err, ElevatorError::Replay(_)));
        assert!(err.to_string().contains("elevator_bad.jsonl:1"));
    }

    #[test]
    fn test_missing_path() {
        let temp = TempDir::new().unwrap();
        assert!(TelemetryReader::open(temp.path().join("absent.jsonl")).is_err());
    }

    #[test]
    fn test_empty_directory() {
        let temp = TempDir::new().unwrap();
        let err = TelemetryReader::open(temp.path()).unwrap_err();
        assert!(err.to_string().contains("no telemetry files"));
    }
}
