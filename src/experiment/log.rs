//! Per-batch summary logs.
//!
//! Each batch owns one [`BatchLog`], created when the batch starts and handed down to
//! every step that reports something. Lines go to the batch's own sink and are mirrored
//! to `tracing` with a `batch` field.

use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::Local;

pub struct BatchLog<W: Write> {
    batch: String,
    sink: W,
}

impl BatchLog<BufWriter<File>> {
    /// Opens `path` for appending, creating it (and its parent directory) if needed.
    pub fn open<P: AsRef<Path>>(batch: &str, path: P) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(batch, BufWriter::new(file)))
    }
}

impl<W: Write> BatchLog<W> {
    pub fn new(batch: &str, sink: W) -> Self {
        Self {
            batch: batch.to_string(),
            sink,
        }
    }

    pub fn batch(&self) -> &str {
        &self.batch
    }

    pub fn info(&mut self, message: impl Display) -> io::Result<()> {
        tracing::info!(batch = %self.batch, "{message}");
        self.write_line("INFO", message)
    }

    pub fn warn(&mut self, message: impl Display) -> io::Result<()> {
        tracing::warn!(batch = %self.batch, "{message}");
        self.write_line("WARNING", message)
    }

    pub fn error(&mut self, message: impl Display) -> io::Result<()> {
        tracing::error!(batch = %self.batch, "{message}");
        self.write_line("ERROR", message)
    }

    fn write_line(&mut self, level: &str, message: impl Display) -> io::Result<()> {
        writeln!(
            self.sink,
            "{} [{level}] - {message}",
            Local::now().format("%Y-%m-%d %H:%M:%S,%3f")
        )?;
        self.sink.flush()
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}
