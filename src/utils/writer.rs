//! Output file creation with automatic compression.
//!
//! The export is written to a sibling `.partial` file first and only renamed over
//! the destination once every byte has been flushed, so an interrupted or failed
//! write never leaves a truncated export behind under the real name.
//!
//! # Supported Formats
//!
//! - Plain files
//! - Gzip compressed files (.gz)
//! - Zstandard compressed files (.zst)

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

enum Sink {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
    Zstd(zstd::Encoder<'static, BufWriter<File>>),
}

/// Writer for one export destination.
///
/// Call [`OutputFile::commit`] after the last write; dropping it without
/// committing removes the partial file.
pub struct OutputFile {
    sink: Option<Sink>,
    partial: PathBuf,
    destination: PathBuf,
}

impl OutputFile {
    /// Opens a writer for `path`, picking compression by extension:
    /// - `.gz` → Gzip
    /// - `.zst` → Zstandard
    /// - Otherwise → plain
    ///
    /// Missing parent directories are created.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let destination = path.as_ref().to_path_buf();

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let partial = partial_path(&destination);
        let file = BufWriter::new(File::create(&partial)?);

        let extension = destination
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        let sink = match extension {
            "gz" => Sink::Gzip(GzEncoder::new(file, Compression::default())),
            "zst" => match zstd::Encoder::new(file, 3) {
                Ok(encoder) => Sink::Zstd(encoder),
                Err(e) => {
                    let _ = fs::remove_file(&partial);
                    return Err(e);
                }
            },
            _ => Sink::Plain(file),
        };

        Ok(Self {
            sink: Some(sink),
            partial,
            destination,
        })
    }

    /// Final path the export lands on.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Flush, finish any compression frame, and move the file into place.
    pub fn commit(mut self) -> io::Result<PathBuf> {
        let sink = self
            .sink
            .take()
            .ok_or_else(|| io::Error::other("output already committed"))?;

        let finished =
            finish_sink(sink).and_then(|()| fs::rename(&self.partial, &self.destination));
        if let Err(e) = finished {
            let _ = fs::remove_file(&self.partial);
            return Err(e);
        }
        Ok(self.destination.clone())
    }

    fn sink(&mut self) -> io::Result<&mut dyn Write> {
        match self.sink.as_mut() {
            Some(Sink::Plain(w)) => Ok(w),
            Some(Sink::Gzip(w)) => Ok(w),
            Some(Sink::Zstd(w)) => Ok(w),
            None => Err(io::Error::other("output already committed")),
        }
    }
}

impl Write for OutputFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink()?.flush()
    }
}

impl Drop for OutputFile {
    fn drop(&mut self) {
        if self.sink.take().is_some() {
            let _ = fs::remove_file(&self.partial);
        }
    }
}

fn finish_sink(sink: Sink) -> io::Result<()> {
    let mut file = match sink {
        Sink::Plain(w) => w,
        Sink::Gzip(encoder) => encoder.finish()?,
        Sink::Zstd(encoder) => encoder.finish()?,
    };
    file.flush()?;
    file.get_ref().sync_all()
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    destination.with_file_name(name)
}
