//! Write a `.cxA` package.
//!
//! Embedded files that cannot be read, compressed or written are skipped
//! with a warning and the header's file count is lowered to match.

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::error::PackageError;
use crate::model::package::{PACKAGE_EXT, PackageHeader, encode_record};
use crate::model::{FileEntry, ProcessedProject};
use crate::processor::blob;

/// Above this size the packager warns before loading a file into memory.
pub const HUGE_FILE_WARNING: u64 = 500 * 1024 * 1024;

/// What ended up in the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSummary {
    /// Records actually written (equals the header's `file_count`).
    pub file_count: u32,
    /// Source paths of the entries that were skipped.
    pub skipped: Vec<String>,
    /// Total package size in bytes.
    pub len: u64,
}

/// Streams a package into any seekable writer.
pub struct Packager<W: Write + Seek> {
    out: W,
    header: PackageHeader,
    skipped: Vec<String>,
}

impl<W: Write + Seek> Packager<W> {
    /// Write the provisional header and both fixed sections.
    pub fn start(mut out: W, project: &ProcessedProject) -> Result<Self, PackageError> {
        let header = PackageHeader::new(
            section_len(&project.settings_blob, "settings")?,
            section_len(&project.script_blob, "code")?,
            u32::try_from(project.files.len())
                .map_err(|_| PackageError::TooLarge { what: "file table" })?,
        );

        out.write_all(&header.to_bytes())
            .map_err(|e| PackageError::io("Cannot write header", e))?;
        out.write_all(&project.settings_blob)
            .map_err(|e| PackageError::io("Cannot write settings", e))?;
        out.write_all(&project.script_blob)
            .map_err(|e| PackageError::io("Cannot write code", e))?;

        Ok(Self {
            out,
            header,
            skipped: Vec::new(),
        })
    }

    /// Append one embedded file; returns whether it made it in.
    pub fn add_file(&mut self, entry: &FileEntry) -> bool {
        match self.try_add_file(entry) {
            Ok(()) => true,
            Err(reason) => {
                warn!("Skipping \"{}\": {reason}", entry.src);
                self.header.file_count = self.header.file_count.saturating_sub(1);
                self.skipped.push(entry.src.clone());
                false
            }
        }
    }

    fn try_add_file(&mut self, entry: &FileEntry) -> Result<(), String> {
        let data = read_source(&entry.resolved)?;

        let compressed = blob::deflate(&data).map_err(|e| format!("cannot compress: {e}"))?;
        info!(
            "Compressed {} from {} to {} bytes ({:.1}% reduction)",
            entry.src,
            data.len(),
            compressed.len(),
            100.0 * (1.0 - compressed.len() as f64 / data.len() as f64)
        );
        drop(data);

        let record = encode_record(&entry.dest, &compressed).map_err(|e| e.to_string())?;
        self.commit(&record)?;

        info!(
            "Added \"{}\" -> \"{}\" ({} bytes compressed)",
            entry.src,
            entry.dest,
            compressed.len()
        );
        Ok(())
    }

    /// Write a whole record; on failure rewind to where it started so no
    /// partial record stays in the stream.
    fn commit(&mut self, record: &[u8]) -> Result<(), String> {
        let mark = self
            .out
            .stream_position()
            .map_err(|e| format!("cannot tell stream position: {e}"))?;

        if let Err(e) = self.out.write_all(record) {
            self.out
                .seek(SeekFrom::Start(mark))
                .map_err(|se| format!("write failed ({e}) and rewind failed ({se})"))?;
            return Err(format!("cannot write record: {e}"));
        }
        Ok(())
    }

    /// Rewrite the header with the final file count.
    ///
    /// Returns the writer and a summary; `summary.len` is where the package
    /// ends, bytes past it (left by a rolled back last record) are garbage.
    pub fn finish(mut self) -> Result<(W, PackageSummary), PackageError> {
        let len = self
            .out
            .stream_position()
            .map_err(|e| PackageError::io("Cannot tell package size", e))?;
        self.out
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.out.write_all(&self.header.to_bytes()))
            .and_then(|_| self.out.seek(SeekFrom::Start(len)))
            .and_then(|_| self.out.flush())
            .map_err(|e| PackageError::io("Cannot rewrite header", e))?;

        let summary = PackageSummary {
            file_count: self.header.file_count,
            skipped: self.skipped,
            len,
        };
        Ok((self.out, summary))
    }
}

fn section_len(blob: &[u8], what: &'static str) -> Result<u32, PackageError> {
    u32::try_from(blob.len()).map_err(|_| PackageError::TooLarge { what })
}

/// Read one embedded source file completely.
fn read_source(path: &Path) -> Result<Vec<u8>, String> {
    let meta = fs::metadata(path).map_err(|e| format!("cannot open: {e}"))?;
    let size = meta.len();
    info!(
        "File size: {size} bytes ({:.2} MB)",
        size as f64 / (1024.0 * 1024.0)
    );
    if size == 0 {
        return Err("file is empty or invalid".to_string());
    }
    if size > HUGE_FILE_WARNING {
        warn!(
            "{} is very large ({size} bytes). Consider using smaller files.",
            path.display()
        );
    }

    let mut data = Vec::new();
    let want = usize::try_from(size).map_err(|_| "file too large for memory".to_string())?;
    data.try_reserve_exact(want)
        .map_err(|e| format!("cannot allocate {size} bytes: {e}"))?;

    let mut file = File::open(path).map_err(|e| format!("cannot open: {e}"))?;
    file.read_to_end(&mut data)
        .map_err(|e| format!("cannot read: {e}"))?;
    if data.len() as u64 != size {
        return Err(format!(
            "cannot read file completely (read {} of {size} bytes)",
            data.len()
        ));
    }
    Ok(data)
}

/// Package file name for a project.
pub fn package_path(out_dir: &Path, project: &str) -> PathBuf {
    out_dir.join(format!("{project}.{PACKAGE_EXT}"))
}

/// Write `<out_dir>/<project>.cxA`.
///
/// The package is assembled in a `.part` file next to the target and only
/// renamed into place once complete.
pub fn emit(project: &ProcessedProject, out_dir: &Path) -> Result<(PathBuf, PackageSummary)> {
    let target = package_path(out_dir, &project.settings.project);
    let part = target.with_extension(format!("{PACKAGE_EXT}.part"));

    let result = write_package(project, &part);
    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            let _ = fs::remove_file(&part);
            return Err(e);
        }
    };

    fs::rename(&part, &target)
        .with_context(|| format!("Cannot create {}", target.display()))?;

    info!("Build done! Check your app as \"{}\"", target.display());
    info!("Total files included: {}", summary.file_count);
    info!("Total folders recorded: {}", project.folders.len());
    if !project.shell_commands.is_empty() {
        info!(
            "Shell commands recorded (not executed): {}",
            project.shell_commands.join("; ")
        );
    }
    Ok((target, summary))
}

fn write_package(project: &ProcessedProject, part: &Path) -> Result<PackageSummary> {
    let file = File::create(part).with_context(|| "Cannot create .cxA file")?;

    let mut packager = Packager::start(file, project)?;
    info!("Including {} files in the build...", project.files.len());
    for (i, entry) in project.files.iter().enumerate() {
        info!(
            "Processing file {}/{}: {}",
            i + 1,
            project.files.len(),
            entry.src
        );
        packager.add_file(entry);
    }

    let (file, summary) = packager.finish()?;
    file.set_len(summary.len)
        .with_context(|| "Cannot truncate .cxA file")?;
    file.sync_all().with_context(|| "Cannot flush .cxA file")?;
    Ok(summary)
}
