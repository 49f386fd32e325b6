//! `cx <app.cxA>`: unpack a package into a scratch directory and run it.
//!
//! Everything that makes the package unusable (bad header, truncated or
//! corrupt settings/script, missing shell) is fatal and detected before
//! the scratch directory exists. A broken embedded file only costs that
//! one file.
pub mod launch;
pub mod scratch;

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::error::PackageError;
use crate::model::Settings;
use crate::model::package::{
    HEADER_LEN, PackageHeader, RECORD_HEADER_LEN, RecordHeader, SCRIPT_FILE, SETTINGS_FILE,
};
use crate::processor::blob;
use scratch::ScratchDir;

/// Run-time configuration for the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Directory the per-process scratch directory is created in.
    pub scratch_root: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            scratch_root: std::env::temp_dir(),
        }
    }
}

/// One decompressed embedded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedFile {
    pub name: String,
    pub data: Vec<u8>,
}

/// A fully decoded package.
#[derive(Debug, Clone)]
pub struct Package {
    pub header: PackageHeader,
    pub settings: Settings,
    /// `settings.json` exactly as stored.
    pub settings_text: Vec<u8>,
    pub script: Vec<u8>,
    /// One entry per declared record; `Err` holds why it was dropped.
    pub files: Vec<Result<EmbeddedFile, String>>,
}

/// Outcome of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub exit_code: Option<i32>,
    pub success: bool,
    pub files_extracted: usize,
    pub files_skipped: usize,
}

// ─────────────────────────────────────────────────────
// Decoding
// ─────────────────────────────────────────────────────

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        if len > self.remaining() {
            return None;
        }
        let out = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Some(out)
    }

    fn record(&mut self) -> Result<EmbeddedFile, String> {
        let head: [u8; RECORD_HEADER_LEN] = self
            .take(RECORD_HEADER_LEN)
            .and_then(|b| b.try_into().ok())
            .ok_or("cannot read file header")?;
        let head = RecordHeader::from_bytes(&head);

        // no payload length to resync from: nothing after this lines up
        let Some(name) = self.take(head.name_len as usize) else {
            self.pos = self.bytes.len();
            return Err("cannot read filename".to_string());
        };
        let name = String::from_utf8(name.to_vec()).map_err(|_| "filename is not UTF-8")?;

        let Some(payload) = self.take(head.data_len as usize) else {
            let left = self.remaining();
            self.resync();
            return Err(format!(
                "cannot read file data for {name} ({} bytes declared, {left} left)",
                head.data_len
            ));
        };

        check_name(&name)?;
        let data =
            blob::inflate(payload).ok_or_else(|| format!("cannot decompress file {name}"))?;
        Ok(EmbeddedFile { name, data })
    }

    /// After a record with an impossible length, skip the zlib stream that
    /// follows (if it is intact) so later records still line up.
    fn resync(&mut self) {
        match blob::stream_len(&self.bytes[self.pos..]) {
            Some(len) => self.pos += len,
            None => self.pos = self.bytes.len(),
        }
    }
}

/// Refuse names that would land outside the scratch directory.
fn check_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("empty filename".to_string());
    }
    let escapes = Path::new(name).components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(format!("refusing to extract outside scratch dir: {name}"));
    }
    Ok(())
}

/// Decode a package held in memory.
pub fn read_package(bytes: &[u8]) -> Result<Package, PackageError> {
    let header = PackageHeader::from_bytes(bytes)?;
    let mut reader = Reader {
        bytes,
        pos: HEADER_LEN,
    };

    let settings_blob = reader
        .take(header.settings_len as usize)
        .ok_or(PackageError::Truncated { what: "settings" })?;
    let script_blob = reader
        .take(header.script_len as usize)
        .ok_or(PackageError::Truncated { what: "code" })?;

    let settings_text =
        blob::inflate(settings_blob).ok_or(PackageError::Decompress { what: "settings" })?;
    let script = blob::inflate(script_blob).ok_or(PackageError::Decompress { what: "code" })?;

    let settings: Settings = serde_json::from_slice(&settings_text)?;
    if settings.shell.trim().is_empty() {
        return Err(PackageError::MissingShell);
    }

    let files = (0..header.file_count).map(|_| reader.record()).collect();

    Ok(Package {
        header,
        settings,
        settings_text,
        script,
        files,
    })
}

// ─────────────────────────────────────────────────────
// Extraction and launch
// ─────────────────────────────────────────────────────

/// Host platform name as used in `cx.project.platform`.
pub fn current_platform() -> &'static str {
    if cfg!(windows) {
        "windows"
    } else if cfg!(target_os = "macos") {
        "darwin"
    } else {
        "linux"
    }
}

/// Write settings, script and embedded files into `dir`.
///
/// Returns (extracted, skipped) counts for the embedded files.
pub fn extract(package: &Package, dir: &Path) -> Result<(usize, usize), PackageError> {
    fs::write(dir.join(SETTINGS_FILE), &package.settings_text)
        .map_err(|e| PackageError::io("Cannot create settings file", e))?;
    fs::write(dir.join(SCRIPT_FILE), &package.script)
        .map_err(|e| PackageError::io("Cannot create code file", e))?;

    let mut extracted = 0;
    let mut skipped = 0;
    for (i, entry) in package.files.iter().enumerate() {
        let result = match entry {
            Ok(file) => write_embedded(dir, file),
            Err(reason) => Err(reason.clone()),
        };
        match result {
            Ok(()) => extracted += 1,
            Err(reason) => {
                warn!("File {i}: {reason}");
                skipped += 1;
            }
        }
    }
    Ok((extracted, skipped))
}

fn write_embedded(dir: &Path, file: &EmbeddedFile) -> Result<(), String> {
    let path = dir.join(&file.name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("cannot create directory for {}: {e}", file.name))?;
    }
    fs::write(&path, &file.data)
        .map_err(|e| format!("cannot create extracted file {}: {e}", file.name))?;
    info!("Extracted file: {} ({} bytes)", file.name, file.data.len());
    Ok(())
}

/// Load, extract and run a package file. The scratch directory is gone by
/// the time this returns, whatever the outcome.
pub fn run_package(path: &Path, config: &RunConfig) -> Result<RunOutcome> {
    let bytes = fs::read(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let package = read_package(&bytes)
        .with_context(|| format!("Cannot load {}", path.display()))?;
    drop(bytes);

    info!(
        "Loading CX application \"{}\" v{} with {} files...",
        package.settings.project, package.settings.version, package.header.file_count
    );
    let platform = package.settings.platform.as_str();
    if platform != "all" && platform != current_platform() {
        warn!(
            "Package targets platform \"{platform}\", running on \"{}\"",
            current_platform()
        );
    }

    let scratch = ScratchDir::create(&config.scratch_root)?;
    let (files_extracted, files_skipped) = extract(&package, scratch.path())?;

    let script = scratch.path().join(SCRIPT_FILE);
    let status = launch::launch(&package.settings.shell, &script, scratch.path())?;
    if !status.success() {
        warn!("Application execution completed with {status}");
    }

    Ok(RunOutcome {
        exit_code: status.code(),
        success: status.success(),
        files_extracted,
        files_skipped,
    })
}
