use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

// @module: File and directory utilities

/// Prefix of every translated output file
pub const TRANSLATED_PREFIX: &str = "translated_";

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Read a file to a string; fails on invalid UTF-8
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    // @returns: Name of the translated output for an input file name
    pub fn translated_file_name(file_name: &str) -> String {
        format!("{}{}", TRANSLATED_PREFIX, file_name)
    }

    /// Reduce a client-supplied file name to a single safe path component
    pub fn sanitize_file_name(raw: &str) -> String {
        let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
        let cleaned: String = base
            .chars()
            .map(|c| if c.is_control() || matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|') { '_' } else { c })
            .collect();
        let cleaned = cleaned.trim().trim_start_matches('.').to_string();

        if cleaned.is_empty() {
            "subtitle.ass".to_string()
        } else {
            cleaned
        }
    }

    // @checks: Name is a plain file name with no traversal
    pub fn is_safe_file_name(name: &str) -> bool {
        !name.is_empty()
            && name != "."
            && !name.contains("..")
            && !name.contains(['/', '\\'])
            && !name.chars().any(char::is_control)
    }

    /// Write a deflate-compressed zip archive holding `(entry name, file)` pairs
    pub fn create_zip_archive<P: AsRef<Path>>(destination: P, entries: &[(String, PathBuf)]) -> Result<PathBuf> {
        let destination = destination.as_ref();
        if let Some(parent) = destination.parent() {
            Self::ensure_dir(parent)?;
        }

        let file = File::create(destination)
            .with_context(|| format!("Failed to create archive: {:?}", destination))?;
        let mut writer = ZipWriter::new(file);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for (entry_name, path) in entries {
            let content = fs::read(path)
                .with_context(|| format!("Failed to read archive entry: {:?}", path))?;
            writer
                .start_file(entry_name.as_str(), options)
                .with_context(|| format!("Failed to add {} to archive", entry_name))?;
            writer.write_all(&content)?;
        }

        writer.finish().context("Failed to finish archive")?;
        debug!("Wrote archive {:?} with {} entries", destination, entries.len());
        Ok(destination.to_path_buf())
    }

    /// Delete files, logging instead of failing on errors
    pub fn cleanup<P: AsRef<Path>>(paths: &[P]) {
        for path in paths {
            let path = path.as_ref();
            if let Err(e) = fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove {:?}: {}", path, e);
                }
            }
        }
    }

    /// Read a file and delete it afterwards
    pub fn take_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
        let path = path.as_ref();
        if !Self::file_exists(path) {
            return Err(anyhow!("File does not exist: {:?}", path));
        }
        let content = fs::read(path).with_context(|| format!("Failed to read file: {:?}", path))?;
        Self::cleanup(&[path]);
        Ok(content)
    }
}
