use crate::errors::DbError;
use serde::Serialize;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Extension of table files in the data directory.
pub const TABLE_EXT: &str = "json";

/// Reject names that cannot be used verbatim as a file stem inside the data directory.
///
/// # Errors
/// Returns `InvalidCollectionName` for empty names, path separators, `..` or NUL.
pub fn validate_collection_name(name: &str) -> Result<(), DbError> {
    let bad = name.trim().is_empty()
        || name == "."
        || name.contains("..")
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(DbError::InvalidCollectionName(name.to_string()));
    }
    Ok(())
}

/// `<dir>/<name>.json`
#[must_use]
pub fn table_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{TABLE_EXT}"))
}

/// Write `value` as pretty JSON to `dest` atomically: temp file in the same
/// directory, fsync, then rename over the target.
///
/// # Errors
/// Returns an error if the temp file cannot be created, written, synced or persisted.
pub fn write_json_atomic<T: Serialize + ?Sized>(dest: &Path, value: &T) -> io::Result<()> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    if !parent.exists() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = NamedTempFile::new_in(parent)?;
    {
        let mut w = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut w, value)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        w.flush()?;
    }
    tmp.as_file().sync_all()?;
    // Renames can transiently fail on Windows while a reader holds the target open.
    let mut last_err: Option<io::Error> = None;
    for attempt in 0..3u64 {
        match tmp.persist(dest) {
            Ok(_) => return Ok(()),
            Err(pe) => {
                last_err = Some(pe.error);
                tmp = pe.file;
                std::thread::sleep(std::time::Duration::from_millis(10 + attempt * 5));
            }
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::other("failed to persist table file")))
}

/// Read a file holding a JSON array of objects.
///
/// # Errors
/// Returns an error if the file cannot be read or is not an array of objects.
pub fn read_json_array(path: &Path) -> Result<Vec<crate::types::Document>, DbError> {
    let raw = fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let docs: Vec<crate::types::Document> = serde_json::from_str(&raw)?;
    Ok(docs)
}

/// Move an unreadable table file out of the way so the next save does not clobber it.
pub fn quarantine(path: &Path) -> io::Result<PathBuf> {
    let mut target = path.as_os_str().to_owned();
    target.push(".corrupt");
    let target = PathBuf::from(target);
    fs::rename(path, &target)?;
    Ok(target)
}
