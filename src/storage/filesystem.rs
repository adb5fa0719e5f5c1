//! Filesystem object store
//!
//! Objects live at `{root}/{container}/{key}`. Every write goes to a temporary
//! sibling file that is fsynced and renamed over the target.

use crate::storage::traits::{validate_key, ObjectStore, StorageResult};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Object store rooted at a local directory
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, container: &str, key: &str) -> StorageResult<PathBuf> {
        validate_key(container)?;
        validate_key(key)?;
        Ok(self.root.join(container).join(key))
    }
}

impl ObjectStore for FilesystemStore {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    fn put(&self, container: &str, key: &str, body: &[u8]) -> StorageResult<()> {
        let path = self.object_path(container, key)?;
        write_atomic(&path, body)?;
        Ok(())
    }

    fn get(&self, container: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.object_path(container, key)?;
        match fs::read(&path) {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, container: &str, prefix: &str) -> StorageResult<Vec<String>> {
        validate_key(container)?;
        let base = self.root.join(container);

        let mut keys = Vec::new();
        if base.is_dir() {
            collect_keys(&base, "", &mut keys)?;
        }

        keys.retain(|key| key.starts_with(prefix) && !is_temp_name(key));
        keys.sort();
        Ok(keys)
    }
}

fn collect_keys(dir: &Path, relative: &str, keys: &mut Vec<String>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let key = if relative.is_empty() {
            name
        } else {
            format!("{}/{}", relative, name)
        };

        if entry.file_type()?.is_dir() {
            collect_keys(&entry.path(), &key, keys)?;
        } else {
            keys.push(key);
        }
    }
    Ok(())
}

const TEMP_SUFFIX: &str = ".partial";

fn is_temp_name(name: &str) -> bool {
    name.ends_with(TEMP_SUFFIX)
}

/// Atomically replaces the file at `path` with `body`
///
/// Parent directories are created as needed. A reader sees either the old
/// content or the new content, never a partial write.
pub fn write_atomic(path: &Path, body: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let mut temp_name = file_name.to_os_string();
    temp_name.push(TEMP_SUFFIX);
    let temp_path = parent.join(temp_name);

    {
        let mut file = File::create(&temp_path)?;
        file.write_all(body)?;
        file.sync_all()?;
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    // Persist the rename itself; not every platform lets a directory be opened
    if let Ok(dir) = File::open(&parent) {
        let _ = dir.sync_all();
    }

    Ok(())
}
