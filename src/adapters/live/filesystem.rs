//! Live filesystem adapter using `std::fs`.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::ports::filesystem::FileSystem;

/// Live filesystem adapter backed by real disk I/O.
#[derive(Debug, Default)]
pub struct LiveFileSystem;

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".tmp-{}", std::process::id()));
    path.with_file_name(name)
}

// A marker that was created but not filled would block every later caller.
fn fill_new_file<W: Write>(mut file: W, path: &Path, contents: &str) -> std::io::Result<()> {
    if let Err(e) = file.write_all(contents.as_bytes()) {
        drop(file);
        let _ = std::fs::remove_file(path);
        return Err(e);
    }
    Ok(())
}

impl FileSystem for LiveFileSystem {
    fn read_to_string(
        &self,
        path: &Path,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        ensure_parent(path)?;
        // Write beside the target and rename so readers never see a torn file.
        let temp = temp_sibling(path);
        std::fs::write(&temp, contents)?;
        if let Err(e) = std::fs::rename(&temp, path) {
            let _ = std::fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(())
    }

    fn create_new(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        ensure_parent(path)?;
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => {
                fill_new_file(file, path, contents)?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, path: &Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_creates_parents_and_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/state/graph.json");
        let fs = LiveFileSystem;

        fs.write(&path, "one").unwrap();
        fs.write(&path, "two").unwrap();

        assert_eq!(fs.read_to_string(&path).unwrap(), "two");
        assert!(!temp_sibling(&path).exists());
    }

    #[test]
    fn create_new_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/graph.json.lock");
        let fs = LiveFileSystem;

        assert!(fs.create_new(&path, "owner-a").unwrap());
        assert!(!fs.create_new(&path, "owner-b").unwrap());
        assert_eq!(fs.read_to_string(&path).unwrap(), "owner-a");
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_marker_write_leaves_no_marker_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json.lock");
        std::fs::write(&path, "").unwrap();

        let err = fill_new_file(FailingWriter, &path, "owner-a").unwrap_err();

        assert_eq!(err.to_string(), "disk full");
        assert!(!path.exists());
        let fs = LiveFileSystem;
        assert!(fs.create_new(&path, "owner-b").unwrap());
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marker");
        let fs = LiveFileSystem;

        fs.create_new(&path, "x").unwrap();
        fs.remove(&path).unwrap();
        fs.remove(&path).unwrap();
        assert!(!fs.exists(&path));
    }
}
