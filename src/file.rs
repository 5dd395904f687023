// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::{fs::File, path::Path};

pub const MAGIC_BYTES: [u8; 4] = [b'T', b'D', b'B', 1];

/// Suffix appended to a record file that failed an integrity check.
pub const CORRUPT_SUFFIX: &str = "corrupt";

/// Atomically materializes a file from a fully written temp file.
///
/// The temp file must live in the same directory as the target so the rename
/// cannot cross file systems. On failure the temp file is cleaned up by its
/// guard, leaving no partial target behind.
pub fn persist_atomic(temp: tempfile::NamedTempFile, path: &Path) -> std::io::Result<()> {
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    // Windows cannot open a directory handle for syncing, so the rename's
    // durability is left to the OS there
    #[cfg(not(target_os = "windows"))]
    {
        let file = File::open(path)?;
        file.sync_all()?;

        if let Some(folder) = path.parent() {
            fsync_directory(folder)?;
        }
    }

    Ok(())
}

#[cfg(not(target_os = "windows"))]
pub fn fsync_directory(path: &Path) -> std::io::Result<()> {
    let file = File::open(path)?;
    debug_assert!(file.metadata()?.is_dir());
    file.sync_all()
}

#[cfg(target_os = "windows")]
pub fn fsync_directory(_path: &Path) -> std::io::Result<()> {
    // No directory handles here, see persist_atomic
    Ok(())
}

/// Renames a file in place to mark it as corrupt.
pub fn quarantine(path: &Path) -> std::io::Result<()> {
    let mut renamed = path.as_os_str().to_os_string();
    renamed.push(".");
    renamed.push(CORRUPT_SUFFIX);
    std::fs::rename(path, &renamed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use test_log::test;

    #[test]
    fn atomic_persist() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("test.bin");

        let mut temp = tempfile::NamedTempFile::new_in(dir.path())?;
        temp.write_all(b"newcontent")?;
        persist_atomic(temp, &path)?;

        assert_eq!(b"newcontent".as_slice(), std::fs::read(&path)?);

        Ok(())
    }

    #[test]
    fn quarantine_renames() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("t.adb.lzma");
        std::fs::write(&path, b"junk")?;

        quarantine(&path)?;

        assert!(!path.try_exists()?);
        assert!(dir.path().join("t.adb.lzma.corrupt").try_exists()?);

        Ok(())
    }
}
