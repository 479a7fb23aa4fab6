//! Whole-file persistence for encrypted boxes.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::crypto::secure_random;

/// Separates the target name from the random suffix of a pending write.
const TMP_INFIX: &str = ".tmp.";
/// Hex digits in that suffix (8 random bytes).
const TMP_SUFFIX_LEN: usize = 16;

/// A single file on disk that is always replaced as a whole.
///
/// Writes never truncate the existing file in place: data goes to a sibling
/// temporary file which is then renamed over the target.
#[derive(Clone, Debug)]
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns `true` if the storage file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Loads the entire file into memory.
    pub fn load(&self) -> Result<Vec<u8>> {
        fs::read(&self.path).with_context(|| format!("failed to read {}", self.path.display()))
    }

    /// Size of the file on disk in bytes.
    pub fn size(&self) -> Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    /// Saves data to the file using atomic write.
    ///
    /// 1. write to a temporary file with a random name in the same directory
    /// 2. fsync the temporary file
    /// 3. atomically replace the target with it
    /// 4. fsync the parent directory so the rename is persisted
    ///
    /// A crash at any point leaves either the old or the new file in place.
    /// Parent directories are created if missing.
    pub fn save(&self, data: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.random_tmp_path()?;
        debug!(path = %self.path.display(), bytes = data.len(), "writing file atomically");

        let mut tmp_file = create_private(&tmp_path).context("failed to create temporary file")?;

        if let Err(e) = tmp_file.write_all(data).and_then(|_| tmp_file.sync_all()) {
            drop(tmp_file);
            let _ = fs::remove_file(&tmp_path);
            return Err(e).context("failed to write temporary file");
        }
        drop(tmp_file);

        if let Err(e) = self.atomic_replace(&tmp_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        #[cfg(not(target_os = "windows"))]
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            let dir = File::open(parent)?;
            dir.sync_all()?;
        }

        Ok(())
    }

    /// Deletes the file.
    pub fn remove(&self) -> Result<()> {
        fs::remove_file(&self.path)
            .with_context(|| format!("failed to remove {}", self.path.display()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling path `filename.tmp.<randomhex>` for the pending write.
    fn random_tmp_path(&self) -> Result<PathBuf> {
        let mut buf = [0u8; 8];
        secure_random(&mut buf)?;

        let rand_string = buf.iter().map(|b| format!("{:02x}", b)).collect::<String>();

        let file_name = self
            .path
            .file_name()
            .with_context(|| format!("{} has no file name", self.path.display()))?
            .to_string_lossy();

        Ok(self
            .path
            .with_file_name(format!("{file_name}{TMP_INFIX}{rand_string}")))
    }

    /// Atomically replaces the target file with the temporary file.
    ///
    /// `ReplaceFileW` requires the target to exist, so a first save falls
    /// back to a plain rename.
    #[cfg(target_os = "windows")]
    fn atomic_replace(&self, tmp_path: &Path) -> Result<()> {
        use std::ffi::OsStr;
        use std::os::windows::ffi::OsStrExt;
        use windows_sys::Win32::Storage::FileSystem::{REPLACEFILE_WRITE_THROUGH, ReplaceFileW};

        if !self.path.exists() {
            fs::rename(tmp_path, &self.path)?;
            return Ok(());
        }

        fn to_wide(s: &OsStr) -> Vec<u16> {
            s.encode_wide().chain(std::iter::once(0)).collect()
        }

        let target_w = to_wide(self.path.as_os_str());
        let tmp_w = to_wide(tmp_path.as_os_str());

        // SAFETY:
        // - Strings are valid UTF-16 and null-terminated
        // - Pointers remain valid during the call
        // - Windows does not retain the pointers after return
        let result = unsafe {
            ReplaceFileW(
                target_w.as_ptr(),
                tmp_w.as_ptr(),
                std::ptr::null(),
                REPLACEFILE_WRITE_THROUGH,
                std::ptr::null(),
                std::ptr::null(),
            )
        };

        if result == 0 {
            let err = std::io::Error::last_os_error();
            return Err(err).context("atomic replace failed");
        }

        Ok(())
    }

    /// On Unix, `rename()` is atomic when both paths are on the same filesystem.
    #[cfg(not(target_os = "windows"))]
    fn atomic_replace(&self, tmp_path: &Path) -> Result<()> {
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }
}

/// True for `<name>.tmp.<16 lowercase hex>`, the temporary file of a save
/// that did not finish.
pub fn is_pending_write(file_name: &str) -> bool {
    file_name
        .rsplit_once(TMP_INFIX)
        .is_some_and(|(stem, suffix)| {
            !stem.is_empty()
                && suffix.len() == TMP_SUFFIX_LEN
                && suffix.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        })
}

/// Creates a new file (failing if it exists) readable only by the owner.
fn create_private(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options.open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn pending_write_names() {
        let storage = Storage::new(PathBuf::from("/boxes/work"));
        let tmp = storage.random_tmp_path().unwrap();
        let tmp_name = tmp.file_name().unwrap().to_str().unwrap();
        assert!(is_pending_write(tmp_name));

        assert!(is_pending_write("work.tmp.0123456789abcdef"));
        assert!(!is_pending_write("work.tmp.old"));
        assert!(!is_pending_write("work.tmp.0123456789ABCDEF"));
        assert!(!is_pending_write("work.tmp.0123456789abcdef0"));
        assert!(!is_pending_write(".tmp.0123456789abcdef"));
        assert!(!is_pending_write("work"));
    }

    #[test]
    fn load_returns_written_data() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("box"));
        storage.save(b"hello world").unwrap();

        assert_eq!(storage.load().unwrap(), b"hello world");
        assert_eq!(storage.size().unwrap(), 11);
    }

    #[test]
    fn load_fails_if_file_does_not_exist() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("missing"));

        assert!(!storage.exists());
        assert!(storage.load().is_err());
    }

    #[test]
    fn tmp_path_is_a_unique_sibling() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("box");
        let storage = Storage::new(path.clone());

        let a = storage.random_tmp_path().unwrap();
        let b = storage.random_tmp_path().unwrap();

        assert_eq!(a.parent(), path.parent());
        assert_ne!(a, path);
        assert_ne!(a, b);
    }

    #[test]
    fn save_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("box");
        let storage = Storage::new(path.clone());

        storage.save(b"first").unwrap();
        storage.save(b"second, and longer").unwrap();
        storage.save(b"third").unwrap();

        assert_eq!(fs::read(path).unwrap(), b"third");
    }

    #[test]
    fn tmp_file_is_removed_after_success() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("box"));
        storage.save(b"data").unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();

        assert_eq!(entries, ["box"]);
    }

    #[test]
    fn parent_directory_is_created() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("box");

        Storage::new(nested.clone()).save(b"data").unwrap();
        assert!(nested.exists());
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("box");
        Storage::new(path.clone()).save(b"data").unwrap();

        let mode = fs::metadata(path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn remove_deletes_file() {
        let dir = tempdir().unwrap();
        let storage = Storage::new(dir.path().join("box"));
        storage.save(b"data").unwrap();

        storage.remove().unwrap();
        assert!(!storage.exists());
    }
}
