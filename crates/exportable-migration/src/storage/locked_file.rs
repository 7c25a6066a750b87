//! Locked file access with atomic writes.
//!
//! Readers take a shared lock for the duration of the read only; writers
//! take an exclusive lock and replace the file via tmp file + atomic
//! rename, so a concurrent reader never observes a half-written file.
//! Lock acquisition is bounded: this code runs inside request-serving
//! paths and must fail with `IndexLocked` rather than hang.

use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;

use exportable_core::{MigrationError, Result};

/// Default bound on lock acquisition before `IndexLocked` is returned.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Clone, Copy)]
enum LockMode {
    Shared,
    Exclusive,
}

/// A file lock guard that releases the lock when dropped.
///
/// Locks are taken on a sibling `<name>.lock` file rather than the
/// target itself, so a writer can atomically rename over the target
/// while holding the lock. The lock file is left in place; the advisory
/// lock itself releases with the handle, and removing the file would
/// let a late-arriving locker acquire a fresh inode behind a waiter.
struct FileLock {
    _file: File,
}

impl FileLock {
    fn acquire(target: &Path, mode: LockMode, timeout: Duration) -> Result<Self> {
        let lock_path = lock_path_for(target);

        if let Some(parent) = lock_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&lock_path)?;

        let deadline = Instant::now() + timeout;
        loop {
            let attempt = match mode {
                LockMode::Shared => FileExt::try_lock_shared(&file),
                LockMode::Exclusive => FileExt::try_lock_exclusive(&file),
            };
            match attempt {
                Ok(()) => return Ok(FileLock { _file: file }),
                Err(_) if Instant::now() < deadline => {
                    std::thread::sleep(LOCK_RETRY_INTERVAL);
                }
                Err(_) => {
                    tracing::warn!(
                        "Gave up waiting for lock on {} after {:?}",
                        target.display(),
                        timeout
                    );
                    return Err(MigrationError::index_locked(target.display()));
                }
            }
        }
    }
}

fn lock_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index".to_string());
    name.push_str(".lock");
    target.with_file_name(name)
}

fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().ok_or_else(|| {
        MigrationError::io(format!("{}: path has no parent directory", target.display()))
    })?;
    let file_name = target.file_name().ok_or_else(|| {
        MigrationError::io(format!("{}: path has no file name", target.display()))
    })?;
    let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
    Ok(parent.join(tmp_name))
}

/// Reads the whole file under a shared lock with the default bound.
pub fn read_locked(path: &Path) -> Result<Vec<u8>> {
    read_locked_timeout(path, DEFAULT_LOCK_TIMEOUT)
}

/// Reads the whole file under a shared lock.
///
/// The lock is held for the duration of the read only.
///
/// # Errors
///
/// Returns `IndexMissing` if the file does not exist and `IndexLocked`
/// if the lock is not acquired within `timeout`.
pub fn read_locked_timeout(path: &Path, timeout: Duration) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(MigrationError::index_missing(path.display()));
    }

    let _lock = FileLock::acquire(path, LockMode::Shared, timeout)?;
    let bytes = fs::read(path)?;
    Ok(bytes)
}

/// Replaces the file's contents under an exclusive lock with the
/// default bound.
pub fn write_locked(path: &Path, bytes: &[u8]) -> Result<()> {
    write_locked_timeout(path, bytes, DEFAULT_LOCK_TIMEOUT)
}

/// Replaces the file's contents under an exclusive lock.
///
/// Writes to a temporary file in the same directory, fsyncs, then
/// renames over the target.
///
/// # Errors
///
/// Returns `IndexLocked` if the lock is not acquired within `timeout`.
pub fn write_locked_timeout(path: &Path, bytes: &[u8], timeout: Duration) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let _lock = FileLock::acquire(path, LockMode::Exclusive, timeout)?;

    let tmp_path = temp_path_for(path)?;
    let mut tmp_file = File::create(&tmp_path)?;
    tmp_file.write_all(bytes)?;

    // Ensure data is on disk before the rename makes it visible
    tmp_file.sync_all()?;
    drop(tmp_file);

    fs::rename(&tmp_path, path)?;

    Ok(())
}
