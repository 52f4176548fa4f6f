//! Content-addressed download cache.
//!
//! Blobs are stored under `<root>/sha256/<digest>` and are only ever
//! written through a temporary file in the same directory followed by a
//! rename, so readers never observe a partially written blob. A per-digest
//! advisory lock keeps concurrent installers from downloading the same
//! content twice.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use fs2::FileExt;
use log::{debug, warn};

use crate::artefact::download::Deadline;
use crate::artefact::sha256_digest::Sha256Digest;

/// Pause between attempts to take a contended lock under a deadline.
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Handle on a cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentCache {
    root: Utf8PathBuf,
}

/// An exclusive lock on one digest, released on drop.
#[derive(Debug)]
pub struct CacheLock {
    file: File,
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            debug!("failed to release cache lock: {err}");
        }
    }
}

impl ContentCache {
    /// Use `root` as the cache directory. Nothing is created until the
    /// first write.
    #[must_use]
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    /// The cache directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Where the blob for `digest` lives.
    #[must_use]
    pub fn blob_path(&self, digest: &Sha256Digest) -> Utf8PathBuf {
        self.blob_dir().join(digest.as_str())
    }

    fn blob_dir(&self) -> Utf8PathBuf {
        self.root.join("sha256")
    }

    fn lock_dir(&self) -> Utf8PathBuf {
        self.root.join("locks")
    }

    /// Return the cached bytes for `digest`.
    ///
    /// The blob is re-hashed on every read. A blob that no longer matches
    /// its digest is deleted and reported as a miss.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob exists but cannot be read or removed.
    pub fn get(&self, digest: &Sha256Digest) -> io::Result<Option<Vec<u8>>> {
        let path = self.blob_path(digest);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };

        if Sha256Digest::of(&bytes) == *digest {
            debug!("cache hit for {digest}");
            return Ok(Some(bytes));
        }

        warn!("discarding corrupt cache entry {path}");
        match fs::remove_file(&path) {
            Ok(()) => Ok(None),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Store `bytes` under `digest` and return the blob path.
    ///
    /// The caller is responsible for having verified that `bytes` hash to
    /// `digest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created or the
    /// blob cannot be written and renamed into place.
    pub fn put(&self, digest: &Sha256Digest, bytes: &[u8]) -> io::Result<Utf8PathBuf> {
        let dir = self.blob_dir();
        fs::create_dir_all(&dir)?;

        let mut staged = tempfile::NamedTempFile::new_in(&dir)?;
        staged.write_all(bytes)?;
        staged.as_file().sync_all()?;

        let path = self.blob_path(digest);
        staged.persist(&path).map_err(|err| err.error)?;
        debug!("cached {digest} at {path}");
        Ok(path)
    }

    /// Wait until this process holds the download lock for `digest`.
    ///
    /// Without a deadline this blocks for as long as another holder keeps
    /// the lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be created or locked, and
    /// an [`io::ErrorKind::TimedOut`] error if `deadline` passes while the
    /// lock is held elsewhere.
    pub fn lock(
        &self,
        digest: &Sha256Digest,
        deadline: Option<Deadline>,
    ) -> io::Result<CacheLock> {
        let dir = self.lock_dir();
        fs::create_dir_all(&dir)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(dir.join(format!("{digest}.lock")))?;
        match deadline {
            None => FileExt::lock_exclusive(&file)?,
            Some(deadline) => lock_before(&file, deadline)?,
        }
        Ok(CacheLock { file })
    }
}

/// Poll for an exclusive lock on `file` until `deadline` passes.
fn lock_before(file: &File, deadline: Deadline) -> io::Result<()> {
    let contended = fs2::lock_contended_error();
    loop {
        match FileExt::try_lock_exclusive(file) {
            Ok(()) => return Ok(()),
            Err(err)
                if err.kind() == io::ErrorKind::WouldBlock
                    || err.raw_os_error() == contended.raw_os_error() => {}
            Err(err) => return Err(err),
        }
        let Some(left) = deadline.remaining() else {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "deadline passed while waiting for the cache lock",
            ));
        };
        debug!("cache lock is busy; retrying");
        thread::sleep(left.min(LOCK_RETRY_INTERVAL));
    }
}
