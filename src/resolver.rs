//! The source-path resolver collaborator (`spec.md` §1: "a source-path
//! resolver (`load(path) -> bytes`)") and the per-compile file-buffer cache
//! (`spec.md` §5).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// External collaborator interface: given a path, return its bytes. The
/// default implementation reads the filesystem; embedders (editor
/// integration, virtual filesystems) supply their own.
pub trait SourceResolver {
    fn load(&self, path: &Path) -> std::io::Result<Vec<u8>>;
    fn mtime(&self, path: &Path) -> std::io::Result<SystemTime>;
}

pub struct FsResolver;

impl SourceResolver for FsResolver {
    fn load(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn mtime(&self, path: &Path) -> std::io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }
}

/// `absolute-path -> (mtime, bytes)`, invalidated on mtime mismatch. Kept
/// per-compile to stay reproducible (`spec.md` §5).
#[derive(Default)]
pub struct FileBufferCache {
    entries: HashMap<PathBuf, (SystemTime, Vec<u8>)>,
}

impl FileBufferCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(
        &mut self,
        resolver: &dyn SourceResolver,
        path: &Path,
    ) -> std::io::Result<Vec<u8>> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        let mtime = resolver.mtime(&absolute)?;
        if let Some((cached_mtime, bytes)) = self.entries.get(&absolute) {
            if *cached_mtime == mtime {
                return Ok(bytes.clone());
            }
        }
        let bytes = resolver.load(&absolute)?;
        self.entries.insert(absolute, (mtime, bytes.clone()));
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_resolver_reads_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "hello").unwrap();
        let bytes = FsResolver.load(&path).unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn fs_resolver_reports_the_error_for_a_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.txt");
        assert!(FsResolver.load(&path).is_err());
    }

    #[test]
    fn buffer_cache_returns_the_same_bytes_on_a_repeated_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "v1").unwrap();
        let mut cache = FileBufferCache::new();
        let first = cache.load(&FsResolver, &path).unwrap();
        let second = cache.load(&FsResolver, &path).unwrap();
        assert_eq!(first, b"v1");
        assert_eq!(second, b"v1");
    }

    /// A resolver whose `mtime` is controlled directly by the test, so cache
    /// invalidation can be exercised without depending on filesystem mtime
    /// resolution granularity.
    struct FakeResolver {
        mtime: std::cell::Cell<SystemTime>,
        content: std::cell::RefCell<Vec<u8>>,
    }

    impl SourceResolver for FakeResolver {
        fn load(&self, _path: &Path) -> std::io::Result<Vec<u8>> {
            Ok(self.content.borrow().clone())
        }

        fn mtime(&self, _path: &Path) -> std::io::Result<SystemTime> {
            Ok(self.mtime.get())
        }
    }

    #[test]
    fn buffer_cache_picks_up_changes_after_mtime_advances() {
        let path = Path::new("/virtual/a.txt");
        let fake = FakeResolver {
            mtime: std::cell::Cell::new(SystemTime::UNIX_EPOCH),
            content: std::cell::RefCell::new(b"v1".to_vec()),
        };
        let mut cache = FileBufferCache::new();
        assert_eq!(cache.load(&fake, path).unwrap(), b"v1");

        *fake.content.borrow_mut() = b"v2".to_vec();
        assert_eq!(cache.load(&fake, path).unwrap(), b"v1", "stale mtime should serve the cached bytes");

        fake.mtime.set(SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1));
        assert_eq!(cache.load(&fake, path).unwrap(), b"v2");
    }
}
