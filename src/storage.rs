//! Durable-storage and backup-transport seams.
//!
//! The rolling-code store treats persistence as an opaque byte-blob
//! sink keyed by namespace and key, which is exactly the shape of an
//! embedded flash key-value store. Platforms implement [`BlobStore`]
//! over their storage peripheral; hosts and tests use
//! [`MemoryBlobStore`].
//!
//! [`BlobTransport`] is the optional off-device backup channel (an HTTP
//! client in the reference deployment). It is strictly best-effort:
//! the core logs transport failures and keeps going.

use thiserror::Error;

#[cfg(feature = "std")]
use std::collections::BTreeMap;
#[cfg(feature = "std")]
use std::string::String;
#[cfg(feature = "std")]
use std::vec::Vec;

/// Errors surfaced by a [`BlobStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StorageError {
    /// No blob recorded under the namespace/key pair. Not an error at
    /// first boot; the caller starts from an empty store.
    #[error("no blob stored under this key")]
    NotFound,
    /// The storage layer failed to read or write. On the write path the
    /// caller must roll back any in-memory state the write was meant to
    /// make durable.
    #[error("storage i/o failure")]
    Io,
}

/// A key-value byte-blob store providing the durable commit for rolling
/// codes.
///
/// Implementations must make `write` atomic with respect to power loss
/// at the granularity of one key: after `write` returns `Ok`, a later
/// `read` returns the new bytes even across a reboot.
pub trait BlobStore {
    /// Writes `bytes` under `namespace`/`key`, replacing any previous
    /// blob, and commits it durably before returning.
    fn write(&mut self, namespace: &str, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Size in bytes of the stored blob, the two-phase read query.
    fn size(&mut self, namespace: &str, key: &str) -> Result<usize, StorageError>;

    /// Copies the stored blob into `buf`, returning the byte count.
    ///
    /// A `buf` smaller than the stored blob is an [`StorageError::Io`]
    /// failure; callers size it with [`BlobStore::size`] first.
    fn read(&mut self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;
}

impl<T: BlobStore + ?Sized> BlobStore for &mut T {
    fn write(&mut self, namespace: &str, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        (**self).write(namespace, key, bytes)
    }

    fn size(&mut self, namespace: &str, key: &str) -> Result<usize, StorageError> {
        (**self).size(namespace, key)
    }

    fn read(&mut self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        (**self).read(namespace, key, buf)
    }
}

/// Error surfaced by a [`BlobTransport`]. Deliberately coarse; the
/// caller only ever logs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The transfer did not complete.
    #[error("blob transport failed")]
    Failed,
}

/// Best-effort off-device transport for config-blob backups.
pub trait BlobTransport {
    /// Pushes the serialized blob to the configured backup endpoint.
    fn upload(&mut self, blob: &[u8]) -> Result<(), TransportError>;

    /// Fetches the backup blob into `buf`, returning the byte count.
    fn download(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;
}

/// Transport for deployments without an off-device backup endpoint.
///
/// Uploads report failure (and get logged once per commit by the
/// caller); downloads never yield data.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTransport;

impl BlobTransport for NoTransport {
    fn upload(&mut self, _blob: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }

    fn download(&mut self, _buf: &mut [u8]) -> Result<usize, TransportError> {
        Err(TransportError::Failed)
    }
}

/// In-memory [`BlobStore`] for host builds and tests.
///
/// Supports write-failure injection so crash-safety paths (increment
/// applied, durable write lost) can be exercised deterministically.
#[cfg(feature = "std")]
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    entries: BTreeMap<(String, String), Vec<u8>>,
    fail_writes: bool,
}

#[cfg(feature = "std")]
impl MemoryBlobStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `write` fail with [`StorageError::Io`]
    /// until switched off again.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// The raw stored blob, for test inspection.
    pub fn blob(&self, namespace: &str, key: &str) -> Option<&[u8]> {
        self.entries
            .get(&(namespace.into(), key.into()))
            .map(Vec::as_slice)
    }
}

#[cfg(feature = "std")]
impl BlobStore for MemoryBlobStore {
    fn write(&mut self, namespace: &str, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Io);
        }
        let _ = self
            .entries
            .insert((namespace.into(), key.into()), bytes.to_vec());
        Ok(())
    }

    fn size(&mut self, namespace: &str, key: &str) -> Result<usize, StorageError> {
        self.entries
            .get(&(namespace.into(), key.into()))
            .map(Vec::len)
            .ok_or(StorageError::NotFound)
    }

    fn read(&mut self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let blob = self
            .entries
            .get(&(namespace.into(), key.into()))
            .ok_or(StorageError::NotFound)?;
        if buf.len() < blob.len() {
            return Err(StorageError::Io);
        }
        buf[..blob.len()].copy_from_slice(blob);
        Ok(blob.len())
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_blobs() {
        let mut store = MemoryBlobStore::new();
        assert_eq!(store.size("ns", "k"), Err(StorageError::NotFound));

        store.write("ns", "k", b"hello").unwrap();
        assert_eq!(store.size("ns", "k"), Ok(5));

        let mut buf = [0u8; 16];
        let n = store.read("ns", "k", &mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");
    }

    #[test]
    fn undersized_read_buffer_is_an_io_error() {
        let mut store = MemoryBlobStore::new();
        store.write("ns", "k", b"hello").unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(store.read("ns", "k", &mut buf), Err(StorageError::Io));
    }

    #[test]
    fn injected_write_failure_leaves_old_blob_intact() {
        let mut store = MemoryBlobStore::new();
        store.write("ns", "k", b"old").unwrap();
        store.set_fail_writes(true);
        assert_eq!(store.write("ns", "k", b"new"), Err(StorageError::Io));
        assert_eq!(store.blob("ns", "k"), Some(&b"old"[..]));
    }
}
