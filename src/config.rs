//! Remote registry and rolling-code persistence.
//!
//! [`ConfigStore`] owns every registered remote: its display name, its
//! 24-bit identifier, and the per-remote rolling code that receivers use
//! to reject replays. [`RollingCodeStore`] wraps the registry with the
//! durable-commit discipline the protocol demands: a rolling code is
//! advanced and flushed to storage *before* the frame carrying it is
//! built, and a failed flush rolls the advance back, so a code is never
//! spent without a durable record of it.
//!
//! ## Serialization
//!
//! The registry serializes to a flat blob: a `u8` record count, then
//! per remote `u32 remote id`, `u16 rolling code`, `u8 name length` and
//! the name bytes. Integers are little-endian; the format carries no
//! byte-order tag, so every producer and consumer of the blob must agree
//! on this. Records are written in insertion order, which keeps the
//! blob deterministic for a given store history.
//!
//! ## Exclusivity
//!
//! Mutating operations take `&mut self`, so within one context the
//! borrow checker provides the mutual exclusion. When the store is
//! shared across contexts it lives inside the same
//! `critical_section::Mutex` global as the rest of the controller (see
//! [`crate::timer`]); the critical section then spans the in-memory
//! advance *and* the durable write, closing the lost-update race, while
//! RF playback itself happens outside any lock.

use crate::consts::{CONFIG_KEY, CONFIG_NAMESPACE, MAX_NAME_LEN, RECORD_HEADER_LEN};
#[cfg(not(feature = "std"))]
use crate::consts::{CONFIG_BLOB_MAX_LEN, MAX_REMOTES};
use crate::storage::{BlobStore, BlobTransport, NoTransport, StorageError};
use thiserror::Error;

/// A 24-bit remote identifier.
pub type Remote = u32;

/// A per-remote rolling security code.
pub type RollingCode = u16;

#[cfg(feature = "std")]
type Name = String;
#[cfg(not(feature = "std"))]
type Name = heapless::String<MAX_NAME_LEN>;

/// Serialized form of a [`ConfigStore`].
#[cfg(feature = "std")]
pub type ConfigBlob = Vec<u8>;
/// Serialized form of a [`ConfigStore`].
#[cfg(not(feature = "std"))]
pub type ConfigBlob = heapless::Vec<u8, CONFIG_BLOB_MAX_LEN>;

/// Errors reported by the config store and rolling-code store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The remote id is not registered. Remotes must be registered
    /// before they can be commanded.
    #[error("remote is not registered")]
    NotFound,
    /// The remote id is already registered.
    #[error("remote is already registered")]
    AlreadyExists,
    /// Remote id wider than 24 bits or name longer than 255 bytes.
    /// Rejected before any state mutation.
    #[error("invalid remote id or name")]
    InvalidArgument,
    /// The store cannot hold more remotes (the serialization format
    /// caps records at 255; no_std builds cap lower).
    #[error("remote store is full")]
    Capacity,
    /// The persisted blob does not parse. Proceeding would risk
    /// transmitting with a reused rolling code, so bootstrap should
    /// treat this as fatal rather than start from an empty store.
    #[error("persisted config blob is corrupt")]
    Corrupt,
    /// The durable storage layer failed.
    #[error("storage failure")]
    Storage(#[from] StorageError),
}

/// One registered remote: name, identifier, and next rolling code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    name: Name,
    /// 24-bit remote identifier, unique within a store.
    pub remote: Remote,
    /// The rolling code most recently issued for this remote.
    pub rolling_code: RollingCode,
}

impl RemoteConfig {
    /// The remote's display name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Insertion-ordered collection of [`RemoteConfig`] keyed by remote id.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    #[cfg(feature = "std")]
    remotes: Vec<RemoteConfig>,
    #[cfg(not(feature = "std"))]
    remotes: heapless::Vec<RemoteConfig, MAX_REMOTES>,
}

#[cfg(feature = "std")]
fn append(blob: &mut ConfigBlob, bytes: &[u8]) {
    blob.extend_from_slice(bytes);
}

// Capacity is sized for MAX_REMOTES records of MAX_NAME_LEN names, so
// the extend cannot fail for a store that passed registration checks.
#[cfg(not(feature = "std"))]
fn append(blob: &mut ConfigBlob, bytes: &[u8]) {
    let _ = blob.extend_from_slice(bytes);
}

impl ConfigStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered remotes.
    pub fn len(&self) -> usize {
        self.remotes.len()
    }

    /// Whether no remotes are registered.
    pub fn is_empty(&self) -> bool {
        self.remotes.is_empty()
    }

    /// Registered remotes in insertion order.
    pub fn as_slice(&self) -> &[RemoteConfig] {
        &self.remotes
    }

    /// Looks up a remote by exact id match.
    pub fn get(&self, remote: Remote) -> Option<&RemoteConfig> {
        self.remotes.iter().find(|r| r.remote == remote)
    }

    /// Registers a new remote with its initial rolling code.
    ///
    /// # Errors
    /// [`ConfigError::InvalidArgument`] for ids wider than 24 bits or
    /// names longer than 255 bytes, [`ConfigError::AlreadyExists`] for
    /// duplicate ids, [`ConfigError::Capacity`] when the store is full.
    pub fn register(
        &mut self,
        remote: Remote,
        name: &str,
        initial_code: RollingCode,
    ) -> Result<(), ConfigError> {
        self.insert(remote, name, initial_code)
    }

    /// Deregisters a remote, returning its record.
    pub fn remove(&mut self, remote: Remote) -> Result<RemoteConfig, ConfigError> {
        let idx = self
            .remotes
            .iter()
            .position(|r| r.remote == remote)
            .ok_or(ConfigError::NotFound)?;
        Ok(self.remotes.remove(idx))
    }

    /// Advances the remote's rolling code by one and returns the new
    /// value.
    ///
    /// The code wraps at the 16-bit boundary; receivers track codes
    /// modulo 2^16.
    pub fn increment(&mut self, remote: Remote) -> Result<RollingCode, ConfigError> {
        let entry = self
            .remotes
            .iter_mut()
            .find(|r| r.remote == remote)
            .ok_or(ConfigError::NotFound)?;
        entry.rolling_code = entry.rolling_code.wrapping_add(1);
        Ok(entry.rolling_code)
    }

    pub(crate) fn decrement(&mut self, remote: Remote) {
        if let Some(entry) = self.remotes.iter_mut().find(|r| r.remote == remote) {
            entry.rolling_code = entry.rolling_code.wrapping_sub(1);
        }
    }

    fn insert(
        &mut self,
        remote: Remote,
        name: &str,
        code: RollingCode,
    ) -> Result<(), ConfigError> {
        if remote > 0x00ff_ffff || name.len() > MAX_NAME_LEN {
            return Err(ConfigError::InvalidArgument);
        }
        if self.remotes.len() >= u8::MAX as usize {
            return Err(ConfigError::Capacity);
        }
        if self.get(remote).is_some() {
            return Err(ConfigError::AlreadyExists);
        }

        #[cfg(feature = "std")]
        let entry = RemoteConfig {
            name: name.into(),
            remote,
            rolling_code: code,
        };
        #[cfg(not(feature = "std"))]
        let entry = RemoteConfig {
            name: Name::try_from(name).map_err(|_| ConfigError::InvalidArgument)?,
            remote,
            rolling_code: code,
        };

        #[cfg(feature = "std")]
        self.remotes.push(entry);
        #[cfg(not(feature = "std"))]
        self.remotes
            .push(entry)
            .map_err(|_| ConfigError::Capacity)?;
        Ok(())
    }

    /// Serializes the store to its flat little-endian blob.
    pub fn serialize(&self) -> ConfigBlob {
        let mut blob = ConfigBlob::new();
        append(&mut blob, &[self.remotes.len() as u8]);
        for entry in &self.remotes {
            append(&mut blob, &entry.remote.to_le_bytes());
            append(&mut blob, &entry.rolling_code.to_le_bytes());
            append(&mut blob, &[entry.name.len() as u8]);
            append(&mut blob, entry.name.as_bytes());
        }
        blob
    }

    /// Reconstructs a store from its serialized blob.
    ///
    /// # Errors
    /// [`ConfigError::Corrupt`] for truncated records, trailing bytes,
    /// duplicate remote ids, or non-UTF-8 names;
    /// [`ConfigError::Capacity`] when the blob holds more remotes than
    /// this build can store.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, ConfigError> {
        let (&count, mut rest) = bytes.split_first().ok_or(ConfigError::Corrupt)?;
        let mut store = Self::new();
        for _ in 0..count {
            if rest.len() < RECORD_HEADER_LEN {
                return Err(ConfigError::Corrupt);
            }
            let remote = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]);
            let code = u16::from_le_bytes([rest[4], rest[5]]);
            let name_len = rest[6] as usize;
            rest = &rest[RECORD_HEADER_LEN..];
            if rest.len() < name_len {
                return Err(ConfigError::Corrupt);
            }
            let name = core::str::from_utf8(&rest[..name_len]).map_err(|_| ConfigError::Corrupt)?;
            rest = &rest[name_len..];
            match store.insert(remote, name, code) {
                Ok(()) => {}
                Err(ConfigError::Capacity) => return Err(ConfigError::Capacity),
                Err(_) => return Err(ConfigError::Corrupt),
            }
        }
        if !rest.is_empty() {
            return Err(ConfigError::Corrupt);
        }
        Ok(store)
    }
}

/// The authoritative, persisted rolling-code counter per remote.
///
/// Owns the [`ConfigStore`], the durable [`BlobStore`] it commits to,
/// and an optional best-effort [`BlobTransport`] for off-device backup.
#[derive(Debug)]
pub struct RollingCodeStore<S: BlobStore, T: BlobTransport = NoTransport> {
    config: ConfigStore,
    blobs: S,
    transport: Option<T>,
}

impl<S: BlobStore, T: BlobTransport> RollingCodeStore<S, T> {
    /// Loads the persisted store, or starts empty when nothing has been
    /// persisted yet (first boot).
    ///
    /// # Errors
    /// [`ConfigError::Corrupt`] or [`ConfigError::Storage`] when a blob
    /// exists but cannot be read back; bootstrap should abort on these
    /// rather than proceed with an inconsistent rolling-code base.
    pub fn load(blobs: S, transport: Option<T>) -> Result<Self, ConfigError> {
        let mut blobs = blobs;
        let config = match blobs.size(CONFIG_NAMESPACE, CONFIG_KEY) {
            Err(StorageError::NotFound) => {
                rts_warn!("no persisted config found; starting with an empty store");
                ConfigStore::new()
            }
            Err(err) => return Err(ConfigError::Storage(err)),
            Ok(size) => {
                #[cfg(feature = "std")]
                let mut buf = vec![0u8; size];
                #[cfg(not(feature = "std"))]
                let mut buf = [0u8; CONFIG_BLOB_MAX_LEN];
                #[cfg(not(feature = "std"))]
                if size > CONFIG_BLOB_MAX_LEN {
                    return Err(ConfigError::Capacity);
                }
                let n = blobs.read(CONFIG_NAMESPACE, CONFIG_KEY, &mut buf)?;
                ConfigStore::deserialize(&buf[..n])?
            }
        };
        rts_info!("config loaded ({} remotes)", config.len());
        Ok(Self {
            config,
            blobs,
            transport,
        })
    }

    /// The registered remotes.
    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// The rolling code most recently issued for a remote.
    pub fn rolling_code(&self, remote: Remote) -> Option<RollingCode> {
        self.config.get(remote).map(|r| r.rolling_code)
    }

    /// Advances the remote's rolling code and commits the whole store
    /// durably before returning the new code.
    ///
    /// On a storage failure the in-memory advance is rolled back: the
    /// code is only ever considered spent once its durable record
    /// exists. A code reused after power loss would be silently
    /// rejected by the receiver, or worse, land outside its replay
    /// window.
    pub fn advance_and_persist(&mut self, remote: Remote) -> Result<RollingCode, ConfigError> {
        let code = self.config.increment(remote)?;
        if let Err(err) = self.persist() {
            self.config.decrement(remote);
            return Err(ConfigError::Storage(err));
        }
        Ok(code)
    }

    /// Registers a remote and persists the updated store.
    pub fn register(
        &mut self,
        remote: Remote,
        name: &str,
        initial_code: RollingCode,
    ) -> Result<(), ConfigError> {
        self.config.register(remote, name, initial_code)?;
        if let Err(err) = self.persist() {
            let _ = self.config.remove(remote);
            return Err(ConfigError::Storage(err));
        }
        Ok(())
    }

    /// Deregisters a remote and persists the updated store.
    pub fn remove(&mut self, remote: Remote) -> Result<(), ConfigError> {
        let removed = self.config.remove(remote)?;
        if let Err(err) = self.persist() {
            let _ = self
                .config
                .insert(removed.remote, removed.name(), removed.rolling_code);
            return Err(ConfigError::Storage(err));
        }
        Ok(())
    }

    fn persist(&mut self) -> Result<(), StorageError> {
        let blob = self.config.serialize();
        self.blobs.write(CONFIG_NAMESPACE, CONFIG_KEY, &blob)?;
        if let Some(transport) = self.transport.as_mut() {
            // Best-effort backup; a failure never fails the command.
            if transport.upload(&blob).is_err() {
                rts_warn!("config backup upload failed");
            }
        }
        Ok(())
    }
}
