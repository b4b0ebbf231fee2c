//! Shared infrastructure utilities for Daily Check-In.
//!
//! Cross-cutting helpers that the store and config crates need but that do not
//! belong in the domain-pure `checkin-types` crate:
//!
//! - **`atomic_write`**: crash-safe file persistence (temp + rename)

pub mod atomic_write;

pub use atomic_write::{
    AtomicWriteOptions, FileSyncPolicy, ParentDirSyncPolicy, PersistMode, atomic_write,
    atomic_write_with_options, ensure_private_dir, read_if_exists, recover_bak_file,
    remove_if_exists,
};
