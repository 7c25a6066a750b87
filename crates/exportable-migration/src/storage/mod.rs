//! Locked, atomic file storage for the migration index.

mod locked_file;

pub use locked_file::{
    read_locked, read_locked_timeout, write_locked, write_locked_timeout, DEFAULT_LOCK_TIMEOUT,
};
