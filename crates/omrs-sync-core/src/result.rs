//! Result type alias for synchronization operations

use crate::error::SyncError;

/// Standard Result type for synchronization operations
pub type Result<T> = std::result::Result<T, SyncError>;
