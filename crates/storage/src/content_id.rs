//! Content addressing for encoded blueprints.

use std::fmt;

use blueprint::Blueprint;
use xxhash_rust::xxh3::xxh3_128;

use crate::codec::encode_blueprint;
use crate::storage_error::StorageError;

/// xxh3-128 digest of a blueprint's encoded bytes.
///
/// Encoding is deterministic, so two blueprints share an id exactly when
/// they encode identically, wherever they were loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(pub u128);

impl ContentId {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(xxh3_128(bytes))
    }

    pub fn of_blueprint(bp: &Blueprint) -> Result<Self, StorageError> {
        Ok(Self::of_bytes(&encode_blueprint(bp)?))
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}
