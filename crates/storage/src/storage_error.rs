// ---------------------------------------------------------------------------
// StorageError: failures while writing or reading blueprint files
// ---------------------------------------------------------------------------

use std::fmt;

use blueprint::BlueprintError;

/// Errors that can occur while encoding, decoding, saving or loading a
/// blueprint.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error (file not found, permission denied, disk full, etc.)
    Io(std::io::Error),
    /// The blueprint could not be encoded.
    Encode(String),
    /// Bitcode decoding failed (corrupt or invalid payload).
    Decode(String),
    /// The lz4 block could not be decompressed.
    Decompress(String),
    ChecksumMismatch { expected: u32, actual: u32 },
    /// The bytes do not start with the blueprint magic.
    InvalidMagic,
    /// File format version is newer than this build supports.
    VersionMismatch { expected_max: u32, found: u32 },
    /// Structurally invalid file (truncated header, unknown flags, length
    /// mismatch).
    Corrupt(String),
    /// The decoded parts do not form a valid blueprint.
    Blueprint(BlueprintError),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "I/O error: {e}"),
            StorageError::Encode(msg) => write!(f, "Encoding error: {msg}"),
            StorageError::Decode(msg) => write!(f, "Decoding error: {msg}"),
            StorageError::Decompress(msg) => write!(f, "Decompression error: {msg}"),
            StorageError::ChecksumMismatch { expected, actual } => write!(
                f,
                "Blueprint file is corrupted: checksum mismatch (expected {expected:#010X}, got {actual:#010X})"
            ),
            StorageError::InvalidMagic => write!(f, "Not a blueprint file (bad magic bytes)"),
            StorageError::VersionMismatch {
                expected_max,
                found,
            } => write!(
                f,
                "Version mismatch: file is v{found}, but this build only supports up to v{expected_max}"
            ),
            StorageError::Corrupt(msg) => write!(f, "Corrupt blueprint file: {msg}"),
            StorageError::Blueprint(e) => write!(f, "Invalid blueprint: {e}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(e) => Some(e),
            StorageError::Blueprint(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

impl From<bitcode::Error> for StorageError {
    fn from(e: bitcode::Error) -> Self {
        StorageError::Decode(e.to_string())
    }
}

impl From<lz4_flex::block::DecompressError> for StorageError {
    fn from(e: lz4_flex::block::DecompressError) -> Self {
        StorageError::Decompress(e.to_string())
    }
}

impl From<BlueprintError> for StorageError {
    fn from(e: BlueprintError) -> Self {
        StorageError::Blueprint(e)
    }
}
