//! Blueprint file format: a checksummed, optionally lz4-compressed bitcode
//! encoding, atomic file writes, content ids and an async loading plugin.

pub mod atomic_write;
pub mod codec;
pub mod content_id;
pub mod file_header;
pub mod loader;
pub mod storage_error;
pub mod stored_types;

pub use codec::{decode_blueprint, encode_blueprint, load_from_file, save_to_file};
pub use content_id::ContentId;
pub use loader::{
    BlueprintCache, BlueprintLoadFailed, BlueprintLoaded, BlueprintSaved, LoadBlueprint,
    SaveBlueprint, StoragePlugin,
};
pub use storage_error::StorageError;
