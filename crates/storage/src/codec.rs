// ---------------------------------------------------------------------------
// codec – Blueprint <-> bytes, and the file helpers built on it
// ---------------------------------------------------------------------------
//
// On encode: Blueprint -> StoredBlueprint -> bitcode -> (lz4 if large)
//            -> prepend header (checksum of the uncompressed payload)
// On decode: check header -> (decompress) -> verify length and checksum
//            -> bitcode -> StoredBlueprint -> Blueprint

use std::path::Path;

use blueprint::Blueprint;

use crate::atomic_write::atomic_write;
use crate::content_id::ContentId;
use crate::file_header::{parse_header, payload_checksum, FileHeader, HEADER_SIZE};
use crate::storage_error::StorageError;
use crate::stored_types::StoredBlueprint;

/// Payloads at least this large are lz4-compressed.
pub const COMPRESSION_THRESHOLD: usize = 4096;

/// Encode `bp` into a self-describing byte buffer.
///
/// Encoding is deterministic: equal blueprints (including anchor hint and
/// entity order) always produce identical bytes.
pub fn encode_blueprint(bp: &Blueprint) -> Result<Vec<u8>, StorageError> {
    let payload = bitcode::encode(&StoredBlueprint::from_blueprint(bp));
    let compress = payload.len() >= COMPRESSION_THRESHOLD;
    let header = FileHeader::for_payload(&payload, compress)?;

    let body = if compress {
        lz4_flex::compress_prepend_size(&payload)
    } else {
        payload
    };
    let mut out = Vec::with_capacity(HEADER_SIZE + body.len());
    header.write_to(&mut out);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decode bytes produced by [`encode_blueprint`].
pub fn decode_blueprint(bytes: &[u8]) -> Result<Blueprint, StorageError> {
    let (header, body) = parse_header(bytes)?;
    let decompressed;
    let payload = if header.is_compressed() {
        decompressed = lz4_flex::decompress_size_prepended(body)?;
        decompressed.as_slice()
    } else {
        body
    };

    if payload.len() != header.uncompressed_size as usize {
        return Err(StorageError::Corrupt(format!(
            "payload is {} bytes, header says {}",
            payload.len(),
            header.uncompressed_size
        )));
    }
    let actual = payload_checksum(payload);
    if actual != header.checksum {
        return Err(StorageError::ChecksumMismatch {
            expected: header.checksum,
            actual,
        });
    }

    let stored: StoredBlueprint = bitcode::decode(payload)?;
    stored.into_blueprint()
}

/// Encode and atomically write `bp` to `path`. Returns the content id of the
/// written bytes.
pub fn save_to_file(bp: &Blueprint, path: impl AsRef<Path>) -> Result<ContentId, StorageError> {
    let bytes = encode_blueprint(bp)?;
    atomic_write(path.as_ref(), &bytes)?;
    Ok(ContentId::of_bytes(&bytes))
}

pub fn load_from_file(path: impl AsRef<Path>) -> Result<Blueprint, StorageError> {
    let bytes = std::fs::read(path)?;
    decode_blueprint(&bytes)
}
