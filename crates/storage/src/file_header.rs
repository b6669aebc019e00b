// ---------------------------------------------------------------------------
// file_header – Blueprint file header with magic bytes, version, and checksum
// ---------------------------------------------------------------------------
//
// Header format (20 bytes, fixed-size, little-endian):
//   [0..4]   Magic bytes: "BLPR" (0x424C5052)
//   [4..8]   Format version (u32)
//   [8..12]  Flags (u32: bit 0 = lz4 compressed)
//   [12..16] Uncompressed payload size (u32)
//   [16..20] xxHash32 checksum of the uncompressed payload
//
// There is deliberately no timestamp: the same blueprint always encodes to
// the same bytes.

use xxhash_rust::xxh32::xxh32;

use crate::storage_error::StorageError;

/// Magic bytes identifying a blueprint file.
pub const MAGIC: [u8; 4] = *b"BLPR";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 20;

/// Current blueprint file format version.
pub const FORMAT_VERSION: u32 = 1;

/// Payload is an lz4 block with its size prepended.
pub const FLAG_LZ4: u32 = 1;

const KNOWN_FLAGS: u32 = FLAG_LZ4;

/// Seed for xxHash32 checksum.
const XXHASH_SEED: u32 = 0;

/// Parsed file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub format_version: u32,
    pub flags: u32,
    pub uncompressed_size: u32,
    pub checksum: u32,
}

impl FileHeader {
    /// Header describing the uncompressed `payload`.
    pub fn for_payload(payload: &[u8], compressed: bool) -> Result<Self, StorageError> {
        let uncompressed_size = u32::try_from(payload.len()).map_err(|_| {
            StorageError::Encode(format!(
                "payload of {} bytes does not fit the header length field",
                payload.len()
            ))
        })?;
        Ok(Self {
            format_version: FORMAT_VERSION,
            flags: if compressed { FLAG_LZ4 } else { 0 },
            uncompressed_size,
            checksum: payload_checksum(payload),
        })
    }

    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_LZ4 != 0
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&self.format_version.to_le_bytes());
        out.extend_from_slice(&self.flags.to_le_bytes());
        out.extend_from_slice(&self.uncompressed_size.to_le_bytes());
        out.extend_from_slice(&self.checksum.to_le_bytes());
    }
}

pub fn payload_checksum(payload: &[u8]) -> u32 {
    xxh32(payload, XXHASH_SEED)
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Split `bytes` into its header and the (possibly compressed) body.
///
/// # Errors
///
/// - `InvalidMagic` if the bytes do not start with "BLPR"
/// - `Corrupt` if the header is truncated or carries unknown flags
/// - `VersionMismatch` if the file comes from a newer format version
pub fn parse_header(bytes: &[u8]) -> Result<(FileHeader, &[u8]), StorageError> {
    if bytes.len() < MAGIC.len() || bytes[..4] != MAGIC {
        return Err(StorageError::InvalidMagic);
    }
    if bytes.len() < HEADER_SIZE {
        return Err(StorageError::Corrupt(format!(
            "header truncated ({} bytes, need at least {HEADER_SIZE})",
            bytes.len()
        )));
    }

    let header = FileHeader {
        format_version: read_u32(bytes, 4),
        flags: read_u32(bytes, 8),
        uncompressed_size: read_u32(bytes, 12),
        checksum: read_u32(bytes, 16),
    };

    if header.format_version > FORMAT_VERSION {
        return Err(StorageError::VersionMismatch {
            expected_max: FORMAT_VERSION,
            found: header.format_version,
        });
    }
    if header.flags & !KNOWN_FLAGS != 0 {
        return Err(StorageError::Corrupt(format!(
            "unknown header flags {:#010X}",
            header.flags
        )));
    }

    Ok((header, &bytes[HEADER_SIZE..]))
}
