//! Save file framing: magic bytes, version, checksum, compression flag.
//!
//! Layout (28 bytes, fixed-size, little-endian):
//!   [0..4]   magic "GPOL"
//!   [4..8]   header format version (u32)
//!   [8..12]  flags (u32, bit 0 = lz4-compressed payload)
//!   [12..20] unix timestamp (u64)
//!   [20..24] uncompressed payload size (u32)
//!   [24..28] xxh32 checksum of the stored payload
//!
//! The checksum covers the stored (compressed) payload, so corruption is
//! caught before any decompression work happens.

use xxhash_rust::xxh32::xxh32;

use crate::save_error::SaveError;

/// Magic bytes identifying a save file.
pub const MAGIC: [u8; 4] = *b"GPOL";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 28;

/// Current header layout version. Distinct from the `SaveData` version,
/// which tracks schema changes; this one tracks the header layout itself.
pub const HEADER_FORMAT_VERSION: u32 = 1;

/// Flag bit: payload is lz4-compressed.
pub const FLAG_COMPRESSED: u32 = 1;

/// Seed for the xxh32 checksum.
const XXHASH_SEED: u32 = 0;

/// Parsed file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub format_version: u32,
    pub flags: u32,
    pub timestamp: u64,
    pub uncompressed_size: u32,
    pub checksum: u32,
}

impl FileHeader {
    #[inline]
    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }
}

fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Compress `data` and wrap it with a file header.
///
/// Returns bytes: [header (28 bytes)] ++ [lz4 payload].
pub fn wrap_with_header(data: &[u8]) -> Vec<u8> {
    let payload = lz4_flex::compress(data);
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&HEADER_FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&FLAG_COMPRESSED.to_le_bytes());
    out.extend_from_slice(&unix_timestamp().to_le_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(&xxh32(&payload, XXHASH_SEED).to_le_bytes());
    out.extend_from_slice(&payload);
    out
}

/// Parse and validate the file header, returning it with the stored payload.
///
/// # Errors
///
/// Rejects files without the magic bytes, files shorter than the header,
/// headers written by a newer build, and payloads whose checksum does not
/// match the header.
pub fn unwrap_header(bytes: &[u8]) -> Result<(FileHeader, &[u8]), SaveError> {
    if bytes.len() < 4 || bytes[..4] != MAGIC {
        return Err(SaveError::corrupt("missing GPOL magic bytes"));
    }
    if bytes.len() < HEADER_SIZE {
        return Err(SaveError::corrupt(format!(
            "file is {} bytes, shorter than the {}-byte header",
            bytes.len(),
            HEADER_SIZE
        )));
    }

    // Header fields, all little-endian.
    let format_version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let flags = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    let timestamp = u64::from_le_bytes([
        bytes[12], bytes[13], bytes[14], bytes[15], bytes[16], bytes[17], bytes[18], bytes[19],
    ]);
    let uncompressed_size = u32::from_le_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
    let checksum = u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]);

    if format_version > HEADER_FORMAT_VERSION {
        return Err(SaveError::UnsupportedVersion {
            found: format_version,
        });
    }

    let payload = &bytes[HEADER_SIZE..];
    let computed = xxh32(payload, XXHASH_SEED);
    if computed != checksum {
        return Err(SaveError::corrupt(format!(
            "checksum mismatch (header {checksum:#010x}, payload {computed:#010x})"
        )));
    }

    Ok((
        FileHeader {
            format_version,
            flags,
            timestamp,
            uncompressed_size,
            checksum,
        },
        payload,
    ))
}

/// Recover the original encoded bytes from a stored payload.
pub fn unpack_payload(header: &FileHeader, payload: &[u8]) -> Result<Vec<u8>, SaveError> {
    if !header.is_compressed() {
        return Ok(payload.to_vec());
    }
    let data = lz4_flex::decompress(payload, header.uncompressed_size as usize)
        .map_err(|e| SaveError::corrupt(format!("lz4 decompression failed: {e}")))?;
    if data.len() != header.uncompressed_size as usize {
        return Err(SaveError::corrupt(format!(
            "decompressed {} bytes, header promised {}",
            data.len(),
            header.uncompressed_size
        )));
    }
    Ok(data)
}
