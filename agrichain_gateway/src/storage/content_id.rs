//! Content identifiers
//!
//! Blobs are addressed by CID. Version 0 ids are bare base58btc SHA-256
//! multihashes (`Qm...`); version 1 ids are multibase strings over
//! `<version><codec><multihash>`, each prefix an unsigned varint.

use data_encoding::{BASE32_NOPAD, HEXLOWER_PERMISSIVE};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Raw-bytes multicodec
pub const RAW_CODEC: u64 = 0x55;
/// sha2-256 multihash code
pub const SHA2_256: u64 = 0x12;

const CID_V0_LEN: usize = 46;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContentIdError {
    #[error("empty content id")]
    Empty,

    #[error("unsupported multibase prefix {0:?}")]
    UnknownBase(char),

    #[error("invalid {0} encoding")]
    Encoding(&'static str),

    #[error("truncated varint")]
    Varint,

    #[error("unsupported CID version {0}")]
    Version(u64),

    #[error("digest length {actual} does not match declared {declared}")]
    DigestLength { declared: u64, actual: usize },
}

/// Decoded content id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentId {
    pub version: u64,
    pub codec: u64,
    pub hash_code: u64,
    pub digest: Vec<u8>,
}

/// CIDv1 (raw codec, sha2-256) of `bytes`, base32 lower-case
pub fn raw_content_id(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);

    let mut encoded = Vec::with_capacity(4 + digest.len());
    for value in [1, RAW_CODEC, SHA2_256, digest.len() as u64] {
        push_varint(&mut encoded, value);
    }
    encoded.extend_from_slice(&digest);

    format!("b{}", BASE32_NOPAD.encode(&encoded).to_ascii_lowercase())
}

/// Parse a v0 or v1 content id
pub fn parse_content_id(content_id: &str) -> Result<ContentId, ContentIdError> {
    let content_id = content_id.trim();
    if content_id.is_empty() {
        return Err(ContentIdError::Empty);
    }

    if content_id.len() == CID_V0_LEN && content_id.starts_with("Qm") {
        let bytes = bs58::decode(content_id)
            .into_vec()
            .map_err(|_| ContentIdError::Encoding("base58btc"))?;
        let (hash_code, digest) = parse_multihash(&bytes)?;
        return Ok(ContentId {
            version: 0,
            codec: 0x70,
            hash_code,
            digest,
        });
    }

    let mut chars = content_id.chars();
    let prefix = chars.next().ok_or(ContentIdError::Empty)?;
    let body = chars.as_str();
    let bytes = match prefix {
        'b' | 'B' => BASE32_NOPAD
            .decode(body.to_ascii_uppercase().as_bytes())
            .map_err(|_| ContentIdError::Encoding("base32"))?,
        'z' => bs58::decode(body)
            .into_vec()
            .map_err(|_| ContentIdError::Encoding("base58btc"))?,
        'f' | 'F' => HEXLOWER_PERMISSIVE
            .decode(body.as_bytes())
            .map_err(|_| ContentIdError::Encoding("base16"))?,
        other => return Err(ContentIdError::UnknownBase(other)),
    };

    let mut rest = bytes.as_slice();
    let version = read_varint(&mut rest)?;
    if version != 1 {
        return Err(ContentIdError::Version(version));
    }
    let codec = read_varint(&mut rest)?;
    let (hash_code, digest) = parse_multihash(rest)?;

    Ok(ContentId {
        version,
        codec,
        hash_code,
        digest,
    })
}

fn parse_multihash(mut bytes: &[u8]) -> Result<(u64, Vec<u8>), ContentIdError> {
    let hash_code = read_varint(&mut bytes)?;
    let declared = read_varint(&mut bytes)?;
    if bytes.is_empty() || bytes.len() as u64 != declared {
        return Err(ContentIdError::DigestLength {
            declared,
            actual: bytes.len(),
        });
    }
    Ok((hash_code, bytes.to_vec()))
}

fn push_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

// Unsigned LEB128, at most 9 bytes
fn read_varint(bytes: &mut &[u8]) -> Result<u64, ContentIdError> {
    let input: &[u8] = *bytes;
    let mut value = 0u64;
    for (i, &byte) in input.iter().enumerate().take(9) {
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            *bytes = &input[i + 1..];
            return Ok(value);
        }
    }
    Err(ContentIdError::Varint)
}
