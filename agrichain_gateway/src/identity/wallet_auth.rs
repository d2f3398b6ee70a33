//! Wallet signature authentication
//!
//! The gateway hands out a challenge message that embeds the wallet address
//! and the issue time. The caller signs it with the wallet's personal-message
//! signing and sends it back. Nothing is stored server-side: verification
//! recovers the signer from `(message, signature)` and compares addresses.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Signature recovery failed: {0}")]
    RecoveryFailed(String),
}

/// Server-issued message a wallet must sign. Ephemeral, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub address: String,
    pub message: String,
    pub issued_at: i64,
}

/// `0x` followed by exactly 40 hex digits, any case
pub fn is_valid_address(address: &str) -> bool {
    address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .map(|hex_part| hex_part.len() == 40 && hex_part.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

/// Build the challenge for `address` at the current millisecond.
///
/// Two calls within the same millisecond produce the same message.
pub fn issue_challenge(address: &str) -> Result<Challenge, IdentityError> {
    issue_challenge_at(address, chrono::Utc::now().timestamp_millis())
}

pub(crate) fn issue_challenge_at(address: &str, issued_at: i64) -> Result<Challenge, IdentityError> {
    if !is_valid_address(address) {
        return Err(IdentityError::InvalidAddress(address.to_string()));
    }

    let message = format!(
        "Welcome to AgriChain!\n\n\
         Sign this message to prove you control this wallet.\n\n\
         Wallet: {}\n\
         Timestamp: {}",
        address, issued_at
    );

    Ok(Challenge {
        address: address.to_string(),
        message,
        issued_at,
    })
}

/// Keccak-256 of the personal-message envelope
/// (`"\x19Ethereum Signed Message:\n" + len + message`)
pub fn eip191_hash(message: &str) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()).as_bytes());
    hasher.update(message.as_bytes());
    hasher.finalize().into()
}

/// Lower-case `0x` address of a public key: last 20 bytes of the
/// keccak-256 of the uncompressed point without its `0x04` tag
pub fn address_from_verifying_key(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let digest = Keccak256::digest(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&digest[12..]))
}

/// Recover the address that signed `message`.
///
/// `signature` is 65 bytes of hex (`r || s || v`, optional `0x`), with `v`
/// either 0/1 or 27/28.
pub fn recover_address(message: &str, signature: &str) -> Result<String, IdentityError> {
    let sig_hex = signature.strip_prefix("0x").unwrap_or(signature);
    let bytes = hex::decode(sig_hex).map_err(|e| IdentityError::MalformedSignature(e.to_string()))?;

    if bytes.len() != 65 {
        return Err(IdentityError::MalformedSignature(format!(
            "expected 65 bytes, got {}",
            bytes.len()
        )));
    }

    let v = match bytes[64] {
        27 | 28 => bytes[64] - 27,
        0 | 1 => bytes[64],
        other => {
            return Err(IdentityError::MalformedSignature(format!(
                "unsupported recovery byte {}",
                other
            )))
        }
    };

    let mut sig = Signature::from_slice(&bytes[..64])
        .map_err(|e| IdentityError::MalformedSignature(e.to_string()))?;
    let mut recovery_id = RecoveryId::from_byte(v)
        .ok_or_else(|| IdentityError::MalformedSignature(format!("bad recovery id {}", v)))?;

    // k256 only accepts low-S; flipping S flips the parity of R's y.
    if let Some(normalized) = sig.normalize_s() {
        sig = normalized;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }

    let digest = eip191_hash(message);
    let key = VerifyingKey::recover_from_prehash(&digest, &sig, recovery_id)
        .map_err(|e| IdentityError::RecoveryFailed(e.to_string()))?;

    Ok(address_from_verifying_key(&key))
}

/// True when `signature` over `message` was produced by `claimed_address`.
///
/// Never fails: malformed input is logged and reported as `false`.
pub fn verify_signature(message: &str, signature: &str, claimed_address: &str) -> bool {
    match recover_address(message, signature) {
        Ok(recovered) => {
            let matches = recovered.eq_ignore_ascii_case(claimed_address.trim());
            debug!(
                "Recovered {} for claimed {} (match: {})",
                recovered, claimed_address, matches
            );
            matches
        }
        Err(e) => {
            warn!("Signature verification failed for {}: {}", claimed_address, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    fn signer(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; 32].into()).unwrap()
    }

    fn sign(key: &SigningKey, message: &str) -> String {
        let (sig, recid) = key.sign_prehash_recoverable(&eip191_hash(message)).unwrap();
        let mut bytes = sig.to_bytes().to_vec();
        bytes.push(recid.to_byte() + 27);
        format!("0x{}", hex::encode(bytes))
    }

    #[test]
    fn test_address_validation() {
        assert!(is_valid_address("0x742d35Cc6634C0532925a3b844Bc454e4438f44e"));
        assert!(!is_valid_address("742d35Cc6634C0532925a3b844Bc454e4438f44e"));
        assert!(!is_valid_address("0x742d35"));
        assert!(!is_valid_address("0xZZ2d35Cc6634C0532925a3b844Bc454e4438f44e"));
        assert!(!is_valid_address(""));
    }

    #[test]
    fn test_challenge_embeds_address_and_timestamp() {
        let address = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";
        let challenge = issue_challenge(address).unwrap();

        assert!(challenge.message.contains(address));
        let stamp = challenge
            .message
            .lines()
            .find_map(|l| l.strip_prefix("Timestamp: "))
            .unwrap();
        assert_eq!(stamp.parse::<i64>().unwrap(), challenge.issued_at);
    }

    #[test]
    fn test_challenge_rejects_invalid_address() {
        assert_eq!(
            issue_challenge("not-an-address"),
            Err(IdentityError::InvalidAddress("not-an-address".into()))
        );
    }

    #[test]
    fn test_same_millisecond_challenges_collide() {
        let address = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";
        let a = issue_challenge_at(address, 1_700_000_000_000).unwrap();
        let b = issue_challenge_at(address, 1_700_000_000_000).unwrap();
        assert_eq!(a.message, b.message);
    }

    #[test]
    fn test_verify_round_trip() {
        let key = signer(7);
        let address = address_from_verifying_key(key.verifying_key());
        let challenge = issue_challenge(&address).unwrap();
        let signature = sign(&key, &challenge.message);

        assert!(verify_signature(&challenge.message, &signature, &address));
        assert!(verify_signature(
            &challenge.message,
            &signature,
            &address.to_uppercase().replace("0X", "0x")
        ));
    }

    #[test]
    fn test_verify_rejects_other_message() {
        let key = signer(7);
        let address = address_from_verifying_key(key.verifying_key());
        let signature = sign(&key, "message one");
        assert!(!verify_signature("message two", &signature, &address));
    }

    #[test]
    fn test_verify_rejects_other_key() {
        let alice = signer(7);
        let bob = signer(9);
        let alice_address = address_from_verifying_key(alice.verifying_key());
        let signature = sign(&bob, "hello");
        assert!(!verify_signature("hello", &signature, &alice_address));
    }

    #[test]
    fn test_verify_never_panics_on_garbage() {
        let address = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";
        assert!(!verify_signature("hello", "", address));
        assert!(!verify_signature("hello", "0xnothex", address));
        assert!(!verify_signature("hello", &format!("0x{}", "00".repeat(65)), address));
        assert!(!verify_signature("hello", &format!("0x{}", "11".repeat(64)), address));
    }

    #[test]
    fn test_recovery_byte_forms_are_equivalent() {
        let key = signer(3);
        let address = address_from_verifying_key(key.verifying_key());
        let (sig, recid) = key.sign_prehash_recoverable(&eip191_hash("hi")).unwrap();
        let mut raw = sig.to_bytes().to_vec();
        raw.push(recid.to_byte());
        let unprefixed = hex::encode(&raw);

        assert!(verify_signature("hi", &unprefixed, &address));
    }

    #[test]
    fn test_high_s_signature_is_normalized() {
        let key = signer(5);
        let address = address_from_verifying_key(key.verifying_key());
        let (sig, recid) = key.sign_prehash_recoverable(&eip191_hash("flip")).unwrap();

        // Build the malleable twin (r, n - s) with flipped parity.
        let (r, s) = sig.split_scalars();
        let high = Signature::from_scalars(r, -*s).unwrap();
        let mut raw = high.to_bytes().to_vec();
        raw.push((recid.to_byte() ^ 1) + 27);

        assert!(verify_signature("flip", &hex::encode(raw), &address));
    }
}
