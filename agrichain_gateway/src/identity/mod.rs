//! Wallet identity: challenge issuing and signature verification

pub mod wallet_auth;

pub use wallet_auth::{
    address_from_verifying_key, eip191_hash, is_valid_address, issue_challenge, recover_address,
    verify_signature, Challenge, IdentityError,
};
