/// Property tests for wallet signature verification
use agrichain_gateway::identity::{address_from_verifying_key, eip191_hash, verify_signature};
use k256::ecdsa::SigningKey;
use proptest::prelude::*;

fn sign(key: &SigningKey, message: &str) -> String {
    let (sig, recid) = key.sign_prehash_recoverable(&eip191_hash(message)).unwrap();
    let mut bytes = sig.to_bytes().to_vec();
    bytes.push(recid.to_byte() + 27);
    format!("0x{}", hex::encode(bytes))
}

fn signing_key(seed: [u8; 32]) -> Option<SigningKey> {
    SigningKey::from_bytes(&seed.into()).ok()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_own_signature_verifies(seed in any::<[u8; 32]>(), message in ".{1,200}") {
        let key = signing_key(seed);
        prop_assume!(key.is_some());
        let key = key.unwrap();
        let address = address_from_verifying_key(key.verifying_key());

        prop_assert!(verify_signature(&message, &sign(&key, &message), &address));
        prop_assert!(verify_signature(&message, &sign(&key, &message), &address.to_uppercase().replacen("0X", "0x", 1)));
    }

    #[test]
    fn prop_other_message_fails(seed in any::<[u8; 32]>(), message in "[a-z]{1,64}") {
        let key = signing_key(seed);
        prop_assume!(key.is_some());
        let key = key.unwrap();
        let address = address_from_verifying_key(key.verifying_key());
        let other = format!("{}!", message);

        prop_assert!(!verify_signature(&other, &sign(&key, &message), &address));
    }

    #[test]
    fn prop_arbitrary_input_never_panics(signature in ".{0,140}", message in ".{0,64}") {
        let _ = verify_signature(&message, &signature, "0x742d35cc6634c0532925a3b844bc454e4438f44e");
    }
}
