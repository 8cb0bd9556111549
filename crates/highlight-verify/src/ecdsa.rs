//! secp256k1 signer recovery for EIP-712 digests.

use highlight_core::eip712::keccak256;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

/// Length of an `r || s || v` signature.
pub const SIGNATURE_LEN: usize = 65;

/// The Ethereum address of a public key.
pub fn address_of(key: &VerifyingKey) -> [u8; 20] {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// Render an address as lowercase `0x` hex.
pub fn format_address(address: &[u8; 20]) -> String {
    format!("0x{}", hex::encode(address))
}

/// Parse a `0x`-prefixed 20-byte address.
pub fn parse_address(text: &str) -> Option<[u8; 20]> {
    let digits = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))?;
    let bytes = hex::decode(digits).ok()?;
    bytes.try_into().ok()
}

/// Recover the address that produced `signature` over `digest`.
///
/// Accepts `v` as 0/1 or 27/28. High-s signatures are normalized before
/// recovery, flipping the recovery parity.
pub fn recover_address(digest: &[u8; 32], signature: &[u8]) -> Option<[u8; 20]> {
    if signature.len() != SIGNATURE_LEN {
        return None;
    }
    let v = match signature[64] {
        v @ (0 | 1) => v,
        v @ (27 | 28) => v - 27,
        _ => return None,
    };
    let mut recovery_id = RecoveryId::from_byte(v)?;
    let mut sig = Signature::from_slice(&signature[..64]).ok()?;
    if let Some(normalized) = sig.normalize_s() {
        sig = normalized;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }

    let key = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id).ok()?;
    Some(address_of(&key))
}

/// Whether `signature` over `digest` recovers to `signer`.
pub fn verify(digest: &[u8; 32], signature: &[u8], signer: &str) -> bool {
    match (recover_address(digest, signature), parse_address(signer)) {
        (Some(recovered), Some(expected)) => recovered == expected,
        _ => false,
    }
}
